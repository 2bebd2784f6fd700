use crate::agent::{EvolutionTrait, Phase, Species};
use crate::food::FoodTier;
use crate::hazard::Hazard;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HookView {
    pub tip: [f64; 2],
    pub length: f64,
    pub latched: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    /// Opaque handle value, stable for the lifetime of the agent.
    pub id: u64,
    pub species: Species,
    pub position: [f64; 2],
    pub size: f64,
    pub energy: f32,
    pub opacity: f32,
    pub evolution: EvolutionTrait,
    pub phase: Phase,
    /// Beam end point in world coordinates (unwrapped), while scanning.
    pub beam_end: Option<[f64; 2]>,
    pub ping_radius: Option<f64>,
    pub hook: Option<HookView>,
    pub pulse_radius: Option<f64>,
    pub counter_draining: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub position: [f64; 2],
    pub size: f64,
    pub tier: FoodTier,
    pub golden: bool,
    pub being_pulled: bool,
}

/// Read-only view of the world for renderers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub width: f64,
    pub height: f64,
    pub agents: Vec<AgentView>,
    pub food: Vec<FoodView>,
    pub hazards: Vec<Hazard>,
}

impl WorldSnapshot {
    pub fn count(&self, species: Species) -> usize {
        self.agents.iter().filter(|a| a.species == species).count()
    }
}
