use crate::agent::{EvolutionTrait, Species};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnCause {
    Initial,
    Reproduction,
    Predation,
}

/// Lifecycle notifications recorded during a tick, for logging/telemetry consumers.
/// They never feed back into the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    PopulationChanged { previous: usize, current: usize },
    Spawned { species: Species, cause: SpawnCause },
    Consumed { predator: Species, prey: Species },
    Starved { species: Species },
    Evolved { species: Species, evolution: EvolutionTrait },
    GoldenFoodSpawned { slot: usize },
}
