pub mod defense;
pub mod economy;
pub mod foraging;
pub mod hunting;
pub mod lifecycle;
pub mod metrics;
pub mod movement;

pub use metrics::*;

use crate::agent::{Agent, AgentId, Species};
use crate::config::{SimConfig, SimConfigError};
use crate::events::{SimEvent, SpawnCause};
use crate::food::FoodStore;
use crate::hazard::{Hazard, HazardField};
use crate::rng::create_rng;
use crate::snapshot::{AgentView, FoodView, HookView, WorldSnapshot};
use crate::spatial::Torus;
use rand::Rng;
use rand_chacha::ChaCha12Rng;
use slotmap::{Key, SlotMap};
use std::{error::Error, fmt};

pub struct World {
    pub(crate) agents: SlotMap<AgentId, Agent>,
    /// Stable iteration order: insertion order of live agents.
    pub(crate) order: Vec<AgentId>,
    pub(crate) food: FoodStore,
    pub(crate) hazards: HazardField,
    pub(crate) config: SimConfig,
    pub(crate) torus: Torus,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) tick: u64,
    pub(crate) events: Vec<SimEvent>,
    pub(crate) last_population: usize,
    pub(crate) manual_pulse_all: bool,
    pub(crate) manual_pulse_ids: Vec<AgentId>,
    pub(crate) births_last_step: usize,
    pub(crate) deaths_last_step: usize,
    pub(crate) consumed_last_step: usize,
    pub(crate) total_births: usize,
    pub(crate) total_deaths: usize,
    pub(crate) total_consumed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    InvalidHazard { index: usize },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::InvalidHazard { index } => write!(
                f,
                "hazard {index} must have a finite position and a non-negative finite radius"
            ),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Build a world populated according to `config`: food pool, hazards, then collectors
    /// followed by predators at random positions.
    pub fn try_new(config: SimConfig) -> Result<Self, WorldInitError> {
        let mut world = Self::try_empty(config)?;
        world.hazards = HazardField::generate(&mut world.rng, &world.torus, &world.config);
        for species in [Species::Collector, Species::Predator] {
            let params = species.params(&world.config).clone();
            for _ in 0..params.initial_count {
                let position = [
                    world.rng.random::<f64>() * world.torus.width,
                    world.rng.random::<f64>() * world.torus.height,
                ];
                world.spawn_agent(species, position, params.initial_energy, SpawnCause::Initial);
            }
        }
        world.events.clear();
        Ok(world)
    }

    /// Build a world with its food pool but no agents and no hazards.
    pub fn try_empty(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let torus = Torus::new(config.world_width, config.world_height);
        let mut rng = create_rng(config.seed);
        let food = FoodStore::new(&mut rng, &torus, &config);
        Ok(Self {
            agents: SlotMap::with_key(),
            order: Vec::new(),
            food,
            hazards: HazardField::default(),
            config,
            torus,
            rng,
            tick: 0,
            events: Vec::new(),
            last_population: 0,
            manual_pulse_all: false,
            manual_pulse_ids: Vec::new(),
            births_last_step: 0,
            deaths_last_step: 0,
            consumed_last_step: 0,
            total_births: 0,
            total_deaths: 0,
            total_consumed: 0,
        })
    }

    /// Replace the hazard field with explicit hazards, wrapping their centers into the world.
    pub fn with_hazards(mut self, hazards: Vec<Hazard>) -> Result<Self, WorldInitError> {
        let mut wrapped = Vec::with_capacity(hazards.len());
        for (index, mut hazard) in hazards.into_iter().enumerate() {
            let valid = hazard.position.iter().all(|c| c.is_finite())
                && hazard.radius.is_finite()
                && hazard.radius >= 0.0;
            if !valid {
                return Err(WorldInitError::InvalidHazard { index });
            }
            hazard.position = self.torus.wrap(hazard.position);
            wrapped.push(hazard);
        }
        self.hazards = HazardField::new(wrapped);
        Ok(self)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Swap in a new configuration. Positions are re-wrapped if the world extent changed;
    /// the food pool and population are kept as they are.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), WorldInitError> {
        config.validate()?;
        let torus = Torus::new(config.world_width, config.world_height);
        if torus != self.torus {
            for agent in self.agents.values_mut() {
                agent.position = torus.wrap(agent.position);
            }
            for food in self.food.items_mut() {
                food.position = torus.wrap(food.position);
            }
            self.torus = torus;
        }
        self.config = config;
        Ok(())
    }

    pub fn torus(&self) -> &Torus {
        &self.torus
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    /// Live agent handles in update order.
    pub fn agent_ids(&self) -> &[AgentId] {
        &self.order
    }

    /// Live agents in update order.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.agents.get(id).map(|agent| (id, agent)))
    }

    pub fn agent_count(&self) -> usize {
        self.order.len()
    }

    pub fn count(&self, species: Species) -> usize {
        self.agents
            .values()
            .filter(|agent| agent.species == species)
            .count()
    }

    pub fn food(&self) -> &FoodStore {
        &self.food
    }

    pub fn food_mut(&mut self) -> &mut FoodStore {
        &mut self.food
    }

    pub fn hazards(&self) -> &HazardField {
        &self.hazards
    }

    /// Lifecycle notifications recorded during the most recent tick.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Arm the manual pulse input: on the next tick every collector whose cooldown has
    /// elapsed starts a pulse.
    pub fn request_pulse(&mut self) {
        self.manual_pulse_all = true;
    }

    /// Arm the manual pulse input for a single collector.
    pub fn request_pulse_for(&mut self, id: AgentId) {
        self.manual_pulse_ids.push(id);
    }

    /// Insert a new agent at the end of the update order.
    ///
    /// `Initial` agents join the baseline population rather than counting as births.
    pub fn spawn_agent(
        &mut self,
        species: Species,
        position: [f64; 2],
        energy: f32,
        cause: SpawnCause,
    ) -> AgentId {
        let behavior_seed = self.rng.random::<f64>();
        let position = self.torus.wrap(position);
        let agent = Agent::new(species, position, energy, behavior_seed, &self.config);
        let id = self.agents.insert(agent);
        self.order.push(id);
        if cause == SpawnCause::Initial {
            self.last_population = self.agent_count();
        } else {
            self.births_last_step += 1;
            self.total_births += 1;
        }
        tracing::debug!(
            tick = self.tick,
            species = species.as_str(),
            ?cause,
            "agent spawned"
        );
        self.events.push(SimEvent::Spawned { species, cause });
        id
    }

    /// Remove an agent and clear every hook, counter-drain, and food reference to it.
    pub fn remove_agent(&mut self, id: AgentId) -> Option<Agent> {
        let removed = self.agents.remove(id)?;
        self.order.retain(|&other| other != id);
        for other in self.agents.values_mut() {
            other.forget(id);
        }
        self.food.release_owner(id);
        Some(removed)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let config = &self.config;
        let agents = self
            .agents()
            .map(|(id, agent)| {
                let caps = agent.capabilities();
                let beam_end = agent.is_scanning().then(|| {
                    let offset = agent.beam_offset(config);
                    [
                        agent.position[0] + offset[0],
                        agent.position[1] + offset[1],
                    ]
                });
                AgentView {
                    id: id.data().as_ffi(),
                    species: agent.species,
                    position: agent.position,
                    size: agent.size,
                    energy: agent.energy,
                    opacity: agent.opacity(config.max_energy),
                    evolution: agent.evolution,
                    phase: agent.motion.phase,
                    beam_end,
                    ping_radius: (caps.pings && agent.ping.active).then_some(agent.ping.radius),
                    hook: agent.hook.is_engaged().then(|| HookView {
                        tip: agent.hook.tip,
                        length: agent.hook.length,
                        latched: agent.hook.latched,
                    }),
                    pulse_radius: (caps.pulses && agent.pulse.active)
                        .then_some(agent.pulse.radius),
                    counter_draining: agent.counter_drain.is_active(),
                }
            })
            .collect();
        let food = self
            .food
            .items()
            .iter()
            .filter(|f| f.active)
            .map(|f| FoodView {
                position: f.position,
                size: f.size,
                tier: f.tier,
                golden: f.golden,
                being_pulled: f.is_being_pulled(),
            })
            .collect();
        WorldSnapshot {
            tick: self.tick,
            width: self.torus.width,
            height: self.torus.height,
            agents,
            food,
            hazards: self.hazards.hazards().to_vec(),
        }
    }
}
