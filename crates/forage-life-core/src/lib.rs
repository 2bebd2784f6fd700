pub mod agent;
pub mod config;
pub mod events;
pub mod food;
pub mod hazard;
pub mod rng;
pub mod snapshot;
pub mod spatial;
pub mod world;

pub use agent::{AgentId, EvolutionTrait, Species};
pub use config::{SimConfig, SimConfigError};
pub use events::{SimEvent, SpawnCause};
pub use snapshot::WorldSnapshot;
pub use world::{
    run_seed_sweep, ExperimentError, PopulationStats, RunSummary, StepMetrics, StepTimings,
    SweepError, TraitCounts, World, WorldInitError,
};
