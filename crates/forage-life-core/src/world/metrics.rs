use super::{World, WorldInitError};
use crate::agent::{EvolutionTrait, Species};
use crate::config::SimConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Clone, Debug, Default)]
pub struct StepTimings {
    pub agent_update_us: u64,
    pub overlap_us: u64,
    pub food_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TraitCounts {
    pub none: usize,
    pub fast_movement: usize,
    pub long_laser: usize,
    pub efficient_energy: usize,
}

impl TraitCounts {
    fn record(&mut self, evolution: EvolutionTrait) {
        match evolution {
            EvolutionTrait::None => self.none += 1,
            EvolutionTrait::FastMovement => self.fast_movement += 1,
            EvolutionTrait::LongLaser => self.long_laser += 1,
            EvolutionTrait::EfficientEnergy => self.efficient_energy += 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub tick: u64,
    pub collectors: usize,
    pub predators: usize,
    pub collector_energy_mean: f32,
    pub predator_energy_mean: f32,
    pub mean_size: f64,
    pub food_active: usize,
    pub golden_food_active: usize,
    pub traits: TraitCounts,
    pub birth_count: usize,
    pub death_count: usize,
    pub consumed_count: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub final_collectors: usize,
    pub final_predators: usize,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub total_births: usize,
    #[serde(default)]
    pub total_deaths: usize,
    #[serde(default)]
    pub total_consumed: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PopulationStats {
    pub collectors: usize,
    pub predators: usize,
    pub total_births: usize,
    pub total_deaths: usize,
    pub total_consumed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepError {
    Init { seed: u64, source: WorldInitError },
    Experiment { seed: u64, source: ExperimentError },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Init { seed, source } => write!(f, "seed {seed}: {source}"),
            SweepError::Experiment { seed, source } => write!(f, "seed {seed}: {source}"),
        }
    }
}

impl Error for SweepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SweepError::Init { source, .. } => Some(source),
            SweepError::Experiment { source, .. } => Some(source),
        }
    }
}

fn mean_f32(sum: f32, n: usize) -> f32 {
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn population_stats(&self) -> PopulationStats {
        PopulationStats {
            collectors: self.count(Species::Collector),
            predators: self.count(Species::Predator),
            total_births: self.total_births,
            total_deaths: self.total_deaths,
            total_consumed: self.total_consumed,
        }
    }

    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let mut collectors = 0usize;
        let mut predators = 0usize;
        let mut collector_energy = 0.0f32;
        let mut predator_energy = 0.0f32;
        let mut size_sum = 0.0f64;
        let mut traits = TraitCounts::default();

        for agent in self.agents.values() {
            match agent.species {
                Species::Collector => {
                    collectors += 1;
                    collector_energy += agent.energy;
                }
                Species::Predator => {
                    predators += 1;
                    predator_energy += agent.energy;
                }
            }
            size_sum += agent.size;
            traits.record(agent.evolution);
        }

        let alive = collectors + predators;
        StepMetrics {
            step,
            tick: self.tick,
            collectors,
            predators,
            collector_energy_mean: mean_f32(collector_energy, collectors),
            predator_energy_mean: mean_f32(predator_energy, predators),
            mean_size: if alive == 0 {
                0.0
            } else {
                size_sum / alive as f64
            },
            food_active: self.food.active_count(),
            golden_food_active: self.food.active_golden_count(),
            traits,
            birth_count: self.births_last_step,
            death_count: self.deaths_last_step,
            consumed_count: self.consumed_last_step,
        }
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Step `steps` ticks, sampling metrics every `sample_every` ticks and on the last one.
    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let births_before = self.total_births;
        let deaths_before = self.total_deaths;
        let consumed_before = self.total_consumed;
        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(step));
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            steps,
            sample_every,
            final_collectors: self.count(Species::Collector),
            final_predators: self.count(Species::Predator),
            samples,
            total_births: self.total_births - births_before,
            total_deaths: self.total_deaths - deaths_before,
            total_consumed: self.total_consumed - consumed_before,
        })
    }
}

/// Run one independent world per seed in parallel. Results keep the order of `seeds`.
pub fn run_seed_sweep(
    config: &SimConfig,
    seeds: &[u64],
    steps: usize,
    sample_every: usize,
) -> Result<Vec<RunSummary>, SweepError> {
    seeds
        .par_iter()
        .map(|&seed| {
            let config = SimConfig {
                seed,
                ..config.clone()
            };
            let mut world =
                World::try_new(config).map_err(|source| SweepError::Init { seed, source })?;
            world
                .try_run_experiment(steps, sample_every)
                .map_err(|source| SweepError::Experiment { seed, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        SimConfig {
            world_width: 200.0,
            world_height: 200.0,
            food_pool_size: 10,
            hazard_count: 0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn experiment_rejects_zero_sample_interval() {
        let mut world = World::new(small_config());
        assert_eq!(
            world.try_run_experiment(10, 0).unwrap_err(),
            ExperimentError::InvalidSampleEvery
        );
    }

    #[test]
    fn experiment_rejects_excessive_steps() {
        let mut world = World::new(small_config());
        let err = world
            .try_run_experiment(World::MAX_EXPERIMENT_STEPS + 1, 1_000)
            .unwrap_err();
        assert!(matches!(err, ExperimentError::TooManySteps { .. }));
    }

    #[test]
    fn experiment_rejects_excessive_samples() {
        let mut world = World::new(small_config());
        let err = world
            .try_run_experiment(World::MAX_EXPERIMENT_SAMPLES + 1, 1)
            .unwrap_err();
        assert!(matches!(err, ExperimentError::TooManySamples { .. }));
    }

    #[test]
    fn experiment_samples_on_interval_and_final_step() {
        let mut world = World::new(small_config());
        let summary = world.run_experiment(25, 10);
        let steps: Vec<usize> = summary.samples.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![10, 20, 25]);
        assert_eq!(summary.samples.last().map(|s| s.tick), Some(25));
        assert_eq!(summary.schema_version, 1);
        assert_eq!(
            summary.final_collectors + summary.final_predators,
            world.agent_count()
        );
    }

    #[test]
    fn step_metrics_count_species_and_traits() {
        let world = World::new(small_config());
        let metrics = world.collect_step_metrics(0);
        assert_eq!(metrics.collectors, 20);
        assert_eq!(metrics.predators, 4);
        assert_eq!(metrics.traits.none, 24);
        assert_eq!(metrics.food_active, 10);
        assert!((metrics.collector_energy_mean - 50.0).abs() < 1e-6);
        assert!((metrics.predator_energy_mean - 60.0).abs() < 1e-6);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let mut world = World::new(small_config());
        let summary = world.run_experiment(5, 5);
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.steps, 5);
        assert_eq!(parsed.samples.len(), 1);
    }

    #[test]
    fn seed_sweep_is_ordered_and_reproducible() {
        let config = small_config();
        let seeds = [3, 1, 2];
        let first = run_seed_sweep(&config, &seeds, 30, 10).unwrap();
        let second = run_seed_sweep(&config, &seeds, 30, 10).unwrap();
        assert_eq!(first.len(), 3);
        for ((a, b), seed) in first.iter().zip(&second).zip(seeds) {
            assert_eq!(a.seed, seed);
            assert_eq!(a.final_collectors, b.final_collectors);
            assert_eq!(a.final_predators, b.final_predators);
            assert_eq!(a.total_births, b.total_births);
        }
    }

    #[test]
    fn seed_sweep_reports_failing_seed() {
        let config = small_config();
        let err = run_seed_sweep(&config, &[7], 10, 0).unwrap_err();
        assert_eq!(
            err,
            SweepError::Experiment {
                seed: 7,
                source: ExperimentError::InvalidSampleEvery
            }
        );
    }
}
