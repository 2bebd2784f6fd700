use serde::{Deserialize, Deserializer, Serialize};

/// Numeric parameters that differ between collectors and predators.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeciesParams {
    /// Number of agents of this species placed at world construction.
    pub initial_count: usize,
    /// Energy assigned to agents placed at world construction.
    pub initial_energy: f32,
    /// Baseline movement speed in world units per second.
    pub base_speed: f64,
    /// Energy lost per second before trait modifiers.
    pub decay_rate: f32,
    /// Energy at or above which the agent reproduces.
    pub reproduction_threshold: f32,
    /// Energy the parent is reset to after reproducing.
    pub parent_energy_after_reproduction: f32,
    /// Energy given to each offspring.
    pub offspring_energy: f32,
    /// Maximum per-axis offset of the offspring from the parent.
    pub offspring_offset: f64,
}

impl SpeciesParams {
    pub fn collector() -> Self {
        Self {
            initial_count: 20,
            initial_energy: 50.0,
            base_speed: 60.0,
            decay_rate: 1.0,
            reproduction_threshold: 95.0,
            parent_energy_after_reproduction: 70.0,
            offspring_energy: 30.0,
            offspring_offset: 0.0,
        }
    }

    pub fn predator() -> Self {
        Self {
            initial_count: 4,
            initial_energy: 60.0,
            base_speed: 70.0,
            decay_rate: 0.6,
            reproduction_threshold: 98.0,
            parent_energy_after_reproduction: 50.0,
            offspring_energy: 40.0,
            offspring_offset: 30.0,
        }
    }
}

/// Partial species table; missing fields fall back to the species' own defaults.
#[derive(Deserialize)]
struct SpeciesOverrides {
    initial_count: Option<usize>,
    initial_energy: Option<f32>,
    base_speed: Option<f64>,
    decay_rate: Option<f32>,
    reproduction_threshold: Option<f32>,
    parent_energy_after_reproduction: Option<f32>,
    offspring_energy: Option<f32>,
    offspring_offset: Option<f64>,
}

impl SpeciesOverrides {
    fn apply(self, base: SpeciesParams) -> SpeciesParams {
        SpeciesParams {
            initial_count: self.initial_count.unwrap_or(base.initial_count),
            initial_energy: self.initial_energy.unwrap_or(base.initial_energy),
            base_speed: self.base_speed.unwrap_or(base.base_speed),
            decay_rate: self.decay_rate.unwrap_or(base.decay_rate),
            reproduction_threshold: self
                .reproduction_threshold
                .unwrap_or(base.reproduction_threshold),
            parent_energy_after_reproduction: self
                .parent_energy_after_reproduction
                .unwrap_or(base.parent_energy_after_reproduction),
            offspring_energy: self.offspring_energy.unwrap_or(base.offspring_energy),
            offspring_offset: self.offspring_offset.unwrap_or(base.offspring_offset),
        }
    }
}

fn collector_params<'de, D>(deserializer: D) -> Result<SpeciesParams, D::Error>
where
    D: Deserializer<'de>,
{
    SpeciesOverrides::deserialize(deserializer).map(|o| o.apply(SpeciesParams::collector()))
}

fn predator_params<'de, D>(deserializer: D) -> Result<SpeciesParams, D::Error>
where
    D: Deserializer<'de>,
{
    SpeciesOverrides::deserialize(deserializer).map(|o| o.apply(SpeciesParams::predator()))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Width of the toroidal world in world units.
    pub world_width: f64,
    /// Height of the toroidal world in world units.
    pub world_height: f64,
    /// Fixed simulation timestep in seconds.
    pub dt: f64,
    /// Upper bound of every agent's energy.
    pub max_energy: f32,
    /// Smallest rendered agent size.
    pub min_cell_size: f64,
    /// Largest rendered agent size.
    pub max_cell_size: f64,
    /// Rate at which current size eases toward the energy-derived target size (units/s).
    pub size_ease_rate: f64,
    #[serde(deserialize_with = "collector_params")]
    pub collector: SpeciesParams,
    #[serde(deserialize_with = "predator_params")]
    pub predator: SpeciesParams,
    /// Fraction of the prey's energy gained by a predator when it eats a collector.
    pub predation_gain: f32,
    /// Predator offspring spawned next to a predator after each meal.
    pub predation_offspring: usize,
    /// Energy an untraited agent evolves on reaching from below.
    pub evolution_threshold: f32,
    /// Energy paid when evolving.
    pub evolution_cost: f32,
    /// Speed multiplier granted by `FastMovement`.
    pub fast_movement_multiplier: f64,
    /// Beam length multiplier granted by `LongLaser`.
    pub long_laser_multiplier: f64,
    /// Decay multiplier granted by `EfficientEnergy`.
    pub efficient_energy_decay_multiplier: f32,
    /// Fraction of `max_energy` below which collectors seek food.
    pub hunger_fraction: f32,
    /// Base ticks spent in the moving phase, scaled by the behavior seed.
    pub move_duration_ticks: u32,
    /// Base ticks spent scanning, scaled by the behavior seed.
    pub scan_duration_ticks: u32,
    /// Base arc swept by the detection beam, in degrees.
    pub scan_arc_degrees: f64,
    /// Beam length per square root of agent size.
    pub beam_length_factor: f64,
    /// Lateral distance from the beam within which food is claimed.
    pub beam_tolerance: f64,
    /// Radius within which other agents repel an agent.
    pub avoidance_radius: f64,
    /// Strength of the inverse-distance avoidance term.
    pub avoidance_strength: f64,
    /// Weight of the target-seeking term relative to the current heading.
    pub seek_weight: f64,
    /// Ping growth rate (units/s).
    pub ping_growth_rate: f64,
    /// Ping cap; doubles as the predator detection range.
    pub ping_max_radius: f64,
    /// Ticks between the end of one ping and the start of the next.
    pub ping_cooldown_ticks: u32,
    /// Maximum hook length before it disengages.
    pub hook_max_length: f64,
    /// Hook travel speed (units/s).
    pub hook_speed: f64,
    /// Energy drained per second through a latched hook.
    pub hook_drain_rate: f32,
    /// Pulse growth rate (units/s).
    pub pulse_growth_rate: f64,
    /// Pulse radius at which the pulse ends.
    pub pulse_max_radius: f64,
    /// Ticks a collector must wait between pulses.
    pub pulse_cooldown_ticks: u32,
    /// Distance a hooking predator is pushed back by a full-strength pulse.
    pub pulse_repel_distance: f64,
    /// Ticks a collector siphons from a predator after countering its hook.
    pub counter_drain_ticks: u32,
    /// Energy per second siphoned during a counter-drain.
    pub counter_drain_rate: f32,
    /// Number of regular food items kept in the world.
    pub food_pool_size: usize,
    /// Size of freshly spawned food.
    pub food_size: f64,
    /// Smallest size a pulled food item shrinks to.
    pub food_min_size: f64,
    /// Speed at which claimed food travels toward its collector (units/s).
    pub food_pull_speed: f64,
    /// Shrink rate of claimed food (units/s).
    pub food_shrink_rate: f64,
    /// Energy granted by golden food.
    pub golden_food_energy: f32,
    /// Ticks between golden food spawn attempts (0 disables golden food).
    pub golden_food_interval_ticks: u64,
    /// Maximum simultaneously active golden food items.
    pub max_golden_food: usize,
    /// Number of hazards generated at world construction.
    pub hazard_count: usize,
    pub hazard_min_radius: f64,
    pub hazard_max_radius: f64,
    /// Energy drained per second from agents overlapping a hazard.
    pub hazard_drain_rate: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            world_width: 800.0,
            world_height: 600.0,
            dt: 1.0 / 60.0,
            max_energy: 100.0,
            min_cell_size: 8.0,
            max_cell_size: 32.0,
            size_ease_rate: 20.0,
            collector: SpeciesParams::collector(),
            predator: SpeciesParams::predator(),
            predation_gain: 0.75,
            predation_offspring: 0,
            evolution_threshold: 60.0,
            evolution_cost: 60.0,
            fast_movement_multiplier: 1.5,
            long_laser_multiplier: 1.5,
            efficient_energy_decay_multiplier: 0.5,
            hunger_fraction: 0.3,
            move_duration_ticks: 90,
            scan_duration_ticks: 60,
            scan_arc_degrees: 180.0,
            beam_length_factor: 18.0,
            beam_tolerance: 4.0,
            avoidance_radius: 40.0,
            avoidance_strength: 30.0,
            seek_weight: 0.5,
            ping_growth_rate: 120.0,
            ping_max_radius: 150.0,
            ping_cooldown_ticks: 90,
            hook_max_length: 120.0,
            hook_speed: 240.0,
            hook_drain_rate: 12.0,
            pulse_growth_rate: 180.0,
            pulse_max_radius: 60.0,
            pulse_cooldown_ticks: 180,
            pulse_repel_distance: 40.0,
            counter_drain_ticks: 90,
            counter_drain_rate: 8.0,
            food_pool_size: 60,
            food_size: 8.0,
            food_min_size: 3.0,
            food_pull_speed: 90.0,
            food_shrink_rate: 4.0,
            golden_food_energy: 60.0,
            golden_food_interval_ticks: 600,
            max_golden_food: 3,
            hazard_count: 3,
            hazard_min_radius: 25.0,
            hazard_max_radius: 60.0,
            hazard_drain_rate: 5.0,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidWorldSize => "world_width and world_height must be positive and finite";
    WorldSizeTooLarge { max: f64, actual: f64 } => "world dimension ({actual}) exceeds supported maximum ({max})";
    InvalidDt => "dt must be positive and finite";
    InvalidMaxEnergy => "max_energy must be positive and finite";
    InvalidCellSizeBounds => "min_cell_size/max_cell_size must be finite, positive, and ordered";
    InvalidSizeEaseRate => "size_ease_rate must be finite and non-negative";
    TooManyAgents { max: usize, actual: usize } => "initial agents ({actual}) exceed supported maximum ({max})";
    InvalidSpeciesSpeed { species: &'static str } => "{species}.base_speed must be finite and non-negative";
    InvalidSpeciesDecay { species: &'static str } => "{species}.decay_rate must be finite and non-negative";
    InvalidSpeciesEnergy { species: &'static str } => "{species} energies must lie within [0, max_energy]";
    InvalidReproductionBalance { species: &'static str } => "{species}.parent_energy_after_reproduction must be below reproduction_threshold";
    InvalidOffspringOffset { species: &'static str } => "{species}.offspring_offset must be finite and non-negative";
    InvalidPredationGain => "predation_gain must be finite and within [0,1]";
    InvalidEvolution => "evolution_threshold and evolution_cost must lie within [0, max_energy]";
    InvalidTraitMultipliers => "trait multipliers must be finite and positive";
    InvalidHungerFraction => "hunger_fraction must be finite and within [0,1]";
    InvalidPhaseDurations => "move_duration_ticks and scan_duration_ticks must be positive";
    InvalidBeam => "scan_arc_degrees, beam_length_factor and beam_tolerance must be finite and non-negative";
    InvalidAvoidance => "avoidance_radius, avoidance_strength and seek_weight must be finite and non-negative";
    InvalidPing => "ping_growth_rate and ping_max_radius must be finite and positive";
    InvalidHook => "hook_max_length, hook_speed and hook_drain_rate must be finite and positive";
    InvalidPulse => "pulse_growth_rate and pulse_max_radius must be finite and positive, pulse_repel_distance non-negative";
    InvalidCounterDrain => "counter_drain_rate must be finite and non-negative";
    InvalidFoodPool => "food_pool_size must be greater than 0";
    InvalidFoodSize => "food_min_size/food_size must be finite, positive, and ordered";
    InvalidFoodMotion => "food_pull_speed and food_shrink_rate must be finite and non-negative";
    InvalidGoldenFood => "golden_food_energy must be finite and non-negative";
    InvalidHazards => "hazard radii must be finite, non-negative, and ordered; hazard_drain_rate non-negative";
}

impl std::error::Error for SimConfigError {}

fn finite_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn finite_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl SimConfig {
    pub const MAX_WORLD_DIMENSION: f64 = 16_384.0;

    pub const MAX_INITIAL_AGENTS: usize = 100_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_world()?;
        self.validate_energy_and_size()?;
        self.validate_species("collector", &self.collector)?;
        self.validate_species("predator", &self.predator)?;
        self.validate_economy()?;
        self.validate_foraging()?;
        self.validate_abilities()?;
        self.validate_food()?;
        self.validate_hazards()?;
        Ok(())
    }

    fn validate_world(&self) -> Result<(), SimConfigError> {
        if !(finite_positive(self.world_width) && finite_positive(self.world_height)) {
            return Err(SimConfigError::InvalidWorldSize);
        }
        let largest = self.world_width.max(self.world_height);
        if largest > Self::MAX_WORLD_DIMENSION {
            return Err(SimConfigError::WorldSizeTooLarge {
                max: Self::MAX_WORLD_DIMENSION,
                actual: largest,
            });
        }
        if !finite_positive(self.dt) {
            return Err(SimConfigError::InvalidDt);
        }
        let total = self
            .collector
            .initial_count
            .saturating_add(self.predator.initial_count);
        if total > Self::MAX_INITIAL_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_INITIAL_AGENTS,
                actual: total,
            });
        }
        Ok(())
    }

    fn validate_energy_and_size(&self) -> Result<(), SimConfigError> {
        if !(self.max_energy.is_finite() && self.max_energy > 0.0) {
            return Err(SimConfigError::InvalidMaxEnergy);
        }
        if !(finite_positive(self.min_cell_size)
            && finite_positive(self.max_cell_size)
            && self.min_cell_size <= self.max_cell_size)
        {
            return Err(SimConfigError::InvalidCellSizeBounds);
        }
        if !finite_non_negative(self.size_ease_rate) {
            return Err(SimConfigError::InvalidSizeEaseRate);
        }
        Ok(())
    }

    fn validate_species(
        &self,
        species: &'static str,
        params: &SpeciesParams,
    ) -> Result<(), SimConfigError> {
        if !finite_non_negative(params.base_speed) {
            return Err(SimConfigError::InvalidSpeciesSpeed { species });
        }
        if !finite_non_negative(params.decay_rate as f64) {
            return Err(SimConfigError::InvalidSpeciesDecay { species });
        }
        let in_range = |e: f32| e.is_finite() && (0.0..=self.max_energy).contains(&e);
        if !(in_range(params.initial_energy)
            && in_range(params.reproduction_threshold)
            && in_range(params.parent_energy_after_reproduction)
            && in_range(params.offspring_energy))
        {
            return Err(SimConfigError::InvalidSpeciesEnergy { species });
        }
        if params.parent_energy_after_reproduction >= params.reproduction_threshold {
            return Err(SimConfigError::InvalidReproductionBalance { species });
        }
        if !finite_non_negative(params.offspring_offset) {
            return Err(SimConfigError::InvalidOffspringOffset { species });
        }
        Ok(())
    }

    fn validate_economy(&self) -> Result<(), SimConfigError> {
        if !(self.predation_gain.is_finite() && (0.0..=1.0).contains(&self.predation_gain)) {
            return Err(SimConfigError::InvalidPredationGain);
        }
        let in_range = |e: f32| e.is_finite() && (0.0..=self.max_energy).contains(&e);
        if !(in_range(self.evolution_threshold) && in_range(self.evolution_cost)) {
            return Err(SimConfigError::InvalidEvolution);
        }
        if !(finite_positive(self.fast_movement_multiplier)
            && finite_positive(self.long_laser_multiplier)
            && finite_positive(self.efficient_energy_decay_multiplier as f64))
        {
            return Err(SimConfigError::InvalidTraitMultipliers);
        }
        Ok(())
    }

    fn validate_foraging(&self) -> Result<(), SimConfigError> {
        if !(self.hunger_fraction.is_finite() && (0.0..=1.0).contains(&self.hunger_fraction)) {
            return Err(SimConfigError::InvalidHungerFraction);
        }
        if self.move_duration_ticks == 0 || self.scan_duration_ticks == 0 {
            return Err(SimConfigError::InvalidPhaseDurations);
        }
        if !(finite_non_negative(self.scan_arc_degrees)
            && finite_non_negative(self.beam_length_factor)
            && finite_non_negative(self.beam_tolerance))
        {
            return Err(SimConfigError::InvalidBeam);
        }
        if !(finite_non_negative(self.avoidance_radius)
            && finite_non_negative(self.avoidance_strength)
            && finite_non_negative(self.seek_weight))
        {
            return Err(SimConfigError::InvalidAvoidance);
        }
        Ok(())
    }

    fn validate_abilities(&self) -> Result<(), SimConfigError> {
        if !(finite_positive(self.ping_growth_rate) && finite_positive(self.ping_max_radius)) {
            return Err(SimConfigError::InvalidPing);
        }
        if !(finite_positive(self.hook_max_length)
            && finite_positive(self.hook_speed)
            && finite_positive(self.hook_drain_rate as f64))
        {
            return Err(SimConfigError::InvalidHook);
        }
        if !(finite_positive(self.pulse_growth_rate)
            && finite_positive(self.pulse_max_radius)
            && finite_non_negative(self.pulse_repel_distance))
        {
            return Err(SimConfigError::InvalidPulse);
        }
        if !finite_non_negative(self.counter_drain_rate as f64) {
            return Err(SimConfigError::InvalidCounterDrain);
        }
        Ok(())
    }

    fn validate_food(&self) -> Result<(), SimConfigError> {
        if self.food_pool_size == 0 {
            return Err(SimConfigError::InvalidFoodPool);
        }
        if !(finite_positive(self.food_size)
            && finite_positive(self.food_min_size)
            && self.food_min_size <= self.food_size)
        {
            return Err(SimConfigError::InvalidFoodSize);
        }
        if !(finite_non_negative(self.food_pull_speed)
            && finite_non_negative(self.food_shrink_rate))
        {
            return Err(SimConfigError::InvalidFoodMotion);
        }
        if !finite_non_negative(self.golden_food_energy as f64) {
            return Err(SimConfigError::InvalidGoldenFood);
        }
        Ok(())
    }

    fn validate_hazards(&self) -> Result<(), SimConfigError> {
        if !(finite_non_negative(self.hazard_min_radius)
            && finite_non_negative(self.hazard_max_radius)
            && self.hazard_min_radius <= self.hazard_max_radius
            && finite_non_negative(self.hazard_drain_rate as f64))
        {
            return Err(SimConfigError::InvalidHazards);
        }
        Ok(())
    }

    /// Size an agent grows toward at the given energy.
    pub fn target_size(&self, energy: f32) -> f64 {
        let fraction = (energy / self.max_energy).clamp(0.0, 1.0) as f64;
        self.min_cell_size + (self.max_cell_size - self.min_cell_size) * fraction
    }

    /// Detection range shared by the ping animation and predator targeting.
    pub fn detection_range(&self) -> f64 {
        self.ping_max_radius
    }

    pub(crate) fn per_tick(&self, rate_per_second: f32) -> f32 {
        rate_per_second * self.dt as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_non_finite_world() {
        let config = SimConfig {
            world_width: f64::NAN,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidWorldSize));
    }

    #[test]
    fn rejects_oversized_world() {
        let config = SimConfig {
            world_height: SimConfig::MAX_WORLD_DIMENSION * 2.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::WorldSizeTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_inverted_cell_sizes() {
        let config = SimConfig {
            min_cell_size: 40.0,
            max_cell_size: 10.0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(SimConfigError::InvalidCellSizeBounds));
    }

    #[test]
    fn rejects_parent_energy_above_threshold() {
        let mut config = SimConfig::default();
        config.predator.parent_energy_after_reproduction = 99.0;
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidReproductionBalance {
                species: "predator"
            })
        );
    }

    #[test]
    fn error_messages_name_the_species() {
        let err = SimConfigError::InvalidSpeciesSpeed {
            species: "collector",
        };
        assert_eq!(
            err.to_string(),
            "collector.base_speed must be finite and non-negative"
        );
    }

    #[test]
    fn target_size_spans_cell_bounds() {
        let config = SimConfig::default();
        assert_eq!(config.target_size(0.0), config.min_cell_size);
        assert_eq!(config.target_size(config.max_energy), config.max_cell_size);
        assert_eq!(config.target_size(1_000.0), config.max_cell_size);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"seed": 7, "food_pool_size": 12}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.food_pool_size, 12);
        assert_eq!(config.predator, SpeciesParams::predator());
        assert_eq!(config.world_width, 800.0);
    }

    #[test]
    fn partial_species_tables_keep_their_own_defaults() {
        let json = r#"{"predator": {"initial_count": 2}, "collector": {"decay_rate": 2.0}}"#;
        let config: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.predator,
            SpeciesParams {
                initial_count: 2,
                ..SpeciesParams::predator()
            }
        );
        assert_eq!(config.predator.reproduction_threshold, 98.0);
        assert_eq!(
            config.collector,
            SpeciesParams {
                decay_rate: 2.0,
                ..SpeciesParams::collector()
            }
        );
        assert_eq!(config.validate(), Ok(()));
    }
}
