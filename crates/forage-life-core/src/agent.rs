use crate::config::{SimConfig, SpeciesParams};
use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Generation-checked handle to an agent. Resolves to nothing once the agent is removed.
    pub struct AgentId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Collector,
    Predator,
}

/// What an agent steers toward while moving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekTarget {
    /// Nearest unclaimed food, only while below the hunger threshold.
    Food,
    /// Nearest collector within detection range.
    Prey,
}

/// Per-species ability table. Shared movement/energy code consults these flags instead of
/// branching on the species.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub scans: bool,
    pub pulses: bool,
    pub pings: bool,
    pub hooks: bool,
    pub eats: bool,
    pub seeks: SeekTarget,
}

impl Species {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Species::Collector => Capabilities {
                scans: true,
                pulses: true,
                pings: false,
                hooks: false,
                eats: false,
                seeks: SeekTarget::Food,
            },
            Species::Predator => Capabilities {
                scans: false,
                pulses: false,
                pings: true,
                hooks: true,
                eats: true,
                seeks: SeekTarget::Prey,
            },
        }
    }

    pub fn params(self, config: &SimConfig) -> &SpeciesParams {
        match self {
            Species::Collector => &config.collector,
            Species::Predator => &config.predator,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Species::Collector => "collector",
            Species::Predator => "predator",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionTrait {
    #[default]
    None,
    FastMovement,
    LongLaser,
    EfficientEnergy,
}

impl EvolutionTrait {
    pub const EVOLVED: [EvolutionTrait; 3] = [
        EvolutionTrait::FastMovement,
        EvolutionTrait::LongLaser,
        EvolutionTrait::EfficientEnergy,
    ];

    /// Uniformly pick one of the non-`None` traits.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::EVOLVED[rng.random_range(0..Self::EVOLVED.len())]
    }

    pub fn is_evolved(self) -> bool {
        self != EvolutionTrait::None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Moving,
    Scanning,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Motion {
    pub velocity: [f64; 2],
    pub phase: Phase,
    pub move_timer: u32,
    pub scan_timer: u32,
    /// Current beam angle in radians.
    pub scan_angle: f64,
}

/// Radar animation. `radius` grows while active; `cooldown` counts down while idle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ping {
    pub active: bool,
    pub radius: f64,
    pub cooldown: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hook {
    /// `Some` while the hook is out. Always resolved through the agent store before use.
    pub target: Option<AgentId>,
    pub tip: [f64; 2],
    pub length: f64,
    /// Set once the tip touches the target; the tip then follows the target.
    pub latched: bool,
}

impl Hook {
    pub fn is_engaged(&self) -> bool {
        self.target.is_some()
    }

    pub fn release(&mut self) {
        self.target = None;
        self.length = 0.0;
        self.latched = false;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pulse {
    pub active: bool,
    pub radius: f64,
    pub cooldown: u32,
}

impl Pulse {
    pub fn ready(&self) -> bool {
        !self.active && self.cooldown == 0
    }

    /// Remaining strength in `[0, 1]`: full at the start of a pulse, zero at its cap.
    pub fn strength(&self, max_radius: f64) -> f64 {
        if !self.active {
            return 0.0;
        }
        (1.0 - self.radius / max_radius).clamp(0.0, 1.0)
    }
}

/// Siphon a collector runs against a predator whose hook it countered.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CounterDrain {
    pub partner: Option<AgentId>,
    pub ticks_left: u32,
}

impl CounterDrain {
    pub fn is_active(&self) -> bool {
        self.partner.is_some() && self.ticks_left > 0
    }

    pub fn end(&mut self) {
        self.partner = None;
        self.ticks_left = 0;
    }
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub species: Species,
    /// Stable random phase in `[0, 1)` that desynchronizes periodic behavior.
    pub behavior_seed: f64,
    pub position: [f64; 2],
    pub size: f64,
    pub target_size: f64,
    pub energy: f32,
    pub evolution: EvolutionTrait,
    /// Energy seen by the previous evolution check. Evolution needs an upward crossing from here.
    pub checked_energy: f32,
    pub age_ticks: u64,
    pub motion: Motion,
    pub ping: Ping,
    pub hook: Hook,
    pub pulse: Pulse,
    pub counter_drain: CounterDrain,
}

impl Agent {
    pub fn new(
        species: Species,
        position: [f64; 2],
        energy: f32,
        behavior_seed: f64,
        config: &SimConfig,
    ) -> Self {
        let energy = energy.clamp(0.0, config.max_energy);
        let size = config.target_size(energy);
        Self {
            species,
            behavior_seed,
            position,
            size,
            target_size: size,
            energy,
            evolution: EvolutionTrait::None,
            checked_energy: energy,
            age_ticks: 0,
            motion: Motion::default(),
            ping: Ping::default(),
            hook: Hook::default(),
            pulse: Pulse::default(),
            counter_drain: CounterDrain::default(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.species.capabilities()
    }

    pub fn is_scanning(&self) -> bool {
        self.motion.phase == Phase::Scanning
    }

    /// Add `amount` (possibly negative) and clamp into `[0, max_energy]`.
    pub fn adjust_energy(&mut self, amount: f32, max_energy: f32) {
        self.energy = (self.energy + amount).clamp(0.0, max_energy);
    }

    pub fn is_starved(&self) -> bool {
        self.energy <= 0.0
    }

    /// Ticks of the current moving phase, perturbed by the behavior seed.
    pub fn move_duration(&self, base_ticks: u32) -> u32 {
        ((base_ticks as f64) * (0.75 + 0.5 * self.behavior_seed)).round().max(1.0) as u32
    }

    pub fn scan_duration(&self, base_ticks: u32) -> u32 {
        ((base_ticks as f64) * (0.8 + 0.4 * self.behavior_seed)).round().max(1.0) as u32
    }

    /// Width of the beam sweep in radians.
    pub fn scan_arc(&self, base_degrees: f64) -> f64 {
        (base_degrees * (0.9 + 0.2 * self.behavior_seed)).to_radians()
    }

    pub fn speed(&self, config: &SimConfig) -> f64 {
        let base = self.species.params(config).base_speed;
        if self.evolution == EvolutionTrait::FastMovement {
            base * config.fast_movement_multiplier
        } else {
            base
        }
    }

    pub fn beam_length(&self, config: &SimConfig) -> f64 {
        let length = config.beam_length_factor * self.size.sqrt();
        if self.evolution == EvolutionTrait::LongLaser {
            length * config.long_laser_multiplier
        } else {
            length
        }
    }

    /// Beam end point relative to the agent center.
    pub fn beam_offset(&self, config: &SimConfig) -> [f64; 2] {
        let length = self.beam_length(config);
        [
            self.motion.scan_angle.cos() * length,
            self.motion.scan_angle.sin() * length,
        ]
    }

    /// Energy lost this tick to metabolism, before hazards.
    pub fn decay_per_tick(&self, config: &SimConfig) -> f32 {
        let rate = self.species.params(config).decay_rate;
        let rate = if self.evolution == EvolutionTrait::EfficientEnergy {
            rate * config.efficient_energy_decay_multiplier
        } else {
            rate
        };
        config.per_tick(rate)
    }

    /// Render opacity derived from energy.
    pub fn opacity(&self, max_energy: f32) -> f32 {
        0.25 + 0.75 * (self.energy / max_energy).clamp(0.0, 1.0)
    }

    /// Drop every stored reference to `removed`, resetting the ability that held it.
    /// Returns true when something was cleared.
    pub fn forget(&mut self, removed: AgentId) -> bool {
        let mut cleared = false;
        if self.hook.target == Some(removed) {
            self.hook.release();
            cleared = true;
        }
        if self.counter_drain.partner == Some(removed) {
            self.counter_drain.end();
            cleared = true;
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use slotmap::SlotMap;

    fn collector(energy: f32) -> Agent {
        Agent::new(
            Species::Collector,
            [10.0, 10.0],
            energy,
            0.5,
            &SimConfig::default(),
        )
    }

    #[test]
    fn capabilities_split_abilities_by_species() {
        let c = Species::Collector.capabilities();
        let p = Species::Predator.capabilities();
        assert!(c.scans && c.pulses && !c.hooks && !c.eats);
        assert!(p.hooks && p.pings && p.eats && !p.scans && !p.pulses);
        assert_eq!(p.seeks, SeekTarget::Prey);
    }

    #[test]
    fn new_clamps_energy_and_derives_size() {
        let config = SimConfig::default();
        let agent = collector(500.0);
        assert_eq!(agent.energy, config.max_energy);
        assert_eq!(agent.size, config.max_cell_size);
    }

    #[test]
    fn adjust_energy_clamps_both_ends() {
        let mut agent = collector(50.0);
        agent.adjust_energy(-80.0, 100.0);
        assert_eq!(agent.energy, 0.0);
        assert!(agent.is_starved());
        agent.adjust_energy(250.0, 100.0);
        assert_eq!(agent.energy, 100.0);
    }

    #[test]
    fn random_trait_is_never_none() {
        let mut rng = create_rng(3);
        for _ in 0..200 {
            assert!(EvolutionTrait::random(&mut rng).is_evolved());
        }
    }

    #[test]
    fn efficient_energy_halves_decay() {
        let config = SimConfig::default();
        let mut agent = collector(50.0);
        let base = agent.decay_per_tick(&config);
        agent.evolution = EvolutionTrait::EfficientEnergy;
        assert!((agent.decay_per_tick(&config) - base * 0.5).abs() < 1e-9);
    }

    #[test]
    fn long_laser_extends_beam() {
        let config = SimConfig::default();
        let mut agent = collector(50.0);
        let base = agent.beam_length(&config);
        agent.evolution = EvolutionTrait::LongLaser;
        assert!((agent.beam_length(&config) - base * 1.5).abs() < 1e-9);
    }

    #[test]
    fn seed_perturbs_durations() {
        let mut early = collector(50.0);
        early.behavior_seed = 0.0;
        let mut late = collector(50.0);
        late.behavior_seed = 0.99;
        assert!(early.move_duration(90) < late.move_duration(90));
        assert!(early.scan_duration(60) < late.scan_duration(60));
    }

    #[test]
    fn forget_releases_hook_and_drain() {
        let mut ids: SlotMap<AgentId, ()> = SlotMap::with_key();
        let target = ids.insert(());
        let other = ids.insert(());
        let mut agent = collector(50.0);
        agent.hook.target = Some(target);
        agent.hook.latched = true;
        agent.counter_drain = CounterDrain {
            partner: Some(target),
            ticks_left: 5,
        };
        assert!(!agent.forget(other));
        assert!(agent.forget(target));
        assert!(!agent.hook.is_engaged());
        assert!(!agent.hook.latched);
        assert!(!agent.counter_drain.is_active());
    }

    #[test]
    fn pulse_strength_fades_with_radius() {
        let pulse = Pulse {
            active: true,
            radius: 15.0,
            cooldown: 0,
        };
        assert!((pulse.strength(60.0) - 0.75).abs() < 1e-9);
        assert_eq!(Pulse::default().strength(60.0), 0.0);
    }
}
