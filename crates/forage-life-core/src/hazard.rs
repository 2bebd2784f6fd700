use crate::config::SimConfig;
use crate::spatial::Torus;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Static circular zone draining energy from any agent touching it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub position: [f64; 2],
    pub radius: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HazardField {
    hazards: Vec<Hazard>,
}

impl HazardField {
    pub fn new(hazards: Vec<Hazard>) -> Self {
        Self { hazards }
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R, torus: &Torus, config: &SimConfig) -> Self {
        let hazards = (0..config.hazard_count)
            .map(|_| Hazard {
                position: [
                    rng.random::<f64>() * torus.width,
                    rng.random::<f64>() * torus.height,
                ],
                radius: if config.hazard_max_radius > config.hazard_min_radius {
                    rng.random_range(config.hazard_min_radius..config.hazard_max_radius)
                } else {
                    config.hazard_min_radius
                },
            })
            .collect();
        Self { hazards }
    }

    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Number of hazards overlapping a body of `size` centered at `position`.
    pub fn overlapping(&self, torus: &Torus, position: [f64; 2], size: f64) -> usize {
        self.hazards
            .iter()
            .filter(|h| torus.distance(h.position, position) < h.radius + size / 2.0)
            .count()
    }

    /// Energy drained this tick from a body at `position`. Overlapping hazards stack.
    pub fn drain_per_tick(
        &self,
        torus: &Torus,
        position: [f64; 2],
        size: f64,
        config: &SimConfig,
    ) -> f32 {
        self.overlapping(torus, position, size) as f32 * config.per_tick(config.hazard_drain_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    #[test]
    fn drain_applies_only_on_overlap() {
        let config = SimConfig::default();
        let torus = Torus::new(100.0, 100.0);
        let field = HazardField::new(vec![Hazard {
            position: [2.0, 50.0],
            radius: 5.0,
        }]);
        // Wraps across the left edge: 95 -> 2 is 7 apart, body half-size 3.
        assert!(field.drain_per_tick(&torus, [95.0, 50.0], 6.0, &config) > 0.0);
        assert_eq!(field.drain_per_tick(&torus, [80.0, 50.0], 6.0, &config), 0.0);
    }

    #[test]
    fn generate_respects_count_and_radius_range() {
        let config = SimConfig::default();
        let torus = Torus::new(config.world_width, config.world_height);
        let field = HazardField::generate(&mut create_rng(11), &torus, &config);
        assert_eq!(field.hazards().len(), config.hazard_count);
        for h in field.hazards() {
            assert!((config.hazard_min_radius..config.hazard_max_radius).contains(&h.radius));
        }
    }
}
