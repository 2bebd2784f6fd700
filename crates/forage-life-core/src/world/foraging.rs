use super::World;
use crate::agent::EvolutionTrait;
use crate::events::SimEvent;

impl World {
    /// Reel claimed food toward its collector, shrinking it on the way, and pay out on
    /// contact. Items whose owner no longer exists fall back to being free.
    pub(super) fn step_food_phase(&mut self) {
        let config = &self.config;
        let pull = config.food_pull_speed * config.dt;
        let shrink = config.food_shrink_rate * config.dt;

        for index in 0..self.food.len() {
            let Some(food) = self.food.items_mut().get_mut(index) else {
                break;
            };
            if !food.active {
                continue;
            }
            let Some(owner_id) = food.owner else {
                continue;
            };
            let Some(owner) = self.agents.get_mut(owner_id) else {
                food.owner = None;
                continue;
            };

            food.position = self.torus.step_toward(food.position, owner.position, pull);
            food.size = (food.size - shrink).max(config.food_min_size);

            let delta = self.torus.delta(food.position, owner.position);
            let reach = (owner.size + food.size) / 2.0;
            if delta[0].abs() > reach || delta[1].abs() > reach {
                continue;
            }

            let gain = food.energy(config);
            owner.adjust_energy(gain, config.max_energy);
            let golden = food.golden;
            if golden {
                let evolution = EvolutionTrait::random(&mut self.rng);
                owner.evolution = evolution;
                tracing::debug!(
                    tick = self.tick,
                    species = owner.species.as_str(),
                    ?evolution,
                    "golden food consumed"
                );
                self.events.push(SimEvent::Evolved {
                    species: owner.species,
                    evolution,
                });
            }
            tracing::trace!(tick = self.tick, slot = index, gain, golden, "food consumed");
            self.food.retire(index, &mut self.rng, &self.torus, config);
        }
    }

    /// Drop a golden item on the fixed interval, up to the configured cap.
    pub(super) fn maybe_spawn_golden_food(&mut self) {
        let interval = self.config.golden_food_interval_ticks;
        if interval == 0 || self.tick % interval != 0 {
            return;
        }
        if let Some(slot) = self
            .food
            .spawn_golden(&mut self.rng, &self.torus, &self.config)
        {
            tracing::debug!(tick = self.tick, slot, "golden food spawned");
            self.events.push(SimEvent::GoldenFoodSpawned { slot });
        }
    }
}
