use super::World;
use crate::agent::{Agent, AgentId, EvolutionTrait, Species};
use crate::events::{SimEvent, SpawnCause};
use rand::Rng;

/// Move up to `amount` energy from `from` to `to`, capped by what `from` holds.
/// Returns the amount taken from `from`; `to` is clamped to `max_energy` afterwards.
pub(crate) fn transfer_energy(from: &mut Agent, to: &mut Agent, amount: f32, max_energy: f32) -> f32 {
    let taken = amount.max(0.0).min(from.energy);
    from.adjust_energy(-taken, max_energy);
    to.adjust_energy(taken, max_energy);
    taken
}

impl World {
    /// Base decay (trait-adjusted) plus hazard drain.
    pub(super) fn apply_metabolism(&self, agent: &mut Agent) {
        let hazard = self
            .hazards
            .drain_per_tick(&self.torus, agent.position, agent.size, &self.config);
        let loss = agent.decay_per_tick(&self.config) + hazard;
        agent.adjust_energy(-loss, self.config.max_energy);
    }

    /// Split off one offspring once energy reaches the species' reproduction threshold.
    pub(super) fn apply_reproduction(&mut self, agent: &mut Agent) {
        let params = agent.species.params(&self.config).clone();
        if agent.energy < params.reproduction_threshold {
            return;
        }
        agent.energy = params.parent_energy_after_reproduction;
        let position = self.offspring_position(agent.position, params.offspring_offset);
        self.spawn_agent(
            agent.species,
            position,
            params.offspring_energy,
            SpawnCause::Reproduction,
        );
    }

    fn offspring_position(&mut self, parent: [f64; 2], max_offset: f64) -> [f64; 2] {
        if max_offset <= 0.0 {
            return parent;
        }
        let dx = self.rng.random_range(-max_offset..=max_offset);
        let dy = self.rng.random_range(-max_offset..=max_offset);
        self.torus.wrap([parent[0] + dx, parent[1] + dy])
    }

    /// Grant a random trait when energy rises to the evolution threshold from below it.
    ///
    /// Energy that only drops back onto or above the threshold (after reproducing, say) does not
    /// count as a crossing.
    pub(super) fn apply_evolution(&mut self, agent: &mut Agent) {
        let threshold = self.config.evolution_threshold;
        let previous = std::mem::replace(&mut agent.checked_energy, agent.energy);
        if agent.evolution.is_evolved() || previous >= threshold || agent.energy < threshold {
            return;
        }
        let evolution = EvolutionTrait::random(&mut self.rng);
        agent.evolution = evolution;
        agent.adjust_energy(-self.config.evolution_cost, self.config.max_energy);
        agent.checked_energy = agent.energy;
        tracing::debug!(
            tick = self.tick,
            species = agent.species.as_str(),
            ?evolution,
            "agent evolved"
        );
        self.events.push(SimEvent::Evolved {
            species: agent.species,
            evolution,
        });
    }

    /// Eat the first collector (in update order) in full-body contact. Returns true on a meal.
    pub(super) fn try_eat(&mut self, id: AgentId, agent: &mut Agent) -> bool {
        let prey = self.order.iter().copied().find(|&other| {
            other != id
                && self.agents.get(other).is_some_and(|candidate| {
                    candidate.species == Species::Collector
                        && self.torus.distance(agent.position, candidate.position)
                            < (agent.size + candidate.size) / 2.0
                })
        });
        match prey {
            Some(prey) => self.eat(agent, prey),
            None => false,
        }
    }

    /// Consume `prey`: the eater gains a fixed fraction of its energy and the prey is removed.
    pub(super) fn eat(&mut self, agent: &mut Agent, prey: AgentId) -> bool {
        let Some(victim) = self.remove_agent(prey) else {
            return false;
        };
        // The working copy is not in the store, so `remove_agent` could not clear it.
        agent.forget(prey);
        let gain = victim.energy * self.config.predation_gain;
        agent.adjust_energy(gain, self.config.max_energy);
        self.consumed_last_step += 1;
        self.total_consumed += 1;
        tracing::debug!(
            tick = self.tick,
            predator = agent.species.as_str(),
            prey_energy = victim.energy,
            gain,
            "collector consumed"
        );
        self.events.push(SimEvent::Consumed {
            predator: agent.species,
            prey: victim.species,
        });

        let offspring_energy = agent.species.params(&self.config).offspring_energy;
        let offset = agent.species.params(&self.config).offspring_offset;
        for _ in 0..self.config.predation_offspring {
            let position = self.offspring_position(agent.position, offset);
            self.spawn_agent(agent.species, position, offspring_energy, SpawnCause::Predation);
        }
        true
    }

    /// Ease size toward the energy-derived target, staying within the cell bounds.
    pub(super) fn ease_size(&self, agent: &mut Agent) {
        let config = &self.config;
        agent.target_size = config.target_size(agent.energy);
        let step = config.size_ease_rate * config.dt;
        let diff = agent.target_size - agent.size;
        agent.size = if diff.abs() <= step {
            agent.target_size
        } else {
            agent.size + step * diff.signum()
        }
        .clamp(config.min_cell_size, config.max_cell_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn agent(species: Species, energy: f32) -> Agent {
        Agent::new(species, [0.0, 0.0], energy, 0.5, &SimConfig::default())
    }

    #[test]
    fn transfer_conserves_energy_when_unclamped() {
        let mut from = agent(Species::Collector, 40.0);
        let mut to = agent(Species::Predator, 30.0);
        let taken = transfer_energy(&mut from, &mut to, 5.0, 100.0);
        assert_eq!(taken, 5.0);
        assert_eq!(from.energy, 35.0);
        assert_eq!(to.energy, 35.0);
    }

    #[test]
    fn transfer_is_capped_by_available_energy() {
        let mut from = agent(Species::Collector, 2.0);
        let mut to = agent(Species::Predator, 30.0);
        let taken = transfer_energy(&mut from, &mut to, 5.0, 100.0);
        assert_eq!(taken, 2.0);
        assert_eq!(from.energy, 0.0);
        assert_eq!(to.energy, 32.0);
    }

    #[test]
    fn transfer_clamps_receiver_to_max() {
        let mut from = agent(Species::Collector, 50.0);
        let mut to = agent(Species::Predator, 98.0);
        let taken = transfer_energy(&mut from, &mut to, 5.0, 100.0);
        assert_eq!(taken, 5.0);
        assert_eq!(to.energy, 100.0);
    }
}
