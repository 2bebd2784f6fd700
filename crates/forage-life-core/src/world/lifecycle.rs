use super::metrics::StepTimings;
use super::World;
use crate::agent::AgentId;
use crate::events::SimEvent;
use crate::spatial;
use std::time::Instant;

impl World {
    /// Remove an agent whose energy ran out.
    fn starve(&mut self, id: AgentId) {
        let Some(removed) = self.remove_agent(id) else {
            return;
        };
        self.deaths_last_step += 1;
        self.total_deaths += 1;
        tracing::debug!(
            tick = self.tick,
            species = removed.species.as_str(),
            age = removed.age_ticks,
            "agent starved"
        );
        self.events.push(SimEvent::Starved {
            species: removed.species,
        });
    }

    fn manual_pulse_for(&self, id: AgentId) -> bool {
        self.manual_pulse_all || self.manual_pulse_ids.contains(&id)
    }

    /// Run the full per-agent state machine on a working copy, then write it back.
    /// Interactions with other agents go straight to the store.
    fn update_agent(&mut self, id: AgentId) {
        let Some(mut agent) = self.agents.get(id).cloned() else {
            return;
        };
        let caps = agent.capabilities();
        agent.age_ticks = agent.age_ticks.saturating_add(1);

        self.apply_metabolism(&mut agent);
        self.apply_reproduction(&mut agent);
        self.apply_evolution(&mut agent);

        if caps.pulses {
            let manual = self.manual_pulse_for(id);
            self.update_pulse(id, &mut agent, manual);
            self.update_counter_drain(&mut agent);
        }
        if caps.pings {
            self.update_ping(&mut agent);
        }

        self.update_motion(id, &mut agent);

        let mut ate = false;
        if caps.hooks {
            ate = self.update_hook(id, &mut agent);
        }
        if caps.eats && !ate {
            self.try_eat(id, &mut agent);
        }

        self.ease_size(&mut agent);

        if let Some(slot) = self.agents.get_mut(id) {
            *slot = agent;
        }
    }

    /// Per-agent pass in stable order. Agents removed earlier in the pass are skipped;
    /// agents spawned during the pass wait for the next tick.
    fn step_agent_phase(&mut self) {
        let order = self.order.clone();
        for id in order {
            let Some(agent) = self.agents.get(id) else {
                continue;
            };
            if agent.is_starved() {
                self.starve(id);
                continue;
            }
            self.update_agent(id);
            if self.agents.get(id).is_some_and(|a| a.is_starved()) {
                self.starve(id);
            }
        }

        // Agents drained to zero by others after their own turn.
        let starved: Vec<AgentId> = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.agents.get(id).is_some_and(|a| a.is_starved()))
            .collect();
        for id in starved {
            self.starve(id);
        }
    }

    /// Push apart every overlapping pair by half the penetration depth each, along the
    /// direct axis between their centers.
    pub(super) fn step_overlap_phase(&mut self) {
        let ids = self.order.clone();
        let positions: Vec<[f64; 2]> = ids
            .iter()
            .filter_map(|&id| self.agents.get(id).map(|a| a.position))
            .collect();
        if positions.len() != ids.len() {
            return;
        }
        let tree = spatial::build_index(&positions);
        let radius = self.config.max_cell_size;
        for (i, &center) in positions.iter().enumerate() {
            for j in spatial::query_neighbors(&tree, &self.torus, center, radius, i) {
                if j > i {
                    self.separate(ids[i], ids[j]);
                }
            }
        }
    }

    fn separate(&mut self, a: AgentId, b: AgentId) {
        let torus = self.torus;
        let Some([first, second]) = self.agents.get_disjoint_mut([a, b]) else {
            return;
        };
        let min_dist = (first.size + second.size) / 2.0;
        let dist = torus.distance(first.position, second.position);
        if dist >= min_dist {
            return;
        }
        let push = (min_dist - dist) / 2.0;
        let raw = [
            second.position[0] - first.position[0],
            second.position[1] - first.position[1],
        ];
        let len = raw[0].hypot(raw[1]);
        let axis = if len > f64::EPSILON {
            [raw[0] / len, raw[1] / len]
        } else {
            [1.0, 0.0]
        };
        first.position = torus.wrap([
            first.position[0] - axis[0] * push,
            first.position[1] - axis[1] * push,
        ]);
        second.position = torus.wrap([
            second.position[0] + axis[0] * push,
            second.position[1] + axis[1] * push,
        ]);
    }

    fn record_population_change(&mut self) {
        let current = self.agent_count();
        if current != self.last_population {
            tracing::info!(
                tick = self.tick,
                previous = self.last_population,
                current,
                collectors = self.count(crate::agent::Species::Collector),
                predators = self.count(crate::agent::Species::Predator),
                "population changed"
            );
            self.events.push(SimEvent::PopulationChanged {
                previous: self.last_population,
                current,
            });
            self.last_population = current;
        }
    }

    /// Advance the simulation by one fixed tick.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.tick = self.tick.saturating_add(1);
        self.events.clear();
        self.births_last_step = 0;
        self.deaths_last_step = 0;
        self.consumed_last_step = 0;

        let t0 = Instant::now();
        self.step_agent_phase();
        self.manual_pulse_all = false;
        self.manual_pulse_ids.clear();
        let agent_update_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_overlap_phase();
        let overlap_us = t1.elapsed().as_micros() as u64;

        let t2 = Instant::now();
        self.step_food_phase();
        self.maybe_spawn_golden_food();
        self.food.prune();
        let food_us = t2.elapsed().as_micros() as u64;

        self.record_population_change();

        let timings = StepTimings {
            agent_update_us,
            overlap_us,
            food_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        tracing::trace!(tick = self.tick, ?timings, "tick complete");
        timings
    }
}
