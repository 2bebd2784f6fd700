use super::economy::transfer_energy;
use super::World;
use crate::agent::{Agent, AgentId, CounterDrain, Species};

impl World {
    /// Nearest live collector other than `id` within `range` of `position`.
    pub(crate) fn nearest_collector(
        &self,
        id: AgentId,
        position: [f64; 2],
        range: f64,
    ) -> Option<(AgentId, [f64; 2], f64)> {
        self.order
            .iter()
            .filter(|&&other| other != id)
            .filter_map(|&other| {
                let candidate = self.agents.get(other)?;
                if candidate.species != Species::Collector {
                    return None;
                }
                let dist = self.torus.distance(position, candidate.position);
                (dist <= range).then_some((other, candidate.position, dist))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }

    /// Radar pulse: grow to the cap, rest for the cooldown, restart.
    pub(super) fn update_ping(&self, agent: &mut Agent) {
        let config = &self.config;
        let ping = &mut agent.ping;
        if ping.active {
            ping.radius += config.ping_growth_rate * config.dt;
            if ping.radius >= config.ping_max_radius {
                ping.active = false;
                ping.radius = 0.0;
                ping.cooldown = config.ping_cooldown_ticks;
            }
        } else if ping.cooldown > 0 {
            ping.cooldown -= 1;
        } else {
            ping.active = true;
            ping.radius = 0.0;
        }
    }

    /// Advance the hook state machine. Returns true if the predator ate its target.
    pub(super) fn update_hook(&mut self, id: AgentId, agent: &mut Agent) -> bool {
        let Some(target_id) = agent.hook.target else {
            self.cast_hook(id, agent);
            return false;
        };
        let Some(target) = self.agents.get(target_id) else {
            agent.hook.release();
            return false;
        };
        let (target_position, target_size) = (target.position, target.size);

        if agent.hook.latched {
            agent.hook.tip = target_position;
            if self.torus.distance(agent.position, target_position) > self.config.hook_max_length {
                agent.hook.release();
                return false;
            }
        } else {
            let step = self.config.hook_speed * self.config.dt;
            agent.hook.tip = self.torus.step_toward(agent.hook.tip, target_position, step);
            agent.hook.length += step;
            if self.torus.distance(agent.hook.tip, target_position) <= target_size / 2.0 {
                agent.hook.latched = true;
            } else if agent.hook.length > self.config.hook_max_length {
                agent.hook.release();
                return false;
            }
        }

        if agent.hook.latched {
            self.resolve_hook_contact(id, agent, target_id)
        } else {
            false
        }
    }

    fn cast_hook(&self, id: AgentId, agent: &mut Agent) {
        let range = self.config.detection_range();
        let Some((target, _, dist)) = self.nearest_collector(id, agent.position, range) else {
            return;
        };
        if dist <= self.config.hook_max_length {
            agent.hook.target = Some(target);
            agent.hook.tip = agent.position;
            agent.hook.length = 0.0;
            agent.hook.latched = false;
        }
    }

    /// Tip is on the target: either the shield counters, or energy flows to the predator.
    fn resolve_hook_contact(&mut self, id: AgentId, agent: &mut Agent, target_id: AgentId) -> bool {
        let config = &self.config;
        let torus = self.torus;
        let Some(target) = self.agents.get_mut(target_id) else {
            agent.hook.release();
            return false;
        };

        if target.pulse.active {
            let strength = target.pulse.strength(config.pulse_max_radius);
            let away = torus
                .direction(target.position, agent.position)
                .map(|(dir, _)| dir)
                .unwrap_or([1.0, 0.0]);
            let push = config.pulse_repel_distance * strength;
            agent.position = torus.wrap([
                agent.position[0] + away[0] * push,
                agent.position[1] + away[1] * push,
            ]);
            let half = agent.energy / 2.0;
            transfer_energy(agent, target, half, config.max_energy);
            target.counter_drain = CounterDrain {
                partner: Some(id),
                ticks_left: config.counter_drain_ticks,
            };
            agent.hook.release();
            tracing::debug!(tick = self.tick, strength, transferred = half, "hook countered by pulse");
            return false;
        }

        transfer_energy(
            target,
            agent,
            config.per_tick(config.hook_drain_rate),
            config.max_energy,
        );
        let touching = torus.distance(agent.position, target.position)
            < (agent.size + target.size) / 2.0;
        if touching {
            agent.hook.release();
            return self.eat(agent, target_id);
        }
        false
    }
}
