use super::economy::transfer_energy;
use super::World;
use crate::agent::{Agent, AgentId};

impl World {
    /// True while any predator has a hook out toward `id`, in flight or latched.
    pub(crate) fn is_hook_target(&self, id: AgentId) -> bool {
        self.agents
            .values()
            .any(|other| other.capabilities().hooks && other.hook.target == Some(id))
    }

    /// Pulse/shield state machine. A ready collector pulses when hooked or when the manual
    /// input is armed; the radius grows to its cap, then the cooldown starts.
    pub(super) fn update_pulse(&self, id: AgentId, agent: &mut Agent, manual: bool) {
        let config = &self.config;
        if agent.pulse.active {
            agent.pulse.radius += config.pulse_growth_rate * config.dt;
            if agent.pulse.radius >= config.pulse_max_radius {
                agent.pulse.active = false;
                agent.pulse.radius = 0.0;
                agent.pulse.cooldown = config.pulse_cooldown_ticks;
            }
            return;
        }
        if agent.pulse.cooldown > 0 {
            agent.pulse.cooldown -= 1;
        }
        if agent.pulse.ready() && (manual || self.is_hook_target(id)) {
            agent.pulse.active = true;
            agent.pulse.radius = 0.0;
            tracing::trace!(tick = self.tick, manual, "pulse started");
        }
    }

    /// Siphon from the predator whose hook this collector countered.
    pub(super) fn update_counter_drain(&mut self, agent: &mut Agent) {
        let Some(partner) = agent.counter_drain.partner else {
            return;
        };
        if agent.counter_drain.ticks_left == 0 {
            agent.counter_drain.end();
            return;
        }
        let Some(predator) = self.agents.get_mut(partner) else {
            agent.counter_drain.end();
            return;
        };
        transfer_energy(
            predator,
            agent,
            self.config.per_tick(self.config.counter_drain_rate),
            self.config.max_energy,
        );
        agent.counter_drain.ticks_left -= 1;
        if agent.counter_drain.ticks_left == 0 {
            agent.counter_drain.end();
        }
    }
}
