use super::World;
use crate::agent::{Agent, AgentId, Phase, SeekTarget};
use crate::spatial::point_segment_distance;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, TAU};

fn normalize(v: [f64; 2]) -> Option<[f64; 2]> {
    let len = v[0].hypot(v[1]);
    (len > f64::EPSILON).then(|| [v[0] / len, v[1] / len])
}

impl World {
    pub(super) fn update_motion(&mut self, id: AgentId, agent: &mut Agent) {
        match agent.motion.phase {
            Phase::Moving => self.step_moving(id, agent),
            Phase::Scanning => self.step_scanning(id, agent),
        }
    }

    fn step_moving(&mut self, id: AgentId, agent: &mut Agent) {
        let speed = agent.speed(&self.config);
        if agent.motion.move_timer == 0 {
            let angle = self.rng.random::<f64>() * TAU;
            agent.motion.velocity = [angle.cos() * speed, angle.sin() * speed];
        }

        let heading = normalize(agent.motion.velocity).unwrap_or([1.0, 0.0]);
        let mut steer = heading;
        if let Some(seek) = self.seek_direction(id, agent) {
            steer[0] += seek[0] * self.config.seek_weight;
            steer[1] += seek[1] * self.config.seek_weight;
        }
        let avoid = self.avoidance(id, agent.position);
        steer[0] += avoid[0];
        steer[1] += avoid[1];
        let dir = normalize(steer).unwrap_or(heading);

        agent.motion.velocity = [dir[0] * speed, dir[1] * speed];
        agent.position = self.torus.wrap([
            agent.position[0] + agent.motion.velocity[0] * self.config.dt,
            agent.position[1] + agent.motion.velocity[1] * self.config.dt,
        ]);

        agent.motion.move_timer += 1;
        if agent.motion.move_timer >= agent.move_duration(self.config.move_duration_ticks) {
            agent.motion.move_timer = 0;
            if agent.capabilities().scans {
                agent.motion.phase = Phase::Scanning;
                agent.motion.scan_timer = 0;
                agent.motion.scan_angle = -FRAC_PI_2;
            }
        }
    }

    /// Unit vector toward the species' seek target, if one applies this tick.
    fn seek_direction(&self, id: AgentId, agent: &Agent) -> Option<[f64; 2]> {
        match agent.capabilities().seeks {
            SeekTarget::Prey => {
                let (_, target, _) =
                    self.nearest_collector(id, agent.position, self.config.detection_range())?;
                self.torus.direction(agent.position, target).map(|(dir, _)| dir)
            }
            SeekTarget::Food => {
                let hungry = agent.energy < self.config.hunger_fraction * self.config.max_energy;
                if !hungry {
                    return None;
                }
                self.food
                    .items()
                    .iter()
                    .filter(|f| f.is_claimable())
                    .filter_map(|f| self.torus.direction(agent.position, f.position))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(dir, _)| dir)
            }
        }
    }

    /// Repulsion from every other agent within the avoidance radius, inversely scaled by distance.
    fn avoidance(&self, id: AgentId, position: [f64; 2]) -> [f64; 2] {
        let radius = self.config.avoidance_radius;
        let strength = self.config.avoidance_strength;
        let mut push = [0.0, 0.0];
        for (other_id, other) in self.agents.iter() {
            if other_id == id {
                continue;
            }
            let Some((dir, dist)) = self.torus.direction(position, other.position) else {
                continue;
            };
            if dist < radius {
                let weight = strength / dist.max(1.0);
                push[0] -= dir[0] * weight;
                push[1] -= dir[1] * weight;
            }
        }
        push
    }

    /// Sweep the detection beam and claim any free food it touches. The agent holds
    /// position while scanning.
    fn step_scanning(&mut self, id: AgentId, agent: &mut Agent) {
        let duration = agent.scan_duration(self.config.scan_duration_ticks);
        let arc = agent.scan_arc(self.config.scan_arc_degrees);
        agent.motion.scan_timer += 1;
        let progress = (agent.motion.scan_timer as f64 / duration as f64).min(1.0);
        agent.motion.scan_angle = -FRAC_PI_2 + arc * progress;

        self.claim_food_in_beam(id, agent);

        if agent.motion.scan_timer >= duration {
            agent.motion.phase = Phase::Moving;
            agent.motion.scan_timer = 0;
            agent.motion.move_timer = 0;
        }
    }

    /// Claim every free food item lying within tolerance of the beam. Returns the count.
    pub(crate) fn claim_food_in_beam(&mut self, id: AgentId, agent: &Agent) -> usize {
        let beam = agent.beam_offset(&self.config);
        let tolerance = self.config.beam_tolerance;
        let mut claimed = 0;
        for index in 0..self.food.len() {
            let Some(food) = self.food.get(index) else {
                break;
            };
            if !food.is_claimable() {
                continue;
            }
            let local = self.torus.delta(agent.position, food.position);
            if point_segment_distance(local, [0.0, 0.0], beam) <= tolerance
                && self.food.claim(index, id)
            {
                claimed += 1;
            }
        }
        claimed
    }
}
