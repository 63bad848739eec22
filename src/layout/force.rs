use eframe::egui::{Vec2, vec2};

pub(super) struct ForceNode {
    pub(super) position: Vec2,
    pub(super) velocity: Vec2,
    pub(super) radius: f32,
}

/// One integration step of the continuous force simulation. Returns whether
/// any node is still moving so the caller can stop repainting once the
/// layout has settled.
pub(super) fn step(nodes: &mut [ForceNode], edges: &[(usize, usize)], delta_seconds: f32) -> bool {
    let node_count = nodes.len();
    if node_count < 2 {
        return false;
    }

    let repulsion_strength = 52_000.0_f32;
    let spring_strength = 0.018_f32;
    let spring_damping = 0.22_f32;
    let center_pull = 0.0012_f32;
    let softening = 620.0_f32;
    let time_step_scale = (delta_seconds * 60.0).clamp(0.25, 3.0);
    let damping_factor = 0.88_f32.powf(time_step_scale);

    let mut forces = vec![Vec2::ZERO; node_count];

    for a in 0..node_count {
        for b in (a + 1)..node_count {
            let delta = nodes[a].position - nodes[b].position;
            let distance_sq = delta.length_sq();
            let distance = distance_sq.sqrt();
            let direction = if distance > 0.0001 {
                delta / distance
            } else {
                let angle =
                    ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
                vec2(angle.cos(), angle.sin())
            };
            let push = direction * (repulsion_strength / (distance_sq + softening));
            forces[a] += push;
            forces[b] -= push;
        }
    }

    for &(from, to) in edges {
        if from >= node_count || to >= node_count || from == to {
            continue;
        }

        let delta = nodes[from].position - nodes[to].position;
        let distance_sq = delta.length_sq();
        if distance_sq <= 0.0001 * 0.0001 {
            continue;
        }
        let distance = distance_sq.sqrt();
        let direction = delta / distance;

        let preferred = 110.0 + (nodes[from].radius + nodes[to].radius) * 2.5;
        let spring = (distance - preferred) * spring_strength;
        let relative_velocity = nodes[from].velocity - nodes[to].velocity;
        let damping_force = relative_velocity.dot(direction) * spring_damping;
        let correction = direction * (spring + damping_force);

        forces[from] -= correction;
        forces[to] += correction;
    }

    for (index, force) in forces.iter_mut().enumerate() {
        *force -= nodes[index].position * center_pull;
    }

    let max_force = 180.0_f32;
    let max_force_sq = max_force * max_force;
    let max_speed = 18.0_f32;
    let max_speed_sq = max_speed * max_speed;
    let min_sleep_speed_sq = 0.02 * 0.02;
    let min_sleep_force_sq = 0.08 * 0.08;
    let mut any_motion = false;

    for (index, force_value) in forces.iter().enumerate() {
        let mut force = *force_value;
        let force_sq = force.length_sq();
        if force_sq > max_force_sq {
            force *= max_force / force_sq.sqrt();
        }

        let mut velocity =
            (nodes[index].velocity + (force * (0.055 * time_step_scale))) * damping_factor;
        let mut speed_sq = velocity.length_sq();
        if speed_sq > max_speed_sq {
            velocity *= max_speed / speed_sq.sqrt();
            speed_sq = max_speed_sq;
        }

        if speed_sq < min_sleep_speed_sq && force_sq < min_sleep_force_sq {
            velocity = Vec2::ZERO;
            speed_sq = 0.0;
        }

        nodes[index].velocity = velocity;
        nodes[index].position += velocity * time_step_scale;
        if speed_sq > 0.000_001 {
            any_motion = true;
        }
    }

    any_motion
}
