//! Fixed-step puck physics
//!
//! Three passes run in order every tick: integration, pairwise collision
//! resolution, then wall/goal handling. Velocities are in units per tick, so
//! nothing here is scaled by wall-clock time.

use crate::components::Body;
use crate::config::FieldConfig;

/// Velocity components below this snap to exactly zero.
pub const VELOCITY_EPSILON: f32 = 0.05;

/// Restitution for body-body impulses.
pub const BODY_RESTITUTION: f32 = 0.8;

/// Restitution for wall bounces.
pub const WALL_RESTITUTION: f32 = 0.6;

/// Squared center distance below which a pair is treated as coincident.
const MIN_CONTACT_DISTANCE_SQ: f32 = 0.001;

/// How far past the goal line (in ball radii) the ball may travel.
const GOAL_DEPTH_RADII: f32 = 2.0;

/// Advance positions by one tick and apply friction.
pub fn integrate(bodies: &mut [Body], friction: f32) {
    for body in bodies.iter_mut() {
        body.position += body.velocity;
        body.velocity *= friction;
        if body.velocity.x.abs() < VELOCITY_EPSILON {
            body.velocity.x = 0.0;
        }
        if body.velocity.y.abs() < VELOCITY_EPSILON {
            body.velocity.y = 0.0;
        }
    }
}

/// Resolve every overlapping pair in slot order. Returns how many pairs were
/// separated.
pub fn resolve_collisions(bodies: &mut [Body], max_speed: f32) -> usize {
    let mut resolved = 0;
    for j in 1..bodies.len() {
        let (head, tail) = bodies.split_at_mut(j);
        let b = &mut tail[0];
        for a in head.iter_mut() {
            if resolve_pair(a, b, max_speed) {
                resolved += 1;
            }
        }
    }
    resolved
}

/// Separate one overlapping pair and, if they are approaching, exchange an
/// elastic impulse along the contact normal. Mass is radius squared, so the
/// smaller ball reacts more strongly than a player.
pub fn resolve_pair(a: &mut Body, b: &mut Body, max_speed: f32) -> bool {
    let delta = b.position - a.position;
    let distance_sq = delta.length_squared();
    let min_distance = a.radius + b.radius;

    if distance_sq >= min_distance * min_distance || distance_sq <= MIN_CONTACT_DISTANCE_SQ {
        return false;
    }

    let distance = distance_sq.sqrt();
    let normal = delta / distance;

    let correction = normal * ((min_distance - distance) * 0.5);
    a.position -= correction;
    b.position += correction;

    // Velocity of B relative to A along the A->B normal; positive is separating.
    let vel_along_normal = (b.velocity - a.velocity).dot(normal);
    if vel_along_normal > 0.0 {
        return true;
    }

    let inv_mass_a = 1.0 / a.mass();
    let inv_mass_b = 1.0 / b.mass();
    let impulse_scalar =
        -(1.0 + BODY_RESTITUTION) * vel_along_normal / (inv_mass_a + inv_mass_b);
    let impulse = normal * impulse_scalar;

    a.velocity -= impulse * inv_mass_a;
    b.velocity += impulse * inv_mass_b;

    a.clamp_speed(max_speed);
    b.clamp_speed(max_speed);
    true
}

/// Keep bodies on the pitch. Top and bottom walls always reflect; side walls
/// reflect except where the ball lines up with a goal aperture.
pub fn apply_boundaries(bodies: &mut [Body], field: &FieldConfig) {
    for body in bodies.iter_mut() {
        let r = body.radius;
        let mut bounced = false;

        if body.position.y - r < 0.0 {
            body.position.y = r;
            body.velocity.y *= -WALL_RESTITUTION;
            bounced = true;
        }
        if body.position.y + r > field.canvas_height {
            body.position.y = field.canvas_height - r;
            body.velocity.y *= -WALL_RESTITUTION;
            bounced = true;
        }

        let depth = r * GOAL_DEPTH_RADII;

        if body.position.x - r < 0.0 {
            if body.is_ball() && field.goal1.spans_y(body.position.y) {
                if body.position.x < -depth {
                    body.position.x = -depth;
                    body.velocity.x = 0.0;
                }
            } else {
                body.position.x = r;
                body.velocity.x *= -WALL_RESTITUTION;
                bounced = true;
            }
        }

        if body.position.x + r > field.canvas_width {
            if body.is_ball() && field.goal2.spans_y(body.position.y) {
                if body.position.x > field.canvas_width + depth {
                    body.position.x = field.canvas_width + depth;
                    body.velocity.x = 0.0;
                }
            } else {
                body.position.x = field.canvas_width - r;
                body.velocity.x *= -WALL_RESTITUTION;
                bounced = true;
            }
        }

        if bounced {
            body.clamp_speed(field.max_speed);
        }
    }
}
