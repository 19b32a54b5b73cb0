//! Listener-relative placement and software doppler

use crate::config::DopplerConfig;
use crate::math::{ListenerState, Vec3};

/// Spatial parameters as the voice should receive them, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPlacement {
    pub position: Vec3,
    pub velocity: Vec3,
    pub direction: Vec3,
}

/// Resolves stored source parameters into world space.
///
/// Absolute sources pass through untouched. Relative sources are expressed in the
/// listener's frame and move with it, so they inherit its translation, rotation and
/// velocity.
pub fn resolve_placement(
    absolute: bool,
    position: Vec3,
    velocity: Vec3,
    direction: Vec3,
    listener: &ListenerState,
) -> WorldPlacement {
    if absolute {
        return WorldPlacement {
            position,
            velocity,
            direction,
        };
    }

    WorldPlacement {
        position: listener.to_world(position),
        velocity: listener.velocity + listener.to_world_direction(velocity),
        direction: listener.to_world_direction(direction),
    }
}

/// Pitch multiplier caused by the relative motion of source and listener.
///
/// Uses `f' = f * (c + v_l * k) / (c - v_s * k)` where both velocities are projected
/// on the listener-to-source axis and count positive when closing the distance.
pub fn doppler_shift(
    placement: &WorldPlacement,
    listener: &ListenerState,
    doppler: &DopplerConfig,
) -> f32 {
    let offset = placement.position - listener.position;
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return 1.0;
    }

    let axis = offset / distance;
    // Listener moving toward the source raises pitch; source moving toward the listener does too.
    let listener_speed = listener.velocity.dot(axis);
    let source_speed = -placement.velocity.dot(axis);

    let c = doppler.speed_of_sound;
    let numerator = c + listener_speed * doppler.factor;
    let denominator = c - source_speed * doppler.factor;

    if denominator.abs() <= 0.01 || numerator <= 0.0 {
        return 1.0;
    }

    numerator / denominator
}
