//! Math types for sound sources

pub use glam::{Quat, Vec3};

/// World-space transform and motion of the listener at the time of a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
}

impl ListenerState {
    pub fn new(position: Vec3, velocity: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            velocity,
            orientation,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Maps a point given in listener space into world space.
    pub fn to_world(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    /// Rotates a listener-space vector into world space without translating it.
    pub fn to_world_direction(&self, vector: Vec3) -> Vec3 {
        self.orientation * vector
    }
}

impl Default for ListenerState {
    fn default() -> Self {
        Self::identity()
    }
}
