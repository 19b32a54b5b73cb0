//! Listener collaborator used to place listener-relative sources in the world

use crate::math::{ListenerState, Quat, Vec3};
use std::sync::{Arc, PoisonError, RwLock};

/// Supplies the listener transform on demand.
///
/// Queried synchronously from [`SoundSource::update`](crate::SoundSource::update), so
/// implementations must answer without blocking on I/O.
pub trait ListenerProvider {
    fn listener_state(&self) -> ListenerState;
}

impl ListenerProvider for ListenerState {
    fn listener_state(&self) -> ListenerState {
        *self
    }
}

impl<P: ListenerProvider + ?Sized> ListenerProvider for Arc<P> {
    fn listener_state(&self) -> ListenerState {
        (**self).listener_state()
    }
}

/// Listener state shared between the camera/player code that moves it and the sources
/// that read it. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SharedListener {
    state: Arc<RwLock<ListenerState>>,
}

impl SharedListener {
    pub fn new(state: ListenerState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub fn set(&self, state: ListenerState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn set_position(&self, position: Vec3) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .position = position;
    }

    pub fn set_velocity(&self, velocity: Vec3) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .velocity = velocity;
    }

    pub fn set_orientation(&self, orientation: Quat) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .orientation = orientation;
    }
}

impl ListenerProvider for SharedListener {
    fn listener_state(&self) -> ListenerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
