//! Pool-wide volume and gain fades

use crate::config::FadePolicy;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide volume multiplier applied on top of every source's own gain.
///
/// Owned by a mixer or settings subsystem; sources only read it, in
/// [`SoundSource::update_gain`](crate::SoundSource::update_gain). Clones share the value.
#[derive(Debug, Clone)]
pub struct PoolVolume {
    bits: Arc<AtomicU32>,
}

impl PoolVolume {
    pub fn new(volume: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(sanitize(volume).to_bits())),
        }
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Negative and non-finite values are stored as 0.0.
    pub fn set(&self, volume: f32) {
        self.bits.store(sanitize(volume).to_bits(), Ordering::Relaxed);
    }
}

impl Default for PoolVolume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn sanitize(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.max(0.0)
    } else {
        0.0
    }
}

/// An in-progress fade toward a target gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Fade {
    pub target: f32,
}

/// Outcome of advancing a fade by one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FadeStep {
    InProgress(f32),
    Finished(f32),
}

impl Fade {
    pub fn new(target: f32) -> Self {
        Self { target }
    }

    /// Moves `current` linearly toward the target by `policy.rate * delta`,
    /// snapping once within `policy.epsilon`.
    pub fn step(&self, current: f32, delta: f32, policy: &FadePolicy) -> FadeStep {
        let remaining = self.target - current;
        let max_step = policy.rate * delta.max(0.0);

        if remaining.abs() <= max_step {
            return FadeStep::Finished(self.target);
        }

        let next = current + max_step.copysign(remaining);
        if (self.target - next).abs() <= policy.epsilon {
            FadeStep::Finished(self.target)
        } else {
            FadeStep::InProgress(next)
        }
    }
}
