//! Device voice binding.
//!
//! A [`Voice`] is the device-level playback channel behind one
//! [`SoundSource`](crate::SoundSource). The source owns it exclusively, pushes parameter
//! changes to it and polls it for progress. Implementations must not block: every call is
//! made from the frame update.

use crate::error::Result;
use crate::math::Vec3;
use crate::sound::{AudioChunk, StaticSound};

pub trait Voice {
    fn set_pitch(&mut self, pitch: f32);

    fn set_gain(&mut self, gain: f32);

    fn set_position(&mut self, position: Vec3);

    fn set_velocity(&mut self, velocity: Vec3);

    fn set_direction(&mut self, direction: Vec3);

    fn set_looping(&mut self, looping: bool);

    /// Attaches a fully buffered sound, replacing any previous buffer or queue.
    fn bind_buffer(&mut self, sound: &StaticSound) -> Result<()>;

    /// Detaches the buffer attached by `bind_buffer`, if any.
    fn unbind_buffer(&mut self);

    /// Appends a streamed chunk to the voice's buffer queue.
    fn queue_chunk(&mut self, chunk: &AudioChunk) -> Result<()>;

    /// Removes the chunks the device has finished playing and returns how many there were.
    /// Chunks are processed in queue order.
    fn unqueue_processed(&mut self) -> usize;

    fn clear_queue(&mut self);

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn stop(&mut self);

    fn rewind(&mut self);

    /// True once the device has stopped on its own, after running out of data.
    fn is_finished(&self) -> bool;

    /// Frees the device resources. The voice is not used again afterwards.
    fn release(&mut self);
}

/// Parameters as last pushed to the voice, after listener transform and gain scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    pub pitch: f32,
    pub gain: f32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub direction: Vec3,
    pub looping: bool,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            gain: 1.0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            direction: Vec3::ZERO,
            looping: false,
        }
    }
}

/// A voice with no device behind it, for headless runs such as dedicated servers.
///
/// Queued chunks count as played on the next poll, so streams drain as fast as the
/// update loop asks for them. Static sounds rely on the source's own time cursor.
#[derive(Debug, Default)]
pub struct NullVoice {
    queued: usize,
    released: bool,
}

impl NullVoice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Voice for NullVoice {
    fn set_pitch(&mut self, _pitch: f32) {}

    fn set_gain(&mut self, _gain: f32) {}

    fn set_position(&mut self, _position: Vec3) {}

    fn set_velocity(&mut self, _velocity: Vec3) {}

    fn set_direction(&mut self, _direction: Vec3) {}

    fn set_looping(&mut self, _looping: bool) {}

    fn bind_buffer(&mut self, _sound: &StaticSound) -> Result<()> {
        self.queued = 0;
        Ok(())
    }

    fn unbind_buffer(&mut self) {}

    fn queue_chunk(&mut self, _chunk: &AudioChunk) -> Result<()> {
        self.queued += 1;
        Ok(())
    }

    fn unqueue_processed(&mut self) -> usize {
        std::mem::take(&mut self.queued)
    }

    fn clear_queue(&mut self) {
        self.queued = 0;
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn stop(&mut self) {}

    fn rewind(&mut self) {}

    fn is_finished(&self) -> bool {
        false
    }

    fn release(&mut self) {
        self.queued = 0;
        self.released = true;
    }
}
