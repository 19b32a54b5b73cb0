//! Positional sound sources.
//!
//! A [`SoundSource`] owns one device voice and drives it from a per-frame
//! [`update`](SoundSource::update): it moves fades along, rotates streaming buffers through
//! the voice queue, resolves listener-relative placement and pushes whatever changed.
//!
//! ## States
//!
//! ```text
//!            play()               pause()
//! Stopped ───────────▶ Playing ───────────▶ Paused
//!    ▲  ◀─────────────    │   ◀───────────    │
//!    │   stop() / end     │      play()       │
//!    └────────────────────┴───────────────────┘
//!                  stop() / reset()
//!
//! any state ── purge() ──▶ Disposed
//! ```
//!
//! A source is not internally synchronized. The pool that owns it calls `update` from one
//! tick and must not call mutators from another thread while that tick runs.

mod update;

#[cfg(test)]
mod fixtures;

use crate::config::SourceConfig;
use crate::error::{Result, SoundSourceError};
use crate::events::{SourceEvent, StopReason};
use crate::gain::{Fade, PoolVolume};
use crate::listener::ListenerProvider;
use crate::math::{ListenerState, Vec3};
use crate::sound::Sound;
use crate::voice::{Voice, VoiceParams};
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Unique identity of a source, stable across `reset()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceId(Uuid);

impl SourceId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Initial state, and where a source returns after stopping or finishing
    Stopped,
    Playing,
    /// Playback position is retained
    Paused,
    /// Terminal; the voice has been released
    Disposed,
}

impl PlaybackState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Disposed => "disposed",
        }
    }
}

bitflags::bitflags! {
    /// Voice parameters changed since the last push.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Dirty: u8 {
        const PITCH = 1 << 0;
        const GAIN = 1 << 1;
        const POSITION = 1 << 2;
        const VELOCITY = 1 << 3;
        const DIRECTION = 1 << 4;
        const LOOPING = 1 << 5;
        const SPATIAL = Self::POSITION.bits() | Self::VELOCITY.bits() | Self::DIRECTION.bits();
    }
}

/// Where playback currently is within the bound sound.
#[derive(Debug, Default)]
pub(crate) struct Cursor {
    /// Seconds played of a buffered sound
    played_secs: f64,
    /// Frames of a stream the voice has finished with
    played_frames: u64,
    /// Frame counts of the chunks still queued on the voice, oldest first
    queued_frames: VecDeque<usize>,
    exhausted: bool,
    loop_count: u32,
}

impl Cursor {
    fn rewind(&mut self) {
        *self = Self::default();
    }
}

/// A positional playback slot bound to at most one sound at a time.
///
/// `T` is the sound handle (see [`Sound`]) and `V` the device voice the source drives.
pub struct SoundSource<T: Sound, V: Voice> {
    id: SourceId,
    config: SourceConfig,
    voice: V,
    listener: Arc<dyn ListenerProvider + Send + Sync>,
    pool_volume: PoolVolume,
    audio: Option<T>,
    state: PlaybackState,
    absolute: bool,
    position: Vec3,
    velocity: Vec3,
    direction: Vec3,
    pitch: f32,
    gain: f32,
    effective_gain: f32,
    looping: bool,
    fade: Option<Fade>,
    cursor: Cursor,
    dirty: Dirty,
    last_listener: Option<ListenerState>,
    pushed: VoiceParams,
    events: Option<Sender<SourceEvent>>,
}

impl<T: Sound, V: Voice> SoundSource<T, V> {
    /// Creates a stopped source with no audio bound.
    ///
    /// # Arguments
    ///
    /// * `voice` - Device voice exclusively owned by this source
    /// * `listener` - Supplies the listener transform for relative placement and doppler
    /// * `pool_volume` - Volume multiplier shared by every source of the pool
    /// * `config` - Fade, streaming and doppler policy
    ///
    /// # Errors
    ///
    /// Returns [`SoundSourceError::Configuration`] if `config` does not validate.
    pub fn new<L>(
        voice: V,
        listener: L,
        pool_volume: PoolVolume,
        config: SourceConfig,
    ) -> Result<Self>
    where
        L: ListenerProvider + Send + Sync + 'static,
    {
        config.validate()?;

        let id = SourceId::new();
        let effective_gain = pool_volume.get();
        log::debug!("Source {} created", id);

        Ok(Self {
            id,
            config,
            voice,
            listener: Arc::new(listener),
            pool_volume,
            audio: None,
            state: PlaybackState::Stopped,
            absolute: true,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            direction: Vec3::ZERO,
            pitch: 1.0,
            gain: 1.0,
            effective_gain,
            looping: false,
            fade: None,
            cursor: Cursor::default(),
            dirty: Dirty::all(),
            last_listener: None,
            pushed: VoiceParams::default(),
            events: None,
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn voice(&self) -> &V {
        &self.voice
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True whenever the source is in the playing state, whether or not the device has
    /// actually started producing sound yet.
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn is_disposed(&self) -> bool {
        self.state == PlaybackState::Disposed
    }

    /// Returns a receiver for this source's playback events.
    ///
    /// Only the most recent subscriber receives events.
    pub fn subscribe(&mut self) -> Receiver<SourceEvent> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.events = Some(sender);
        receiver
    }

    /// Starts or resumes playback.
    ///
    /// From `Stopped` the sound starts at its first frame; from `Paused` it continues where
    /// it left off. Calling this while already playing does nothing, and neither does
    /// calling it with no audio bound (the source stays stopped).
    ///
    /// # Errors
    ///
    /// - [`SoundSourceError::Disposed`] after `purge()`
    /// - [`SoundSourceError::Device`] or [`SoundSourceError::Stream`] if the voice or the
    ///   stream fails while starting; the source is left stopped
    pub fn play(&mut self) -> Result<&mut Self> {
        match self.state {
            PlaybackState::Disposed => return Err(SoundSourceError::Disposed),
            PlaybackState::Playing => {
                log::debug!("Source {} already playing, ignoring play", self.id);
            }
            PlaybackState::Paused => {
                if let Err(e) = self.voice.play() {
                    return Err(self.fail(e));
                }
                self.state = PlaybackState::Playing;
                log::debug!("Source {} resumed at {:?}", self.id, self.playback_position());
                self.emit(SourceEvent::Resumed { source_id: self.id });
            }
            PlaybackState::Stopped => {
                if self.audio.is_none() {
                    log::warn!("Source {} has no audio bound, ignoring play", self.id);
                    return Ok(self);
                }
                if let Err(e) = self.start_from_beginning() {
                    return Err(self.fail(e));
                }
                self.state = PlaybackState::Playing;
                log::debug!("Source {} playing from beginning", self.id);
                self.emit(SourceEvent::Started { source_id: self.id });
            }
        }
        Ok(self)
    }

    /// Pauses a playing source. Does nothing in any other live state.
    pub fn pause(&mut self) -> Result<&mut Self> {
        self.ensure_alive()?;
        if self.state == PlaybackState::Playing {
            self.voice.pause();
            self.state = PlaybackState::Paused;
            log::debug!("Source {} paused at {:?}", self.id, self.playback_position());
            self.emit(SourceEvent::Paused { source_id: self.id });
        }
        Ok(self)
    }

    /// Stops playback, cancels any fade and rewinds to the start.
    /// Stopping a stopped source is a no-op.
    pub fn stop(&mut self) -> Result<&mut Self> {
        self.ensure_alive()?;
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.halt(StopReason::Requested);
        }
        Ok(self)
    }

    /// Returns the source to a clean, unbound, stopped state so a pool can reuse it.
    ///
    /// Clears the audio binding, any fade, and restores spatial, pitch, gain and looping
    /// defaults. The voice is kept.
    pub fn reset(&mut self) -> Result<&mut Self> {
        self.ensure_alive()?;
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.halt(StopReason::Reset);
        }

        self.voice.clear_queue();
        self.voice.unbind_buffer();
        self.audio = None;
        self.fade = None;
        self.cursor.rewind();
        self.absolute = true;
        self.position = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.direction = Vec3::ZERO;
        self.pitch = 1.0;
        self.gain = 1.0;
        self.looping = false;
        self.dirty = Dirty::all();
        self.refresh_effective_gain();

        log::debug!("Source {} reset", self.id);
        Ok(self)
    }

    /// Releases the voice for good. Every later mutating call fails with
    /// [`SoundSourceError::Disposed`].
    ///
    /// The caller must guarantee no `update` is running concurrently.
    pub fn purge(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.voice.stop();
        self.voice.clear_queue();
        self.voice.unbind_buffer();
        self.voice.release();
        self.audio = None;
        self.fade = None;
        self.cursor.rewind();
        self.state = PlaybackState::Disposed;

        log::info!("Source {} purged", self.id);
        self.emit(SourceEvent::Purged { source_id: self.id });
        Ok(())
    }

    /// Binds a sound. Only legal while stopped.
    ///
    /// # Errors
    ///
    /// - [`SoundSourceError::InvalidState`] while playing or paused
    /// - [`SoundSourceError::UnsupportedOperation`] when binding a streaming sound to a
    ///   looping source
    pub fn set_audio(&mut self, sound: T) -> Result<&mut Self> {
        self.ensure_alive()?;
        if self.state != PlaybackState::Stopped {
            return Err(SoundSourceError::InvalidState {
                operation: "bind audio",
                state: self.state.name(),
            });
        }
        if self.looping && sound.is_streaming() {
            return Err(SoundSourceError::UnsupportedOperation(
                "streaming sounds cannot be bound to a looping source".to_string(),
            ));
        }

        self.voice.clear_queue();
        self.voice.unbind_buffer();
        self.cursor.rewind();
        self.audio = Some(sound);
        Ok(self)
    }

    pub fn audio(&self) -> Option<&T> {
        self.audio.as_ref()
    }

    /// `true` places the source in world space; `false` makes its position, velocity and
    /// direction relative to the listener.
    pub fn set_absolute(&mut self, absolute: bool) -> Result<&mut Self> {
        self.ensure_alive()?;
        if self.absolute != absolute {
            self.absolute = absolute;
            self.dirty |= Dirty::SPATIAL;
        }
        Ok(self)
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn set_position(&mut self, position: impl Into<Vec3>) -> Result<&mut Self> {
        self.ensure_alive()?;
        let position = finite_vector("position", position.into())?;
        if self.position != position {
            self.position = position;
            self.dirty |= Dirty::POSITION;
        }
        Ok(self)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Copies the position into `dest` and returns it.
    pub fn position_into<'a>(&self, dest: &'a mut Vec3) -> &'a mut Vec3 {
        *dest = self.position;
        dest
    }

    /// Velocity used for doppler, in units per second.
    pub fn set_velocity(&mut self, velocity: impl Into<Vec3>) -> Result<&mut Self> {
        self.ensure_alive()?;
        let velocity = finite_vector("velocity", velocity.into())?;
        if self.velocity != velocity {
            self.velocity = velocity;
            self.dirty |= Dirty::VELOCITY;
        }
        Ok(self)
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn velocity_into<'a>(&self, dest: &'a mut Vec3) -> &'a mut Vec3 {
        *dest = self.velocity;
        dest
    }

    /// Cone direction. Expected to be a unit vector, or zero for an omnidirectional source.
    pub fn set_direction(&mut self, direction: impl Into<Vec3>) -> Result<&mut Self> {
        self.ensure_alive()?;
        let direction = finite_vector("direction", direction.into())?;
        if self.direction != direction {
            self.direction = direction;
            self.dirty |= Dirty::DIRECTION;
        }
        Ok(self)
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn direction_into<'a>(&self, dest: &'a mut Vec3) -> &'a mut Vec3 {
        *dest = self.direction;
        dest
    }

    /// # Errors
    ///
    /// Returns [`SoundSourceError::InvalidParameter`] unless `pitch` is finite and positive.
    pub fn set_pitch(&mut self, pitch: f32) -> Result<&mut Self> {
        self.ensure_alive()?;
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(SoundSourceError::InvalidParameter {
                name: "pitch",
                value: pitch.to_string(),
            });
        }
        if self.pitch != pitch {
            self.pitch = pitch;
            self.dirty |= Dirty::PITCH;
        }
        Ok(self)
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Sets the source-level gain, clamped to `[0, max_gain]`. Cancels a running fade.
    pub fn set_gain(&mut self, gain: f32) -> Result<&mut Self> {
        self.ensure_alive()?;
        let gain = finite_scalar("gain", gain)?;
        self.gain = gain.clamp(0.0, self.config.max_gain);
        self.fade = None;
        self.refresh_effective_gain();
        Ok(self)
    }

    /// Source-level gain, before the pool volume is applied.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Gain sent to the voice: source gain times pool volume.
    pub fn effective_gain(&self) -> f32 {
        self.effective_gain
    }

    /// Recomputes the effective gain from the current pool volume.
    ///
    /// Call after the pool volume changes; `update` also does this every frame.
    pub fn update_gain(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.refresh_effective_gain();
        Ok(())
    }

    /// Starts, or replaces, a fade toward `target_gain` (clamped to `[0, max_gain]`).
    ///
    /// The gain then moves at the configured rate on each `update`. A fade that reaches
    /// 0.0 stops the source.
    pub fn fade(&mut self, target_gain: f32) -> Result<&mut Self> {
        self.ensure_alive()?;
        let target = finite_scalar("target_gain", target_gain)?.clamp(0.0, self.config.max_gain);
        log::debug!("Source {} fading {} -> {}", self.id, self.gain, target);
        self.fade = Some(Fade::new(target));
        Ok(self)
    }

    /// Target of the fade in progress, if any.
    pub fn fade_target(&self) -> Option<f32> {
        self.fade.map(|fade| fade.target)
    }

    /// # Errors
    ///
    /// Returns [`SoundSourceError::UnsupportedOperation`] when enabling looping on a source
    /// bound to a streaming sound; `looping` is left unchanged.
    pub fn set_looping(&mut self, looping: bool) -> Result<&mut Self> {
        self.ensure_alive()?;
        if looping && self.audio.as_ref().is_some_and(|audio| audio.is_streaming()) {
            return Err(SoundSourceError::UnsupportedOperation(
                "looping is not supported on streaming sounds".to_string(),
            ));
        }
        if self.looping != looping {
            self.looping = looping;
            self.dirty |= Dirty::LOOPING;
        }
        Ok(self)
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Time played since the sound started, within the current loop.
    pub fn playback_position(&self) -> Duration {
        match &self.audio {
            Some(audio) if audio.is_streaming() => {
                let sample_rate = audio.sample_rate().max(1);
                Duration::from_secs_f64(self.cursor.played_frames as f64 / sample_rate as f64)
            }
            Some(_) => Duration::from_secs_f64(self.cursor.played_secs),
            None => Duration::ZERO,
        }
    }

    /// Parameters as last pushed to the voice.
    pub fn effective_params(&self) -> VoiceParams {
        self.pushed
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.state == PlaybackState::Disposed {
            return Err(SoundSourceError::Disposed);
        }
        Ok(())
    }

    fn emit(&self, event: SourceEvent) {
        if let Some(sender) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = sender.send(event);
        }
    }

    fn refresh_effective_gain(&mut self) {
        let effective = self.gain * self.pool_volume.get();
        if effective != self.effective_gain {
            self.effective_gain = effective;
            self.dirty |= Dirty::GAIN;
        }
    }

    fn start_from_beginning(&mut self) -> Result<()> {
        self.cursor.rewind();
        self.voice.clear_queue();
        self.voice.rewind();

        let Some(audio) = self.audio.as_mut() else {
            return Ok(());
        };

        if audio.is_streaming() {
            let stream = audio.stream_mut().ok_or_else(|| {
                SoundSourceError::Stream("streaming sound exposes no stream".to_string())
            })?;
            stream.rewind()?;
            update::refill(stream, &mut self.voice, &mut self.cursor, &self.config.stream)?;
        } else {
            let sound = audio.as_static().ok_or_else(|| {
                SoundSourceError::Device("buffered sound exposes no samples".to_string())
            })?;
            self.voice.bind_buffer(sound)?;
        }

        self.sync_voice();
        self.voice.play()
    }

    /// Stops the voice and moves to `Stopped`, whatever the current live state.
    fn halt(&mut self, reason: StopReason) {
        self.voice.stop();
        self.voice.clear_queue();
        self.voice.rewind();
        self.fade = None;
        self.cursor.rewind();
        self.state = PlaybackState::Stopped;

        log::debug!("Source {} stopped ({:?})", self.id, reason);
        self.emit(SourceEvent::Stopped {
            source_id: self.id,
            reason,
        });
    }

    /// Leaves the source stopped after a device or stream failure and hands the error back.
    fn fail(&mut self, error: SoundSourceError) -> SoundSourceError {
        log::error!("Source {} failed: {}", self.id, error);
        let reason = match &error {
            SoundSourceError::Stream(_) => StopReason::StreamError,
            _ => StopReason::DeviceError,
        };
        self.halt(reason);
        error
    }
}

impl<T: Sound, V: Voice> std::fmt::Debug for SoundSource<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundSource")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("absolute", &self.absolute)
            .field("pitch", &self.pitch)
            .field("gain", &self.gain)
            .field("looping", &self.looping)
            .field("fade", &self.fade)
            .finish_non_exhaustive()
    }
}

impl<T: Sound, V: Voice> Drop for SoundSource<T, V> {
    fn drop(&mut self) {
        if self.state != PlaybackState::Disposed {
            self.voice.stop();
            self.voice.release();
        }
    }
}

fn finite_scalar(name: &'static str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SoundSourceError::InvalidParameter {
            name,
            value: value.to_string(),
        })
    }
}

fn finite_vector(name: &'static str, value: Vec3) -> Result<Vec3> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SoundSourceError::InvalidParameter {
            name,
            value: format!("{:?}", value),
        })
    }
}
