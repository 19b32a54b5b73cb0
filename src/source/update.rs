//! The per-frame update pipeline.

use super::{Cursor, Dirty, PlaybackState, SoundSource};
use crate::config::StreamConfig;
use crate::error::{Result, SoundSourceError};
use crate::events::{SourceEvent, StopReason};
use crate::gain::FadeStep;
use crate::listener::ListenerProvider;
use crate::sound::{Sound, SoundStream};
use crate::spatial::{doppler_shift, resolve_placement};
use crate::voice::Voice;

impl<T: Sound, V: Voice> SoundSource<T, V> {
    /// Advances the source by `delta` seconds. Call once per frame until purged.
    ///
    /// In order:
    /// 1. moves an active fade toward its target, stopping the source if it faded to 0.0
    /// 2. while playing, advances the play cursor: buffered sounds stop on the first
    ///    update where the time played reaches their duration (unless looping), streams
    ///    hand finished chunks back and refill the voice queue, stopping once exhausted
    /// 3. resolves listener-relative placement against the current listener
    /// 4. pushes to the voice only the parameters that changed since the last push
    ///
    /// # Errors
    ///
    /// - [`SoundSourceError::Disposed`] after `purge()`
    /// - [`SoundSourceError::InvalidParameter`] for a negative or non-finite `delta`
    /// - [`SoundSourceError::Device`] on queue failure or underrun and
    ///   [`SoundSourceError::Stream`] on decode failure; the source is stopped first
    pub fn update(&mut self, delta: f32) -> Result<()> {
        self.ensure_alive()?;
        if !delta.is_finite() || delta < 0.0 {
            return Err(SoundSourceError::InvalidParameter {
                name: "delta",
                value: delta.to_string(),
            });
        }

        self.step_fade(delta);

        let mut outcome = Ok(());
        if self.state == PlaybackState::Playing {
            if let Err(e) = self.advance(delta) {
                outcome = Err(self.fail(e));
            }
        }

        self.refresh_effective_gain();
        self.sync_voice();
        outcome
    }

    fn step_fade(&mut self, delta: f32) {
        let Some(fade) = self.fade else {
            return;
        };

        match fade.step(self.gain, delta, &self.config.fade) {
            FadeStep::InProgress(gain) => self.gain = gain,
            FadeStep::Finished(gain) => {
                self.gain = gain;
                self.fade = None;
                log::debug!("Source {} fade finished at {}", self.id, gain);
                self.emit(SourceEvent::FadeFinished {
                    source_id: self.id,
                    gain,
                });

                if gain == 0.0
                    && matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
                {
                    self.halt(StopReason::FadedOut);
                }
            }
        }
    }

    fn advance(&mut self, delta: f32) -> Result<()> {
        let streaming = self.audio.as_ref().is_some_and(|audio| audio.is_streaming());
        if streaming {
            self.advance_stream()
        } else {
            self.advance_buffered(delta);
            Ok(())
        }
    }

    fn advance_buffered(&mut self, delta: f32) {
        let Some(duration) = self.audio.as_ref().and_then(|audio| audio.duration()) else {
            return;
        };
        let length = duration.as_secs_f64();
        self.cursor.played_secs += f64::from(delta) * f64::from(self.pitch);

        if self.looping {
            if length <= 0.0 {
                self.cursor.played_secs = 0.0;
            } else if self.cursor.played_secs >= length {
                let wraps = (self.cursor.played_secs / length).floor();
                self.cursor.played_secs -= wraps * length;
                self.cursor.loop_count = self.cursor.loop_count.saturating_add(wraps as u32);
                log::debug!(
                    "Source {} looped (count: {})",
                    self.id,
                    self.cursor.loop_count
                );
                self.emit(SourceEvent::Looped {
                    source_id: self.id,
                    loop_count: self.cursor.loop_count,
                });
            }
        } else if self.cursor.played_secs >= length || self.voice.is_finished() {
            log::info!(
                "Source {} completed after {:.3}s",
                self.id,
                self.cursor.played_secs.min(length)
            );
            self.halt(StopReason::Completed);
        }
    }

    fn advance_stream(&mut self) -> Result<()> {
        let processed = self.voice.unqueue_processed();
        for _ in 0..processed {
            match self.cursor.queued_frames.pop_front() {
                Some(frames) => self.cursor.played_frames += frames as u64,
                None => break,
            }
        }

        if let Some(stream) = self.audio.as_mut().and_then(|audio| audio.stream_mut()) {
            refill(stream, &mut self.voice, &mut self.cursor, &self.config.stream)?;
        }

        let finished = self.voice.is_finished();
        if self.cursor.exhausted && (self.cursor.queued_frames.is_empty() || finished) {
            log::info!(
                "Source {} stream completed after {} frames",
                self.id,
                self.cursor.played_frames
            );
            self.halt(StopReason::Completed);
        } else if finished {
            return Err(SoundSourceError::Device(format!(
                "buffer underrun on source {}",
                self.id
            )));
        }

        Ok(())
    }

    /// Resolves placement against the listener and pushes every dirty parameter.
    pub(super) fn sync_voice(&mut self) {
        let listener = self.listener.listener_state();
        if self.last_listener != Some(listener) {
            if !self.absolute {
                self.dirty |= Dirty::SPATIAL;
            }
            if self.config.doppler.is_some() {
                self.dirty |= Dirty::PITCH;
            }
            self.last_listener = Some(listener);
        }

        if self.config.doppler.is_some() && self.dirty.intersects(Dirty::SPATIAL) {
            self.dirty |= Dirty::PITCH;
        }

        if self.dirty.is_empty() {
            return;
        }

        let placement = resolve_placement(
            self.absolute,
            self.position,
            self.velocity,
            self.direction,
            &listener,
        );

        if self.dirty.contains(Dirty::PITCH) {
            let pitch = match &self.config.doppler {
                Some(doppler) => self.pitch * doppler_shift(&placement, &listener, doppler),
                None => self.pitch,
            };
            self.voice.set_pitch(pitch);
            self.pushed.pitch = pitch;
        }
        if self.dirty.contains(Dirty::GAIN) {
            self.voice.set_gain(self.effective_gain);
            self.pushed.gain = self.effective_gain;
        }
        if self.dirty.contains(Dirty::POSITION) {
            self.voice.set_position(placement.position);
            self.pushed.position = placement.position;
        }
        if self.dirty.contains(Dirty::VELOCITY) {
            self.voice.set_velocity(placement.velocity);
            self.pushed.velocity = placement.velocity;
        }
        if self.dirty.contains(Dirty::DIRECTION) {
            self.voice.set_direction(placement.direction);
            self.pushed.direction = placement.direction;
        }
        if self.dirty.contains(Dirty::LOOPING) {
            self.voice.set_looping(self.looping);
            self.pushed.looping = self.looping;
        }

        self.dirty = Dirty::empty();
    }
}

/// Tops the voice queue up to `buffer_count` chunks, marking the cursor exhausted at end of
/// stream.
pub(super) fn refill<V: Voice>(
    stream: &mut dyn SoundStream,
    voice: &mut V,
    cursor: &mut Cursor,
    config: &StreamConfig,
) -> Result<()> {
    while !cursor.exhausted && cursor.queued_frames.len() < config.buffer_count {
        match stream.read_chunk(config.chunk_frames)? {
            Some(chunk) if chunk.frames() > 0 => {
                voice.queue_chunk(&chunk)?;
                cursor.queued_frames.push_back(chunk.frames());
            }
            // Decoder has nothing ready this frame.
            Some(_) => break,
            None => cursor.exhausted = true,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::config::{DopplerConfig, SourceConfig};
    use crate::error::SoundSourceError;
    use crate::events::{SourceEvent, StopReason};
    use crate::gain::PoolVolume;
    use crate::listener::SharedListener;
    use crate::math::{ListenerState, Vec3};
    use crate::source::PlaybackState;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn streaming_config() -> SourceConfig {
        SourceConfig::new().chunk_frames(2).buffer_count(2)
    }

    #[test]
    fn test_buffered_sound_stops_on_tick_reaching_duration() {
        let mut source = source();
        let events = source.subscribe();
        source.set_audio(buffered(2.0)).unwrap();
        source.play().unwrap();

        source.update(1.0).unwrap();
        assert_eq!(source.state(), PlaybackState::Playing);

        source.update(1.0).unwrap();
        assert_eq!(source.state(), PlaybackState::Stopped);
        assert!(drain(&events).contains(&SourceEvent::Stopped {
            source_id: source.id(),
            reason: StopReason::Completed
        }));
    }

    #[test]
    fn test_pitch_scales_buffered_progress() {
        let mut source = source();
        source.set_audio(buffered(2.0)).unwrap();
        source.set_pitch(2.0).unwrap();
        source.play().unwrap();

        source.update(0.5).unwrap();
        assert_eq!(source.playback_position(), Duration::from_secs(1));
        source.update(0.5).unwrap();
        assert_eq!(source.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_looping_buffered_sound_wraps() {
        let mut source = source();
        let events = source.subscribe();
        source.set_audio(buffered(1.0)).unwrap();
        source.set_looping(true).unwrap();
        source.play().unwrap();

        source.update(0.6).unwrap();
        source.update(0.6).unwrap();

        assert!(source.is_playing());
        assert_relative_eq!(
            source.playback_position().as_secs_f64(),
            0.2,
            epsilon = 1e-6
        );
        assert!(source.voice().params.looping);
        assert!(drain(&events).contains(&SourceEvent::Looped {
            source_id: source.id(),
            loop_count: 1
        }));
    }

    #[test]
    fn test_voice_finishing_completes_buffered_sound() {
        let mut source = source();
        source.set_audio(buffered(5.0)).unwrap();
        source.play().unwrap();

        source.voice.finished = true;
        source.update(0.1).unwrap();
        assert_eq!(source.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_stream_rotates_through_voice_queue() {
        let mut source = source_with(
            ListenerState::identity(),
            PoolVolume::default(),
            streaming_config(),
        );
        source.set_audio(streamed(10)).unwrap();
        source.play().unwrap();
        assert_eq!(source.voice().queue.len(), 2);

        for _ in 0..4 {
            source.update(0.02).unwrap();
            assert!(source.is_playing());
        }
        assert_eq!(source.playback_position(), Duration::from_secs_f64(0.08));

        source.update(0.02).unwrap();
        assert_eq!(source.state(), PlaybackState::Stopped);

        let streamed_samples: Vec<f32> = source
            .voice()
            .queued_total
            .iter()
            .flat_map(|chunk| chunk.samples.iter().copied())
            .collect();
        let expected: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(streamed_samples, expected);
    }

    #[test]
    fn test_stream_queue_failure_stops_source() {
        let mut source = source_with(
            ListenerState::identity(),
            PoolVolume::default(),
            streaming_config(),
        );
        source.set_audio(streamed(10)).unwrap();
        source.play().unwrap();

        source.voice.fail_queue = true;
        let err = source.update(0.02).unwrap_err();
        assert!(matches!(err, SoundSourceError::Device(_)));
        assert_eq!(source.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_stream_underrun_reports_device_error() {
        let mut source = source_with(
            ListenerState::identity(),
            PoolVolume::default(),
            streaming_config(),
        );
        let events = source.subscribe();
        source.set_audio(streamed(10)).unwrap();
        source.play().unwrap();

        source.voice.finished = true;
        let err = source.update(0.02).unwrap_err();
        assert!(matches!(err, SoundSourceError::Device(_)));
        assert_eq!(source.state(), PlaybackState::Stopped);
        assert!(drain(&events).contains(&SourceEvent::Stopped {
            source_id: source.id(),
            reason: StopReason::DeviceError
        }));
    }

    #[test]
    fn test_fade_to_zero_stops_source() {
        let mut source = source();
        let events = source.subscribe();
        source.set_audio(buffered(10.0)).unwrap();
        source.play().unwrap();
        source.fade(0.0).unwrap();

        for _ in 0..3 {
            source.update(0.25).unwrap();
        }
        assert!(source.is_playing());
        assert_relative_eq!(source.gain(), 0.25);

        source.update(0.25).unwrap();
        assert_eq!(source.state(), PlaybackState::Stopped);
        assert_eq!(source.gain(), 0.0);
        assert_eq!(source.effective_params().gain, 0.0);

        let events = drain(&events);
        assert!(events.contains(&SourceEvent::FadeFinished {
            source_id: source.id(),
            gain: 0.0
        }));
        assert!(events.contains(&SourceEvent::Stopped {
            source_id: source.id(),
            reason: StopReason::FadedOut
        }));
    }

    #[test]
    fn test_repeated_fade_follows_same_trajectory() {
        let mut once = source();
        let mut twice = source();
        for source in [&mut once, &mut twice] {
            source.set_audio(buffered(10.0)).unwrap();
            source.play().unwrap();
        }

        once.fade(0.3).unwrap();
        twice.fade(0.3).unwrap();
        twice.fade(0.3).unwrap();

        for step in 0..10 {
            once.update(0.1).unwrap();
            twice.update(0.1).unwrap();
            if step == 2 {
                twice.fade(0.3).unwrap();
            }
            assert_eq!(once.gain(), twice.gain());
        }
        assert_eq!(once.gain(), 0.3);
        assert_eq!(once.fade_target(), None);
    }

    #[test]
    fn test_fade_to_zero_while_paused_stops() {
        let mut source = source();
        let events = source.subscribe();
        source.set_audio(buffered(10.0)).unwrap();
        source.play().unwrap();
        source.update(0.5).unwrap();
        source.pause().unwrap();

        source.fade(0.0).unwrap();
        source.update(1.0).unwrap();

        assert_eq!(source.state(), PlaybackState::Stopped);
        assert_eq!(source.gain(), 0.0);
        assert_eq!(source.playback_position(), Duration::ZERO);
        assert!(drain(&events).contains(&SourceEvent::Stopped {
            source_id: source.id(),
            reason: StopReason::FadedOut
        }));
    }

    #[test]
    fn test_fade_does_not_change_playback_state() {
        let mut source = source();
        source.set_audio(buffered(10.0)).unwrap();
        source.play().unwrap();

        source.fade(0.5).unwrap();
        assert_eq!(source.fade_target(), Some(0.5));
        source.update(1.0).unwrap();

        assert!(source.is_playing());
        assert_eq!(source.gain(), 0.5);
        assert_eq!(source.fade_target(), None);

        source.fade(5.0).unwrap();
        assert_eq!(source.fade_target(), Some(1.0));
    }

    #[test]
    fn test_stop_cancels_fade() {
        let mut source = source();
        source.set_audio(buffered(10.0)).unwrap();
        source.play().unwrap();
        source.fade(0.2).unwrap();

        source.stop().unwrap();
        assert_eq!(source.fade_target(), None);
    }

    #[test]
    fn test_absolute_and_relative_placement() {
        let listener = ListenerState::from_position(Vec3::new(10.0, 0.0, 0.0));
        let mut source = source_with(listener, PoolVolume::default(), SourceConfig::default());

        source.set_absolute(true).unwrap();
        source.set_position([1.0, 2.0, 3.0]).unwrap();
        source.update(0.0).unwrap();
        assert_eq!(source.effective_params().position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(source.voice().params.position, Vec3::new(1.0, 2.0, 3.0));

        source.set_absolute(false).unwrap();
        source.update(0.0).unwrap();
        assert_eq!(source.effective_params().position, Vec3::new(11.0, 2.0, 3.0));
        assert_eq!(source.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_relative_source_follows_moving_listener() {
        let listener = SharedListener::default();
        let mut relative = source_with(
            listener.clone(),
            PoolVolume::default(),
            SourceConfig::default(),
        );
        let mut absolute = source_with(
            listener.clone(),
            PoolVolume::default(),
            SourceConfig::default(),
        );
        relative.set_absolute(false).unwrap();
        relative.set_position(Vec3::X).unwrap();
        absolute.set_position(Vec3::X).unwrap();

        relative.update(0.0).unwrap();
        absolute.update(0.0).unwrap();
        let absolute_pushes = absolute.voice().pushes;

        listener.set_position(Vec3::new(0.0, 0.0, 5.0));
        relative.update(0.0).unwrap();
        absolute.update(0.0).unwrap();

        assert_eq!(relative.voice().params.position, Vec3::new(1.0, 0.0, 5.0));
        assert_eq!(absolute.voice().params.position, Vec3::X);
        assert_eq!(absolute.voice().pushes, absolute_pushes);
    }

    #[test]
    fn test_only_changed_parameters_are_pushed() {
        let mut source = source();
        source.update(0.0).unwrap();
        let initial = source.voice().pushes;
        assert_eq!(initial, 6);

        source.update(0.0).unwrap();
        assert_eq!(source.voice().pushes, initial);

        source.set_pitch(1.0).unwrap();
        source.set_position(Vec3::ZERO).unwrap();
        source.update(0.0).unwrap();
        assert_eq!(source.voice().pushes, initial);

        source.set_pitch(2.0).unwrap();
        source.update(0.0).unwrap();
        assert_eq!(source.voice().pushes, initial + 1);
        assert_eq!(source.voice().params.pitch, 2.0);
    }

    #[test]
    fn test_update_picks_up_pool_volume() {
        let pool = PoolVolume::default();
        let mut source = source_with(
            ListenerState::identity(),
            pool.clone(),
            SourceConfig::default(),
        );
        source.set_gain(0.8).unwrap();

        pool.set(0.5);
        source.update(0.0).unwrap();
        assert_relative_eq!(source.voice().params.gain, 0.4);
    }

    #[test]
    fn test_software_doppler_shifts_pushed_pitch() {
        let config = SourceConfig::new().doppler(DopplerConfig::default());
        let mut source = source_with(ListenerState::identity(), PoolVolume::default(), config);
        source.set_position([10.0, 0.0, 0.0]).unwrap();
        source.set_velocity([-20.0, 0.0, 0.0]).unwrap();
        source.update(0.0).unwrap();

        let pitch = source.effective_params().pitch;
        assert!(pitch > 1.0);
        assert_eq!(source.voice().params.pitch, pitch);
        assert_eq!(source.pitch(), 1.0);
    }

    #[test]
    fn test_invalid_delta_rejected() {
        let mut source = source();
        assert!(matches!(
            source.update(-1.0),
            Err(SoundSourceError::InvalidParameter { name: "delta", .. })
        ));
        assert!(source.update(f32::NAN).is_err());
    }
}
