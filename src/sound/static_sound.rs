use crate::error::{Result, SoundSourceError};
use std::sync::Arc;
use std::time::Duration;

/// Fully decoded PCM data with reference-counted sharing.
///
/// Samples are stored interleaved (`[L0, R0, L1, R1, ...]` for stereo). Cloning is cheap and
/// every clone refers to the same buffer, so binding a sound to many sources never copies it.
#[derive(Debug, Clone)]
pub struct StaticSound {
    inner: Arc<StaticSoundInner>,
}

#[derive(Debug)]
struct StaticSoundInner {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
    total_frames: usize,
}

impl StaticSound {
    /// Wraps already decoded, interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns [`SoundSourceError::InvalidParameter`] if the sample rate or channel count is
    /// zero, or if the sample count is not a whole number of frames.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SoundSourceError::InvalidParameter {
                name: "sample_rate",
                value: sample_rate.to_string(),
            });
        }

        if channels == 0 || samples.len() % channels as usize != 0 {
            return Err(SoundSourceError::InvalidParameter {
                name: "channels",
                value: format!("{} (for {} samples)", channels, samples.len()),
            });
        }

        let total_frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(total_frames as f64 / sample_rate as f64);

        Ok(Self {
            inner: Arc::new(StaticSoundInner {
                samples,
                sample_rate,
                channels,
                duration,
                total_frames,
            }),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn samples(&self) -> &[f32] {
        &self.inner.samples
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    /// Interleaved samples for frames `start..end`, clamped to the available data.
    pub fn frames(&self, start: usize, end: usize) -> &[f32] {
        let channels = self.inner.channels as usize;
        let end = end.min(self.inner.total_frames);
        let start = start.min(end);
        &self.inner.samples[start * channels..end * channels]
    }
}
