//! Configuration for sound sources

use crate::error::{Result, SoundSourceError};

/// How fast a fade moves the source gain toward its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadePolicy {
    /// Gain units per second
    pub rate: f32,
    /// Distance to the target below which the fade snaps and finishes
    pub epsilon: f32,
}

impl Default for FadePolicy {
    fn default() -> Self {
        Self {
            rate: 1.0,
            epsilon: 0.001,
        }
    }
}

/// Size of the buffer window rotated through a voice for streaming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Number of chunks kept queued on the voice
    pub buffer_count: usize,
    /// Frames requested from the stream per chunk
    pub chunk_frames: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_count: 3,
            chunk_frames: 4096,
        }
    }
}

/// Software doppler parameters, for voices that do not shift pitch themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DopplerConfig {
    /// Speed of sound in world units per second
    pub speed_of_sound: f32,
    /// Effect strength (0.0 = none, 1.0 = physical)
    pub factor: f32,
}

impl Default for DopplerConfig {
    fn default() -> Self {
        Self {
            speed_of_sound: 343.3,
            factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub max_gain: f32,
    pub fade: FadePolicy,
    pub stream: StreamConfig,
    /// `None` leaves doppler to the device, which receives the velocity.
    pub doppler: Option<DopplerConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_gain: 1.0,
            fade: FadePolicy::default(),
            stream: StreamConfig::default(),
            doppler: None,
        }
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_gain(mut self, max_gain: f32) -> Self {
        self.max_gain = max_gain;
        self
    }

    pub fn fade_rate(mut self, rate: f32) -> Self {
        self.fade.rate = rate;
        self
    }

    pub fn fade_epsilon(mut self, epsilon: f32) -> Self {
        self.fade.epsilon = epsilon;
        self
    }

    pub fn buffer_count(mut self, count: usize) -> Self {
        self.stream.buffer_count = count;
        self
    }

    pub fn chunk_frames(mut self, frames: usize) -> Self {
        self.stream.chunk_frames = frames;
        self
    }

    pub fn doppler(mut self, doppler: DopplerConfig) -> Self {
        self.doppler = Some(doppler);
        self
    }

    /// Checks that every policy value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SoundSourceError::Configuration`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SoundSourceError::Configuration(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )))
            }
        };

        positive("max_gain", self.max_gain)?;
        positive("fade.rate", self.fade.rate)?;
        positive("fade.epsilon", self.fade.epsilon)?;

        if self.stream.buffer_count == 0 {
            return Err(SoundSourceError::Configuration(
                "stream.buffer_count must be greater than 0".to_string(),
            ));
        }

        if self.stream.chunk_frames == 0 {
            return Err(SoundSourceError::Configuration(
                "stream.chunk_frames must be greater than 0".to_string(),
            ));
        }

        if let Some(doppler) = &self.doppler {
            positive("doppler.speed_of_sound", doppler.speed_of_sound)?;
            if !doppler.factor.is_finite() || doppler.factor < 0.0 {
                return Err(SoundSourceError::Configuration(format!(
                    "doppler.factor must be a non-negative finite number, got {}",
                    doppler.factor
                )));
            }
        }

        Ok(())
    }
}
