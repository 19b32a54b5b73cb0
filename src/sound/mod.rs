//! Sound assets a source can be bound to.
//!
//! A sound is either fully buffered ([`StaticSound`]) or decoded incrementally while it
//! plays ([`SoundStream`]). Decoding itself happens outside this crate; a stream only has
//! to hand out PCM chunks on request and signal the end of its data.

mod pcm_stream;
mod static_sound;

pub use pcm_stream::PcmStream;
pub use static_sound::StaticSound;

use crate::error::Result;
use std::time::Duration;

/// A block of interleaved PCM produced by a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Pull interface of a streaming asset.
pub trait SoundStream {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Total length, when the decoder knows it up front.
    fn duration(&self) -> Option<Duration> {
        None
    }

    /// Moves the read cursor back to the first frame.
    fn rewind(&mut self) -> Result<()>;

    /// Decodes up to `max_frames` frames. `Ok(None)` signals end of stream.
    ///
    /// Called from the frame update, so implementations must not block for long.
    fn read_chunk(&mut self, max_frames: usize) -> Result<Option<AudioChunk>>;
}

/// A sound asset handle a [`SoundSource`](crate::SoundSource) can be bound to.
pub trait Sound {
    fn is_streaming(&self) -> bool;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    fn duration(&self) -> Option<Duration>;

    /// The buffered data, for non-streaming sounds.
    fn as_static(&self) -> Option<&StaticSound>;

    /// The pull interface, for streaming sounds.
    fn stream_mut(&mut self) -> Option<&mut dyn SoundStream>;
}

impl Sound for StaticSound {
    fn is_streaming(&self) -> bool {
        false
    }

    fn sample_rate(&self) -> u32 {
        StaticSound::sample_rate(self)
    }

    fn channels(&self) -> u16 {
        StaticSound::channels(self)
    }

    fn duration(&self) -> Option<Duration> {
        Some(StaticSound::duration(self))
    }

    fn as_static(&self) -> Option<&StaticSound> {
        Some(self)
    }

    fn stream_mut(&mut self) -> Option<&mut dyn SoundStream> {
        None
    }
}

impl Sound for PcmStream {
    fn is_streaming(&self) -> bool {
        true
    }

    fn sample_rate(&self) -> u32 {
        SoundStream::sample_rate(self)
    }

    fn channels(&self) -> u16 {
        SoundStream::channels(self)
    }

    fn duration(&self) -> Option<Duration> {
        SoundStream::duration(self)
    }

    fn as_static(&self) -> Option<&StaticSound> {
        None
    }

    fn stream_mut(&mut self) -> Option<&mut dyn SoundStream> {
        Some(self)
    }
}

/// Either kind of sound, so a single pool of sources can play both.
pub enum Audio {
    Static(StaticSound),
    Streaming(Box<dyn SoundStream + Send>),
}

impl Audio {
    pub fn streaming<S: SoundStream + Send + 'static>(stream: S) -> Self {
        Self::Streaming(Box::new(stream))
    }
}

impl From<StaticSound> for Audio {
    fn from(sound: StaticSound) -> Self {
        Self::Static(sound)
    }
}

impl std::fmt::Debug for Audio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(sound) => f.debug_tuple("Static").field(sound).finish(),
            Self::Streaming(stream) => f
                .debug_struct("Streaming")
                .field("sample_rate", &stream.sample_rate())
                .field("channels", &stream.channels())
                .finish_non_exhaustive(),
        }
    }
}

impl Sound for Audio {
    fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming(_))
    }

    fn sample_rate(&self) -> u32 {
        match self {
            Self::Static(sound) => sound.sample_rate(),
            Self::Streaming(stream) => stream.sample_rate(),
        }
    }

    fn channels(&self) -> u16 {
        match self {
            Self::Static(sound) => sound.channels(),
            Self::Streaming(stream) => stream.channels(),
        }
    }

    fn duration(&self) -> Option<Duration> {
        match self {
            Self::Static(sound) => Some(sound.duration()),
            Self::Streaming(stream) => stream.duration(),
        }
    }

    fn as_static(&self) -> Option<&StaticSound> {
        match self {
            Self::Static(sound) => Some(sound),
            Self::Streaming(_) => None,
        }
    }

    fn stream_mut(&mut self) -> Option<&mut dyn SoundStream> {
        match self {
            Self::Static(_) => None,
            Self::Streaming(stream) => Some(stream.as_mut()),
        }
    }
}
