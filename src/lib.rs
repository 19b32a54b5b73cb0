//! # Sonic Source
//!
//! Positional sound sources for a game runtime.
//!
//! A [`SoundSource`] binds a decoded or streaming sound to an exclusively owned device
//! [`Voice`] and drives it once per frame: playback state, gain fades, looping, streaming
//! buffer rotation and world or listener-relative placement. Only parameters that changed
//! since the last frame are pushed to the voice.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sonic_source::*;
//!
//! let listener = SharedListener::default();
//! let pool_volume = PoolVolume::default();
//!
//! let mut source: SoundSource<Audio, NullVoice> = SoundSource::new(
//!     NullVoice::new(),
//!     listener.clone(),
//!     pool_volume.clone(),
//!     SourceConfig::default(),
//! )?;
//!
//! let sound = StaticSound::new(vec![0.0; 48_000], 48_000, 1)?;
//! source
//!     .set_audio(Audio::from(sound))?
//!     .set_position(Vec3::new(5.0, 0.0, 0.0))?
//!     .play()?;
//!
//! let events = source.subscribe();
//!
//! // Once per frame
//! listener.set_position(Vec3::new(0.0, 0.0, 1.0));
//! source.update(1.0 / 60.0)?;
//!
//! for event in events.try_iter() {
//!     if let SourceEvent::Stopped { reason, .. } = event {
//!         println!("Source stopped: {:?}", reason);
//!     }
//! }
//!
//! source.purge()?;
//! # Ok::<(), SoundSourceError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`SoundSource`]**: State machine and per-frame update
//! - **[`Voice`]**: Device channel the source drives, see [`NullVoice`] for a silent one
//! - **[`Sound`]**: Buffered ([`StaticSound`]) or streaming ([`SoundStream`]) audio
//! - **[`ListenerProvider`]**: Listener transform, usually a [`SharedListener`]
//! - **[`PoolVolume`]**: Volume multiplier shared across a pool of sources
//! - **[`SourceEvent`]**: Transitions reported through [`SoundSource::subscribe`]

pub mod config;
pub mod error;
pub mod events;
pub mod gain;
pub mod listener;
pub mod math;
pub mod sound;
pub mod source;
pub mod spatial;
pub mod voice;

pub use config::{DopplerConfig, FadePolicy, SourceConfig, StreamConfig};
pub use error::{Result, SoundSourceError};
pub use events::{SourceEvent, StopReason};
pub use gain::PoolVolume;
pub use listener::{ListenerProvider, SharedListener};
pub use math::{ListenerState, Quat, Vec3};
pub use sound::{Audio, AudioChunk, PcmStream, Sound, SoundStream, StaticSound};
pub use source::{PlaybackState, SoundSource, SourceId};
pub use voice::{NullVoice, Voice, VoiceParams};
