//! Error types for sound sources

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoundSourceError {
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Sound source has been purged")]
    Disposed,

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SoundSourceError {
    /// Errors raised by the device or the stream collaborator force the source to stop.
    pub fn is_playback_failure(&self) -> bool {
        matches!(self, Self::Device(_) | Self::Stream(_))
    }
}

pub type Result<T> = std::result::Result<T, SoundSourceError>;
