//! Playback notifications emitted by sound sources

use crate::source::SourceId;

/// Why a source ended up in the stopped state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called
    Requested,
    /// A non-looping sound played to its end
    Completed,
    /// A fade to silence finished
    FadedOut,
    /// `reset()` was called while playing or paused
    Reset,
    /// The voice failed to start, accept data, or underran
    DeviceError,
    /// The streaming collaborator failed to deliver data
    StreamError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Started { source_id: SourceId },
    Resumed { source_id: SourceId },
    Paused { source_id: SourceId },
    Stopped { source_id: SourceId, reason: StopReason },
    Looped { source_id: SourceId, loop_count: u32 },
    FadeFinished { source_id: SourceId, gain: f32 },
    Purged { source_id: SourceId },
}

impl SourceEvent {
    pub fn source_id(&self) -> SourceId {
        match self {
            Self::Started { source_id }
            | Self::Resumed { source_id }
            | Self::Paused { source_id }
            | Self::Stopped { source_id, .. }
            | Self::Looped { source_id, .. }
            | Self::FadeFinished { source_id, .. }
            | Self::Purged { source_id } => *source_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Stopped {
                reason: StopReason::DeviceError | StopReason::StreamError,
                ..
            }
        )
    }
}
