use super::{AudioChunk, SoundStream, StaticSound};
use crate::error::Result;
use std::time::Duration;

/// Streams already decoded PCM in chunks.
///
/// Useful for long sounds that should still rotate through a small voice queue, and as the
/// reference behaviour for decoder-backed streams.
#[derive(Debug, Clone)]
pub struct PcmStream {
    data: StaticSound,
    cursor: usize,
}

impl PcmStream {
    pub fn new(data: StaticSound) -> Self {
        Self { data, cursor: 0 }
    }

    /// Next frame to be read.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.data.total_frames()
    }
}

impl SoundStream for PcmStream {
    fn sample_rate(&self) -> u32 {
        self.data.sample_rate()
    }

    fn channels(&self) -> u16 {
        self.data.channels()
    }

    fn duration(&self) -> Option<Duration> {
        Some(self.data.duration())
    }

    fn rewind(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn read_chunk(&mut self, max_frames: usize) -> Result<Option<AudioChunk>> {
        if self.is_exhausted() || max_frames == 0 {
            return Ok(None);
        }

        let end = self.cursor.saturating_add(max_frames);
        let samples = self.data.frames(self.cursor, end).to_vec();
        self.cursor = end.min(self.data.total_frames());

        Ok(Some(AudioChunk::new(
            samples,
            self.data.sample_rate(),
            self.data.channels(),
        )))
    }
}
