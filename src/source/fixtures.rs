use super::SoundSource;
use crate::config::SourceConfig;
use crate::events::SourceEvent;
use crate::gain::PoolVolume;
use crate::listener::ListenerProvider;
use crate::math::ListenerState;
use crate::sound::{Audio, PcmStream, StaticSound};
use crate::voice::recording::RecordingVoice;
use crossbeam_channel::Receiver;

pub type TestSource = SoundSource<Audio, RecordingVoice>;

pub const SAMPLE_RATE: u32 = 100;

/// Mono buffered sound whose samples count up from zero.
pub fn buffered(seconds: f32) -> Audio {
    let frames = (seconds * SAMPLE_RATE as f32).round() as usize;
    let samples = (0..frames).map(|i| i as f32).collect();
    Audio::Static(StaticSound::new(samples, SAMPLE_RATE, 1).unwrap())
}

/// Mono stream of `frames` frames counting up from zero.
pub fn pcm_stream(frames: usize) -> PcmStream {
    let samples = (0..frames).map(|i| i as f32).collect();
    PcmStream::new(StaticSound::new(samples, SAMPLE_RATE, 1).unwrap())
}

pub fn streamed(frames: usize) -> Audio {
    Audio::streaming(pcm_stream(frames))
}

pub fn source() -> TestSource {
    source_with(ListenerState::identity(), PoolVolume::default(), SourceConfig::default())
}

pub fn source_with<L>(listener: L, pool_volume: PoolVolume, config: SourceConfig) -> TestSource
where
    L: ListenerProvider + Send + Sync + 'static,
{
    let _ = env_logger::builder().is_test(true).try_init();
    SoundSource::new(RecordingVoice::default(), listener, pool_volume, config).unwrap()
}

pub fn drain(events: &Receiver<SourceEvent>) -> Vec<SourceEvent> {
    events.try_iter().collect()
}
