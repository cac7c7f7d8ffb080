// Tonearm - audio playback engine
// Decodes audio into an in-memory sample buffer, then plays it through a
// rebuildable source -> filter -> gain -> output chain.
pub mod audio;
pub mod player;
pub mod settings;

pub use audio::buffer::SampleBuffer;
pub use audio::chain::{CpalChain, SignalChain, SourceControl};
pub use audio::decoder::decode;
pub use audio::filter::{validate_frequency, FilterMode, FilterSettings};
pub use audio::output::{AudioOutput, OutputHandle};
pub use player::clock::PlaybackClock;
pub use player::player::Player;
pub use player::progress::{format_millis, PositionTicker, ProgressBar};
pub use player::state::{PlaybackSnapshot, PlaybackState};
pub use settings::AudioSettings;

/// Errors surfaced by the playback engine.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Playback error: {0}")]
    Playback(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
