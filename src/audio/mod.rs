// Audio signal path
// Uses Symphonia for decoding and cpal for output

pub mod buffer;
pub mod chain;
pub mod decoder;
pub mod filter;
pub mod output;

pub use buffer::SampleBuffer;
pub use chain::{CpalChain, SignalChain, SourceControl};
pub use filter::{validate_frequency, FilterMode, FilterSettings};
pub use output::{AudioOutput, OutputHandle};
