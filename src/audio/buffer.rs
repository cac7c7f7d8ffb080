// Decoded audio held in memory
// The buffer is immutable once decoded; the player and source feeders
// share it through an Arc and never write to it.

use std::sync::Arc;

/// Immutable decoded PCM data: interleaved f32 samples plus format.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: usize,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        Self {
            data: Arc::new(data),
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Interleaved samples, `channels` values per frame
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels
    }

    /// Total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64 * 1000.0
    }

    /// Read one channel at a fractional frame position with linear
    /// interpolation. Positions past the end read as silence; a channel
    /// index past the channel count reads the last channel, so mono
    /// buffers fan out to every output channel.
    pub fn sample_at(&self, frame_position: f64, channel: usize) -> f32 {
        if frame_position < 0.0 {
            return 0.0;
        }
        let channels = self.channels;
        let src_channel = channel.min(channels - 1);
        let base_frame = frame_position.floor();
        let index = base_frame as usize * channels + src_channel;
        if index >= self.data.len() {
            return 0.0;
        }
        let current = self.data[index];

        let next_index = index + channels;
        if next_index >= self.data.len() {
            return current;
        }
        let fraction = (frame_position - base_frame) as f32;
        current + (self.data[next_index] - current) * fraction
    }
}
