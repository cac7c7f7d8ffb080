// Signal chain construction
// Wires source -> filter -> gain -> output. The filter and gain stages
// live for the whole session; sources are fire-once and torn down and
// rebuilt on every play, seek, or source-level parameter change.

use crate::audio::buffer::SampleBuffer;
use crate::audio::filter::{BiquadFilter, FilterSettings};
use crate::audio::output::OutputHandle;
use crate::{AudioError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const CHUNK_FRAMES: usize = 512;
const IDLE_WAIT: Duration = Duration::from_millis(2);
const FULL_WAIT: Duration = Duration::from_millis(1);

/// Control surface of a live source node.
///
/// A source is fire-once: stopping it is final, and resuming playback
/// means asking the chain for a new one.
pub trait SourceControl: Send {
    /// Halt emission and discard queued audio. Idempotent.
    fn stop(&mut self);
}

/// Builds the audio node graph for one playback configuration.
///
/// This is the seam between the playback state machine and the audio
/// backend; tests drive the machine through a recording implementation.
pub trait SignalChain: Send {
    /// Start a new source `start_offset_ms` into the buffer, playing at
    /// `rate` and routed through the filter stage when `filter` is set.
    /// Emission begins immediately. Installing a new source supersedes
    /// any previous one, so at most one is ever audible.
    fn start(
        &mut self,
        buffer: Arc<SampleBuffer>,
        rate: f64,
        filter: Option<FilterSettings>,
        start_offset_ms: f64,
    ) -> Result<Box<dyn SourceControl>>;

    /// Adjust the long-lived gain stage, clamped to [0, 1].
    fn set_gain(&mut self, gain: f32);
}

/// The single-use playback assignment consumed by the feeder
struct ActiveSource {
    generation: u64,
    buffer: Arc<SampleBuffer>,
    /// Fractional read position in buffer frames
    position: f64,
    /// Buffer frames advanced per output frame; folds the playback rate
    /// and the sample-rate ratio together
    step: f64,
    filtered: bool,
}

struct ChainShared {
    output: Arc<OutputHandle>,
    gain: Mutex<f32>,
    filter: Mutex<BiquadFilter>,
    slot: Mutex<Option<ActiveSource>>,
    generation: AtomicU64,
    shutdown: AtomicBool,
}

impl ChainShared {
    fn current_generation(&self) -> Option<u64> {
        self.slot.lock().as_ref().map(|source| source.generation)
    }
}

/// Signal chain backed by the cpal output.
///
/// One feeder thread per session reads whatever source is installed,
/// runs it through the filter and gain stages, and pushes the result
/// into the output ring with backpressure.
pub struct CpalChain {
    shared: Arc<ChainShared>,
    feeder: Option<JoinHandle<()>>,
}

impl CpalChain {
    pub fn new(output: Arc<OutputHandle>) -> Self {
        let filter = BiquadFilter::new(output.sample_rate(), output.channels() as usize);
        let shared = Arc::new(ChainShared {
            output,
            gain: Mutex::new(1.0),
            filter: Mutex::new(filter),
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let feeder = std::thread::Builder::new()
            .name("tonearm-feeder".to_string())
            .spawn(move || run_feeder(worker))
            .ok();

        Self { shared, feeder }
    }

    pub fn gain(&self) -> f32 {
        *self.shared.gain.lock()
    }
}

impl SignalChain for CpalChain {
    fn start(
        &mut self,
        buffer: Arc<SampleBuffer>,
        rate: f64,
        filter: Option<FilterSettings>,
        start_offset_ms: f64,
    ) -> Result<Box<dyn SourceControl>> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AudioError::Playback(format!(
                "invalid playback rate: {}",
                rate
            )));
        }
        if self.feeder.is_none() {
            return Err(AudioError::Playback("feeder thread unavailable".to_string()));
        }

        let filtered = match filter {
            Some(settings) => {
                let mut stage = self.shared.filter.lock();
                stage.configure(settings);
                stage.reset();
                true
            }
            None => false,
        };

        let position = start_offset_ms.max(0.0) / 1000.0 * buffer.sample_rate() as f64;
        let step = rate * buffer.sample_rate() as f64 / self.shared.output.sample_rate() as f64;
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        *self.shared.slot.lock() = Some(ActiveSource {
            generation,
            buffer,
            position,
            step,
            filtered,
        });

        Ok(Box::new(CpalSource {
            shared: Arc::clone(&self.shared),
            generation,
            stopped: false,
        }))
    }

    fn set_gain(&mut self, gain: f32) {
        *self.shared.gain.lock() = gain.clamp(0.0, 1.0);
    }
}

impl Drop for CpalChain {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.feeder.take() {
            let _ = handle.join();
        }
    }
}

/// Live source handed to the state machine. Stopping clears the feeder
/// slot (if this source still owns it) and drains the output queue so
/// the stop is heard promptly.
struct CpalSource {
    shared: Arc<ChainShared>,
    generation: u64,
    stopped: bool,
}

impl SourceControl for CpalSource {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        let mut slot = self.shared.slot.lock();
        if slot.as_ref().map(|s| s.generation) == Some(self.generation) {
            *slot = None;
            drop(slot);
            self.shared.output.request_drain();
        }
    }
}

impl Drop for CpalSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_feeder(shared: Arc<ChainShared>) {
    let out_channels = shared.output.channels() as usize;
    let mut chunk: Vec<f32> = Vec::with_capacity(CHUNK_FRAMES * out_channels);

    loop {
        if shared.shutdown.load(Ordering::SeqCst) {
            return;
        }

        chunk.clear();
        let generation = match produce_chunk(&shared, out_channels, &mut chunk) {
            Some(generation) => generation,
            None => {
                std::thread::sleep(IDLE_WAIT);
                continue;
            }
        };

        // Push with backpressure; bail out if this source was superseded
        // so a seek never hears stale samples.
        let mut offset = 0;
        while offset < chunk.len() {
            if shared.shutdown.load(Ordering::SeqCst) {
                return;
            }
            if shared.current_generation() != Some(generation) {
                break;
            }
            let written = shared.output.write(&chunk[offset..]);
            if written == 0 {
                std::thread::sleep(FULL_WAIT);
            } else {
                offset += written;
            }
        }
    }
}

/// Render up to one chunk from the installed source.
/// Returns the source generation, or None when the slot is empty.
fn produce_chunk(shared: &ChainShared, out_channels: usize, chunk: &mut Vec<f32>) -> Option<u64> {
    let mut slot = shared.slot.lock();
    let source = slot.as_mut()?;
    let generation = source.generation;
    let total_frames = source.buffer.frames() as f64;
    let gain = *shared.gain.lock();
    let mut filter = source.filtered.then(|| shared.filter.lock());

    for _ in 0..CHUNK_FRAMES {
        if source.position >= total_frames {
            break;
        }
        for channel in 0..out_channels {
            let mut sample = source.buffer.sample_at(source.position, channel);
            if let Some(stage) = filter.as_mut() {
                sample = stage.process(channel, sample);
            }
            chunk.push(sample * gain);
        }
        source.position += source.step;
    }

    if source.position >= total_frames && chunk.is_empty() {
        // Source ran out; queued audio plays to its natural end
        *slot = None;
        return None;
    }

    Some(generation)
}
