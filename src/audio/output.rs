// Audio output using cpal
// Session-scoped output stream fed from a lock-free ring buffer. The
// stream itself is not Send, so it stays with its owner; feeder threads
// get a shareable producer-side handle instead.

use crate::{AudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Producer-side view of the output shared with source feeder threads.
pub struct OutputHandle {
    producer: Mutex<RingProducer>,
    drain_flag: AtomicBool,
    sample_rate: u32,
    channels: u16,
}

impl OutputHandle {
    /// Push samples into the output queue.
    /// Returns the number of samples actually accepted.
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut producer = self.producer.lock();
        let mut written = 0;

        for &sample in samples {
            if producer.try_push(sample).is_ok() {
                written += 1;
            } else {
                // Queue full, caller decides whether to wait
                break;
            }
        }

        written
    }

    /// Space left in the queue, in samples
    pub fn available_space(&self) -> usize {
        self.producer.lock().vacant_len()
    }

    /// Ask the audio callback to discard everything still queued.
    /// Used on stop and seek so stale audio never reaches the listener.
    pub fn request_drain(&self) {
        self.drain_flag.store(true, Ordering::SeqCst);
    }

    /// Output device sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Output device channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn new(producer: RingProducer, sample_rate: u32, channels: u16) -> Self {
        Self {
            producer: Mutex::new(producer),
            drain_flag: AtomicBool::new(false),
            sample_rate,
            channels,
        }
    }

    /// Handle with no device behind it; the returned consumer plays the
    /// role of the audio callback.
    #[cfg(test)]
    pub(crate) fn detached(sample_rate: u32, channels: u16) -> (Arc<Self>, RingConsumer) {
        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();
        (
            Arc::new(Self::new(producer, sample_rate, channels)),
            consumer,
        )
    }
}

/// Owns the cpal stream for the lifetime of a player session.
pub struct AudioOutput {
    _stream: Stream,
    handle: Arc<OutputHandle>,
}

impl AudioOutput {
    /// Open the default output device and start its stream.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Device("no output device available".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::Device(format!("failed to get default output config: {}", e)))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (producer, consumer) = rb.split();
        let consumer = Arc::new(Mutex::new(consumer));

        let handle = Arc::new(OutputHandle::new(producer, sample_rate, channels));
        let drain = Arc::clone(&handle);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), consumer, drain)?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), consumer, drain)?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), consumer, drain)?
            }
            format => {
                return Err(AudioError::Device(format!(
                    "unsupported sample format: {:?}",
                    format
                )))
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::Device(format!("failed to start stream: {}", e)))?;

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        consumer: Arc<Mutex<RingConsumer>>,
        handle: Arc<OutputHandle>,
    ) -> Result<Stream> {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut consumer = consumer.lock();

                    // A requested drain empties the queue before this period
                    if handle.drain_flag.swap(false, Ordering::SeqCst) {
                        while consumer.try_pop().is_some() {}
                    }

                    for sample in data.iter_mut() {
                        let value = consumer.try_pop().unwrap_or(0.0);
                        *sample = T::from_sample(value);
                    }
                },
                move |err| {
                    eprintln!("[Output] Stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::Device(format!("failed to build output stream: {}", e)))?;

        Ok(stream)
    }

    /// Shareable producer-side handle for building signal chains
    pub fn handle(&self) -> Arc<OutputHandle> {
        Arc::clone(&self.handle)
    }
}
