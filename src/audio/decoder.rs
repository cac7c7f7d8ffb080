// Audio decoder using Symphonia
// Decodes a complete encoded stream (MP3/AAC/FLAC/OGG/WAV/M4A) into an
// in-memory sample buffer up front; playback never touches the codec.

use crate::audio::buffer::SampleBuffer;
use crate::{AudioError, Result};
use std::io::Cursor;
use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decode raw audio bytes into a sample buffer.
///
/// The container format is probed from the bytes themselves; callers that
/// know the file extension can pass it as a hint via [`decode_with_hint`].
pub fn decode(bytes: Vec<u8>) -> Result<SampleBuffer> {
    decode_with_hint(bytes, None)
}

/// Decode raw audio bytes, hinting the probe with a file extension.
pub fn decode_with_hint(bytes: Vec<u8>, extension: Option<&str>) -> Result<SampleBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Decode(format!("failed to probe format: {}", e)))?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("failed to read packet: {}", e))),
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_interleaved(&decoded, &mut samples),
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt packet, keep going
                eprintln!("[Decoder] Decode error (skipping): {}", e);
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("decode failed: {}", e))),
        }
    }

    if samples.is_empty() {
        return Err(AudioError::Decode(
            "stream contained no decodable audio".to_string(),
        ));
    }

    Ok(SampleBuffer::new(samples, sample_rate, channels))
}

/// Convert any AudioBufferRef to interleaved f32 and append it
fn append_interleaved(buf: &AudioBufferRef, out: &mut Vec<f32>) {
    match buf {
        AudioBufferRef::F32(b) => interleave(b.planes(), b.frames(), out, |s: f32| s),
        AudioBufferRef::F64(b) => interleave(b.planes(), b.frames(), out, |s: f64| s as f32),
        AudioBufferRef::S8(b) => {
            interleave(b.planes(), b.frames(), out, |s: i8| s as f32 / 128.0)
        }
        AudioBufferRef::S16(b) => {
            interleave(b.planes(), b.frames(), out, |s: i16| s as f32 / 32768.0)
        }
        AudioBufferRef::S24(b) => {
            interleave(b.planes(), b.frames(), out, |s| s.inner() as f32 / 8388608.0)
        }
        AudioBufferRef::S32(b) => {
            interleave(b.planes(), b.frames(), out, |s: i32| s as f32 / 2147483648.0)
        }
        AudioBufferRef::U8(b) => {
            interleave(b.planes(), b.frames(), out, |s: u8| (s as f32 - 128.0) / 128.0)
        }
        AudioBufferRef::U16(b) => interleave(b.planes(), b.frames(), out, |s: u16| {
            (s as f32 - 32768.0) / 32768.0
        }),
        AudioBufferRef::U24(b) => interleave(b.planes(), b.frames(), out, |s| {
            (s.inner() as f32 - 8388608.0) / 8388608.0
        }),
        AudioBufferRef::U32(b) => interleave(b.planes(), b.frames(), out, |s: u32| {
            ((s as f64 - 2147483648.0) / 2147483648.0) as f32
        }),
    }
}

fn interleave<T: Sample + Copy, F: Fn(T) -> f32>(
    planes: AudioPlanes<T>,
    frames: usize,
    out: &mut Vec<f32>,
    convert: F,
) {
    let planes = planes.planes();
    if planes.is_empty() || frames == 0 {
        return;
    }

    out.reserve(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            out.push(convert(plane[frame]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal 16-bit PCM WAV writer, enough to feed the probe
    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let byte_rate = sample_rate * channels as u32 * 2;
        let block_align = channels * 2;

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&byte_rate.to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_decode_wav_round_trip() {
        // Half a second of a 440 Hz tone, mono, 8 kHz
        let sample_rate = 8000u32;
        let samples: Vec<i16> = (0..sample_rate / 2)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 16000.0) as i16
            })
            .collect();

        let buffer = decode(wav_bytes(&samples, sample_rate, 1)).unwrap();
        assert_eq!(buffer.sample_rate(), sample_rate);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.frames(), samples.len());
        assert!((buffer.duration_ms() - 500.0).abs() < 1.0);

        // Samples should round-trip within 16-bit quantization error
        let first = samples[100] as f32 / 32768.0;
        assert!((buffer.samples()[100] - first).abs() < 1e-3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(decode(Vec::new()).is_err());
    }
}
