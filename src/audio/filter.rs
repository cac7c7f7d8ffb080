// Frequency filtering
// A single biquad stage provides the low-pass and high-pass responses.
// The filter object is session-scoped; its state is reset whenever a new
// source starts so one playback cannot bleed into the next.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DEFAULT_FREQUENCY_HZ: f64 = 1000.0;
pub const MIN_FREQUENCY_HZ: f64 = 20.0;
pub const MAX_FREQUENCY_HZ: f64 = 20_000.0;

/// Clamp a cutoff frequency into the audible band.
/// Non-finite input falls back to the default so bad persisted or
/// user-entered values never reach the audio graph.
pub fn validate_frequency(freq: f64) -> f64 {
    if !freq.is_finite() {
        return DEFAULT_FREQUENCY_HZ;
    }
    freq.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ)
}

/// Filter response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Lowpass,
    Highpass,
}

/// User-facing filter configuration, mirrored into persisted settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(rename = "type")]
    pub mode: FilterMode,
    pub frequency: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            mode: FilterMode::Lowpass,
            frequency: DEFAULT_FREQUENCY_HZ,
        }
    }
}

impl FilterSettings {
    /// Copy of the settings with the frequency forced into range
    pub fn clamped(self) -> Self {
        Self {
            mode: self.mode,
            frequency: validate_frequency(self.frequency),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

/// Two-pole filter (12 dB/octave) with independent state per channel.
/// Coefficients follow the RBJ audio-EQ cookbook with a Butterworth Q.
pub struct BiquadFilter {
    settings: FilterSettings,
    sample_rate: f64,
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    state: Vec<ChannelState>,
}

impl BiquadFilter {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        let mut filter = Self {
            settings: FilterSettings::default(),
            sample_rate: sample_rate.max(1) as f64,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            state: vec![ChannelState::default(); channels.max(1)],
        };
        filter.update_coefficients();
        filter
    }

    pub fn settings(&self) -> FilterSettings {
        self.settings
    }

    /// Retarget the filter. Existing state is kept so a parameter sweep
    /// while audio flows stays click-free; use [`reset`] between sources.
    pub fn configure(&mut self, settings: FilterSettings) {
        self.settings = settings.clamped();
        self.update_coefficients();
    }

    /// Clear the per-channel memory
    pub fn reset(&mut self) {
        for state in &mut self.state {
            *state = ChannelState::default();
        }
    }

    /// Process one sample of the given channel
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        let state = &mut self.state[channel];
        let x = input as f64;
        let y = self.b0 * x + self.b1 * state.x1 + self.b2 * state.x2
            - self.a1 * state.y1
            - self.a2 * state.y2;

        state.x2 = state.x1;
        state.x1 = x;
        state.y2 = state.y1;
        state.y1 = y;

        y as f32
    }

    fn update_coefficients(&mut self) {
        // Stay safely below Nyquist, the response math blows up there
        let cutoff = self.settings.frequency.min(self.sample_rate * 0.49);
        let omega = 2.0 * PI * cutoff / self.sample_rate;
        let cos_omega = omega.cos();
        // Butterworth Q for a maximally flat passband
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let alpha = omega.sin() / (2.0 * q);

        let (b0, b1, b2) = match self.settings.mode {
            FilterMode::Lowpass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterMode::Highpass => {
                let b1 = -(1.0 + cos_omega);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
        };

        let a0 = 1.0 + alpha;
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_omega / a0;
        self.a2 = (1.0 - alpha) / a0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_frequency_rejects_non_finite() {
        assert_eq!(validate_frequency(f64::NAN), 1000.0);
        assert_eq!(validate_frequency(f64::INFINITY), 1000.0);
        assert_eq!(validate_frequency(f64::NEG_INFINITY), 1000.0);
    }

    #[test]
    fn test_validate_frequency_clamps() {
        assert_eq!(validate_frequency(999_999.0), 20_000.0);
        assert_eq!(validate_frequency(5.0), 20.0);
        assert_eq!(validate_frequency(1234.0), 1234.0);
    }

    /// A low cutoff should flatten the fastest signal the sample rate can
    /// represent (alternating +1/-1 is the Nyquist frequency).
    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let mut filter = BiquadFilter::new(44100, 1);
        filter.configure(FilterSettings {
            mode: FilterMode::Lowpass,
            frequency: 100.0,
        });

        let mut max_output = 0.0f32;
        for i in 0..2000 {
            let input = if i % 2 == 0 { 1.0 } else { -1.0 };
            let output = filter.process(0, input);
            if i > 100 {
                max_output = max_output.max(output.abs());
            }
        }
        assert!(max_output < 0.01, "expected attenuation, got {}", max_output);
    }

    /// DC is the lowest frequency there is; a high-pass must remove it.
    #[test]
    fn test_highpass_removes_dc() {
        let mut filter = BiquadFilter::new(44100, 1);
        filter.configure(FilterSettings {
            mode: FilterMode::Highpass,
            frequency: 1000.0,
        });

        let mut output = 0.0f32;
        for _ in 0..20000 {
            output = filter.process(0, 1.0);
        }
        assert!(output.abs() < 1e-3, "expected DC removal, got {}", output);
    }

    /// DC must pass a low-pass unchanged regardless of cutoff.
    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = BiquadFilter::new(44100, 1);
        filter.configure(FilterSettings {
            mode: FilterMode::Lowpass,
            frequency: 100.0,
        });

        let mut output = 0.0f32;
        for _ in 0..20000 {
            output = filter.process(0, 1.0);
        }
        assert!((output - 1.0).abs() < 1e-3, "expected ~1.0, got {}", output);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = BiquadFilter::new(44100, 2);
        filter.process(0, 1.0);
        filter.process(1, -1.0);
        filter.reset();

        // After reset the first output of a silent input is exactly silent
        assert_eq!(filter.process(0, 0.0), 0.0);
        assert_eq!(filter.process(1, 0.0), 0.0);
    }

    #[test]
    fn test_channels_filtered_independently() {
        let mut filter = BiquadFilter::new(44100, 2);
        filter.configure(FilterSettings {
            mode: FilterMode::Lowpass,
            frequency: 1000.0,
        });

        // Drive only channel 0; channel 1 must stay silent
        for _ in 0..100 {
            filter.process(0, 1.0);
        }
        assert_eq!(filter.process(1, 0.0), 0.0);
    }

    #[test]
    fn test_configure_clamps_frequency() {
        let mut filter = BiquadFilter::new(44100, 1);
        filter.configure(FilterSettings {
            mode: FilterMode::Lowpass,
            frequency: f64::NAN,
        });
        assert_eq!(filter.settings().frequency, 1000.0);
    }
}
