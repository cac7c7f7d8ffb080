// Playback state machine
// Owns every transition between stopped and playing. Sources are
// fire-once, so resuming, seeking while playing, and rate or filter
// changes all stop the old source and build a new one starting from the
// captured position.

use crate::audio::buffer::SampleBuffer;
use crate::audio::chain::SignalChain;
use crate::audio::filter::FilterSettings;
use crate::player::clock::PlaybackClock;
use crate::player::state::{PlaybackSnapshot, PlaybackState};
use crate::settings::AudioSettings;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;

pub const MIN_PLAYBACK_RATE: f64 = 0.5;
pub const MAX_PLAYBACK_RATE: f64 = 2.0;

type SettingsListener = Box<dyn FnMut(&AudioSettings) + Send>;

/// Drives a signal chain through play/pause/stop/seek and keeps the
/// externally observable state consistent with what is audible.
///
/// Without a loaded buffer, play and seek are no-ops rather than errors;
/// the host may still be waiting on a decode.
pub struct Player {
    chain: Box<dyn SignalChain>,
    buffer: Option<Arc<SampleBuffer>>,
    state: PlaybackState,
    rate: f64,
    filter: FilterSettings,
    filter_enabled: bool,
    settings_listener: Option<SettingsListener>,
}

impl Player {
    pub fn new(chain: Box<dyn SignalChain>) -> Self {
        Self {
            chain,
            buffer: None,
            state: PlaybackState::Stopped { position_ms: 0.0 },
            rate: 1.0,
            filter: FilterSettings::default(),
            filter_enabled: false,
            settings_listener: None,
        }
    }

    /// Adopt persisted preferences. The filter configuration is stored
    /// but stays out of the chain until the user first touches it.
    pub fn apply_settings(&mut self, settings: &AudioSettings) {
        let settings = settings.clamped();
        self.rate = settings.playback_speed;
        self.filter = settings.filter;
    }

    /// Register the save-request sink invoked on every user-driven rate
    /// or filter change.
    pub fn set_settings_listener(&mut self, listener: SettingsListener) {
        self.settings_listener = Some(listener);
    }

    /// Current preferences as they would be persisted
    pub fn settings(&self) -> AudioSettings {
        AudioSettings {
            playback_speed: self.rate,
            filter: self.filter,
        }
    }

    /// Install a decoded buffer, replacing any current one.
    /// Any live source is stopped first; the cursor rewinds to zero.
    pub fn load(&mut self, buffer: Arc<SampleBuffer>) {
        if let PlaybackState::Playing { source, .. } = &mut self.state {
            source.stop();
        }
        self.buffer = Some(buffer);
        self.state = PlaybackState::Stopped { position_ms: 0.0 };
    }

    /// Begin emitting from the stopped cursor. A second play while
    /// already playing is ignored; double-starting a source would leave
    /// an unreachable one audible.
    pub fn play(&mut self) -> Result<()> {
        let Some(buffer) = self.buffer.clone() else {
            return Ok(());
        };
        let position_ms = match &self.state {
            PlaybackState::Playing { .. } => return Ok(()),
            PlaybackState::Stopped { position_ms } => *position_ms,
        };

        let source = self
            .chain
            .start(buffer, self.rate, self.active_filter(), position_ms)?;
        self.state = PlaybackState::Playing {
            clock: PlaybackClock::anchored(position_ms, self.rate, Instant::now()),
            source,
        };
        Ok(())
    }

    /// Freeze the cursor where the clock reads now.
    pub fn pause(&mut self) {
        let now = Instant::now();
        let previous =
            std::mem::replace(&mut self.state, PlaybackState::Stopped { position_ms: 0.0 });
        match previous {
            PlaybackState::Playing { clock, mut source } => {
                source.stop();
                let position_ms = self.clamp_position(clock.position_ms(now));
                self.state = PlaybackState::Stopped { position_ms };
            }
            stopped => self.state = stopped,
        }
    }

    /// Halt playback and rewind to zero, playing or not.
    pub fn stop(&mut self) {
        if let PlaybackState::Playing { source, .. } = &mut self.state {
            source.stop();
        }
        self.state = PlaybackState::Stopped { position_ms: 0.0 };
    }

    /// Move the cursor. While playing this swaps in a new source at the
    /// target so the jump is seamless; while stopped it just moves the
    /// frozen cursor. Targets outside the buffer are clamped.
    pub fn seek(&mut self, target_ms: f64) -> Result<()> {
        let Some(duration) = self.duration_ms() else {
            return Ok(());
        };
        if !target_ms.is_finite() {
            return Ok(());
        }
        let target = target_ms.clamp(0.0, duration);

        if self.state.is_playing() {
            self.restart_at(target)
        } else {
            self.state = PlaybackState::Stopped { position_ms: target };
            Ok(())
        }
    }

    /// Change playback speed, clamped to [0.5, 2.0]. While playing, the
    /// chain is rebuilt from the captured position so the displayed
    /// position stays continuous across the change.
    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() {
            return Ok(());
        }
        self.rate = rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);

        let result = if self.state.is_playing() {
            let position_ms = self.position_ms();
            self.restart_at(position_ms)
        } else {
            Ok(())
        };
        self.notify_settings();
        result
    }

    /// Change the filter. The first call wires the filter stage into the
    /// chain; while playing, the chain is rebuilt from the captured
    /// position with the new response.
    pub fn set_filter(&mut self, filter: FilterSettings) -> Result<()> {
        self.filter = filter.clamped();
        self.filter_enabled = true;

        let result = if self.state.is_playing() {
            let position_ms = self.position_ms();
            self.restart_at(position_ms)
        } else {
            Ok(())
        };
        self.notify_settings();
        result
    }

    /// Drive the session gain stage
    pub fn set_volume(&mut self, volume: f32) {
        self.chain.set_gain(volume);
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Duration of the loaded buffer, if any
    pub fn duration_ms(&self) -> Option<f64> {
        self.buffer.as_ref().map(|b| b.duration_ms())
    }

    /// Current position; the clock is only consulted while playing
    pub fn position_ms(&self) -> f64 {
        self.position_ms_at(Instant::now())
    }

    pub fn position_ms_at(&self, now: Instant) -> f64 {
        match &self.state {
            PlaybackState::Stopped { position_ms } => *position_ms,
            PlaybackState::Playing { clock, .. } => self.clamp_position(clock.position_ms(now)),
        }
    }

    /// Resource-free view of the state for rendering
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> PlaybackSnapshot {
        match &self.state {
            PlaybackState::Stopped { position_ms } => PlaybackSnapshot::Stopped {
                position_ms: *position_ms,
            },
            PlaybackState::Playing { .. } => PlaybackSnapshot::Playing {
                position_ms: self.position_ms_at(now),
            },
        }
    }

    /// Stop the old source and start a new one at `position_ms` with the
    /// current rate and filter. Only called while playing. If the chain
    /// refuses the new source, the player is left stopped at the target
    /// position rather than leaking the old source.
    fn restart_at(&mut self, position_ms: f64) -> Result<()> {
        let Some(buffer) = self.buffer.clone() else {
            return Ok(());
        };
        let previous =
            std::mem::replace(&mut self.state, PlaybackState::Stopped { position_ms });
        if let PlaybackState::Playing { mut source, .. } = previous {
            source.stop();
        }

        let source = self
            .chain
            .start(buffer, self.rate, self.active_filter(), position_ms)?;
        self.state = PlaybackState::Playing {
            clock: PlaybackClock::anchored(position_ms, self.rate, Instant::now()),
            source,
        };
        Ok(())
    }

    fn active_filter(&self) -> Option<FilterSettings> {
        self.filter_enabled.then_some(self.filter)
    }

    fn clamp_position(&self, position_ms: f64) -> f64 {
        match self.duration_ms() {
            Some(duration) => position_ms.clamp(0.0, duration),
            None => position_ms.max(0.0),
        }
    }

    fn notify_settings(&mut self) {
        if let Some(listener) = self.settings_listener.as_mut() {
            let settings = AudioSettings {
                playback_speed: self.rate,
                filter: self.filter,
            };
            listener(&settings);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // Tearing down the player must never leave a source audible
        if let PlaybackState::Playing { source, .. } = &mut self.state {
            source.stop();
        }
    }
}
