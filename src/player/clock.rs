// Playback clock
// Derives the current position from a wall-clock anchor instead of a
// continuously updated position variable. Rate changes never rescale
// time that has already elapsed; callers re-anchor at the moment of the
// change so the position stays continuous.

use std::time::Instant;

/// Wall-clock anchor for a playing source.
///
/// The clock reads `origin_ms` at the anchor instant and advances by
/// `rate` buffer-milliseconds per wall-millisecond from there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    anchor: Instant,
    origin_ms: f64,
    rate: f64,
}

impl PlaybackClock {
    /// Clock that reads `position_ms` at `now` and advances at `rate`.
    pub fn anchored(position_ms: f64, rate: f64, now: Instant) -> Self {
        Self {
            anchor: now,
            origin_ms: position_ms,
            rate,
        }
    }

    /// Playback position at the given instant
    pub fn position_ms(&self, now: Instant) -> f64 {
        let elapsed_ms = now.saturating_duration_since(self.anchor).as_secs_f64() * 1000.0;
        self.origin_ms + elapsed_ms * self.rate
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Re-anchor at a new rate without moving the current position
    pub fn with_rate(&self, rate: f64, now: Instant) -> Self {
        Self::anchored(self.position_ms(now), rate, now)
    }
}
