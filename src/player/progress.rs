// Position display driver
// Keeps a rendered progress indicator in step with the playback clock.
// While playing, the position is re-derived from the clock on a display
// cadence; while stopped, the frozen cursor is shown as-is.

use crate::player::player::Player;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// ~60 Hz, one update per typical display refresh
pub const DISPLAY_REFRESH_INTERVAL: Duration = Duration::from_millis(16);

/// Format milliseconds as m:ss
pub fn format_millis(time_ms: f64) -> String {
    let total_seconds = (time_ms.max(0.0) / 1000.0).floor() as u64;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Model behind a seek bar: the displayed position, the fill fraction,
/// and the pointer math for committing seeks and previewing hover times.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    total_ms: f64,
    displayed_ms: f64,
    hover_ms: Option<f64>,
}

impl ProgressBar {
    pub fn new(total_ms: f64) -> Self {
        Self {
            total_ms: total_ms.max(0.0),
            displayed_ms: 0.0,
            hover_ms: None,
        }
    }

    /// Pull the current position from the player. Call once per frame
    /// while visible; when the player is stopped this reads the frozen
    /// cursor without touching the clock.
    pub fn refresh(&mut self, player: &Player, now: Instant) {
        self.displayed_ms = player.position_ms_at(now);
    }

    pub fn displayed_ms(&self) -> f64 {
        self.displayed_ms
    }

    /// Fill fraction in [0, 1]; a position past the end pins at 1
    pub fn fraction(&self) -> f64 {
        if self.total_ms <= 0.0 {
            return 0.0;
        }
        (self.displayed_ms / self.total_ms).clamp(0.0, 1.0)
    }

    /// Map a pointer offset (fraction of the bar width) to a time.
    /// This computes the target only; committing it is the state
    /// machine's seek transition.
    pub fn seek_target(&self, fraction: f64) -> f64 {
        if !fraction.is_finite() {
            return 0.0;
        }
        fraction.clamp(0.0, 1.0) * self.total_ms
    }

    /// Record a hover preview without committing a seek
    pub fn hover(&mut self, fraction: f64) -> f64 {
        let time_ms = self.seek_target(fraction);
        self.hover_ms = Some(time_ms);
        time_ms
    }

    pub fn clear_hover(&mut self) {
        self.hover_ms = None;
    }

    pub fn hover_ms(&self) -> Option<f64> {
        self.hover_ms
    }

    pub fn position_label(&self) -> String {
        format_millis(self.displayed_ms)
    }

    pub fn total_label(&self) -> String {
        format_millis(self.total_ms)
    }
}

/// Polls the playback position on a display cadence and hands it to a
/// callback, but only while the player is playing. The polling thread is
/// joined on drop, so no callback can fire after teardown.
pub struct PositionTicker {
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PositionTicker {
    pub fn spawn<F>(player: Arc<Mutex<Player>>, interval: Duration, mut on_position: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop_flag);

        let thread = std::thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                let position = {
                    let player = player.lock();
                    player.is_playing().then(|| player.position_ms())
                };
                if let Some(position_ms) = position {
                    on_position(position_ms);
                }
                std::thread::sleep(interval);
            }
        });

        Self {
            stop_flag,
            thread: Some(thread),
        }
    }

    /// Stop the polling thread and wait for it to exit
    pub fn cancel(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PositionTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0.0), "0:00");
        assert_eq!(format_millis(59_999.0), "0:59");
        assert_eq!(format_millis(61_000.0), "1:01");
        assert_eq!(format_millis(600_000.0), "10:00");
        assert_eq!(format_millis(-5.0), "0:00");
    }

    #[test]
    fn test_seek_target_scales_and_clamps() {
        let bar = ProgressBar::new(120_000.0);
        assert_eq!(bar.seek_target(0.5), 60_000.0);
        assert_eq!(bar.seek_target(1.5), 120_000.0);
        assert_eq!(bar.seek_target(-0.2), 0.0);
        assert_eq!(bar.seek_target(f64::NAN), 0.0);
    }

    #[test]
    fn test_hover_preview_is_independent() {
        let mut bar = ProgressBar::new(100_000.0);
        assert_eq!(bar.hover_ms(), None);

        let preview = bar.hover(0.25);
        assert_eq!(preview, 25_000.0);
        assert_eq!(bar.hover_ms(), Some(25_000.0));
        // Hovering never moves the displayed position
        assert_eq!(bar.displayed_ms(), 0.0);

        bar.clear_hover();
        assert_eq!(bar.hover_ms(), None);
    }

    #[test]
    fn test_fraction_pins_at_full() {
        let mut bar = ProgressBar::new(1000.0);
        bar.displayed_ms = 2500.0;
        assert_eq!(bar.fraction(), 1.0);

        bar.displayed_ms = 250.0;
        assert_eq!(bar.fraction(), 0.25);
    }

    #[test]
    fn test_zero_length_bar_has_no_fill() {
        let bar = ProgressBar::new(0.0);
        assert_eq!(bar.fraction(), 0.0);
        assert_eq!(bar.seek_target(0.7), 0.0);
    }
}
