// Playback state
// A tagged union: the live source only exists inside `Playing`, so code
// running while stopped cannot touch it.

use crate::audio::chain::SourceControl;
use crate::player::clock::PlaybackClock;

/// Exactly one of these holds at any time.
pub enum PlaybackState {
    /// Frozen cursor, nothing audible
    Stopped { position_ms: f64 },
    /// A live source is emitting; position is derived from the clock
    Playing {
        clock: PlaybackClock,
        source: Box<dyn SourceControl>,
    },
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing { .. })
    }
}

/// Value handed to rendering code; carries no live resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackSnapshot {
    Stopped { position_ms: f64 },
    Playing { position_ms: f64 },
}

impl PlaybackSnapshot {
    pub fn position_ms(&self) -> f64 {
        match self {
            PlaybackSnapshot::Stopped { position_ms } => *position_ms,
            PlaybackSnapshot::Playing { position_ms } => *position_ms,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackSnapshot::Playing { .. })
    }
}
