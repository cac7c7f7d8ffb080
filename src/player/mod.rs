// Playback control core
// State machine, clock model, and position display driver

pub mod clock;
pub mod player;
pub mod progress;
pub mod state;

pub use clock::PlaybackClock;
pub use player::Player;
pub use progress::{PositionTicker, ProgressBar};
pub use state::{PlaybackSnapshot, PlaybackState};
