// Per-user preference persistence

pub mod settings;

pub use settings::AudioSettings;
