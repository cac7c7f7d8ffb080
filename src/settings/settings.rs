// Audio settings management and persistence
// One JSON file per user under the data directory. Values are clamped on
// every load and save so out-of-range numbers never reach the audio
// graph, whatever is on disk.

use crate::audio::filter::FilterSettings;
use crate::player::player::{MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Playback preferences persisted per user
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    pub playback_speed: f64,
    pub filter: FilterSettings,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            playback_speed: 1.0,
            filter: FilterSettings::default(),
        }
    }
}

impl AudioSettings {
    /// Settings file path for a user
    pub fn settings_path(data_dir: &Path, user_id: &str) -> PathBuf {
        data_dir.join(format!("{}.json", user_id))
    }

    /// Load settings for a user, or defaults if no file exists
    pub fn load(data_dir: &Path, user_id: &str) -> Result<Self, String> {
        let path = Self::settings_path(data_dir, user_id);

        if !path.exists() {
            eprintln!("[Settings] No settings file for {}, using defaults", user_id);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings file: {}", e))?;

        let settings: AudioSettings = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse settings: {}", e))?;

        Ok(settings.clamped())
    }

    /// Save settings for a user
    pub fn save(&self, data_dir: &Path, user_id: &str) -> Result<(), String> {
        fs::create_dir_all(data_dir)
            .map_err(|e| format!("Failed to create settings directory: {}", e))?;

        let path = Self::settings_path(data_dir, user_id);
        let content = serde_json::to_string_pretty(&self.clamped())
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        eprintln!("[Settings] Saved settings to {:?}", path);
        Ok(())
    }

    /// Copy with every value forced into its legal range
    pub fn clamped(&self) -> Self {
        let playback_speed = if self.playback_speed.is_finite() {
            self.playback_speed.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
        } else {
            1.0
        };
        Self {
            playback_speed,
            filter: self.filter.clamped(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::filter::FilterMode;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AudioSettings::load(dir.path(), "nobody").unwrap();
        assert_eq!(settings, AudioSettings::default());
        assert_eq!(settings.playback_speed, 1.0);
        assert_eq!(settings.filter.mode, FilterMode::Lowpass);
        assert_eq!(settings.filter.frequency, 1000.0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = AudioSettings {
            playback_speed: 1.5,
            filter: FilterSettings {
                mode: FilterMode::Highpass,
                frequency: 250.0,
            },
        };

        settings.save(dir.path(), "user-1").unwrap();
        let loaded = AudioSettings::load(dir.path(), "user-1").unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_users_do_not_share_files() {
        let dir = tempfile::tempdir().unwrap();
        let fast = AudioSettings {
            playback_speed: 2.0,
            ..AudioSettings::default()
        };
        fast.save(dir.path(), "user-a").unwrap();

        let other = AudioSettings::load(dir.path(), "user-b").unwrap();
        assert_eq!(other, AudioSettings::default());
    }

    #[test]
    fn test_persisted_format_is_stable() {
        let json = serde_json::to_value(AudioSettings::default()).unwrap();
        assert_eq!(json["playbackSpeed"], 1.0);
        assert_eq!(json["filter"]["type"], "lowpass");
        assert_eq!(json["filter"]["frequency"], 1000.0);
    }

    #[test]
    fn test_out_of_range_values_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = AudioSettings::settings_path(dir.path(), "user-x");
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(
            &path,
            r#"{"playbackSpeed": 9.0, "filter": {"type": "highpass", "frequency": 999999}}"#,
        )
        .unwrap();

        let loaded = AudioSettings::load(dir.path(), "user-x").unwrap();
        assert_eq!(loaded.playback_speed, 2.0);
        assert_eq!(loaded.filter.frequency, 20_000.0);
        assert_eq!(loaded.filter.mode, FilterMode::Highpass);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = AudioSettings::settings_path(dir.path(), "user-y");
        std::fs::write(&path, "not json at all").unwrap();

        assert!(AudioSettings::load(dir.path(), "user-y").is_err());
    }
}
