//! Journey configuration
//!
//! Loaded from a RON file next to the binary. Every field has a default, so a
//! partial file (or none at all) is fine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::engine::DEFAULT_FADE_OUT_SECS;
use crate::audio::GraphLevels;
use crate::error::ConfigError;
use crate::journey::flight::DEFAULT_FLIGHT_SECS;
use crate::journey::DEFAULT_TRANSITION_DELAY;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "journey.ron";

/// Storage key holding the current stage
pub const DEFAULT_STORAGE_KEY: &str = "pipino-air-stage";

/// Background track for the flight stage
pub const DEFAULT_BACKGROUND_TRACK: &str = "assets/audio/flight.mp3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyConfig {
    pub storage_key: String,
    /// Seconds between a stage request and the committed change
    pub transition_delay_secs: f64,
    /// URL or local path of the flight's background track
    pub background_track: Option<String>,
    pub effects_gain: f32,
    pub ambient_gain: f32,
    pub music_gain: f32,
    pub master_gain: f32,
    pub fade_out_secs: f64,
    pub flight_duration_secs: f64,
    /// Off: run silently through a headless output
    pub audio_enabled: bool,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        let levels = GraphLevels::default();
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            transition_delay_secs: DEFAULT_TRANSITION_DELAY,
            background_track: Some(DEFAULT_BACKGROUND_TRACK.to_string()),
            effects_gain: levels.effects,
            ambient_gain: levels.ambient,
            music_gain: levels.music,
            master_gain: levels.master,
            fade_out_secs: DEFAULT_FADE_OUT_SECS,
            flight_duration_secs: DEFAULT_FLIGHT_SECS,
            audio_enabled: true,
        }
    }
}

impl JourneyConfig {
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Load `path`, falling back to defaults if it is missing or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .indentor("  ".to_string());
        let ron_string = ron::ser::to_string_pretty(self, config)?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    /// Bus and master levels for the mixing graph
    pub fn levels(&self) -> GraphLevels {
        GraphLevels {
            effects: self.effects_gain,
            ambient: self.ambient_gain,
            music: self.music_gain,
            master: self.master_gain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = JourneyConfig::default();
        assert_eq!(config.storage_key, "pipino-air-stage");
        assert_eq!(config.transition_delay_secs, 0.4);
        assert_eq!(config.fade_out_secs, 1.0);
        assert_eq!(config.flight_duration_secs, 60.0);
        assert!(config.audio_enabled);
        assert_eq!(config.levels(), GraphLevels::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = JourneyConfig::from_ron("(transition_delay_secs: 0.1, music_gain: 0.25)").unwrap();
        assert_eq!(config.transition_delay_secs, 0.1);
        assert_eq!(config.music_gain, 0.25);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.ambient_gain, 0.3);
    }

    #[test]
    fn test_background_track_can_be_disabled() {
        let config = JourneyConfig::from_ron("(background_track: None)").unwrap();
        assert_eq!(config.background_track, None);
    }

    #[test]
    fn test_invalid_ron_is_parse_error() {
        let err = JourneyConfig::from_ron("(transition_delay_secs: \"soon\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journey.ron");

        let config = JourneyConfig {
            storage_key: "other-key".to_string(),
            flight_duration_secs: 12.5,
            audio_enabled: false,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(JourneyConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.ron");
        assert_eq!(JourneyConfig::load_or_default(&missing), JourneyConfig::default());

        let broken = dir.path().join("broken.ron");
        fs::write(&broken, "(((").unwrap();
        assert_eq!(JourneyConfig::load_or_default(&broken), JourneyConfig::default());
    }
}
