use std::path::{Path, PathBuf};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SettingsError;
use crate::swing::SwingConfig;
use crate::tracking::TrackedNode;

lazy_static! {
    pub static ref SETTINGS_PATH: PathBuf = {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default()
            .join("settings.json")
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub left_hand_node: TrackedNode,
    pub right_hand_node: TrackedNode,
    pub max_speed: f32,
    pub controller_speed_for_max_speed: f32,
    pub smoothing: f32,
    pub listen_port: u16,
    pub position_prefix: String,
    pub stale_after_ms: u64,
    pub output_enabled: bool,
    pub output_target: String,
    pub output_address: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            left_hand_node: TrackedNode::LeftHand,
            right_hand_node: TrackedNode::RightHand,
            max_speed: SwingConfig::DEFAULT_MAX_SPEED,
            controller_speed_for_max_speed: SwingConfig::DEFAULT_SPEED_FOR_MAX_OUTPUT,
            smoothing: SwingConfig::DEFAULT_SMOOTHING,
            listen_port: 9001,
            position_prefix: "/tracking/trackers".into(),
            stale_after_ms: 500,
            output_enabled: true,
            output_target: "127.0.0.1:9000".into(),
            output_address: "/input/Vertical".into(),
        }
    }
}

impl Settings {
    pub fn swing_config(&self) -> Result<SwingConfig, SettingsError> {
        Ok(SwingConfig::new(self.max_speed, self.controller_speed_for_max_speed, self.smoothing)?)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        self.save_to(&SETTINGS_PATH)
    }

    pub fn load_or_default() -> Result<Self, SettingsError> {
        Self::load_from(&SETTINGS_PATH)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let settings = serde_json::to_string_pretty(&self)?;
        std::fs::write(path, settings)?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let settings = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&settings)?;
        settings.swing_config()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings {
            left_hand_node: TrackedNode::GameController,
            smoothing: 0.4,
            listen_port: 9100,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "smoothing": 0.5, "right_hand_node": "hardware_tracker" }"#).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.smoothing, 0.5);
        assert_eq!(loaded.right_hand_node, TrackedNode::HardwareTracker);
        assert_eq!(loaded.listen_port, 9001);
        assert_eq!(loaded.output_address, "/input/Vertical");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "controller_speed_for_max_speed": 0.0 }"#).unwrap();

        match Settings::load_from(&path) {
            Err(SettingsError::Config(ConfigError::InvalidSpeedForMaxOutput(_))) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn test_swing_config_uses_settings() {
        let settings = Settings {
            max_speed: 4.0,
            controller_speed_for_max_speed: 1.5,
            smoothing: 0.25,
            ..Default::default()
        };
        let config = settings.swing_config().unwrap();
        assert_eq!(config.max_speed(), 4.0);
        assert_eq!(config.speed_for_max_output(), 1.5);
        assert_eq!(config.smoothing(), 0.25);
    }
}
