use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("controller speed for max output must be a positive finite number, got {0}")]
    InvalidSpeedForMaxOutput(f32),

    #[error("max speed must be a non-negative finite number, got {0}")]
    InvalidMaxSpeed(f32),

    #[error("smoothing must be within [0, 1], got {0}")]
    InvalidSmoothing(f32),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("malformed settings file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
