//! Arm-swing locomotion input for VR movement systems.
//!
//! [`swing::ArmSwingEstimator`] turns the swinging of two tracked hands into
//! a forward movement input. Positions come from any
//! [`tracking::PositionProvider`]; the OSC modules bridge it to a VR client.

pub mod error;
pub mod osc_sender;
pub mod osc_server;
pub mod settings;
pub mod swing;
pub mod tracking;

pub use error::{ConfigError, SettingsError};
pub use swing::{ArmSwingEstimator, MovementInputSource, SwingConfig};
pub use tracking::{PositionProvider, TrackedNode, TrackedPointSample};
