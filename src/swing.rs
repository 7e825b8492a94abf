//! Arm-swing locomotion estimator
//!
//! Turns the distance both hand controllers travel each tick into a
//! forward movement input in [0, 1], smoothed with a frame-rate independent
//! exponential filter.

use glam::{Vec2, Vec3};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::tracking::{PositionProvider, TrackedNode, TrackedPointSample};

/// Rate constant of the smoothing filter, scaled by `SwingConfig::smoothing`.
const SMOOTHING_RATE: f32 = 10.0;

/// Host-side contract for anything that produces a 2D movement input per tick.
pub trait MovementInputSource {
    fn read_input(&mut self, elapsed_seconds: f32) -> Vec2;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingConfig {
    max_speed: f32,
    speed_for_max_output: f32,
    smoothing: f32,
}

impl SwingConfig {
    pub const DEFAULT_MAX_SPEED: f32 = 3.0;
    pub const DEFAULT_SPEED_FOR_MAX_OUTPUT: f32 = 2.0;
    pub const DEFAULT_SMOOTHING: f32 = 0.15;

    pub fn new(max_speed: f32, speed_for_max_output: f32, smoothing: f32) -> Result<Self, ConfigError> {
        if !max_speed.is_finite() || max_speed < 0.0 {
            return Err(ConfigError::InvalidMaxSpeed(max_speed));
        }
        if !speed_for_max_output.is_finite() || speed_for_max_output <= 0.0 {
            return Err(ConfigError::InvalidSpeedForMaxOutput(speed_for_max_output));
        }
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(ConfigError::InvalidSmoothing(smoothing));
        }

        Ok(Self {
            max_speed,
            speed_for_max_output,
            smoothing,
        })
    }

    /// Forward speed in m/s the host should apply for `strength`.
    pub fn forward_speed(&self, strength: f32) -> f32 {
        strength.clamp(0.0, 1.0) * self.max_speed
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn speed_for_max_output(&self) -> f32 {
        self.speed_for_max_output
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            max_speed: Self::DEFAULT_MAX_SPEED,
            speed_for_max_output: Self::DEFAULT_SPEED_FOR_MAX_OUTPUT,
            smoothing: Self::DEFAULT_SMOOTHING,
        }
    }
}

pub struct ArmSwingEstimator<P> {
    provider: P,
    left_node: TrackedNode,
    right_node: TrackedNode,
    config: SwingConfig,
    left: TrackedPointSample,
    right: TrackedPointSample,
    smoothed_strength: f32,
}

impl<P: PositionProvider> ArmSwingEstimator<P> {
    pub fn new(provider: P, config: SwingConfig) -> Self {
        Self::with_nodes(provider, TrackedNode::LeftHand, TrackedNode::RightHand, config)
    }

    pub fn with_nodes(provider: P, left_node: TrackedNode, right_node: TrackedNode, config: SwingConfig) -> Self {
        Self {
            provider,
            left_node,
            right_node,
            config,
            left: TrackedPointSample::default(),
            right: TrackedPointSample::default(),
            smoothed_strength: 0.0,
        }
    }

    /// Advances the estimator by one tick and returns `(0, strength)`.
    ///
    /// Ticks must be fed in simulation order. A non-positive or non-finite
    /// `elapsed_seconds` counts as zero elapsed time.
    pub fn sample_movement_input(&mut self, elapsed_seconds: f32) -> Vec2 {
        let left_change = Self::sample_hand(&self.provider, self.left_node, &mut self.left);
        let right_change = Self::sample_hand(&self.provider, self.right_node, &mut self.right);

        let average_change = (left_change + right_change) * 0.5;

        let dt = if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
            elapsed_seconds
        } else {
            0.0
        };

        let speed_per_sec = if dt > 0.0 { average_change / dt } else { 0.0 };
        let normalized = (speed_per_sec / self.config.speed_for_max_output).clamp(0.0, 1.0);
        let target = response_curve(normalized);

        // smoothing = 0 leaves the output frozen; values near 1 approach an instant snap
        let blend = 1.0 - (-SMOOTHING_RATE * self.config.smoothing * dt).exp();
        self.smoothed_strength += (target - self.smoothed_strength) * blend;
        self.smoothed_strength = self.smoothed_strength.clamp(0.0, 1.0);

        trace!(
            left_change,
            right_change,
            speed_per_sec,
            target,
            strength = self.smoothed_strength,
            "arm swing tick"
        );

        Vec2::new(0.0, self.smoothed_strength)
    }

    fn sample_hand(provider: &P, node: TrackedNode, sample: &mut TrackedPointSample) -> f32 {
        let Some(position) = provider.try_get_position(node).filter(|p| p.is_finite()) else {
            return 0.0;
        };

        if !sample.has_prior {
            debug!(%node, ?position, "hand baseline established");
        }

        sample.advance(position)
    }

    pub fn strength(&self) -> f32 {
        self.smoothed_strength
    }

    pub fn left_sample(&self) -> &TrackedPointSample {
        &self.left
    }

    pub fn right_sample(&self) -> &TrackedPointSample {
        &self.right
    }

    pub fn nodes(&self) -> (TrackedNode, TrackedNode) {
        (self.left_node, self.right_node)
    }

    pub fn config(&self) -> &SwingConfig {
        &self.config
    }

    /// Replaces the configuration; hand samples and strength are kept.
    pub fn set_config(&mut self, config: SwingConfig) {
        self.config = config;
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}

impl<P: PositionProvider> MovementInputSource for ArmSwingEstimator<P> {
    fn read_input(&mut self, elapsed_seconds: f32) -> Vec2 {
        self.sample_movement_input(elapsed_seconds)
    }
}

/// Maps normalized swing speed to forward input. Linear for now.
fn response_curve(t: f32) -> f32 {
    t
}
