use std::fmt;
use std::str::FromStr;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Named tracked input source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TrackedNode {
    Head,
    LeftHand,
    RightHand,
    GameController,
    HardwareTracker,
}

impl TrackedNode {
    pub const ALL: [TrackedNode; 5] = [
        TrackedNode::Head,
        TrackedNode::LeftHand,
        TrackedNode::RightHand,
        TrackedNode::GameController,
        TrackedNode::HardwareTracker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedNode::Head => "head",
            TrackedNode::LeftHand => "left_hand",
            TrackedNode::RightHand => "right_hand",
            TrackedNode::GameController => "game_controller",
            TrackedNode::HardwareTracker => "hardware_tracker",
        }
    }
}

impl fmt::Display for TrackedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown tracked node '{0}'")]
pub struct UnknownNode(pub String);

impl FromStr for TrackedNode {
    type Err = UnknownNode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackedNode::ALL
            .into_iter()
            .find(|node| node.as_str() == s)
            .ok_or_else(|| UnknownNode(s.to_string()))
    }
}

/// Source of world-space positions for tracked nodes.
///
/// Implementations return `None` when the device is absent or its data is
/// not currently valid; they must never panic for a missing node.
pub trait PositionProvider {
    fn try_get_position(&self, node: TrackedNode) -> Option<Vec3>;
}

/// Last known position of one tracked point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackedPointSample {
    pub last_position: Vec3,
    pub has_prior: bool,
}

impl TrackedPointSample {
    /// Records `position` and returns the distance travelled since the
    /// previous sample (zero for the first one).
    pub fn advance(&mut self, position: Vec3) -> f32 {
        let displacement = if self.has_prior {
            self.last_position.distance(position)
        } else {
            0.0
        };

        self.last_position = position;
        self.has_prior = true;
        displacement
    }
}
