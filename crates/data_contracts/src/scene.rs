use serde::{Deserialize, Serialize};
use std::fmt;

/// World-frame pose: position in metres (z up) and orientation quaternion `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Pose {
    /// Yaw-only pose (rotation about world z).
    pub fn from_yaw(position: [f64; 3], yaw: f64) -> Self {
        Self {
            position,
            orientation: quat_from_yaw(yaw),
        }
    }

    pub fn yaw(&self) -> f64 {
        let [x, y, z, w] = self.orientation;
        let siny_cosp = 2.0 * (w * z + x * y);
        let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Quaternion for a pure yaw rotation: `z = sin(yaw/2)`, `w = cos(yaw/2)`.
pub fn quat_from_yaw(yaw: f64) -> [f64; 4] {
    let half = yaw * 0.5;
    [0.0, 0.0, half.sin(), half.cos()]
}

/// Ground-truth object classes. The serialized name doubles as the dataset sub-directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectClass {
    Stop,
    Parking,
    TrafficLight,
}

impl ObjectClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectClass::Stop => "STOP",
            ObjectClass::Parking => "PARKING",
            ObjectClass::TrafficLight => "TRAFFIC_LIGHT",
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lighting {
    #[default]
    Day,
    Dusk,
    Night,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Clear,
    Fog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
}

/// Environment variation applied alongside the vehicle pose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentVariant {
    pub lighting: Lighting,
    pub weather: Weather,
    pub traffic_light: Option<TrafficLightState>,
}

/// The sign model a scene is framed around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub class: ObjectClass,
    pub model: String,
}

/// Parameter set issued to the simulator before a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfiguration {
    pub scene_id: u64,
    pub target: TargetRef,
    pub vehicle_pose: Pose,
    pub environment: EnvironmentVariant,
    /// Number of captures requested once the scene has settled.
    pub shots: u32,
}
