//! Shared data contracts for capture runs, scene configurations, and label metadata.

pub mod capture;
pub mod manifest;
pub mod scene;

pub use capture::{
    CameraIntrinsics, CaptureFrame, CaptureMetadata, GroundTruthLabel, ObjectLabel,
    ValidationError,
};
pub use manifest::{RunManifest, RunManifestSchemaVersion, RunReport};
pub use scene::{
    quat_from_yaw, EnvironmentVariant, Lighting, ObjectClass, Pose, SceneConfiguration,
    TargetRef, TrafficLightState, Weather,
};
