//! Simulator-facing interfaces for the capture pipeline, plus the in-process twin backend.

pub mod camera;
pub mod interfaces;
pub mod settle;
pub mod twin;
pub mod world;

pub mod prelude {
    pub use crate::camera::CameraRig;
    pub use crate::interfaces::{
        FrameRecord, GroundTruth, Recorder, SensorFrame, SimError, SimResult, SimStatus,
        Simulator,
    };
    pub use crate::settle::{wait_for_settle, SettleError, SettleOutcome, SettlePolicy};
    pub use crate::twin::TwinSim;
    pub use crate::world::{SignModel, TrackWorld};
}
