use data_contracts::capture::{CameraIntrinsics, CaptureMetadata, ObjectLabel};
use data_contracts::scene::{Pose, SceneConfiguration, TargetRef};
use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("model '{0}' not found in world")]
    ModelNotFound(String),
    #[error("simulator rejected scene {scene_id}: {reason}")]
    Rejected { scene_id: u64, reason: String },
    #[error("sensor read failed: {0}")]
    Sensor(String),
    #[error("simulator unavailable: {0}")]
    Unavailable(String),
}

/// Result of advancing the simulator by one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStatus {
    pub tick: u64,
    pub sim_time: f64,
    /// True once the vehicle and scene are at rest after the last `apply`.
    pub settled: bool,
}

/// One camera observation.
#[derive(Debug, Clone)]
pub struct SensorFrame {
    pub tick: u64,
    pub sim_time: f64,
    /// Raw RGBA8, row-major, `size.0 * size.1 * 4` bytes.
    pub rgba: Vec<u8>,
    pub size: (u32, u32),
    pub intrinsics: CameraIntrinsics,
    pub sensor_pose: Pose,
}

/// Annotations read from simulator state.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruth {
    pub tick: u64,
    pub sim_time: f64,
    pub objects: Vec<ObjectLabel>,
}

/// Black-box simulator: scene control, stepping, sensor reads and ground-truth queries.
pub trait Simulator {
    fn name(&self) -> &str;
    /// World pose of a named model.
    fn model_pose(&mut self, model: &str) -> SimResult<Pose>;
    fn apply(&mut self, scene: &SceneConfiguration) -> SimResult<()>;
    fn step(&mut self) -> SimResult<SimStatus>;
    /// Latest camera frame at the current tick; does not advance time.
    fn capture_frame(&mut self) -> SimResult<SensorFrame>;
    /// Ground truth at the current tick; does not advance time.
    fn ground_truth(&mut self) -> SimResult<GroundTruth>;
}

/// Data passed to a recorder sink: validated label metadata plus the raw pixels it describes.
#[derive(Debug)]
pub struct FrameRecord<'a> {
    pub metadata: &'a CaptureMetadata,
    pub rgba: &'a [u8],
}

/// Persists frame/label pairs to a sink (disk, stream, etc).
pub trait Recorder {
    /// Relative image path the next capture of `target` will be stored under.
    /// Only a successful `record` advances it, so failed writes leave no gaps in the numbering.
    fn next_image_path(&self, target: &TargetRef) -> String;
    fn record(&mut self, record: &FrameRecord) -> std::io::Result<()>;
}
