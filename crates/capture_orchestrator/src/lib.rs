//! Capture orchestrator: turns sign targets into scene configurations and drives the
//! simulator through them, writing aligned frame/label pairs to the dataset store.

pub mod plan;
pub mod runner;
pub mod session;

pub use plan::{
    default_targets, orbit_pose, parse_list, plan_scenes, PlanConfig, PlanOutcome, TargetGroup,
};
pub use runner::{
    build_capture_metadata, CaptureError, CaptureOptions, CaptureOrchestrator, WriteFailurePolicy,
};
pub use session::{run_session, SessionOutput};
