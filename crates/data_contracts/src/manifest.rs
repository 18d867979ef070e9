use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunManifestSchemaVersion {
    V1,
}

/// Written once when a capture run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: RunManifestSchemaVersion,
    pub seed: u64,
    pub simulator: String,
    pub output_root: PathBuf,
    pub run_dir: PathBuf,
    pub started_at_unix: f64,
    pub scene_count: usize,
    pub shots_per_pose: u32,
    pub max_captures: Option<u32>,
}

impl RunManifest {
    pub fn validate(&self) -> Result<(), String> {
        if self.started_at_unix.is_nan() || self.started_at_unix < 0.0 {
            return Err("started_at_unix must be non-negative".into());
        }
        if self.shots_per_pose == 0 {
            return Err("shots_per_pose must be at least 1".into());
        }
        if let Some(max) = self.max_captures {
            if max == 0 {
                return Err("max_captures cannot be zero".into());
            }
        }
        Ok(())
    }
}

/// Outcome counters for a capture run; written once when the run ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenes handed to the run. Once a run completes this equals the sum of the five
    /// scene outcome counters; a halted run leaves the halting scene and the rest uncounted.
    pub scenes_total: usize,
    pub scenes_captured: usize,
    /// Scenes that never settled within the step bound.
    pub scenes_incomplete: usize,
    /// Scenes the simulator refused to apply.
    pub scenes_failed: usize,
    /// Scenes that settled but stored no frame (every shot failed or was discarded).
    #[serde(default)]
    pub scenes_empty: usize,
    /// Scenes not attempted because `max_captures` was reached.
    #[serde(default)]
    pub scenes_skipped: usize,
    pub frames_written: usize,
    pub misaligned: usize,
    pub sensor_failures: usize,
    pub write_failures: usize,
    pub halted: bool,
    pub incomplete_scene_ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> RunManifest {
        RunManifest {
            schema_version: RunManifestSchemaVersion::V1,
            seed: 7,
            simulator: "twin".into(),
            output_root: PathBuf::from("dataset"),
            run_dir: PathBuf::from("dataset/run_1"),
            started_at_unix: 1.0,
            scene_count: 3,
            shots_per_pose: 1,
            max_captures: None,
        }
    }

    #[test]
    fn manifest_validation_rules() {
        assert!(manifest().validate().is_ok());
        let mut m = manifest();
        m.max_captures = Some(0);
        assert!(m.validate().is_err());
        let mut m = manifest();
        m.shots_per_pose = 0;
        assert!(m.validate().is_err());
        let mut m = manifest();
        m.started_at_unix = f64::NAN;
        assert!(m.validate().is_err());
    }
}
