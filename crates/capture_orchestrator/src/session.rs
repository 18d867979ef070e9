//! A capture run written to disk: run directory, manifest, frames, report.

use std::path::{Path, PathBuf};

use capture_utils::{create_run_dir, write_manifest, write_report, DatasetRecorder};
use data_contracts::scene::SceneConfiguration;
use data_contracts::{RunManifest, RunManifestSchemaVersion, RunReport};
use sim_core::prelude::Simulator;
use tracing::{error, info};

use crate::runner::{unix_now, CaptureError, CaptureOptions, CaptureOrchestrator};

#[derive(Debug, Clone)]
pub struct SessionOutput {
    pub run_dir: PathBuf,
    pub report: RunReport,
}

/// Run `scenes` against `sim` into a new run directory under `output_root`.
///
/// The report is written even when the run halts on a write failure; the halt is still
/// returned as an error.
pub fn run_session<S: Simulator + ?Sized>(
    sim: &mut S,
    scenes: &[SceneConfiguration],
    options: CaptureOptions,
    output_root: &Path,
) -> Result<SessionOutput, CaptureError> {
    let started = unix_now();
    let run_dir = create_run_dir(output_root, started)?;
    let shots_per_pose = scenes.iter().map(|s| s.shots).max().unwrap_or(1).max(1);
    let manifest = RunManifest {
        schema_version: RunManifestSchemaVersion::V1,
        seed: options.seed,
        simulator: sim.name().to_string(),
        output_root: output_root.to_path_buf(),
        run_dir: run_dir.clone(),
        started_at_unix: started,
        scene_count: scenes.len(),
        shots_per_pose,
        max_captures: options.max_captures,
    };
    write_manifest(&run_dir, &manifest)?;
    info!(run_dir = %run_dir.display(), scenes = scenes.len(), "capture run started");

    let mut recorder = DatasetRecorder::new(&run_dir);
    let result = CaptureOrchestrator::new(sim, &mut recorder, options).run(scenes);
    match result {
        Ok(report) => {
            write_report(&run_dir, &report)?;
            Ok(SessionOutput { run_dir, report })
        }
        Err(CaptureError::WriteHalted {
            capture_id,
            source,
            report,
        }) => {
            if let Err(err) = write_report(&run_dir, &report) {
                error!(error = %err, "could not write report for halted run");
            }
            Err(CaptureError::WriteHalted {
                capture_id,
                source,
                report,
            })
        }
        Err(err) => Err(err),
    }
}
