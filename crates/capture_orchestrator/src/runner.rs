use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use data_contracts::capture::{CaptureFrame, CaptureMetadata, GroundTruthLabel};
use data_contracts::scene::SceneConfiguration;
use data_contracts::RunReport;
use sim_core::prelude::{
    wait_for_settle, FrameRecord, GroundTruth, Recorder, SensorFrame, SettleError, SettlePolicy,
    SimError, Simulator,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// What to do when the dataset store rejects a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteFailurePolicy {
    /// Stop the run and surface the error.
    #[default]
    Halt,
    /// Log, count, and move on to the next shot.
    Skip,
}

impl FromStr for WriteFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(Self::Halt),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown write failure policy '{other}' (halt|skip)")),
        }
    }
}

impl fmt::Display for WriteFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Halt => "halt",
            Self::Skip => "skip",
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    pub settle: SettlePolicy,
    pub write_failure: WriteFailurePolicy,
    pub max_captures: Option<u32>,
    /// Recorded in every label for provenance.
    pub seed: u64,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("sensor preflight failed: {0}")]
    SensorUnavailable(#[source] SimError),
    #[error("write failed for capture {capture_id}; run halted")]
    WriteHalted {
        capture_id: u64,
        #[source]
        source: io::Error,
        report: Box<RunReport>,
    },
    #[error("dataset io: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneOutcome {
    Captured,
    Empty,
    Incomplete,
    Failed,
}

pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Assemble the persisted label document for an aligned frame/ground-truth pair.
pub fn build_capture_metadata(
    scene: &SceneConfiguration,
    capture_id: u64,
    seed: u64,
    unix_time: f64,
    image: String,
    frame: &SensorFrame,
    ground_truth: GroundTruth,
) -> CaptureMetadata {
    CaptureMetadata {
        capture_id,
        scene_id: scene.scene_id,
        seed,
        unix_time,
        target: scene.target.clone(),
        environment: scene.environment,
        frame: CaptureFrame {
            capture_id,
            tick: frame.tick,
            sim_time: frame.sim_time,
            image,
            image_present: true,
            size: frame.size,
            intrinsics: frame.intrinsics,
            sensor_pose: frame.sensor_pose,
        },
        ground_truth: GroundTruthLabel {
            capture_id,
            tick: ground_truth.tick,
            sim_time: ground_truth.sim_time,
            objects: ground_truth.objects,
        },
    }
}

/// Drives one simulator through a sequence of scenes, sequentially, into one recorder.
pub struct CaptureOrchestrator<'a, S: Simulator + ?Sized, R: Recorder + ?Sized> {
    sim: &'a mut S,
    recorder: &'a mut R,
    options: CaptureOptions,
    next_capture_id: u64,
    report: RunReport,
}

impl<'a, S: Simulator + ?Sized, R: Recorder + ?Sized> CaptureOrchestrator<'a, S, R> {
    pub fn new(sim: &'a mut S, recorder: &'a mut R, options: CaptureOptions) -> Self {
        Self {
            sim,
            recorder,
            options,
            next_capture_id: 1,
            report: RunReport::default(),
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// One step and one frame read, to confirm the sensor stream is live.
    pub fn preflight(&mut self) -> Result<(), CaptureError> {
        self.sim.step().map_err(CaptureError::SensorUnavailable)?;
        let frame = self
            .sim
            .capture_frame()
            .map_err(CaptureError::SensorUnavailable)?;
        info!(
            simulator = self.sim.name(),
            width = frame.size.0,
            height = frame.size.1,
            "sensor stream ok; starting capture"
        );
        Ok(())
    }

    pub fn run(&mut self, scenes: &[SceneConfiguration]) -> Result<RunReport, CaptureError> {
        self.preflight()?;
        self.report.scenes_total = scenes.len();
        for (index, scene) in scenes.iter().enumerate() {
            if self.cap_reached() {
                self.report.scenes_skipped = scenes.len() - index;
                info!(
                    frames = self.report.frames_written,
                    skipped = self.report.scenes_skipped,
                    "capture limit reached"
                );
                break;
            }
            match self.capture_scene(scene)? {
                SceneOutcome::Captured => self.report.scenes_captured += 1,
                SceneOutcome::Incomplete => {
                    self.report.scenes_incomplete += 1;
                    self.report.incomplete_scene_ids.push(scene.scene_id);
                }
                SceneOutcome::Failed => self.report.scenes_failed += 1,
                SceneOutcome::Empty => self.report.scenes_empty += 1,
            }
        }
        Ok(self.report.clone())
    }

    fn cap_reached(&self) -> bool {
        self.options
            .max_captures
            .is_some_and(|max| self.report.frames_written >= max as usize)
    }

    fn capture_scene(&mut self, scene: &SceneConfiguration) -> Result<SceneOutcome, CaptureError> {
        if let Err(err) = self.sim.apply(scene) {
            warn!(scene_id = scene.scene_id, error = %err, "failed to apply scene; skipping");
            return Ok(SceneOutcome::Failed);
        }
        match wait_for_settle(&mut *self.sim, self.options.settle) {
            Ok(outcome) => debug!(
                scene_id = scene.scene_id,
                steps = outcome.steps,
                tick = outcome.status.tick,
                "scene settled"
            ),
            Err(SettleError::Timeout { steps }) => {
                warn!(
                    scene_id = scene.scene_id,
                    model = %scene.target.model,
                    steps,
                    "scene did not settle; marked incomplete"
                );
                return Ok(SceneOutcome::Incomplete);
            }
            Err(SettleError::Sim(err)) => {
                warn!(scene_id = scene.scene_id, error = %err, "simulator error while settling; marked incomplete");
                return Ok(SceneOutcome::Incomplete);
            }
        }

        let mut written = 0usize;
        for shot in 0..scene.shots.max(1) {
            if self.cap_reached() {
                break;
            }
            if shot > 0 {
                if let Err(err) = self.sim.step() {
                    warn!(scene_id = scene.scene_id, error = %err, "step between shots failed");
                    self.report.sensor_failures += 1;
                    continue;
                }
            }
            let (frame, truth) = match self.sim.capture_frame().and_then(|frame| {
                let truth = self.sim.ground_truth()?;
                Ok((frame, truth))
            }) {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(
                        scene_id = scene.scene_id,
                        model = %scene.target.model,
                        error = %err,
                        "capture failed"
                    );
                    self.report.sensor_failures += 1;
                    continue;
                }
            };
            if frame.tick != truth.tick || frame.sim_time.to_bits() != truth.sim_time.to_bits() {
                warn!(
                    scene_id = scene.scene_id,
                    frame_tick = frame.tick,
                    label_tick = truth.tick,
                    "frame and ground truth from different ticks; discarded"
                );
                self.report.misaligned += 1;
                continue;
            }
            if self.write_pair(scene, &frame, truth)? {
                written += 1;
            }
        }
        Ok(if written > 0 {
            SceneOutcome::Captured
        } else {
            SceneOutcome::Empty
        })
    }

    /// Returns whether the pair was stored; errors only under [`WriteFailurePolicy::Halt`].
    fn write_pair(
        &mut self,
        scene: &SceneConfiguration,
        frame: &SensorFrame,
        truth: GroundTruth,
    ) -> Result<bool, CaptureError> {
        let capture_id = self.next_capture_id;
        let image = self.recorder.next_image_path(&scene.target);
        let metadata = build_capture_metadata(
            scene,
            capture_id,
            self.options.seed,
            unix_now(),
            image,
            frame,
            truth,
        );
        let record = FrameRecord {
            metadata: &metadata,
            rgba: &frame.rgba,
        };
        match self.recorder.record(&record) {
            Ok(()) => {
                self.next_capture_id += 1;
                self.report.frames_written += 1;
                info!(capture_id, image = %metadata.frame.image, "saved");
                Ok(true)
            }
            Err(source) => match self.options.write_failure {
                WriteFailurePolicy::Halt => {
                    error!(capture_id, error = %source, "failed to save capture; halting run");
                    self.report.write_failures += 1;
                    self.report.halted = true;
                    Err(CaptureError::WriteHalted {
                        capture_id,
                        source,
                        report: Box::new(self.report.clone()),
                    })
                }
                WriteFailurePolicy::Skip => {
                    error!(capture_id, error = %source, "failed to save capture; continuing");
                    self.report.write_failures += 1;
                    Ok(false)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_contracts::capture::CameraIntrinsics;
    use data_contracts::scene::{EnvironmentVariant, ObjectClass, Pose, TargetRef};
    use data_contracts::ObjectLabel;
    use sim_core::prelude::{SimResult, SimStatus};
    use std::collections::HashSet;

    #[derive(Default)]
    struct ScriptedSim {
        tick: u64,
        current: u64,
        never_settle: HashSet<u64>,
        reject: HashSet<u64>,
        lagging_truth: HashSet<u64>,
        blind: HashSet<u64>,
    }

    impl Simulator for ScriptedSim {
        fn name(&self) -> &str {
            "scripted"
        }
        fn model_pose(&mut self, model: &str) -> SimResult<Pose> {
            Err(SimError::ModelNotFound(model.into()))
        }
        fn apply(&mut self, scene: &SceneConfiguration) -> SimResult<()> {
            if self.reject.contains(&scene.scene_id) {
                return Err(SimError::Rejected {
                    scene_id: scene.scene_id,
                    reason: "scripted".into(),
                });
            }
            self.current = scene.scene_id;
            Ok(())
        }
        fn step(&mut self) -> SimResult<SimStatus> {
            self.tick += 1;
            Ok(SimStatus {
                tick: self.tick,
                sim_time: self.tick as f64 * 0.1,
                settled: !self.never_settle.contains(&self.current),
            })
        }
        fn capture_frame(&mut self) -> SimResult<SensorFrame> {
            if self.blind.contains(&self.current) {
                return Err(SimError::Sensor("no image".into()));
            }
            Ok(SensorFrame {
                tick: self.tick,
                sim_time: self.tick as f64 * 0.1,
                rgba: vec![0; 4],
                size: (1, 1),
                intrinsics: CameraIntrinsics::from_fov(1, 1, 60.0),
                sensor_pose: Pose::default(),
            })
        }
        fn ground_truth(&mut self) -> SimResult<GroundTruth> {
            let tick = if self.lagging_truth.contains(&self.current) {
                self.tick + 1
            } else {
                self.tick
            };
            Ok(GroundTruth {
                tick,
                sim_time: tick as f64 * 0.1,
                objects: vec![ObjectLabel {
                    model: "STOP_A".into(),
                    class: ObjectClass::Stop,
                    center_world: [0.0; 3],
                    distance_m: 1.0,
                    bbox_px: None,
                    bbox_norm: None,
                }],
            })
        }
    }

    #[derive(Default)]
    struct MemoryRecorder {
        records: Vec<CaptureMetadata>,
        fail_capture_ids: HashSet<u64>,
    }

    impl Recorder for MemoryRecorder {
        fn next_image_path(&self, target: &TargetRef) -> String {
            let n = self
                .records
                .iter()
                .filter(|m| m.target.model == target.model)
                .count()
                + 1;
            format!("images/{}/{}_{:04}.png", target.class, target.model, n)
        }
        fn record(&mut self, record: &FrameRecord) -> io::Result<()> {
            if self.fail_capture_ids.contains(&record.metadata.capture_id) {
                return Err(io::Error::other("disk full"));
            }
            record.metadata.validate().map_err(io::Error::other)?;
            self.records.push(record.metadata.clone());
            Ok(())
        }
    }

    fn scenes(n: u64, shots: u32) -> Vec<SceneConfiguration> {
        (1..=n)
            .map(|scene_id| SceneConfiguration {
                scene_id,
                target: TargetRef {
                    class: ObjectClass::Stop,
                    model: "STOP_A".into(),
                },
                vehicle_pose: Pose::default(),
                environment: EnvironmentVariant::default(),
                shots,
            })
            .collect()
    }

    fn options() -> CaptureOptions {
        CaptureOptions {
            settle: SettlePolicy {
                min_steps: 2,
                max_steps: 5,
            },
            ..Default::default()
        }
    }

    #[test]
    fn every_written_frame_is_aligned_with_its_label() {
        let mut sim = ScriptedSim::default();
        let mut rec = MemoryRecorder::default();
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(3, 2))
            .expect("run");
        assert_eq!(report.scenes_total, 3);
        assert_eq!(report.scenes_captured, 3);
        assert_eq!(report.frames_written, 6);
        let ids: Vec<u64> = rec.records.iter().map(|m| m.capture_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        for meta in &rec.records {
            assert_eq!(meta.frame.capture_id, meta.ground_truth.capture_id);
            assert_eq!(meta.frame.tick, meta.ground_truth.tick);
            assert_eq!(meta.frame.sim_time, meta.ground_truth.sim_time);
        }
        // Shots within a scene come from distinct ticks.
        assert_ne!(rec.records[0].frame.tick, rec.records[1].frame.tick);
    }

    #[test]
    fn unsettled_scene_is_skipped_without_output() {
        let mut sim = ScriptedSim {
            never_settle: HashSet::from([2]),
            ..Default::default()
        };
        let mut rec = MemoryRecorder::default();
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(3, 1))
            .expect("run continues");
        assert_eq!(report.scenes_incomplete, 1);
        assert_eq!(report.incomplete_scene_ids, vec![2]);
        assert_eq!(report.scenes_captured, 2);
        assert!(rec.records.iter().all(|m| m.scene_id != 2));
    }

    #[test]
    fn rejected_scene_counts_as_failed() {
        let mut sim = ScriptedSim {
            reject: HashSet::from([1]),
            ..Default::default()
        };
        let mut rec = MemoryRecorder::default();
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(2, 1))
            .unwrap();
        assert_eq!(report.scenes_failed, 1);
        assert_eq!(report.frames_written, 1);
    }

    #[test]
    fn misaligned_pairs_are_discarded() {
        let mut sim = ScriptedSim {
            lagging_truth: HashSet::from([1]),
            ..Default::default()
        };
        let mut rec = MemoryRecorder::default();
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(2, 2))
            .unwrap();
        assert_eq!(report.misaligned, 2);
        assert_eq!(report.frames_written, 2);
        assert_eq!(report.scenes_empty, 1);
        assert!(rec.records.iter().all(|m| m.scene_id == 2));
        // Capture ids stay contiguous across discarded pairs.
        assert_eq!(rec.records[0].capture_id, 1);
    }

    #[test]
    fn sensor_failure_skips_shot() {
        let mut sim = ScriptedSim {
            blind: HashSet::from([1]),
            ..Default::default()
        };
        let mut rec = MemoryRecorder::default();
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(2, 1))
            .unwrap();
        assert_eq!(report.sensor_failures, 1);
        assert_eq!(report.scenes_captured, 1);
        assert_eq!(report.scenes_empty, 1);
    }

    #[test]
    fn write_failure_halts_by_default() {
        let mut sim = ScriptedSim::default();
        let mut rec = MemoryRecorder {
            fail_capture_ids: HashSet::from([2]),
            ..Default::default()
        };
        let err = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(4, 1))
            .unwrap_err();
        match err {
            CaptureError::WriteHalted {
                capture_id, report, ..
            } => {
                assert_eq!(capture_id, 2);
                assert!(report.halted);
                assert_eq!(report.frames_written, 1);
                assert_eq!(report.write_failures, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(rec.records.len(), 1);
    }

    #[test]
    fn write_failure_can_be_skipped() {
        let mut sim = ScriptedSim::default();
        let mut rec = MemoryRecorder {
            fail_capture_ids: HashSet::from([2]),
            ..Default::default()
        };
        let opts = CaptureOptions {
            write_failure: WriteFailurePolicy::Skip,
            ..options()
        };
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, opts)
            .run(&scenes(3, 1))
            .unwrap();
        // Capture id 2 keeps failing, so only the first frame lands.
        assert_eq!(report.frames_written, 1);
        assert_eq!(report.write_failures, 2);
        assert_eq!(report.scenes_empty, 2);
        assert!(!report.halted);
    }

    #[test]
    fn max_captures_stops_the_run() {
        let mut sim = ScriptedSim::default();
        let mut rec = MemoryRecorder::default();
        let opts = CaptureOptions {
            max_captures: Some(3),
            ..options()
        };
        let report = CaptureOrchestrator::new(&mut sim, &mut rec, opts)
            .run(&scenes(5, 2))
            .unwrap();
        assert_eq!(report.frames_written, 3);
        assert_eq!(rec.records.len(), 3);
        assert_eq!(report.scenes_captured, 2);
        assert_eq!(report.scenes_skipped, 3);
        assert_eq!(
            report.scenes_captured
                + report.scenes_incomplete
                + report.scenes_failed
                + report.scenes_empty
                + report.scenes_skipped,
            report.scenes_total
        );
    }

    #[test]
    fn preflight_failure_aborts_before_any_scene() {
        let mut sim = ScriptedSim {
            blind: HashSet::from([0]),
            ..Default::default()
        };
        let mut rec = MemoryRecorder::default();
        let err = CaptureOrchestrator::new(&mut sim, &mut rec, options())
            .run(&scenes(1, 1))
            .unwrap_err();
        assert!(matches!(err, CaptureError::SensorUnavailable(_)));
        assert!(rec.records.is_empty());
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("halt".parse::<WriteFailurePolicy>().unwrap(), WriteFailurePolicy::Halt);
        assert_eq!(" Skip ".parse::<WriteFailurePolicy>().unwrap(), WriteFailurePolicy::Skip);
        assert!("retry".parse::<WriteFailurePolicy>().is_err());
    }
}
