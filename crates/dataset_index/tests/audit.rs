use data_contracts::capture::{
    CameraIntrinsics, CaptureFrame, CaptureMetadata, GroundTruthLabel, ObjectLabel,
};
use data_contracts::scene::{EnvironmentVariant, ObjectClass, Pose, TargetRef};
use dataset_index::{
    index_runs, summarize_root_with_thresholds, summarize_runs, ValidationOutcome,
    ValidationThresholds,
};
use std::fs;
use std::path::Path;

fn metadata(capture_id: u64, image: &str, boxed: bool) -> CaptureMetadata {
    let objects = vec![ObjectLabel {
        model: "STOP_A".into(),
        class: ObjectClass::Stop,
        center_world: [2.0, 1.0, 0.2],
        distance_m: 1.2,
        bbox_px: boxed.then_some([100.0, 120.0, 160.0, 180.0]),
        bbox_norm: boxed.then_some([0.15, 0.25, 0.25, 0.375]),
    }];
    CaptureMetadata {
        capture_id,
        scene_id: 1,
        seed: 7,
        unix_time: 0.0,
        target: TargetRef {
            class: ObjectClass::Stop,
            model: "STOP_A".into(),
        },
        environment: EnvironmentVariant::default(),
        frame: CaptureFrame {
            capture_id,
            tick: 10 + capture_id,
            sim_time: 0.1 * capture_id as f64,
            image: image.into(),
            image_present: true,
            size: (640, 480),
            intrinsics: CameraIntrinsics::default(),
            sensor_pose: Pose::default(),
        },
        ground_truth: GroundTruthLabel {
            capture_id,
            tick: 10 + capture_id,
            sim_time: 0.1 * capture_id as f64,
            objects,
        },
    }
}

fn write_pair(run: &Path, meta: &CaptureMetadata, with_image: bool) {
    let image = run.join(&meta.frame.image);
    fs::create_dir_all(image.parent().unwrap()).unwrap();
    if with_image {
        fs::write(&image, b"png").unwrap();
    }
    let label = run
        .join("labels")
        .join(Path::new(&meta.frame.image).strip_prefix("images").unwrap())
        .with_extension("json");
    fs::create_dir_all(label.parent().unwrap()).unwrap();
    fs::write(&label, serde_json::to_vec_pretty(meta).unwrap()).unwrap();
}

#[test]
fn clean_run_passes() {
    let root = tempfile::tempdir().unwrap();
    let run = root.path().join("run_1");
    write_pair(&run, &metadata(1, "images/STOP/STOP_A_0001.png", true), true);
    write_pair(&run, &metadata(2, "images/STOP/STOP_A_0002.png", true), true);
    fs::create_dir_all(root.path().join("not_a_run")).unwrap();

    let indices = index_runs(root.path()).unwrap();
    assert_eq!(indices.len(), 2);
    let report =
        summarize_root_with_thresholds(root.path(), &ValidationThresholds::default()).unwrap();
    assert_eq!(report.outcome, ValidationOutcome::Pass);
    assert_eq!(report.summary.runs.len(), 1);
    assert_eq!(report.summary.totals.valid, 2);
    assert_eq!(report.summary.totals.non_empty, 2);
}

#[test]
fn misaligned_label_fails_audit() {
    let root = tempfile::tempdir().unwrap();
    let run = root.path().join("run_1");
    let mut meta = metadata(1, "images/STOP/STOP_A_0001.png", true);
    meta.ground_truth.tick += 1;
    write_pair(&run, &meta, true);

    let report =
        summarize_root_with_thresholds(root.path(), &ValidationThresholds::default()).unwrap();
    assert_eq!(report.summary.totals.misaligned, 1);
    assert_eq!(report.summary.totals.valid, 0);
    assert_eq!(report.outcome, ValidationOutcome::Fail);
}

#[test]
fn orphan_image_fails_audit() {
    let root = tempfile::tempdir().unwrap();
    let run = root.path().join("run_1");
    write_pair(&run, &metadata(1, "images/STOP/STOP_A_0001.png", true), true);
    fs::write(run.join("images/STOP/STOP_A_0002.png"), b"png").unwrap();

    let report =
        summarize_root_with_thresholds(root.path(), &ValidationThresholds::default()).unwrap();
    assert_eq!(report.summary.totals.orphan_images, 1);
    assert_eq!(report.outcome, ValidationOutcome::Fail);
}

#[test]
fn missing_and_broken_files_are_counted() {
    let root = tempfile::tempdir().unwrap();
    let run = root.path().join("run_1");
    write_pair(&run, &metadata(1, "images/STOP/STOP_A_0001.png", false), false);
    write_pair(&run, &metadata(2, "images/STOP/STOP_A_0002.png", false), true);
    fs::write(run.join("labels/STOP/garbage.json"), b"{not json").unwrap();

    let indices = index_runs(root.path()).unwrap();
    let summary = summarize_runs(&indices).unwrap();
    let totals = &summary.totals;
    assert_eq!(totals.total, 3);
    assert_eq!(totals.missing_file, 1);
    assert_eq!(totals.invalid, 1);
    assert_eq!(totals.valid, 1);
    assert_eq!(totals.empty, 1);

    let report = dataset_index::validate_summary(
        summary,
        &ValidationThresholds {
            max_missing: Some(0),
            ..Default::default()
        },
    );
    assert_eq!(report.outcome, ValidationOutcome::Fail);
}

#[test]
fn run_without_labels_still_reports_orphans() {
    let root = tempfile::tempdir().unwrap();
    let run = root.path().join("run_1");
    fs::create_dir_all(run.join("labels")).unwrap();
    fs::create_dir_all(run.join("images/STOP")).unwrap();
    fs::write(run.join("images/STOP/STOP_A_0001.png"), b"png").unwrap();

    assert!(index_runs(root.path()).unwrap().is_empty());
    let report =
        summarize_root_with_thresholds(root.path(), &ValidationThresholds::default()).unwrap();
    assert_eq!(report.summary.runs.len(), 1);
    assert_eq!(report.summary.totals.total, 0);
    assert_eq!(report.summary.totals.orphan_images, 1);
    assert_eq!(report.outcome, ValidationOutcome::Fail);
}

#[test]
fn misalignment_within_limit_warns() {
    let root = tempfile::tempdir().unwrap();
    let run = root.path().join("run_1");
    let mut meta = metadata(1, "images/STOP/STOP_A_0001.png", true);
    meta.ground_truth.tick += 1;
    write_pair(&run, &meta, true);
    write_pair(&run, &metadata(2, "images/STOP/STOP_A_0002.png", true), true);

    let report = summarize_root_with_thresholds(
        root.path(),
        &ValidationThresholds {
            max_misaligned: 1,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(report.summary.totals.misaligned, 1);
    assert_eq!(report.outcome, ValidationOutcome::Warn);
}
