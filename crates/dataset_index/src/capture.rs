//! Indexing and summarizing capture runs on disk.

use crate::types::{DatasetError, DatasetResult, DatasetSummary, RunSummary, SampleIndex};
use data_contracts::{CaptureMetadata, ValidationError};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

fn collect_files(dir: &Path, ext: &str, out: &mut Vec<PathBuf>) -> DatasetResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| DatasetError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, ext, out)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some(ext) {
            out.push(path);
        }
    }
    Ok(())
}

/// Run directories under a captures root: any child directory holding `labels/` or `images/`.
pub fn find_runs(root: &Path) -> DatasetResult<Vec<PathBuf>> {
    let entries = fs::read_dir(root).map_err(|e| DatasetError::Io {
        path: root.to_path_buf(),
        source: e,
    })?;
    let mut runs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.join("labels").is_dir() || path.join("images").is_dir())
        .collect();
    runs.sort();
    Ok(runs)
}

/// Scan a captures root and index every label file of every run.
pub fn index_runs(root: &Path) -> DatasetResult<Vec<SampleIndex>> {
    let mut indices = Vec::new();
    for run_path in find_runs(root)? {
        let labels_dir = run_path.join("labels");
        if !labels_dir.is_dir() {
            continue;
        }
        let mut labels = Vec::new();
        collect_files(&labels_dir, "json", &mut labels)?;
        indices.extend(labels.into_iter().map(|label_path| SampleIndex {
            run_dir: run_path.clone(),
            label_path,
        }));
    }
    indices.sort();
    Ok(indices)
}

/// Parse one label file.
pub fn load_label(idx: &SampleIndex) -> DatasetResult<CaptureMetadata> {
    let raw = fs::read(&idx.label_path).map_err(|e| DatasetError::Io {
        path: idx.label_path.clone(),
        source: e,
    })?;
    serde_json::from_slice(&raw).map_err(|e| DatasetError::Json {
        path: idx.label_path.clone(),
        source: e,
    })
}

fn is_alignment_error(err: &ValidationError) -> bool {
    matches!(
        err,
        ValidationError::CaptureIdMismatch { .. }
            | ValidationError::TickMismatch { .. }
            | ValidationError::TimestampMismatch { .. }
    )
}

fn orphan_images(run_dir: &Path, referenced: &BTreeSet<PathBuf>) -> usize {
    let images_dir = run_dir.join("images");
    if !images_dir.is_dir() {
        return 0;
    }
    let mut images = Vec::new();
    if collect_files(&images_dir, "png", &mut images).is_err() {
        return 0;
    }
    images.iter().filter(|p| !referenced.contains(*p)).count()
}

/// Per-run counts of valid, misaligned, missing and invalid samples, for the runs named by
/// `indices`.
pub fn summarize_runs(indices: &[SampleIndex]) -> DatasetResult<DatasetSummary> {
    summarize(std::iter::empty(), indices)
}

/// Summarize every run under `root`. Runs with no label at all still get a summary, so
/// their images are counted as orphans.
pub fn summarize_root(root: &Path) -> DatasetResult<DatasetSummary> {
    let runs = find_runs(root)?;
    let indices = index_runs(root)?;
    summarize(runs, &indices)
}

fn summarize(
    runs: impl IntoIterator<Item = PathBuf>,
    indices: &[SampleIndex],
) -> DatasetResult<DatasetSummary> {
    let mut by_run: BTreeMap<PathBuf, (RunSummary, BTreeSet<PathBuf>)> = BTreeMap::new();
    let seed = |run_dir: &Path| {
        (
            RunSummary {
                run_dir: run_dir.to_path_buf(),
                ..Default::default()
            },
            BTreeSet::new(),
        )
    };
    for run_dir in runs {
        by_run.entry(run_dir.clone()).or_insert_with(|| seed(&run_dir));
    }
    for idx in indices {
        let (entry, referenced) = by_run
            .entry(idx.run_dir.clone())
            .or_insert_with(|| seed(&idx.run_dir));
        entry.total += 1;
        let Ok(meta) = load_label(idx) else {
            entry.invalid += 1;
            continue;
        };
        if meta.frame.image.trim().is_empty() {
            entry.missing_image += 1;
            continue;
        }
        let img_path = idx.run_dir.join(&meta.frame.image);
        referenced.insert(img_path.clone());
        if !meta.frame.image_present || !img_path.exists() {
            entry.missing_file += 1;
            continue;
        }
        match meta.validate() {
            Ok(()) => {}
            Err(err) if is_alignment_error(&err) => {
                entry.misaligned += 1;
                continue;
            }
            Err(_) => {
                entry.invalid += 1;
                continue;
            }
        }
        entry.valid += 1;
        if meta.has_boxes() {
            entry.non_empty += 1;
        } else {
            entry.empty += 1;
        }
    }
    let runs = by_run
        .into_iter()
        .map(|(run_dir, (mut summary, referenced))| {
            summary.orphan_images = orphan_images(&run_dir, &referenced);
            summary
        })
        .collect();
    Ok(DatasetSummary::from_runs(runs))
}
