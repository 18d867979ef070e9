//! Core types and error definitions for dataset_index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SampleIndex {
    pub run_dir: PathBuf,
    pub label_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    /// Label files examined.
    pub total: usize,
    /// Aligned, valid pairs with the image on disk.
    pub valid: usize,
    pub non_empty: usize,
    pub empty: usize,
    pub misaligned: usize,
    pub missing_image: usize,
    pub missing_file: usize,
    pub invalid: usize,
    /// Images on disk with no label pointing at them.
    pub orphan_images: usize,
}

impl RunSummary {
    fn add(&mut self, other: &RunSummary) {
        self.total += other.total;
        self.valid += other.valid;
        self.non_empty += other.non_empty;
        self.empty += other.empty;
        self.misaligned += other.misaligned;
        self.missing_image += other.missing_image;
        self.missing_file += other.missing_file;
        self.invalid += other.invalid;
        self.orphan_images += other.orphan_images;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub runs: Vec<RunSummary>,
    pub totals: RunSummary,
}

impl DatasetSummary {
    pub fn from_runs(runs: Vec<RunSummary>) -> Self {
        let mut totals = RunSummary::default();
        for run in &runs {
            totals.add(run);
        }
        Self { runs, totals }
    }
}

/// Audit verdict for a captures root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Pass,
    /// Degraded samples within the configured limits.
    Warn,
    Fail,
}

impl ValidationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationOutcome::Pass => "pass",
            ValidationOutcome::Warn => "warn",
            ValidationOutcome::Fail => "fail",
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Limits applied by the audit.
///
/// Integrity limits (`max_misaligned`, `max_orphan_images`) are always enforced and default
/// to zero: a frame/label pair from different ticks or an unlabelled image fails the audit.
/// Quality limits are optional; samples over an unset limit only warn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationThresholds {
    pub max_misaligned: usize,
    pub max_orphan_images: usize,
    pub max_invalid: Option<usize>,
    pub max_missing: Option<usize>,
    pub max_empty: Option<usize>,
    pub max_invalid_ratio: Option<f32>,
    pub max_missing_ratio: Option<f32>,
    pub max_empty_ratio: Option<f32>,
}

impl ValidationThresholds {
    /// Limits from `DATASET_MAX_*` environment variables; unparseable values are ignored.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok()?.trim().parse().ok()
        }
        ValidationThresholds {
            max_misaligned: var("DATASET_MAX_MISALIGNED").unwrap_or(0),
            max_orphan_images: var("DATASET_MAX_ORPHANS").unwrap_or(0),
            max_invalid: var("DATASET_MAX_INVALID"),
            max_missing: var("DATASET_MAX_MISSING"),
            max_empty: var("DATASET_MAX_EMPTY"),
            max_invalid_ratio: var("DATASET_MAX_INVALID_RATIO"),
            max_missing_ratio: var("DATASET_MAX_MISSING_RATIO"),
            max_empty_ratio: var("DATASET_MAX_EMPTY_RATIO"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub reasons: Vec<String>,
    pub summary: DatasetSummary,
}
