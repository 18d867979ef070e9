use clap::Args;
use std::path::{Path, PathBuf};

/// Capture output options shared across capture-related binaries.
#[derive(Debug, Clone, Args)]
pub struct CaptureOutputArgs {
    /// Directory to write run_* captures into (defaults to the tool config's output_root).
    #[arg(long)]
    pub output_root: Option<PathBuf>,
    /// Render bounding-box overlays for every written frame after the run.
    #[arg(long, default_value_t = false)]
    pub overlays: bool,
}

#[derive(Debug, Clone)]
pub struct CaptureOutputOpts {
    pub output_root: PathBuf,
    pub overlays: bool,
}

impl CaptureOutputOpts {
    /// Flags take precedence; `config_root` fills in when `--output-root` is absent.
    pub fn resolve(args: &CaptureOutputArgs, config_root: &Path, config_overlays: bool) -> Self {
        Self {
            output_root: args
                .output_root
                .clone()
                .unwrap_or_else(|| config_root.to_path_buf()),
            overlays: args.overlays || config_overlays,
        }
    }
}

/// Audit thresholds for dataset checks; unset values fall back to `DATASET_MAX_*` env vars.
#[derive(Debug, Clone, Default, Args)]
pub struct ThresholdArgs {
    /// Misaligned frame/label pairs tolerated before the audit fails (default 0).
    #[arg(long)]
    pub max_misaligned: Option<usize>,
    /// Unlabelled images tolerated before the audit fails (default 0).
    #[arg(long)]
    pub max_orphan_images: Option<usize>,
    /// Maximum number of invalid labels.
    #[arg(long)]
    pub max_invalid: Option<usize>,
    /// Maximum number of labels with a missing image.
    #[arg(long)]
    pub max_missing: Option<usize>,
    /// Maximum number of labels without a boxed object.
    #[arg(long)]
    pub max_empty: Option<usize>,
    #[arg(long)]
    pub max_invalid_ratio: Option<f32>,
    #[arg(long)]
    pub max_missing_ratio: Option<f32>,
    #[arg(long)]
    pub max_empty_ratio: Option<f32>,
}
