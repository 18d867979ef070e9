use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use cli_support::common::ThresholdArgs;
use cli_support::logging;
use dataset_index::{summarize_root_with_thresholds, ValidationOutcome, ValidationThresholds};
use twin_capture_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "dataset_check",
    about = "Audit captured runs for frame/label alignment, missing files and orphan images"
)]
struct Args {
    /// Captures root containing run_* directories (defaults to the config's output_root).
    root: Option<PathBuf>,
    #[command(flatten)]
    thresholds: ThresholdArgs,
    /// Print the full report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn thresholds(args: &ThresholdArgs) -> ValidationThresholds {
    let env = ValidationThresholds::from_env();
    ValidationThresholds {
        max_misaligned: args.max_misaligned.unwrap_or(env.max_misaligned),
        max_orphan_images: args.max_orphan_images.unwrap_or(env.max_orphan_images),
        max_invalid: args.max_invalid.or(env.max_invalid),
        max_missing: args.max_missing.or(env.max_missing),
        max_empty: args.max_empty.or(env.max_empty),
        max_invalid_ratio: args.max_invalid_ratio.or(env.max_invalid_ratio),
        max_missing_ratio: args.max_missing_ratio.or(env.max_missing_ratio),
        max_empty_ratio: args.max_empty_ratio.or(env.max_empty_ratio),
    }
}

fn main() -> Result<()> {
    logging::init("warn");
    let args = Args::parse();
    let root = args.root.clone().unwrap_or_else(|| ToolConfig::load().output_root);
    let report = summarize_root_with_thresholds(&root, &thresholds(&args.thresholds))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for run in &report.summary.runs {
            println!(
                "{}: total {} valid {} (non-empty {}, empty {}) misaligned {} missing {} invalid {} orphans {}",
                run.run_dir.display(),
                run.total,
                run.valid,
                run.non_empty,
                run.empty,
                run.misaligned,
                run.missing_image + run.missing_file,
                run.invalid,
                run.orphan_images
            );
        }
        println!("outcome: {}", report.outcome);
        for reason in &report.reasons {
            println!("  - {reason}");
        }
    }
    if report.outcome == ValidationOutcome::Fail {
        bail!("dataset check failed for {}", root.display());
    }
    Ok(())
}
