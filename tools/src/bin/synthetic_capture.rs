use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use capture_orchestrator::{parse_list, plan_scenes, run_session, CaptureError, WriteFailurePolicy};
use capture_utils::generate_overlays;
use clap::Parser;
use cli_support::common::{CaptureOutputArgs, CaptureOutputOpts};
use cli_support::logging;
use cli_support::seed::resolve_seed_or;
use data_contracts::RunReport;
use sim_core::prelude::{TrackWorld, TwinSim};
use twin_capture_tools::ToolConfig;

#[derive(Parser, Debug)]
#[command(
    name = "synthetic_capture",
    about = "Orbit the vehicle around each target sign and record aligned image/label pairs"
)]
struct Args {
    /// Tools config (defaults to $TWIN_CAPTURE_CONFIG or ./twin-capture.toml).
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(flatten)]
    capture: CaptureOutputArgs,
    /// Distance from each sign, metres.
    #[arg(long)]
    radius: Option<f64>,
    /// Comma list of vehicle heights relative to the sign, metres.
    #[arg(long)]
    heights: Option<String>,
    /// Comma list of orbit angles, degrees.
    #[arg(long)]
    angles_deg: Option<String>,
    #[arg(long)]
    shots_per_pose: Option<u32>,
    #[arg(long)]
    settle_min_steps: Option<u32>,
    #[arg(long)]
    settle_max_steps: Option<u32>,
    /// Seed for the run (falls back to CAPTURE_SEED, the config, then the clock).
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many frames have been written.
    #[arg(long)]
    max_captures: Option<u32>,
    /// halt | skip
    #[arg(long)]
    on_write_failure: Option<WriteFailurePolicy>,
}

fn apply_overrides(cfg: &mut ToolConfig, args: &Args) -> Result<()> {
    let c = &mut cfg.capture;
    if let Some(r) = args.radius {
        c.radius = r;
    }
    if let Some(raw) = &args.heights {
        c.heights = parse_list(raw).with_context(|| format!("--heights '{raw}'"))?;
    }
    if let Some(raw) = &args.angles_deg {
        c.angles_deg = parse_list(raw).with_context(|| format!("--angles-deg '{raw}'"))?;
    }
    if let Some(n) = args.shots_per_pose {
        c.shots_per_pose = n;
    }
    if let Some(n) = args.settle_min_steps {
        c.settle_min_steps = n;
    }
    if let Some(n) = args.settle_max_steps {
        c.settle_max_steps = n;
    }
    if args.max_captures.is_some() {
        c.max_captures = args.max_captures;
    }
    if let Some(policy) = args.on_write_failure {
        c.write_failure = policy;
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "scenes: {} total, {} captured, {} incomplete, {} failed, {} empty, {} skipped",
        report.scenes_total,
        report.scenes_captured,
        report.scenes_incomplete,
        report.scenes_failed,
        report.scenes_empty,
        report.scenes_skipped
    );
    println!(
        "frames written: {} (misaligned {}, sensor failures {}, write failures {})",
        report.frames_written, report.misaligned, report.sensor_failures, report.write_failures
    );
    if !report.incomplete_scene_ids.is_empty() {
        println!("incomplete scene ids: {:?}", report.incomplete_scene_ids);
    }
}

fn main() -> Result<()> {
    logging::init("info");
    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => ToolConfig::read(path)?,
        None => ToolConfig::load(),
    };
    apply_overrides(&mut cfg, &args)?;
    cfg.warn_if_invalid();
    let output = CaptureOutputOpts::resolve(&args.capture, &cfg.output_root, cfg.capture.overlays);
    let seed = resolve_seed_or(args.seed, cfg.seed);

    let mut sim = TwinSim::new(TrackWorld::competition_track(), seed);
    let plan = plan_scenes(&mut sim, &cfg.plan_config());
    if !plan.missing_models.is_empty() {
        println!("skipped missing models: {}", plan.missing_models.join(", "));
    }
    if plan.scenes.is_empty() {
        bail!("no scenes planned; check targets, heights and angles");
    }
    println!(
        "capturing {} scenes into {} (seed {seed})",
        plan.scenes.len(),
        output.output_root.display()
    );

    let session = match run_session(
        &mut sim,
        &plan.scenes,
        cfg.capture_options(seed),
        &output.output_root,
    ) {
        Ok(session) => session,
        Err(CaptureError::WriteHalted {
            capture_id,
            source,
            report,
        }) => {
            print_report(&report);
            bail!("run halted: write failed for capture {capture_id}: {source}");
        }
        Err(err) => return Err(err.into()),
    };

    if output.overlays {
        let n = generate_overlays(&session.run_dir)?;
        println!("overlays written: {n}");
    }
    print_report(&session.report);
    println!("run directory: {}", session.run_dir.display());
    Ok(())
}
