use std::path::PathBuf;

use anyhow::{bail, Result};
use capture_utils::generate_overlays;
use clap::Parser;
use cli_support::logging;

#[derive(Parser, Debug)]
#[command(
    name = "overlay_labels",
    about = "Draw label boxes onto copies of a run's images under overlays/"
)]
struct Args {
    /// Run directory containing images/ and labels/.
    run_dir: PathBuf,
}

fn main() -> Result<()> {
    logging::init("info");
    let args = Args::parse();
    if !args.run_dir.join("labels").is_dir() {
        bail!("{} has no labels/ directory", args.run_dir.display());
    }
    let written = generate_overlays(&args.run_dir)?;
    println!(
        "{written} overlays written to {}",
        args.run_dir.join("overlays").display()
    );
    Ok(())
}
