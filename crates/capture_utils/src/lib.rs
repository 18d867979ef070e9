//! On-disk dataset store for capture runs.
//!
//! Layout of a run directory:
//! - `images/<CLASS>/<model>_<nnnn>.png`
//! - `labels/<CLASS>/<model>_<nnnn>.json`
//! - `run_manifest.json`, `run_report.json`
//! - `overlays/` (optional, regenerated on demand)
//!
//! Every dataset file is created with create-new semantics: nothing already on disk is
//! ever rewritten.

pub mod overlay;

use data_contracts::scene::TargetRef;
use data_contracts::{RunManifest, RunReport};
use serde::Serialize;
use sim_core::prelude::{FrameRecord, Recorder};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

pub use overlay::generate_overlays;

pub const IMAGES_DIR: &str = "images";
pub const LABELS_DIR: &str = "labels";
pub const OVERLAYS_DIR: &str = "overlays";
pub const MANIFEST_FILE: &str = "run_manifest.json";
pub const REPORT_FILE: &str = "run_report.json";

const MAX_RUN_DIR_ATTEMPTS: u32 = 100;

/// Create a fresh `run_<unix_ms>` directory under `output_root`. An existing directory is
/// never reused: a clash within the same millisecond gets a `_<n>` suffix instead.
pub fn create_run_dir(output_root: &Path, started_unix: f64) -> io::Result<PathBuf> {
    fs::create_dir_all(output_root)?;
    let started_ms = (started_unix * 1000.0).round() as u128;
    for attempt in 0..MAX_RUN_DIR_ATTEMPTS {
        let name = if attempt == 0 {
            format!("run_{started_ms}")
        } else {
            format!("run_{started_ms}_{attempt}")
        };
        let run_dir = output_root.join(name);
        match fs::create_dir(&run_dir) {
            Ok(()) => {
                fs::create_dir(run_dir.join(IMAGES_DIR))?;
                fs::create_dir(run_dir.join(LABELS_DIR))?;
                return Ok(run_dir);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free run directory for run_{started_ms}"),
    ))
}

pub fn write_manifest(run_dir: &Path, manifest: &RunManifest) -> io::Result<()> {
    manifest
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    write_json_new(&run_dir.join(MANIFEST_FILE), manifest)
}

pub fn write_report(run_dir: &Path, report: &RunReport) -> io::Result<()> {
    write_json_new(&run_dir.join(REPORT_FILE), report)
}

/// Pretty JSON with trailing newline; refuses to replace an existing file.
fn write_json_new<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    create_new_with(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        writer.write_all(b"\n")
    })
}

fn write_bytes_new(path: &Path, bytes: &[u8]) -> io::Result<()> {
    create_new_with(path, |writer| writer.write_all(bytes))
}

/// Create `path` (never replacing an existing file) and fill it through `fill`.
/// Any failure once the file exists removes it again, so no truncated file is left.
fn create_new_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let mut writer = BufWriter::new(file);
    let result = fill(&mut writer)
        .and_then(|()| writer.flush())
        .and_then(|()| writer.get_ref().sync_all());
    if result.is_err() {
        drop(writer);
        let _ = fs::remove_file(path);
    }
    result
}

/// Move a fully written temporary file onto `target`, refusing to replace an existing one.
/// The temporary file is removed on failure.
fn publish(partial: &Path, target: &Path) -> io::Result<()> {
    if target.exists() {
        let _ = fs::remove_file(partial);
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ));
    }
    fs::rename(partial, target).inspect_err(|_| {
        let _ = fs::remove_file(partial);
    })
}

/// Label path matching a relative image path (`images/A/b.png` -> `labels/A/b.json`).
pub fn label_path_for(run_dir: &Path, image: &str) -> PathBuf {
    let image = Path::new(image);
    let rel = image
        .strip_prefix(IMAGES_DIR)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| image.file_name().map(PathBuf::from).unwrap_or_default());
    run_dir.join(LABELS_DIR).join(rel).with_extension("json")
}

/// File-based recorder writing PNG + JSON pairs into a run directory.
pub struct DatasetRecorder {
    pub run_dir: PathBuf,
    counters: HashMap<String, u32>,
}

impl DatasetRecorder {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            counters: HashMap::new(),
        }
    }

    fn encode_png(record: &FrameRecord) -> io::Result<Vec<u8>> {
        let (w, h) = record.metadata.frame.size;
        let img = image::RgbaImage::from_raw(w, h, record.rgba.to_vec()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("pixel buffer does not match {w}x{h}"),
            )
        })?;
        let mut png = Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png)
            .map_err(io::Error::other)?;
        Ok(png.into_inner())
    }

    fn write_image(&self, image_path: &Path, png: &[u8]) -> io::Result<()> {
        let partial = image_path.with_extension("png.partial");
        write_bytes_new(&partial, png)?;
        publish(&partial, image_path)
    }

    fn write_label(&self, label_path: &Path, record: &FrameRecord) -> io::Result<()> {
        let partial = label_path.with_extension("json.partial");
        write_json_new(&partial, record.metadata)?;
        publish(&partial, label_path)
    }
}

impl Recorder for DatasetRecorder {
    fn next_image_path(&self, target: &TargetRef) -> String {
        let n = self.counters.get(&target.model).copied().unwrap_or(0) + 1;
        format!(
            "{IMAGES_DIR}/{}/{}_{:04}.png",
            target.class, target.model, n
        )
    }

    fn record(&mut self, record: &FrameRecord) -> io::Result<()> {
        let meta = record.metadata;
        meta.validate()
            .map_err(|e| io::Error::other(format!("validation failed: {e}")))?;

        let image_path = self.run_dir.join(&meta.frame.image);
        let label_path = label_path_for(&self.run_dir, &meta.frame.image);
        if image_path.exists() || label_path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("capture {} would overwrite existing files", meta.capture_id),
            ));
        }
        for dir in [image_path.parent(), label_path.parent()].into_iter().flatten() {
            fs::create_dir_all(dir)?;
        }

        let png = Self::encode_png(record)?;
        self.write_image(&image_path, &png)?;
        // Label goes last; without it the image is an orphan and is removed.
        if let Err(err) = self.write_label(&label_path, record) {
            let _ = fs::remove_file(&image_path);
            return Err(err);
        }
        *self.counters.entry(meta.target.model.clone()).or_insert(0) += 1;
        tracing::debug!(
            capture_id = meta.capture_id,
            image = %meta.frame.image,
            objects = meta.ground_truth.objects.len(),
            "capture written"
        );
        Ok(())
    }
}
