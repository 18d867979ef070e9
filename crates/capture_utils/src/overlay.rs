use data_contracts::scene::ObjectClass;
use data_contracts::CaptureMetadata;
use image::{Rgba, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{IMAGES_DIR, LABELS_DIR, OVERLAYS_DIR};

fn class_color(class: ObjectClass) -> Rgba<u8> {
    match class {
        ObjectClass::Stop => Rgba([255, 64, 192, 255]),
        ObjectClass::Parking => Rgba([64, 255, 128, 255]),
        ObjectClass::TrafficLight => Rgba([255, 220, 0, 255]),
    }
}

fn collect_json(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_json(&path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }
}

/// Draw every label's pixel box onto a copy of its image under `overlays/`.
/// Unreadable labels or images are skipped. Returns the number of overlays written.
pub fn generate_overlays(run_dir: &Path) -> anyhow::Result<usize> {
    let mut labels = Vec::new();
    collect_json(&run_dir.join(LABELS_DIR), &mut labels);
    labels.sort();
    let out_root = run_dir.join(OVERLAYS_DIR);
    fs::create_dir_all(&out_root)?;

    let mut written = 0;
    for path in labels {
        let Ok(bytes) = fs::read(&path) else { continue };
        let Ok(meta) = serde_json::from_slice::<CaptureMetadata>(&bytes) else {
            continue;
        };
        if !meta.frame.image_present {
            continue;
        }
        let img_path = run_dir.join(&meta.frame.image);
        let Ok(mut img) = image::open(&img_path).map(|im| im.into_rgba8()) else {
            continue;
        };
        let (w, h) = img.dimensions();
        let clamp =
            |v: f32, max: u32| -> u32 { v.max(0.0).min(max.saturating_sub(1) as f32) as u32 };
        for object in &meta.ground_truth.objects {
            let Some(b) = object.bbox_px else { continue };
            let bbox = [clamp(b[0], w), clamp(b[1], h), clamp(b[2], w), clamp(b[3], h)];
            draw_rect(&mut img, bbox, class_color(object.class), 2);
        }
        let rel = Path::new(&meta.frame.image);
        let rel = rel.strip_prefix(IMAGES_DIR).unwrap_or(rel);
        let out = out_root.join(rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        if img.save(&out).is_ok() {
            written += 1;
        }
    }
    Ok(written)
}

/// Draw a rectangle border with given thickness, growing inward.
pub fn draw_rect(img: &mut RgbaImage, bbox_px: [u32; 4], color: Rgba<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx1 >= w || yy1 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}
