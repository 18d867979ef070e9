use crate::scene::{EnvironmentVariant, ObjectClass, Pose, TargetRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pinhole intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
}

impl CameraIntrinsics {
    /// Square-pixel intrinsics from a horizontal field of view, principal point centred.
    pub fn from_fov(width: u32, height: u32, hfov_deg: f32) -> Self {
        let f = (width as f32 * 0.5) / (hfov_deg.to_radians() * 0.5).tan();
        Self {
            fx: f,
            fy: f,
            cx: width as f32 * 0.5,
            cy: height as f32 * 0.5,
            width,
            height,
        }
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::from_fov(640, 480, 62.0)
    }
}

/// Metadata of one sensor observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFrame {
    pub capture_id: u64,
    pub tick: u64,
    pub sim_time: f64,
    pub image: String,
    pub image_present: bool,
    pub size: (u32, u32),
    pub intrinsics: CameraIntrinsics,
    pub sensor_pose: Pose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLabel {
    pub model: String,
    pub class: ObjectClass,
    pub center_world: [f32; 3],
    pub distance_m: f32,
    pub bbox_px: Option<[f32; 4]>,
    pub bbox_norm: Option<[f32; 4]>,
}

/// Annotations derived from simulator state at the frame's tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthLabel {
    pub capture_id: u64,
    pub tick: u64,
    pub sim_time: f64,
    pub objects: Vec<ObjectLabel>,
}

/// Persisted label document: one per capture, next to its image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub capture_id: u64,
    pub scene_id: u64,
    pub seed: u64,
    pub unix_time: f64,
    pub target: TargetRef,
    pub environment: EnvironmentVariant,
    pub frame: CaptureFrame,
    pub ground_truth: GroundTruthLabel,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bbox_px invalid order or non-finite: {0:?}")]
    InvalidBboxPx([f32; 4]),
    #[error("bbox_norm out of range: {0:?}")]
    InvalidBboxNorm([f32; 4]),
    #[error("missing image path for present frame")]
    MissingImage,
    #[error("capture id mismatch: frame {frame}, label {label}")]
    CaptureIdMismatch { frame: u64, label: u64 },
    #[error("tick mismatch: frame {frame}, label {label}")]
    TickMismatch { frame: u64, label: u64 },
    #[error("timestamp mismatch: frame {frame}, label {label}")]
    TimestampMismatch { frame: f64, label: f64 },
}

impl ObjectLabel {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(px) = self.bbox_px {
            if px.iter().any(|v| !v.is_finite()) || px[0] > px[2] || px[1] > px[3] {
                return Err(ValidationError::InvalidBboxPx(px));
            }
        }
        if let Some(norm) = self.bbox_norm {
            let in_range = norm.iter().all(|v| !v.is_nan() && *v >= 0.0 && *v <= 1.0);
            if !in_range || norm[0] > norm[2] || norm[1] > norm[3] {
                return Err(ValidationError::InvalidBboxNorm(norm));
            }
        }
        Ok(())
    }
}

impl GroundTruthLabel {
    /// Checks that this label was taken from the same capture event and simulation tick as `frame`.
    pub fn check_alignment(&self, frame: &CaptureFrame) -> Result<(), ValidationError> {
        if self.capture_id != frame.capture_id {
            return Err(ValidationError::CaptureIdMismatch {
                frame: frame.capture_id,
                label: self.capture_id,
            });
        }
        if self.tick != frame.tick {
            return Err(ValidationError::TickMismatch {
                frame: frame.tick,
                label: self.tick,
            });
        }
        if self.sim_time.to_bits() != frame.sim_time.to_bits() {
            return Err(ValidationError::TimestampMismatch {
                frame: frame.sim_time,
                label: self.sim_time,
            });
        }
        Ok(())
    }
}

impl CaptureMetadata {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.frame.image_present && self.frame.image.trim().is_empty() {
            return Err(ValidationError::MissingImage);
        }
        if self.capture_id != self.frame.capture_id {
            return Err(ValidationError::CaptureIdMismatch {
                frame: self.frame.capture_id,
                label: self.capture_id,
            });
        }
        self.ground_truth.check_alignment(&self.frame)?;
        for label in &self.ground_truth.objects {
            label.validate()?;
        }
        Ok(())
    }

    /// True when at least one object carries a usable box.
    pub fn has_boxes(&self) -> bool {
        self.ground_truth
            .objects
            .iter()
            .any(|o| o.bbox_norm.is_some() || o.bbox_px.is_some())
    }
}
