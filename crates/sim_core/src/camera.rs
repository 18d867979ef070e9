//! Pinhole camera mounted on the vehicle, looking along the vehicle's yaw.

use data_contracts::capture::CameraIntrinsics;
use data_contracts::scene::Pose;

const NEAR_PLANE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub intrinsics: CameraIntrinsics,
    /// Camera height above the vehicle origin.
    pub mount_height: f64,
    /// Objects further than this along the optical axis are not labelled.
    pub max_label_depth: f64,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            intrinsics: CameraIntrinsics::default(),
            mount_height: 0.0,
            max_label_depth: 4.0,
        }
    }
}

/// Camera-frame basis: forward along yaw, left, and world up.
struct Basis {
    origin: [f64; 3],
    forward: [f64; 3],
    left: [f64; 3],
    up: [f64; 3],
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

impl CameraRig {
    pub fn sensor_pose(&self, vehicle: &Pose) -> Pose {
        let [x, y, z] = vehicle.position;
        Pose {
            position: [x, y, z + self.mount_height],
            orientation: vehicle.orientation,
        }
    }

    fn basis(&self, vehicle: &Pose) -> Basis {
        let (sin, cos) = vehicle.yaw().sin_cos();
        Basis {
            origin: self.sensor_pose(vehicle).position,
            forward: [cos, sin, 0.0],
            left: [-sin, cos, 0.0],
            up: [0.0, 0.0, 1.0],
        }
    }

    /// Depth of `point` along the optical axis.
    pub fn depth(&self, vehicle: &Pose, point: [f64; 3]) -> f64 {
        let b = self.basis(vehicle);
        dot(sub(point, b.origin), b.forward)
    }

    /// Pixel coordinates of a world point; `None` when it sits behind the near plane.
    pub fn project(&self, vehicle: &Pose, point: [f64; 3]) -> Option<[f32; 2]> {
        let b = self.basis(vehicle);
        project_with(&b, &self.intrinsics, point)
    }

    /// Bounding box of a camera-facing square of half-size `half_extent` centred at `center`,
    /// clipped to the image. Returns `(bbox_px, bbox_norm)` or `None` when nothing is visible.
    pub fn label_box(
        &self,
        vehicle: &Pose,
        center: [f64; 3],
        half_extent: f64,
    ) -> Option<([f32; 4], [f32; 4])> {
        let b = self.basis(vehicle);
        let depth = dot(sub(center, b.origin), b.forward);
        if depth <= NEAR_PLANE || depth > self.max_label_depth {
            return None;
        }
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for (sl, su) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
            let corner = [
                center[0] + b.left[0] * half_extent * sl + b.up[0] * half_extent * su,
                center[1] + b.left[1] * half_extent * sl + b.up[1] * half_extent * su,
                center[2] + b.left[2] * half_extent * sl + b.up[2] * half_extent * su,
            ];
            let p = project_with(&b, &self.intrinsics, corner)?;
            min = [min[0].min(p[0]), min[1].min(p[1])];
            max = [max[0].max(p[0]), max[1].max(p[1])];
        }
        let w = self.intrinsics.width as f32;
        let h = self.intrinsics.height as f32;
        let px = [
            min[0].clamp(0.0, w),
            min[1].clamp(0.0, h),
            max[0].clamp(0.0, w),
            max[1].clamp(0.0, h),
        ];
        if px[0] >= px[2] || px[1] >= px[3] {
            return None;
        }
        let norm = [px[0] / w, px[1] / h, px[2] / w, px[3] / h];
        Some((px, norm))
    }
}

fn project_with(b: &Basis, k: &CameraIntrinsics, point: [f64; 3]) -> Option<[f32; 2]> {
    let d = sub(point, b.origin);
    let depth = dot(d, b.forward);
    if depth <= NEAR_PLANE {
        return None;
    }
    let u = k.cx as f64 - k.fx as f64 * dot(d, b.left) / depth;
    let v = k.cy as f64 - k.fy as f64 * dot(d, b.up) / depth;
    Some([u as f32, v as f32])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_on_axis_projects_to_principal_point() {
        let rig = CameraRig::default();
        let pose = Pose::from_yaw([0.0, 0.0, 0.0], std::f64::consts::FRAC_PI_2);
        let p = rig.project(&pose, [0.0, 2.0, 0.0]).expect("in front");
        assert!((p[0] - rig.intrinsics.cx).abs() < 1e-3);
        assert!((p[1] - rig.intrinsics.cy).abs() < 1e-3);
    }

    #[test]
    fn left_and_up_map_to_smaller_pixel_coords() {
        let rig = CameraRig::default();
        let pose = Pose::from_yaw([0.0, 0.0, 0.0], 0.0);
        let p = rig.project(&pose, [2.0, 0.5, 0.5]).expect("in front");
        assert!(p[0] < rig.intrinsics.cx);
        assert!(p[1] < rig.intrinsics.cy);
    }

    #[test]
    fn behind_camera_is_not_projected() {
        let rig = CameraRig::default();
        let pose = Pose::from_yaw([0.0, 0.0, 0.0], 0.0);
        assert!(rig.project(&pose, [-1.0, 0.0, 0.0]).is_none());
        assert!(rig.label_box(&pose, [-1.0, 0.0, 0.0], 0.1).is_none());
    }

    #[test]
    fn label_box_is_centred_and_normalized() {
        let rig = CameraRig::default();
        let pose = Pose::from_yaw([0.0, 0.0, 0.0], 0.0);
        let (px, norm) = rig.label_box(&pose, [1.2, 0.0, 0.0], 0.1).expect("visible");
        let cx = (px[0] + px[2]) * 0.5;
        let cy = (px[1] + px[3]) * 0.5;
        assert!((cx - rig.intrinsics.cx).abs() < 1e-2);
        assert!((cy - rig.intrinsics.cy).abs() < 1e-2);
        assert!(norm.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(norm[0] < norm[2] && norm[1] < norm[3]);
    }

    #[test]
    fn label_box_respects_max_depth_and_image_bounds() {
        let rig = CameraRig::default();
        let pose = Pose::from_yaw([0.0, 0.0, 0.0], 0.0);
        assert!(rig.label_box(&pose, [10.0, 0.0, 0.0], 0.1).is_none());
        // Far off to the side: projects outside the image entirely.
        assert!(rig.label_box(&pose, [1.0, 5.0, 0.0], 0.1).is_none());
    }
}
