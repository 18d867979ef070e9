//! Scene planning: orbit the vehicle around each target sign, facing it.

use data_contracts::scene::{EnvironmentVariant, ObjectClass, Pose, SceneConfiguration, TargetRef};
use sim_core::prelude::Simulator;
use std::num::ParseFloatError;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup {
    pub class: ObjectClass,
    pub models: Vec<String>,
}

impl TargetGroup {
    pub fn new(class: ObjectClass, models: &[&str]) -> Self {
        Self {
            class,
            models: models.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Sign models placed on the full-object track.
pub fn default_targets() -> Vec<TargetGroup> {
    vec![
        TargetGroup::new(
            ObjectClass::Stop,
            &["STOP_A", "STOP_C", "STOP_E", "STOP_G", "STOP_W", "STOP_Y", "STOP_Z"],
        ),
        TargetGroup::new(
            ObjectClass::Parking,
            &["PRK_P1", "PRK_P2", "PRK_P3", "PRK_P4"],
        ),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    pub targets: Vec<TargetGroup>,
    /// Distance from the sign, metres.
    pub radius: f64,
    /// Vehicle heights relative to sign z, metres.
    pub heights: Vec<f64>,
    /// Angles around the sign, degrees.
    pub angles_deg: Vec<f64>,
    pub shots_per_pose: u32,
    pub environments: Vec<EnvironmentVariant>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            radius: 1.2,
            heights: vec![0.15, 0.25],
            angles_deg: vec![-60.0, -40.0, -20.0, 0.0, 20.0, 40.0, 60.0],
            shots_per_pose: 1,
            environments: vec![EnvironmentVariant::default()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutcome {
    pub scenes: Vec<SceneConfiguration>,
    /// Targets the simulator could not locate; they produce no scenes.
    pub missing_models: Vec<String>,
}

/// Parse a comma list like `"0.15, 0.25,"`, ignoring blank entries.
pub fn parse_list(raw: &str) -> Result<Vec<f64>, ParseFloatError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<f64>)
        .collect()
}

/// Vehicle pose on a circle of `radius` around `sign`, at `height` above it, facing the sign.
pub fn orbit_pose(sign: &Pose, radius: f64, height: f64, angle_rad: f64) -> Pose {
    let [sx, sy, sz] = sign.position;
    let cx = sx + radius * angle_rad.cos();
    let cy = sy + radius * angle_rad.sin();
    let yaw = (sy - cy).atan2(sx - cx);
    Pose::from_yaw([cx, cy, sz + height], yaw)
}

/// Expand the configuration into scenes, looking up each sign's pose in the simulator.
/// Scene ids run from 1 in emission order.
pub fn plan_scenes<S: Simulator + ?Sized>(sim: &mut S, cfg: &PlanConfig) -> PlanOutcome {
    let default_env = [EnvironmentVariant::default()];
    let environments: &[EnvironmentVariant] = if cfg.environments.is_empty() {
        &default_env
    } else {
        &cfg.environments
    };
    let mut outcome = PlanOutcome::default();
    let mut next_id = 1u64;
    for group in &cfg.targets {
        for model in &group.models {
            let sign = match sim.model_pose(model) {
                Ok(pose) => pose,
                Err(err) => {
                    warn!(model = %model, error = %err, "could not find sign model; skipping");
                    outcome.missing_models.push(model.clone());
                    continue;
                }
            };
            for &height in &cfg.heights {
                for &angle in &cfg.angles_deg {
                    let vehicle_pose = orbit_pose(&sign, cfg.radius, height, angle.to_radians());
                    for env in environments {
                        outcome.scenes.push(SceneConfiguration {
                            scene_id: next_id,
                            target: TargetRef {
                                class: group.class,
                                model: model.clone(),
                            },
                            vehicle_pose,
                            environment: *env,
                            shots: cfg.shots_per_pose.max(1),
                        });
                        next_id += 1;
                    }
                }
            }
        }
    }
    outcome
}
