use std::path::{Path, PathBuf};

use anyhow::Context;
use capture_orchestrator::{
    default_targets, CaptureOptions, PlanConfig, TargetGroup, WriteFailurePolicy,
};
use data_contracts::scene::{EnvironmentVariant, ObjectClass};
use serde::Deserialize;
use sim_core::prelude::SettlePolicy;

const DEFAULT_CONFIG_NAME: &str = "twin-capture.toml";
const CONFIG_ENV: &str = "TWIN_CAPTURE_CONFIG";

/// Orbit, settle and write settings for `synthetic_capture`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    pub radius: f64,
    pub heights: Vec<f64>,
    pub angles_deg: Vec<f64>,
    pub shots_per_pose: u32,
    pub settle_min_steps: u32,
    pub settle_max_steps: u32,
    pub write_failure: WriteFailurePolicy,
    pub max_captures: Option<u32>,
    pub overlays: bool,
    pub environments: Vec<EnvironmentVariant>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        let plan = PlanConfig::default();
        let settle = SettlePolicy::default();
        Self {
            radius: plan.radius,
            heights: plan.heights,
            angles_deg: plan.angles_deg,
            shots_per_pose: plan.shots_per_pose,
            settle_min_steps: settle.min_steps,
            settle_max_steps: settle.max_steps,
            write_failure: WriteFailurePolicy::default(),
            max_captures: None,
            overlays: false,
            environments: plan.environments,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolConfig {
    pub output_root: PathBuf,
    /// Used when neither `--seed` nor `CAPTURE_SEED` is given.
    pub seed: Option<u64>,
    pub capture: CaptureSettings,
    pub targets: Vec<TargetGroup>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("dataset"),
            seed: None,
            capture: CaptureSettings::default(),
            targets: default_targets(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ToolConfigFile {
    output_root: Option<String>,
    seed: Option<u64>,
    capture: Option<CaptureSection>,
    targets: Option<Vec<TargetSection>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureSection {
    radius: Option<f64>,
    heights: Option<Vec<f64>>,
    angles_deg: Option<Vec<f64>>,
    shots_per_pose: Option<u32>,
    settle_min_steps: Option<u32>,
    settle_max_steps: Option<u32>,
    on_write_failure: Option<String>,
    max_captures: Option<u32>,
    overlays: Option<bool>,
    environments: Option<Vec<EnvironmentVariant>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetSection {
    class: ObjectClass,
    models: Vec<String>,
}

impl ToolConfig {
    /// `$TWIN_CAPTURE_CONFIG` if set, else `twin-capture.toml` in the working directory,
    /// else defaults.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME));
        let cfg = Self::from_path(&path).unwrap_or_default();
        cfg.warn_if_invalid();
        cfg
    }

    /// `None` when the file is absent or unreadable; parse errors are logged.
    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::read(path) {
            Ok(cfg) => Some(cfg),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "ignoring tools config");
                None
            }
        }
    }

    /// Strict variant for an explicitly requested file.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let file: ToolConfigFile =
            toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
        Self::from_file(file)
    }

    fn from_file(file: ToolConfigFile) -> anyhow::Result<Self> {
        let defaults = CaptureSettings::default();
        let section = file.capture.unwrap_or_default();
        let write_failure = match section.on_write_failure {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            None => defaults.write_failure,
        };
        let capture = CaptureSettings {
            radius: section.radius.unwrap_or(defaults.radius),
            heights: section.heights.unwrap_or(defaults.heights),
            angles_deg: section.angles_deg.unwrap_or(defaults.angles_deg),
            shots_per_pose: section.shots_per_pose.unwrap_or(defaults.shots_per_pose),
            settle_min_steps: section.settle_min_steps.unwrap_or(defaults.settle_min_steps),
            settle_max_steps: section.settle_max_steps.unwrap_or(defaults.settle_max_steps),
            write_failure,
            max_captures: section.max_captures,
            overlays: section.overlays.unwrap_or(defaults.overlays),
            environments: section.environments.unwrap_or(defaults.environments),
        };
        let targets = file
            .targets
            .map(|groups| {
                groups
                    .into_iter()
                    .map(|t| TargetGroup {
                        class: t.class,
                        models: t.models,
                    })
                    .collect()
            })
            .unwrap_or_else(default_targets);

        Ok(ToolConfig {
            output_root: file
                .output_root
                .map(|v| expand_path(&v))
                .unwrap_or_else(|| PathBuf::from("dataset")),
            seed: file.seed,
            capture,
            targets,
        })
    }

    pub fn plan_config(&self) -> PlanConfig {
        PlanConfig {
            targets: self.targets.clone(),
            radius: self.capture.radius,
            heights: self.capture.heights.clone(),
            angles_deg: self.capture.angles_deg.clone(),
            shots_per_pose: self.capture.shots_per_pose,
            environments: self.capture.environments.clone(),
        }
    }

    pub fn capture_options(&self, seed: u64) -> CaptureOptions {
        CaptureOptions {
            settle: SettlePolicy {
                min_steps: self.capture.settle_min_steps,
                max_steps: self.capture.settle_max_steps,
            },
            write_failure: self.capture.write_failure,
            max_captures: self.capture.max_captures,
            seed,
        }
    }

    pub fn warn_if_invalid(&self) {
        let c = &self.capture;
        if self.output_root.as_os_str().is_empty() {
            tracing::warn!("tools config: output_root is empty; captures land in the working directory");
        }
        if !(c.radius.is_finite() && c.radius > 0.0) {
            tracing::warn!(radius = c.radius, "tools config: capture.radius should be positive");
        }
        if c.heights.is_empty() || c.angles_deg.is_empty() {
            tracing::warn!("tools config: capture.heights or capture.angles_deg is empty; no scenes will be planned");
        }
        if c.settle_max_steps < c.settle_min_steps {
            tracing::warn!(
                min = c.settle_min_steps,
                max = c.settle_max_steps,
                "tools config: settle_max_steps below settle_min_steps; the settle bound is raised to settle_min_steps"
            );
        }
        if self.targets.iter().all(|g| g.models.is_empty()) {
            tracing::warn!("tools config: no target models configured");
        }
    }
}

pub fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

/// Substitute `${VAR}` from the environment; unknown variables are left as written.
pub fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match std::env::var(key) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => out.push_str(&format!("${{{key}}}")),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
