//! Deterministic in-process stand-in for the track simulator.
//!
//! Knows the labelled sign models, settles the vehicle after each pose change, renders a
//! flat-shaded camera frame and derives ground truth by projecting every sign through the
//! vehicle camera. Output depends only on the seed and the sequence of calls.

use std::collections::HashSet;

use data_contracts::capture::ObjectLabel;
use data_contracts::scene::{
    EnvironmentVariant, Lighting, ObjectClass, Pose, SceneConfiguration, TrafficLightState, Weather,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::CameraRig;
use crate::interfaces::{GroundTruth, SensorFrame, SimError, SimResult, SimStatus, Simulator};
use crate::world::TrackWorld;

const FOG_GRAY: [u8; 3] = [180, 180, 180];
const NOISE_AMPLITUDE: i16 = 4;

pub struct TwinSim {
    world: TrackWorld,
    rig: CameraRig,
    seed: u64,
    dt: f64,
    settle_steps: u32,
    settle_jitter: u32,
    unstable: HashSet<String>,
    tick: u64,
    vehicle: Pose,
    environment: EnvironmentVariant,
    /// Steps left until rest; `None` never settles.
    settle_remaining: Option<u32>,
}

impl TwinSim {
    pub fn new(world: TrackWorld, seed: u64) -> Self {
        Self {
            world,
            rig: CameraRig::default(),
            seed,
            dt: 0.01,
            settle_steps: 10,
            settle_jitter: 5,
            unstable: HashSet::new(),
            tick: 0,
            vehicle: Pose::default(),
            environment: EnvironmentVariant::default(),
            settle_remaining: Some(0),
        }
    }

    pub fn with_rig(mut self, rig: CameraRig) -> Self {
        self.rig = rig;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Base steps to rest after `apply`, plus up to `jitter` seeded extra steps.
    pub fn with_settle_steps(mut self, steps: u32, jitter: u32) -> Self {
        self.settle_steps = steps;
        self.settle_jitter = jitter;
        self
    }

    /// Scenes framed on `model` never come to rest.
    pub fn with_unstable_model(mut self, model: impl Into<String>) -> Self {
        self.unstable.insert(model.into());
        self
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn vehicle_pose(&self) -> Pose {
        self.vehicle
    }

    fn sim_time(&self) -> f64 {
        self.tick as f64 * self.dt
    }

    fn settle_delay(&self, scene_id: u64) -> u32 {
        if self.settle_jitter == 0 {
            return self.settle_steps;
        }
        let mut rng = StdRng::seed_from_u64(self.seed ^ scene_id.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.settle_steps + rng.gen_range(0..=self.settle_jitter)
    }

    fn visible_objects(&self) -> Vec<ObjectLabel> {
        let eye = self.rig.sensor_pose(&self.vehicle).position;
        let mut objects: Vec<ObjectLabel> = self
            .world
            .signs
            .iter()
            .filter_map(|sign| {
                let center = sign.plate_center();
                let (bbox_px, bbox_norm) =
                    self.rig.label_box(&self.vehicle, center, sign.half_extent)?;
                let distance = ((center[0] - eye[0]).powi(2)
                    + (center[1] - eye[1]).powi(2)
                    + (center[2] - eye[2]).powi(2))
                .sqrt();
                Some(ObjectLabel {
                    model: sign.name.clone(),
                    class: sign.class,
                    center_world: [center[0] as f32, center[1] as f32, center[2] as f32],
                    distance_m: distance as f32,
                    bbox_px: Some(bbox_px),
                    bbox_norm: Some(bbox_norm),
                })
            })
            .collect();
        objects.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.model.cmp(&b.model))
        });
        objects
    }

    fn plate_color(&self, class: ObjectClass) -> [u8; 3] {
        match class {
            ObjectClass::Stop => [200, 20, 30],
            ObjectClass::Parking => [20, 60, 200],
            ObjectClass::TrafficLight => match self.environment.traffic_light {
                Some(TrafficLightState::Red) => [230, 30, 30],
                Some(TrafficLightState::Yellow) => [240, 200, 20],
                Some(TrafficLightState::Green) => [30, 200, 60],
                None => [40, 40, 40],
            },
        }
    }

    fn render(&self) -> Vec<u8> {
        let k = self.rig.intrinsics;
        let (w, h) = (k.width as usize, k.height as usize);
        let (sky, ground) = match self.environment.lighting {
            Lighting::Day => ([135, 190, 235], [90, 90, 90]),
            Lighting::Dusk => ([220, 140, 90], [70, 60, 55]),
            Lighting::Night => ([20, 24, 40], [25, 25, 28]),
        };
        let horizon = k.cy.max(0.0) as usize;
        let mut rgb = vec![[0u8; 3]; w * h];
        for (row, chunk) in rgb.chunks_mut(w).enumerate() {
            let base = if row < horizon { sky } else { ground };
            chunk.fill(base);
        }

        // Far to near, so closer plates overdraw.
        for object in self.visible_objects().iter().rev() {
            let Some(px) = object.bbox_px else { continue };
            let color = self.plate_color(object.class);
            let x0 = px[0].floor().max(0.0) as usize;
            let y0 = px[1].floor().max(0.0) as usize;
            let x1 = (px[2].ceil() as usize).min(w);
            let y1 = (px[3].ceil() as usize).min(h);
            for y in y0..y1 {
                rgb[y * w + x0..y * w + x1].fill(color);
            }
        }

        let fog = self.environment.weather == Weather::Fog;
        let mut rng = StdRng::seed_from_u64(self.seed ^ self.tick.wrapping_mul(0xD1B5_4A32_D192_ED03));
        let mut out = Vec::with_capacity(w * h * 4);
        for px in rgb {
            for (c, channel) in px.into_iter().enumerate() {
                let mut v = channel as i16;
                if fog {
                    v = (v + FOG_GRAY[c] as i16) / 2;
                }
                v += rng.gen_range(-NOISE_AMPLITUDE..=NOISE_AMPLITUDE);
                out.push(v.clamp(0, 255) as u8);
            }
            out.push(255);
        }
        out
    }
}

impl Simulator for TwinSim {
    fn name(&self) -> &str {
        "twin"
    }

    fn model_pose(&mut self, model: &str) -> SimResult<Pose> {
        self.world
            .find(model)
            .map(|sign| sign.pose)
            .ok_or_else(|| SimError::ModelNotFound(model.to_string()))
    }

    fn apply(&mut self, scene: &SceneConfiguration) -> SimResult<()> {
        let pose = scene.vehicle_pose;
        if pose
            .position
            .iter()
            .chain(pose.orientation.iter())
            .any(|v| !v.is_finite())
        {
            return Err(SimError::Rejected {
                scene_id: scene.scene_id,
                reason: "non-finite vehicle pose".into(),
            });
        }
        self.vehicle = pose;
        self.environment = scene.environment;
        self.settle_remaining = if self.unstable.contains(&scene.target.model) {
            None
        } else {
            Some(self.settle_delay(scene.scene_id))
        };
        Ok(())
    }

    fn step(&mut self) -> SimResult<SimStatus> {
        self.tick += 1;
        if let Some(n) = self.settle_remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
        Ok(SimStatus {
            tick: self.tick,
            sim_time: self.sim_time(),
            settled: self.settle_remaining == Some(0),
        })
    }

    fn capture_frame(&mut self) -> SimResult<SensorFrame> {
        let k = self.rig.intrinsics;
        Ok(SensorFrame {
            tick: self.tick,
            sim_time: self.sim_time(),
            rgba: self.render(),
            size: (k.width, k.height),
            intrinsics: k,
            sensor_pose: self.rig.sensor_pose(&self.vehicle),
        })
    }

    fn ground_truth(&mut self) -> SimResult<GroundTruth> {
        Ok(GroundTruth {
            tick: self.tick,
            sim_time: self.sim_time(),
            objects: self.visible_objects(),
        })
    }
}
