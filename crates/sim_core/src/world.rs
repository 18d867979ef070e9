use data_contracts::scene::{ObjectClass, Pose};

/// Height of a sign plate centre above its model origin.
pub const DEFAULT_PLATE_HEIGHT: f64 = 0.2;
/// Half-size of the square sign plate.
pub const DEFAULT_PLATE_HALF_EXTENT: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct SignModel {
    pub name: String,
    pub class: ObjectClass,
    pub pose: Pose,
    pub plate_height: f64,
    pub half_extent: f64,
}

impl SignModel {
    pub fn new(name: impl Into<String>, class: ObjectClass, x: f64, y: f64) -> Self {
        Self {
            name: name.into(),
            class,
            pose: Pose::from_yaw([x, y, 0.0], 0.0),
            plate_height: DEFAULT_PLATE_HEIGHT,
            half_extent: DEFAULT_PLATE_HALF_EXTENT,
        }
    }

    pub fn plate_center(&self) -> [f64; 3] {
        let [x, y, z] = self.pose.position;
        [x, y, z + self.plate_height]
    }
}

/// Static set of labelled models on the track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackWorld {
    pub signs: Vec<SignModel>,
}

impl TrackWorld {
    pub fn new(signs: Vec<SignModel>) -> Self {
        Self { signs }
    }

    /// Sign layout of the full-object track map.
    pub fn competition_track() -> Self {
        let mut signs = Vec::new();
        let stops = [
            ("STOP_A", 2.0, 1.0),
            ("STOP_C", 6.0, 1.0),
            ("STOP_E", 10.0, 1.0),
            ("STOP_G", 14.0, 1.0),
            ("STOP_W", 2.0, 8.0),
            ("STOP_Y", 6.0, 8.0),
            ("STOP_Z", 10.0, 8.0),
        ];
        for (name, x, y) in stops {
            signs.push(SignModel::new(name, ObjectClass::Stop, x, y));
        }
        for (i, x) in [2.0, 6.0, 10.0, 14.0].into_iter().enumerate() {
            signs.push(SignModel::new(
                format!("PRK_P{}", i + 1),
                ObjectClass::Parking,
                x,
                15.0,
            ));
        }
        signs.push(SignModel::new("TL_1", ObjectClass::TrafficLight, 14.0, 8.0));
        signs.push(SignModel::new("TL_2", ObjectClass::TrafficLight, 18.0, 1.0));
        Self { signs }
    }

    pub fn find(&self, name: &str) -> Option<&SignModel> {
        self.signs.iter().find(|s| s.name == name)
    }
}
