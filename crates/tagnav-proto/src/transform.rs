use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// One marker transform as reported by the tracker (sensor frame, meters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerTransform {
    #[serde(default)]
    pub frame_id: String,
    pub marker_id: String,
    pub translation: Vec3,
}

/// A single delivery from the tracker. May be empty when nothing is in view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformBatch {
    #[serde(default)]
    pub transforms: Vec<MarkerTransform>,
}

impl TransformBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(marker_id: impl Into<String>, translation: Vec3) -> Self {
        Self {
            transforms: vec![MarkerTransform {
                frame_id: String::new(),
                marker_id: marker_id.into(),
                translation,
            }],
        }
    }

    /// Stamps every transform with the delivery time.
    pub fn into_observations(self, received_at: OffsetDateTime) -> Vec<Observation> {
        self.transforms
            .into_iter()
            .map(|t| Observation {
                marker_id: t.marker_id,
                translation: t.translation,
                received_at,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub marker_id: String,
    pub translation: Vec3,
    pub received_at: OffsetDateTime,
}

impl Observation {
    pub fn now(marker_id: impl Into<String>, translation: Vec3) -> Self {
        Self {
            marker_id: marker_id.into(),
            translation,
            received_at: OffsetDateTime::now_utc(),
        }
    }
}
