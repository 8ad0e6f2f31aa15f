use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tagnav_proto::Observation;

use crate::{NavError, INCH_M};

/// World-frame 2-D position estimate, meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Pose {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Per-marker origin correction, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerCalibration {
    offsets: BTreeMap<String, Pose>,
}

impl MarkerCalibration {
    pub fn new(offsets: BTreeMap<String, Pose>) -> Result<Self, NavError> {
        if offsets.is_empty() {
            return Err(NavError::EmptyCalibration);
        }
        Ok(Self { offsets })
    }

    pub fn from_table(table: &BTreeMap<String, [f64; 2]>) -> Result<Self, NavError> {
        Self::new(table.iter().map(|(id, v)| (id.clone(), Pose::from(*v))).collect())
    }

    pub fn offset(&self, marker_id: &str) -> Option<Pose> {
        self.offsets.get(marker_id).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn marker_ids(&self) -> impl Iterator<Item = &str> {
        self.offsets.keys().map(String::as_str)
    }

    /// World pose from a single marker observation.
    ///
    /// The tracker's x axis points opposite to the world x axis (the camera
    /// is mounted facing backwards), hence the negation. Keep it.
    pub fn estimate(&self, obs: &Observation) -> Result<Pose, NavError> {
        let offset = self
            .offset(&obs.marker_id)
            .ok_or_else(|| NavError::UnknownMarker(obs.marker_id.clone()))?;
        Ok(Pose {
            x: -obs.translation.x + offset.x,
            y: obs.translation.y + offset.y,
        })
    }
}

/// Bench layout: origin at the center of ID4, the other four tags at the corners.
pub fn default_marker_table() -> BTreeMap<String, [f64; 2]> {
    [
        ("ID0", [-2.2 * INCH_M, 2.1 * INCH_M]),
        ("ID1", [-2.2 * INCH_M, -2.1 * INCH_M]),
        ("ID2", [2.2 * INCH_M, -2.1 * INCH_M]),
        ("ID3", [2.2 * INCH_M, 2.1 * INCH_M]),
        ("ID4", [0.0, 0.0]),
    ]
    .into_iter()
    .map(|(id, v)| (id.to_string(), v))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagnav_proto::Vec3;

    fn calibration() -> MarkerCalibration {
        MarkerCalibration::from_table(&default_marker_table()).unwrap()
    }

    #[test]
    fn test_pose_formula_for_every_marker() {
        let cal = calibration();
        let t = Vec3::new(0.12, -0.07, 0.4);
        for (id, [ox, oy]) in default_marker_table() {
            let pose = cal.estimate(&Observation::now(id.clone(), t)).unwrap();
            assert_eq!(pose.x, -t.x + ox, "x for {}", id);
            assert_eq!(pose.y, t.y + oy, "y for {}", id);
        }
    }

    #[test]
    fn test_x_axis_is_flipped() {
        let cal = calibration();
        let pose = cal.estimate(&Observation::now("ID4", Vec3::new(0.3, 0.3, 0.0))).unwrap();
        assert_eq!(pose, Pose::new(-0.3, 0.3));
    }

    #[test]
    fn test_unknown_marker() {
        let cal = calibration();
        let before = cal.clone();
        let err = cal.estimate(&Observation::now("ID9", Vec3::default())).unwrap_err();
        assert_eq!(err, NavError::UnknownMarker("ID9".into()));
        assert_eq!(cal, before);
    }

    #[test]
    fn test_empty_calibration_rejected() {
        assert_eq!(
            MarkerCalibration::new(BTreeMap::new()).unwrap_err(),
            NavError::EmptyCalibration
        );
    }

    #[test]
    fn test_default_table_has_five_markers() {
        assert_eq!(calibration().len(), 5);
        assert_eq!(calibration().offset("ID4"), Some(Pose::new(0.0, 0.0)));
    }
}
