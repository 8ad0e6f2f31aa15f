use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{NavError, Pose, INCH_M};

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub label: String,
    pub pose: Pose,
}

/// Named targets in the world frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaypointTable {
    targets: BTreeMap<String, Pose>,
}

impl WaypointTable {
    pub fn new(targets: BTreeMap<String, Pose>) -> Self {
        Self { targets }
    }

    pub fn from_table(table: &BTreeMap<String, [f64; 2]>) -> Self {
        Self::new(table.iter().map(|(l, v)| (l.clone(), Pose::from(*v))).collect())
    }

    pub fn get(&self, label: &str) -> Option<Pose> {
        self.targets.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Looks every destination up once, so a bad label fails at startup
    /// instead of mid-flight.
    pub fn resolve<S: AsRef<str>>(&self, destinations: &[S]) -> Result<Vec<Waypoint>, NavError> {
        destinations
            .iter()
            .map(|d| {
                let label = d.as_ref();
                self.get(label)
                    .map(|pose| Waypoint { label: label.to_string(), pose })
                    .ok_or_else(|| NavError::UnknownWaypoint(label.to_string()))
            })
            .collect()
    }
}

/// Cursor over the session's destination list.
///
/// `next` peeks without moving; `advance` moves forward one slot and
/// saturates once the route is exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSequencer {
    route: Arc<[Waypoint]>,
    cursor: usize,
}

impl WaypointSequencer {
    pub fn new(route: Vec<Waypoint>) -> Self {
        Self { route: route.into(), cursor: 0 }
    }

    pub fn next(&self) -> Option<&Waypoint> {
        self.route.get(self.cursor)
    }

    /// No-op once exhausted.
    pub fn advance(&mut self) {
        if self.cursor < self.route.len() {
            self.cursor += 1;
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.route.len()
    }
}

/// The four letters on the bench mat, halfway between the corner tags.
pub fn default_waypoint_table() -> BTreeMap<String, [f64; 2]> {
    [
        ("A", [-2.2 * INCH_M, 0.0]),
        ("B", [0.0, 2.1 * INCH_M]),
        ("C", [2.2 * INCH_M, 0.0]),
        ("D", [0.0, -2.1 * INCH_M]),
    ]
    .into_iter()
    .map(|(l, v)| (l.to_string(), v))
    .collect()
}

pub fn default_destinations() -> Vec<String> {
    vec!["A".to_string(), "B".to_string()]
}
