use crate::nav::NavState;

/// Faults that stop the control loop.
///
/// A missing observation is not in here: it is an ordinary input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavError {
    #[error("Marker {0:?} is not in the calibration table")]
    UnknownMarker(String),

    #[error("Destination {0:?} is not in the waypoint table")]
    UnknownWaypoint(String),

    #[error("Invalid state {state:?}: {reason}")]
    InvalidState { state: NavState, reason: &'static str },

    #[error("Marker calibration table is empty")]
    EmptyCalibration,

    #[error("Invalid navigation parameter: {0}")]
    InvalidConfig(&'static str),
}
