pub mod doctor;
pub mod error;
pub mod feed;
pub mod nav;
pub mod observer;
pub mod pose;
pub mod waypoints;

pub use error::NavError;
pub use nav::{Directive, NavEngine, NavOutput, NavParams, NavState, Session};
pub use observer::TransformObserver;
pub use pose::{MarkerCalibration, Pose};
pub use waypoints::{Waypoint, WaypointSequencer, WaypointTable};

/// Inches to meters; the bench layout was measured in inches.
pub const INCH_M: f64 = 0.0254;
