pub mod command;
pub mod transform;

pub use command::Command;
pub use transform::{MarkerTransform, Observation, TransformBatch, Vec3};
