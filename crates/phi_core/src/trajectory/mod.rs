//! Trajectory dump parsing.

pub mod reader;
pub mod types;

pub use reader::TrajectoryReader;
pub use types::{AxisBounds, BoxBounds, CoordinateMode, Frame, Particle, ParticleKind};
