//! Particle and frame types produced by the trajectory reader.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bead role in the coarse-grained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    /// Polymer backbone bead (type 1)
    Dna,
    /// Transcription unit (type 2)
    Tu,
    /// Transcription factor (type 3)
    Tf,
    /// Any other type id found in the dump
    Other(u32),
}

impl From<u32> for ParticleKind {
    fn from(value: u32) -> Self {
        match value {
            1 => ParticleKind::Dna,
            2 => ParticleKind::Tu,
            3 => ParticleKind::Tf,
            other => ParticleKind::Other(other),
        }
    }
}

impl ParticleKind {
    pub fn type_id(self) -> u32 {
        match self {
            ParticleKind::Dna => 1,
            ParticleKind::Tu => 2,
            ParticleKind::Tf => 3,
            ParticleKind::Other(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: u32,
    pub kind: ParticleKind,
    pub position: Vector3<f64>,
}

impl Particle {
    pub fn new(id: u32, kind: ParticleKind, position: Vector3<f64>) -> Self {
        Self { id, kind, position }
    }
}

/// Extent of the simulation cell along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub low: f64,
    pub high: f64,
}

impl AxisBounds {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Maps a box-relative coordinate onto this axis.
    pub fn unscale(&self, scaled: f64) -> f64 {
        scaled * (self.high - self.low) + self.low
    }
}

/// Per-axis bounds in x, y, z order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxBounds {
    pub x: AxisBounds,
    pub y: AxisBounds,
    pub z: AxisBounds,
}

impl BoxBounds {
    pub fn unscale(&self, scaled: Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.x.unscale(scaled.x),
            self.y.unscale(scaled.y),
            self.z.unscale(scaled.z),
        )
    }
}

/// How the coordinate columns of a dump are interpreted.
///
/// The corpus mixes conventions and the files do not say which one they use,
/// so the caller always picks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CoordinateMode {
    /// Coordinates are absolute
    Raw,
    /// Coordinates are box-relative and un-scaled with each frame's bounds
    BoxScaled,
    /// Coordinates are box-relative in a fixed cubic box of the given side
    FixedBox(f64),
}

impl fmt::Display for CoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoordinateMode::Raw => write!(f, "raw"),
            CoordinateMode::BoxScaled => write!(f, "box-scaled"),
            CoordinateMode::FixedBox(side) => write!(f, "fixed-box:{}", side),
        }
    }
}

impl FromStr for CoordinateMode {
    type Err = String;

    /// Accepts `raw`, `box-scaled` and `fixed-box:<side>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "raw" => Ok(CoordinateMode::Raw),
            "box-scaled" | "scaled" => Ok(CoordinateMode::BoxScaled),
            other => {
                let side = other
                    .strip_prefix("fixed-box:")
                    .ok_or_else(|| format!("unknown coordinate mode '{}'", other))?;
                let side: f64 = side
                    .parse()
                    .map_err(|_| format!("invalid fixed box side '{}'", side))?;
                if !(side.is_finite() && side > 0.0) {
                    return Err(format!("fixed box side must be positive, got {}", side));
                }
                Ok(CoordinateMode::FixedBox(side))
            }
        }
    }
}

impl TryFrom<String> for CoordinateMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CoordinateMode> for String {
    fn from(mode: CoordinateMode) -> Self {
        mode.to_string()
    }
}

/// Particle snapshot at one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub timestep: u64,
    pub box_bounds: Option<BoxBounds>,
    pub particles: Vec<Particle>,
}

impl Frame {
    pub fn tus(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.kind == ParticleKind::Tu)
    }

    pub fn tfs(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.kind == ParticleKind::Tf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_type_id() {
        assert_eq!(ParticleKind::from(1), ParticleKind::Dna);
        assert_eq!(ParticleKind::from(2), ParticleKind::Tu);
        assert_eq!(ParticleKind::from(3), ParticleKind::Tf);
        assert_eq!(ParticleKind::from(7), ParticleKind::Other(7));
        assert_eq!(ParticleKind::Other(7).type_id(), 7);
    }

    #[test]
    fn test_unscale_midpoint() {
        let axis = AxisBounds::new(0.0, 100.0);
        assert_eq!(axis.unscale(0.5), 50.0);

        let shifted = AxisBounds::new(-50.0, 50.0);
        assert_eq!(shifted.unscale(0.25), -25.0);
    }

    #[test]
    fn test_coordinate_mode_parse() {
        assert_eq!("raw".parse::<CoordinateMode>(), Ok(CoordinateMode::Raw));
        assert_eq!("box-scaled".parse::<CoordinateMode>(), Ok(CoordinateMode::BoxScaled));
        assert_eq!(
            "fixed-box:100".parse::<CoordinateMode>(),
            Ok(CoordinateMode::FixedBox(100.0))
        );
        assert!("fixed-box:-1".parse::<CoordinateMode>().is_err());
        assert!("absolute".parse::<CoordinateMode>().is_err());
        assert!("".parse::<CoordinateMode>().is_err());
    }

    #[test]
    fn test_coordinate_mode_yaml() {
        let mode: CoordinateMode = serde_yaml::from_str("fixed-box:100").unwrap();
        assert_eq!(mode, CoordinateMode::FixedBox(100.0));
        let mode: CoordinateMode = serde_yaml::from_str("box-scaled").unwrap();
        assert_eq!(mode, CoordinateMode::BoxScaled);
        assert!(serde_yaml::from_str::<CoordinateMode>("sideways").is_err());
    }
}
