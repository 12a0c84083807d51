//! Parameter metadata carried in file names.
//!
//! File names are the only place simulation parameters are recorded, e.g.
//! `TF_phis_Np_40_run_3.json` or `pos_noise_Ns_30_l_20_Np_40_run_3.lammpstrj`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{PhiError, Result};

static RUN_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Np_(\d+)_run_(\d+)").expect("valid run tag regex"));

static BATCH_TAG_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Ns_(\d+)_l_(\d+)_Np_(\d+)_run_(\d+)").expect("valid batch tag regex")
});

const RUN_TAG_FORMAT: &str = "Np_<int>_run_<int>";
const BATCH_TAG_FORMAT: &str = "Ns_<int>_l_<int>_Np_<int>_run_<int>";

/// `(Np, run)` pair identifying one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunTag {
    /// Number of TF particles
    pub np: u32,
    pub run: u32,
}

impl RunTag {
    pub fn new(np: u32, run: u32) -> Self {
        Self { np, run }
    }

    pub fn from_file_name(name: &str) -> Result<Self> {
        let mismatch = || PhiError::FileNameMismatch {
            name: name.to_string(),
            pattern: RUN_TAG_FORMAT,
        };
        let caps = RUN_TAG_PATTERN.captures(name).ok_or_else(mismatch)?;
        let np = caps[1].parse().map_err(|_| mismatch())?;
        let run = caps[2].parse().map_err(|_| mismatch())?;
        Ok(Self { np, run })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_file_name(&file_name_of(path))
    }
}

impl fmt::Display for RunTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Np_{}_run_{}", self.np, self.run)
    }
}

/// `(Ns, l, Np, run)` tuple of a batch trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchTag {
    pub ns: u32,
    /// TU spacing
    pub spacing: u32,
    pub np: u32,
    pub run: u32,
}

impl BatchTag {
    pub fn from_file_name(name: &str) -> Result<Self> {
        let mismatch = || PhiError::FileNameMismatch {
            name: name.to_string(),
            pattern: BATCH_TAG_FORMAT,
        };
        let caps = BATCH_TAG_PATTERN.captures(name).ok_or_else(mismatch)?;
        let field = |i: usize| caps[i].parse::<u32>().map_err(|_| mismatch());
        Ok(Self {
            ns: field(1)?,
            spacing: field(2)?,
            np: field(3)?,
            run: field(4)?,
        })
    }

    /// Trajectory file name the simulation driver writes for this tag.
    pub fn trajectory_file_name(&self) -> String {
        format!(
            "pos_noise_Ns_{}_l_{}_Np_{}_run_{}.lammpstrj",
            self.ns, self.spacing, self.np, self.run
        )
    }

    pub fn run_tag(&self) -> RunTag {
        RunTag::new(self.np, self.run)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_tag_from_phi_file() {
        let tag = RunTag::from_file_name("TF_phis_Np_40_run_3.json").unwrap();
        assert_eq!(tag, RunTag::new(40, 3));
        assert_eq!(tag.to_string(), "Np_40_run_3");
    }

    #[test]
    fn test_run_tag_from_path_uses_file_name_only() {
        let tag = RunTag::from_path(Path::new("/data/Np_1_run_1/TF_phis_Np_20_run_7.json")).unwrap();
        assert_eq!(tag, RunTag::new(20, 7));
    }

    #[test]
    fn test_run_tag_mismatch() {
        let err = RunTag::from_file_name("phis_np40_r3.json").unwrap_err();
        assert!(matches!(err, PhiError::FileNameMismatch { .. }));
        assert!(RunTag::from_file_name("Np_99999999999_run_1.json").is_err());
    }

    #[test]
    fn test_batch_tag_round_trip_name() {
        let name = "pos_noise_Ns_30_l_20_Np_40_run_3.lammpstrj";
        let tag = BatchTag::from_file_name(name).unwrap();

        assert_eq!(tag.ns, 30);
        assert_eq!(tag.spacing, 20);
        assert_eq!(tag.run_tag(), RunTag::new(40, 3));
        assert_eq!(tag.trajectory_file_name(), name);
    }

    #[test]
    fn test_batch_tag_requires_all_fields() {
        assert!(BatchTag::from_file_name("pos_noise_Np_40_run_3.lammpstrj").is_err());
    }
}
