//! Batch manifest: which spacings, how many repeats, which TF counts.
//!
//! ```yaml
//! trajectory_root: /data/sims
//! output_dir: /data/phi_stats
//! polymer_segments: 30
//! threshold: 3.5
//! coordinates: fixed-box:100
//! entries:
//!   - { spacing: 10, repeats: 30 }
//!   - { spacing: 80, repeats: 10, tf_counts: { start: 10, end: 100, step: 10 } }
//! ```
//!
//! Relative paths are resolved against the manifest's own directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::binding::DEFAULT_BINDING_THRESHOLD;
use crate::error::{PhiError, Result};
use crate::stats::BatchTag;
use crate::trajectory::CoordinateMode;

/// Box side of the fixed-box batch trajectories.
pub const DEFAULT_BOX_SIDE: f64 = 100.0;
pub const DEFAULT_POLYMER_SEGMENTS: u32 = 30;

/// Inclusive TF count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfCountRange {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Default for TfCountRange {
    fn default() -> Self {
        Self {
            start: 10,
            end: 100,
            step: 10,
        }
    }
}

impl TfCountRange {
    pub fn counts(&self) -> impl Iterator<Item = u32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// TU spacing `l`
    pub spacing: u32,
    /// Runs per TF count
    pub repeats: u32,
    #[serde(default)]
    pub tf_counts: TfCountRange,
}

impl ManifestEntry {
    pub fn new(spacing: u32, repeats: u32) -> Self {
        Self {
            spacing,
            repeats,
            tf_counts: TfCountRange::default(),
        }
    }

    /// `<root>/runSep<l>`
    pub fn spacing_dir(&self, root: &Path) -> PathBuf {
        root.join(format!("runSep{}", self.spacing))
    }

    /// `phi_stats_l<l>_r<repeats>.csv`
    pub fn table_file_name(&self) -> String {
        format!("phi_stats_l{}_r{}.csv", self.spacing, self.repeats)
    }

    /// Every expected trajectory, TF count major, run minor.
    pub fn tags(&self, polymer_segments: u32) -> Vec<BatchTag> {
        self.tf_counts
            .counts()
            .flat_map(|np| {
                (1..=self.repeats).map(move |run| BatchTag {
                    ns: polymer_segments,
                    spacing: self.spacing,
                    np,
                    run,
                })
            })
            .collect()
    }
}

fn default_polymer_segments() -> u32 {
    DEFAULT_POLYMER_SEGMENTS
}

fn default_threshold() -> f64 {
    DEFAULT_BINDING_THRESHOLD
}

fn default_coordinates() -> CoordinateMode {
    CoordinateMode::FixedBox(DEFAULT_BOX_SIDE)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchManifest {
    pub trajectory_root: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default = "default_polymer_segments")]
    pub polymer_segments: u32,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_coordinates")]
    pub coordinates: CoordinateMode,
    pub entries: Vec<ManifestEntry>,
}

impl BatchManifest {
    /// The spacing/repeat catalogue the simulation campaign was run with.
    pub fn historical(trajectory_root: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            trajectory_root,
            output_dir,
            polymer_segments: DEFAULT_POLYMER_SEGMENTS,
            threshold: DEFAULT_BINDING_THRESHOLD,
            coordinates: default_coordinates(),
            entries: vec![
                ManifestEntry::new(10, 30),
                ManifestEntry::new(20, 30),
                ManifestEntry::new(40, 30),
                ManifestEntry::new(80, 10),
                ManifestEntry::new(100, 10),
            ],
        }
    }

    pub fn from_yaml(text: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: BatchManifest = serde_yaml::from_str(text)?;
        manifest.trajectory_root = base_dir.join(&manifest.trajectory_root);
        manifest.output_dir = base_dir.join(&manifest.output_dir);
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PhiError::io(path, e))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_yaml(&text, base_dir)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(PhiError::InvalidParameter(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        for entry in &self.entries {
            let range = entry.tf_counts;
            if range.step == 0 || range.start > range.end {
                return Err(PhiError::InvalidParameter(format!(
                    "spacing {}: invalid TF count range {}..={} step {}",
                    entry.spacing, range.start, range.end, range.step
                )));
            }
            if entry.repeats == 0 {
                return Err(PhiError::InvalidParameter(format!(
                    "spacing {}: repeats must be at least 1",
                    entry.spacing
                )));
            }
        }
        Ok(())
    }
}
