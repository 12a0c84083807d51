//! phi_builder driver library
//!
//! Path resolution and argument checks in front of `phi_core`. Every path is
//! made absolute here so the core never depends on the working directory.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use phi_core::batch::BatchReport;
use phi_core::binding::BindingClassifier;
use phi_core::stats::{read_stat_points, summarize_by_np, write_np_summary, NpSummary};
use phi_core::{
    analyze_trajectory, nearest_distance_series, CoordinateMode, RunOutputs, RunTag,
};

pub const MATRIX_DIR_NAME: &str = "TF_On_Off_Matrices";
pub const PHI_DIR_NAME: &str = "TF_Phi_Values";

/// Summary of one `parse` invocation, optionally saved next to the outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub source: PathBuf,
    pub np: u32,
    pub run: u32,
    pub coordinates: CoordinateMode,
    pub threshold: f64,
    pub total_timesteps: usize,
    pub dropped_frames: usize,
    pub skipped_records: usize,
    pub tu_count: usize,
    pub matrix_json: PathBuf,
    pub phi_json: PathBuf,
    pub phi_csv: PathBuf,
}

/// Absolute form of `path`, relative paths taken from the current directory.
pub fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

pub fn require_file(path: &Path) -> Result<PathBuf> {
    let path = resolve_path(path)?;
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    Ok(path)
}

pub fn require_dir(path: &Path) -> Result<PathBuf> {
    let path = resolve_path(path)?;
    if !path.is_dir() {
        bail!("Directory not found: {}", path.display());
    }
    Ok(path)
}

/// Parses one trajectory and writes its matrix, phi JSON and phi CSV.
///
/// The trajectory name must carry an `Np_<int>_run_<int>` tag, which names
/// the outputs.
pub fn parse_trajectory(
    trajectory: &Path,
    coordinates: CoordinateMode,
    threshold: f64,
    matrix_dir: &Path,
    phi_dir: &Path,
) -> Result<ParseMetadata> {
    let trajectory = require_file(trajectory)?;
    let tag = RunTag::from_path(&trajectory)
        .context("Could not extract Np and run number from filename")?;
    let classifier = BindingClassifier::new(threshold)?;

    let analysis = analyze_trajectory(&trajectory, coordinates, classifier)
        .with_context(|| format!("Failed to parse trajectory: {}", trajectory.display()))?;

    if analysis.matrix.is_empty() {
        warn!("{}: no TU beads found, phi outputs will be empty", trajectory.display());
    }

    let outputs = RunOutputs::new(&resolve_path(matrix_dir)?, &resolve_path(phi_dir)?, tag);
    outputs
        .write(&analysis.matrix, &analysis.phi)
        .context("Failed to write binding outputs")?;

    Ok(ParseMetadata {
        source: trajectory,
        np: tag.np,
        run: tag.run,
        coordinates,
        threshold,
        total_timesteps: analysis.total_timesteps,
        dropped_frames: analysis.dropped_frames,
        skipped_records: analysis.skipped_records,
        tu_count: analysis.matrix.len(),
        matrix_json: outputs.matrix_json,
        phi_json: outputs.phi_json,
        phi_csv: outputs.phi_csv,
    })
}

/// Writes the per-frame nearest TF distance of every TU to `out`.
pub fn export_distances(
    trajectory: &Path,
    coordinates: CoordinateMode,
    out: &Path,
) -> Result<usize> {
    let trajectory = require_file(trajectory)?;
    let samples =
        nearest_distance_series(&trajectory, coordinates, BindingClassifier::default())
            .with_context(|| format!("Failed to read trajectory: {}", trajectory.display()))?;
    phi_core::io::save_distance_csv(&samples, &resolve_path(out)?)
        .context("Failed to write distance table")?;
    Ok(samples.len())
}

/// Per-Np summary of a statistics table, optionally written to `out`.
pub fn summarize_table(table: &Path, out: Option<&Path>) -> Result<Vec<NpSummary>> {
    let table = require_file(table)?;
    let points = read_stat_points(&table)
        .with_context(|| format!("Failed to read statistics table: {}", table.display()))?;
    let summary = summarize_by_np(&points);
    if let Some(out) = out {
        write_np_summary(&resolve_path(out)?, &summary).context("Failed to write summary")?;
    }
    Ok(summary)
}

pub fn save_metadata<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write metadata: {}", path.display()))?;
    info!("Metadata saved to {}", path.display());
    Ok(())
}

/// Number of problems a batch run skipped over.
pub fn batch_warning_count(report: &BatchReport) -> usize {
    report.missing_dirs.len() + report.missing_files.len() + report.skipped.len()
}
