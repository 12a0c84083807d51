//! Manifest-driven batch statistics, one table per TU spacing.
//!
//! Trajectories of one spacing are independent, so they are parsed in
//! parallel. Rows are collected back in catalogue order before the table is
//! written.

pub mod manifest;

pub use manifest::{BatchManifest, ManifestEntry, TfCountRange, DEFAULT_BOX_SIDE};

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::binding::BindingClassifier;
use crate::error::{PhiError, Result};
use crate::pipeline::analyze_trajectory;
use crate::stats::metadata::file_name_of;
use crate::stats::{mean_std, BatchTag, SkippedFile};
use crate::trajectory::CoordinateMode;

pub const BATCH_TABLE_HEADER: [&str; 5] = ["TFs", "Run", "phi_mean", "phi_std", "File"];

/// One trajectory's row in a spacing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    #[serde(rename = "TFs")]
    pub tfs: u32,
    #[serde(rename = "Run")]
    pub run: u32,
    pub phi_mean: f64,
    pub phi_std: f64,
    #[serde(rename = "File")]
    pub file: String,
}

/// Table written for one manifest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingTable {
    pub spacing: u32,
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub tables: Vec<SpacingTable>,
    pub missing_dirs: Vec<PathBuf>,
    pub missing_files: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Runs every manifest entry and writes its table into `manifest.output_dir`.
///
/// Missing spacing directories, missing trajectories and unusable
/// trajectories are reported and skipped. Only failing to write a table is
/// an error.
pub fn run_batch(manifest: &BatchManifest) -> Result<BatchReport> {
    manifest.validate()?;
    let classifier = BindingClassifier::new(manifest.threshold)?;
    fs::create_dir_all(&manifest.output_dir).map_err(|e| PhiError::io(&manifest.output_dir, e))?;

    let mut report = BatchReport::default();
    for entry in &manifest.entries {
        let dir = entry.spacing_dir(&manifest.trajectory_root);
        if !dir.is_dir() {
            warn!("Directory not found: {}", dir.display());
            report.missing_dirs.push(dir);
            continue;
        }

        let index = index_files(&dir);
        let mut jobs: Vec<(BatchTag, PathBuf)> = Vec::new();
        for tag in entry.tags(manifest.polymer_segments) {
            let name = tag.trajectory_file_name();
            match index.get(&name) {
                Some(paths) => jobs.extend(paths.iter().map(|p| (tag, p.clone()))),
                None => {
                    warn!("Trajectory not found under {}: {}", dir.display(), name);
                    report.missing_files.push(name);
                }
            }
        }

        let results: Vec<(BatchTag, PathBuf, Result<BatchRow>)> = jobs
            .into_par_iter()
            .map(|(tag, path)| {
                let row = batch_row(&path, tag, manifest.coordinates, classifier);
                (tag, path, row)
            })
            .collect();

        let mut rows = Vec::with_capacity(results.len());
        for (_, path, result) in results {
            match result {
                Ok(row) => rows.push(row),
                Err(err) => {
                    warn!("Skipping trajectory {}: {}", path.display(), err);
                    report.skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let table_path = manifest.output_dir.join(entry.table_file_name());
        write_batch_table(&table_path, &rows)?;
        info!("Saved: {} with {} entries", table_path.display(), rows.len());
        report.tables.push(SpacingTable {
            spacing: entry.spacing,
            path: table_path,
            rows: rows.len(),
        });
    }
    Ok(report)
}

fn batch_row(
    path: &Path,
    tag: BatchTag,
    mode: CoordinateMode,
    classifier: BindingClassifier,
) -> Result<BatchRow> {
    let analysis = analyze_trajectory(path, mode, classifier)?;
    if analysis.frames_with_tfs == 0 {
        return Err(PhiError::InvalidDocument(format!(
            "{}: no TF beads found",
            path.display()
        )));
    }
    let values: Vec<f64> = analysis.phi.values().collect();
    let (mean, std) = mean_std(&values).ok_or_else(|| {
        PhiError::InvalidDocument(format!("{}: no TU beads found", path.display()))
    })?;
    Ok(BatchRow {
        tfs: tag.np,
        run: tag.run,
        phi_mean: round6(mean),
        phi_std: round6(std),
        file: file_name_of(path),
    })
}

fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// File name → every path with that name below `dir`, sorted.
fn index_files(dir: &Path) -> HashMap<String, Vec<PathBuf>> {
    let mut index: HashMap<String, Vec<PathBuf>> = HashMap::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Cannot read {}: {}", current.display(), err);
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                index.entry(file_name_of(&path)).or_default().push(path);
            }
        }
    }
    for paths in index.values_mut() {
        paths.sort();
    }
    index
}

/// Writes (replacing) one spacing table.
pub fn write_batch_table(path: &Path, rows: &[BatchRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(BATCH_TABLE_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| PhiError::io(path, e))?;
    Ok(())
}
