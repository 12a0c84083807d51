//! Run statistics across many `(Np, run)` phi records.

pub mod metadata;
pub mod summary;
pub mod table;

pub use metadata::{BatchTag, RunTag};
pub use summary::{read_stat_points, summarize_by_np, write_np_summary, NpSummary, StatPoint};
pub use table::{
    append_run_statistics, mean_std, read_run_statistics, RunStatistic, RUN_STATISTICS_HEADER,
};

use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PhiError, Result};
use crate::io::{load_binding_matrix, load_phi_json, save_phi_json};
use crate::occupancy::PhiRecord;

/// A source that could not contribute a row, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Rows produced by one aggregation pass, plus the sources it had to skip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateReport {
    pub rows: Vec<RunStatistic>,
    pub skipped: Vec<SkippedFile>,
}

/// JSON documents in `dir`, sorted by file name.
pub fn json_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| PhiError::io(dir, e))?;
    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PhiError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// One statistics row per phi document.
///
/// Documents whose name carries no `Np_<int>_run_<int>` tag, or that cannot
/// be read or validated, are skipped and listed in the report.
pub fn aggregate(sources: &[PathBuf]) -> AggregateReport {
    let mut report = AggregateReport::default();

    for path in sources {
        match aggregate_one(path) {
            Ok(row) => {
                debug!("{}: mean={:?} std={:?}", path.display(), row.mean, row.std);
                report.rows.push(row);
            }
            Err(err) => {
                warn!("Skipping file {}: {}", path.display(), err);
                report.skipped.push(SkippedFile {
                    path: path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

fn aggregate_one(path: &Path) -> Result<RunStatistic> {
    let tag = RunTag::from_path(path)?;
    let record = load_phi_json(path)?;
    Ok(RunStatistic::from_record(tag, &record))
}

/// Writes a phi document for every binding matrix in `matrix_dir` that has
/// none in `phi_dir`, using the matrix row means.
///
/// Returns the documents written. Matrices that cannot be read are skipped.
pub fn recover_missing_phi(matrix_dir: &Path, phi_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for matrix_path in json_documents(matrix_dir)? {
        let Ok(tag) = RunTag::from_path(&matrix_path) else {
            continue;
        };
        let phi_path = phi_dir.join(format!("TF_phis_{}.json", tag));
        if phi_path.exists() {
            continue;
        }
        match load_binding_matrix(&matrix_path) {
            Ok(matrix) => {
                save_phi_json(&PhiRecord::from_row_means(&matrix), &phi_path)?;
                info!("Recovered {} from {}", phi_path.display(), matrix_path.display());
                written.push(phi_path);
            }
            Err(err) => warn!("Skipping matrix {}: {}", matrix_path.display(), err),
        }
    }
    Ok(written)
}

/// Aggregates every phi document in `phi_dir` and appends the rows to `table`.
pub fn aggregate_dir_into(phi_dir: &Path, table: &Path) -> Result<AggregateReport> {
    let sources = json_documents(phi_dir)?;
    let report = aggregate(&sources);
    append_run_statistics(table, &report.rows)?;
    Ok(report)
}
