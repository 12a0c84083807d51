//! Run statistics records and the append-only CSV table they live in.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::Path;

use super::metadata::RunTag;
use crate::error::{PhiError, Result};
use crate::occupancy::PhiRecord;

pub const RUN_STATISTICS_HEADER: [&str; 4] = ["Np", "Run", "Mean", "Standard Deviation"];

/// Mean and spread of one run's phi distribution.
///
/// `mean`/`std` are absent for a run without any TU, and are written as
/// empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistic {
    #[serde(rename = "Np")]
    pub np: u32,
    #[serde(rename = "Run")]
    pub run: u32,
    #[serde(rename = "Mean")]
    pub mean: Option<f64>,
    #[serde(rename = "Standard Deviation")]
    pub std: Option<f64>,
}

impl RunStatistic {
    pub fn from_record(tag: RunTag, record: &PhiRecord) -> Self {
        let values: Vec<f64> = record.values().collect();
        let (mean, std) = match mean_std(&values) {
            Some((mean, std)) => (Some(mean), Some(std)),
            None => (None, None),
        };
        Self {
            np: tag.np,
            run: tag.run,
            mean,
            std,
        }
    }
}

/// Mean and population standard deviation (divisor `n`).
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Appends rows to the statistics table at `path`.
///
/// The header is written only when the file does not exist yet or is empty.
/// Existing rows are never touched, so appending the same rows twice leaves
/// duplicates behind.
pub fn append_run_statistics(path: &Path, rows: &[RunStatistic]) -> Result<()> {
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PhiError::io(parent, e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PhiError::io(path, e))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        writer.write_record(RUN_STATISTICS_HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| PhiError::io(path, e))?;

    info!("Appended {} run statistics to {}", rows.len(), path.display());
    Ok(())
}

pub fn read_run_statistics(path: &Path) -> Result<Vec<RunStatistic>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
