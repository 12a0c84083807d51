//! Per-Np reduction of run statistics tables.
//!
//! Curve fitting of the noise/activity relation works on one point per TF
//! count: the mean over runs of the per-run mean and of the per-run spread.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{PhiError, Result};
use crate::io::ensure_parent;

pub const NP_SUMMARY_HEADER: [&str; 4] = ["TFs", "phi_mean", "phi_std", "Runs"];

/// One TF count's averaged statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpSummary {
    #[serde(rename = "TFs")]
    pub np: u32,
    pub phi_mean: f64,
    pub phi_std: f64,
    #[serde(rename = "Runs")]
    pub runs: usize,
}

/// `(Np, mean, std)` triple as read from either table layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatPoint {
    pub np: u32,
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

/// Reads `Np,Run,Mean,Standard Deviation` or `TFs,Run,phi_mean,phi_std,...` tables.
pub fn read_stat_points(path: &Path) -> Result<Vec<StatPoint>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.contains(&h.trim()))
            .ok_or_else(|| {
                PhiError::InvalidDocument(format!(
                    "{}: missing column {}",
                    path.display(),
                    names.join(" / ")
                ))
            })
    };
    let np_col = column(&["Np", "TFs"])?;
    let mean_col = column(&["Mean", "phi_mean"])?;
    let std_col = column(&["Standard Deviation", "phi_std"])?;

    let mut points = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let np = record
            .get(np_col)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| {
                PhiError::InvalidDocument(format!("{}: row {} has no valid Np", path.display(), i + 1))
            })?;
        points.push(StatPoint {
            np,
            mean: optional_float(record.get(mean_col)),
            std: optional_float(record.get(std_col)),
        });
    }
    Ok(points)
}

fn optional_float(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

/// Groups points by Np, ignoring points without statistics.
pub fn summarize_by_np(points: &[StatPoint]) -> Vec<NpSummary> {
    let mut groups: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
    for point in points {
        if let (Some(mean), Some(std)) = (point.mean, point.std) {
            let entry = groups.entry(point.np).or_insert((0.0, 0.0, 0));
            entry.0 += mean;
            entry.1 += std;
            entry.2 += 1;
        }
    }
    groups
        .into_iter()
        .map(|(np, (mean_sum, std_sum, runs))| NpSummary {
            np,
            phi_mean: mean_sum / runs as f64,
            phi_std: std_sum / runs as f64,
            runs,
        })
        .collect()
}

/// Writes (replacing) a `TFs,phi_mean,phi_std,Runs` table.
pub fn write_np_summary(path: &Path, summary: &[NpSummary]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(NP_SUMMARY_HEADER)?;
    for row in summary {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| PhiError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reads_run_statistics_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("phi_statistics.csv");
        fs::write(&path, "Np,Run,Mean,Standard Deviation\n10,1,0.2,0.1\n10,2,,\n20,1,0.4,0.3\n").unwrap();

        let points = read_stat_points(&path).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], StatPoint { np: 10, mean: None, std: None });
    }

    #[test]
    fn test_reads_batch_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("phi_stats_l10_r30.csv");
        fs::write(&path, "TFs,Run,phi_mean,phi_std,File\n30,1,0.5,0.2,a.lammpstrj\n").unwrap();

        let points = read_stat_points(&path).unwrap();
        assert_eq!(points, vec![StatPoint { np: 30, mean: Some(0.5), std: Some(0.2) }]);
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Np,Run\n10,1\n").unwrap();

        assert!(matches!(read_stat_points(&path), Err(PhiError::InvalidDocument(_))));
    }

    #[test]
    fn test_summary_groups_and_drops_empty_rows() {
        let points = vec![
            StatPoint { np: 20, mean: Some(0.4), std: Some(0.2) },
            StatPoint { np: 10, mean: Some(0.1), std: Some(0.05) },
            StatPoint { np: 20, mean: Some(0.6), std: Some(0.4) },
            StatPoint { np: 10, mean: None, std: None },
        ];
        let summary = summarize_by_np(&points);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].np, 10);
        assert_eq!(summary[0].runs, 1);
        assert_eq!(summary[1].np, 20);
        assert!((summary[1].phi_mean - 0.5).abs() < 1e-12);
        assert!((summary[1].phi_std - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary_keeps_header_and_creates_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fits").join("summary.csv");

        write_np_summary(&path, &[]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "TFs,phi_mean,phi_std,Runs\n");
    }

    #[test]
    fn test_write_summary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");
        let summary = vec![NpSummary { np: 10, phi_mean: 0.25, phi_std: 0.5, runs: 3 }];

        write_np_summary(&path, &summary).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "TFs,phi_mean,phi_std,Runs\n10,0.25,0.5,3\n");
    }
}
