//! Trajectory → binding matrix → phi, for one file.

use log::{debug, info, warn};
use std::io::BufRead;
use std::path::Path;

use crate::binding::{BindingAccumulator, BindingClassifier, BindingMatrix, DistanceSample};
use crate::error::{FrameError, PhiError, Result};
use crate::occupancy::PhiRecord;
use crate::trajectory::{CoordinateMode, TrajectoryReader};

/// Everything learned from one pass over a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryAnalysis {
    pub matrix: BindingMatrix,
    pub phi: PhiRecord,
    /// Frames parsed and classified; the phi denominator
    pub total_timesteps: usize,
    pub dropped_frames: usize,
    pub skipped_records: usize,
    /// Counted frames that held at least one TF
    pub frames_with_tfs: usize,
}

/// Parses `path` and returns its binding matrix and phi record.
pub fn parse(path: &Path, mode: CoordinateMode, threshold: f64) -> Result<(BindingMatrix, PhiRecord)> {
    let classifier = BindingClassifier::new(threshold)?;
    let analysis = analyze_trajectory(path, mode, classifier)?;
    Ok((analysis.matrix, analysis.phi))
}

pub fn analyze_trajectory(
    path: &Path,
    mode: CoordinateMode,
    classifier: BindingClassifier,
) -> Result<TrajectoryAnalysis> {
    info!(
        "Parsing {} ({} coordinates, threshold {})",
        path.display(),
        mode,
        classifier.threshold()
    );
    let reader = TrajectoryReader::open(path, mode)?;
    let analysis = analyze_reader(reader, classifier, path)?;
    info!(
        "{}: {} frames, {} TUs, {} frames dropped",
        path.display(),
        analysis.total_timesteps,
        analysis.matrix.len(),
        analysis.dropped_frames
    );
    Ok(analysis)
}

/// Nearest TF distance of every TU in every readable frame of `path`.
pub fn nearest_distance_series(
    path: &Path,
    mode: CoordinateMode,
    classifier: BindingClassifier,
) -> Result<Vec<DistanceSample>> {
    let mut samples = Vec::new();
    for frame in TrajectoryReader::open(path, mode)? {
        match frame {
            Ok(frame) => samples.extend(classifier.nearest_distances(&frame)),
            Err(FrameError::Io(e)) => return Err(PhiError::io(path, e)),
            Err(err) => warn!("{}: dropping frame: {}", path.display(), err),
        }
    }
    Ok(samples)
}

/// Runs an already opened frame stream through the classifier.
///
/// `source` only labels errors and log lines.
pub fn analyze_reader<R: BufRead>(
    mut reader: TrajectoryReader<R>,
    classifier: BindingClassifier,
    source: &Path,
) -> Result<TrajectoryAnalysis> {
    let mut accumulator = BindingAccumulator::new(classifier);
    let mut dropped_frames = 0usize;

    for frame in reader.by_ref() {
        match frame {
            Ok(frame) => accumulator.add_frame(&frame),
            Err(FrameError::Io(e)) => return Err(PhiError::io(source, e)),
            Err(err) => {
                dropped_frames += 1;
                warn!("{}: dropping frame: {}", source.display(), err);
            }
        }
    }

    let skipped_records = reader.skipped_records();
    if skipped_records > 0 {
        debug!("{}: {} atom records skipped", source.display(), skipped_records);
    }

    let frames_with_tfs = accumulator.frames_with_tfs();
    let (matrix, total_timesteps) = accumulator.finish();
    if total_timesteps == 0 {
        return Err(PhiError::EmptyTrajectory {
            path: source.to_path_buf(),
        });
    }
    let phi = PhiRecord::from_matrix(&matrix, total_timesteps)?;

    Ok(TrajectoryAnalysis {
        matrix,
        phi,
        total_timesteps,
        dropped_frames,
        skipped_records,
        frames_with_tfs,
    })
}

#[cfg(test)]
mod tests;
