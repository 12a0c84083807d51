//! Per-TU binding history and its accumulation over a trajectory.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classifier::{BindingClassifier, TuState};
use crate::error::PhiError;
use crate::trajectory::Frame;

/// TU id → binding state per processed frame, in frame order.
///
/// On disk this is a JSON object with TU ids as keys and lists of 0/1 as
/// values. Loading rejects non-integer keys and any state other than 0 or 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<u32, Vec<u8>>", into = "BTreeMap<u32, Vec<u8>>")]
pub struct BindingMatrix {
    rows: BTreeMap<u32, Vec<bool>>,
}

impl BindingMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tu: u32, bound: bool) {
        self.rows.entry(tu).or_default().push(bound);
    }

    pub fn row(&self, tu: u32) -> Option<&[bool]> {
        self.rows.get(&tu).map(Vec::as_slice)
    }

    /// Rows sorted by TU id.
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[bool])> {
        self.rows.iter().map(|(tu, states)| (*tu, states.as_slice()))
    }

    pub fn tu_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    /// Number of TUs.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(u32, Vec<bool>)> for BindingMatrix {
    fn from_iter<I: IntoIterator<Item = (u32, Vec<bool>)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<BTreeMap<u32, Vec<u8>>> for BindingMatrix {
    type Error = PhiError;

    fn try_from(doc: BTreeMap<u32, Vec<u8>>) -> Result<Self, Self::Error> {
        let mut rows = BTreeMap::new();
        for (tu, states) in doc {
            let states = states
                .into_iter()
                .enumerate()
                .map(|(frame, state)| match state {
                    0 => Ok(false),
                    1 => Ok(true),
                    other => Err(PhiError::InvalidDocument(format!(
                        "TU {} frame {}: binding state must be 0 or 1, got {}",
                        tu, frame, other
                    ))),
                })
                .collect::<Result<Vec<bool>, _>>()?;
            rows.insert(tu, states);
        }
        Ok(Self { rows })
    }
}

impl From<BindingMatrix> for BTreeMap<u32, Vec<u8>> {
    fn from(matrix: BindingMatrix) -> Self {
        matrix
            .rows
            .into_iter()
            .map(|(tu, states)| (tu, states.into_iter().map(u8::from).collect()))
            .collect()
    }
}

/// Feeds frames through a classifier and builds the binding matrix.
///
/// Every frame handed in counts toward `total_timesteps`, including frames
/// that contain no TU at all.
#[derive(Debug)]
pub struct BindingAccumulator {
    classifier: BindingClassifier,
    matrix: BindingMatrix,
    total_timesteps: usize,
    frames_with_tfs: usize,
    last_timestep: Option<u64>,
}

impl BindingAccumulator {
    pub fn new(classifier: BindingClassifier) -> Self {
        Self {
            classifier,
            matrix: BindingMatrix::new(),
            total_timesteps: 0,
            frames_with_tfs: 0,
            last_timestep: None,
        }
    }

    pub fn add_frame(&mut self, frame: &Frame) {
        if let Some(last) = self.last_timestep {
            if frame.timestep <= last {
                warn!(
                    "timestep {} follows {} - frames are kept in file order",
                    frame.timestep, last
                );
            }
        }
        self.last_timestep = Some(frame.timestep);

        let states = self.classifier.classify(frame);
        if states.is_empty() {
            debug!("timestep {}: no TU beads", frame.timestep);
        }
        for TuState { tu, bound } in states {
            self.matrix.push(tu, bound);
        }
        if frame.tfs().next().is_some() {
            self.frames_with_tfs += 1;
        }
        self.total_timesteps += 1;
    }

    pub fn total_timesteps(&self) -> usize {
        self.total_timesteps
    }

    /// Frames that contained at least one TF.
    pub fn frames_with_tfs(&self) -> usize {
        self.frames_with_tfs
    }

    pub fn finish(self) -> (BindingMatrix, usize) {
        (self.matrix, self.total_timesteps)
    }
}
