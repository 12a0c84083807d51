//! Occupancy fraction ("phi") per TU.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::binding::BindingMatrix;
use crate::error::{PhiError, Result};

/// TU id → fraction of processed timesteps the TU was bound.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<u32, f64>", into = "BTreeMap<u32, f64>")]
pub struct PhiRecord {
    values: BTreeMap<u32, f64>,
}

impl PhiRecord {
    /// `phi[tu] = bound states / total_timesteps`.
    ///
    /// The denominator is the trajectory's frame count even for a TU whose row
    /// is shorter, which under-counts TUs that were not present in every
    /// frame. Historical results were produced this way and stay comparable
    /// only if it is kept.
    pub fn from_matrix(matrix: &BindingMatrix, total_timesteps: usize) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (tu, states) in matrix.rows() {
            if states.len() > total_timesteps {
                return Err(PhiError::InconsistentMatrix {
                    tu,
                    len: states.len(),
                    total: total_timesteps,
                });
            }
            if total_timesteps == 0 {
                continue;
            }
            let bound = states.iter().filter(|s| **s).count();
            values.insert(tu, bound as f64 / total_timesteps as f64);
        }
        Ok(Self { values })
    }

    /// Row means of a stored matrix, used when no phi file was written.
    ///
    /// Each TU is normalised by its own row length here since the original
    /// frame count is not stored in the matrix file.
    pub fn from_row_means(matrix: &BindingMatrix) -> Self {
        let values = matrix
            .rows()
            .filter(|(_, states)| !states.is_empty())
            .map(|(tu, states)| {
                let bound = states.iter().filter(|s| **s).count();
                (tu, bound as f64 / states.len() as f64)
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, tu: u32) -> Option<f64> {
        self.values.get(&tu).copied()
    }

    /// Entries sorted by TU id.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.values.iter().map(|(tu, phi)| (*tu, *phi))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.values().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<BTreeMap<u32, f64>> for PhiRecord {
    type Error = PhiError;

    fn try_from(values: BTreeMap<u32, f64>) -> std::result::Result<Self, Self::Error> {
        if let Some((tu, phi)) = values.iter().find(|(_, phi)| !(0.0..=1.0).contains(*phi)) {
            return Err(PhiError::InvalidDocument(format!(
                "TU {}: phi must lie in [0, 1], got {}",
                tu, phi
            )));
        }
        Ok(Self { values })
    }
}

impl From<PhiRecord> for BTreeMap<u32, f64> {
    fn from(record: PhiRecord) -> Self {
        record.values
    }
}
