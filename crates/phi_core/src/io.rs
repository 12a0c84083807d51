//! Reading and writing binding matrices, phi records and distance series.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::binding::{BindingMatrix, DistanceSample};
use crate::error::{PhiError, Result};
use crate::occupancy::PhiRecord;
use crate::stats::RunTag;

/// Output locations for one parsed trajectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutputs {
    pub matrix_json: PathBuf,
    pub phi_json: PathBuf,
    pub phi_csv: PathBuf,
}

impl RunOutputs {
    /// `<matrix_dir>/TF_on_off_Matrix_Np_<np>_run_<run>.json` and
    /// `<phi_dir>/TF_phis_Np_<np>_run_<run>.{json,csv}`.
    pub fn new(matrix_dir: &Path, phi_dir: &Path, tag: RunTag) -> Self {
        Self {
            matrix_json: matrix_dir.join(format!("TF_on_off_Matrix_{}.json", tag)),
            phi_json: phi_dir.join(format!("TF_phis_{}.json", tag)),
            phi_csv: phi_dir.join(format!("TF_phis_{}.csv", tag)),
        }
    }

    pub fn write(&self, matrix: &BindingMatrix, phi: &PhiRecord) -> Result<()> {
        save_binding_matrix(matrix, &self.matrix_json)?;
        save_phi_json(phi, &self.phi_json)?;
        save_phi_csv(phi, &self.phi_csv)
    }
}

pub fn save_binding_matrix(matrix: &BindingMatrix, path: &Path) -> Result<()> {
    write_json(matrix, path)
}

pub fn load_binding_matrix(path: &Path) -> Result<BindingMatrix> {
    read_json(path)
}

pub fn save_phi_json(record: &PhiRecord, path: &Path) -> Result<()> {
    write_json(record, path)
}

pub fn load_phi_json(path: &Path) -> Result<PhiRecord> {
    read_json(path)
}

/// Two-column `TU,Phi` mirror of the phi document.
pub fn save_phi_csv(record: &PhiRecord, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["TU", "Phi"])?;
    for (tu, phi) in record.iter() {
        writer.serialize((tu, phi))?;
    }
    writer.flush().map_err(|e| PhiError::io(path, e))?;
    Ok(())
}

/// `Timestep,TU,Distance` rows; the distance cell is empty when the frame had no TF.
pub fn save_distance_csv(samples: &[DistanceSample], path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Timestep", "TU", "Distance"])?;
    for sample in samples {
        writer.serialize((sample.timestep, sample.tu, sample.distance))?;
    }
    writer.flush().map_err(|e| PhiError::io(path, e))?;
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PhiError::io(parent, e))?;
    }
    Ok(())
}

/// Pretty JSON (4-space indent), written to a temp file and renamed into place.
fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &buf).map_err(|e| PhiError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| PhiError::io(path, e))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|e| PhiError::io(path, e))?;
    Ok(serde_json::from_str(&data)?)
}
