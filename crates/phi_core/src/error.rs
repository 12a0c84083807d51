use std::path::PathBuf;
use thiserror::Error;

/// Recoverable conditions raised while reading a single frame.
///
/// The reader yields these in place of the offending frame and keeps going.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timestep {timestep}: box bounds required for box-scaled coordinates")]
    MissingBoxBounds { timestep: u64 },

    #[error("Timestep {timestep}: expected {expected} atom records, input ended after {found}")]
    Truncated {
        timestep: u64,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: malformed {section} header: '{content}'")]
    MalformedHeader {
        line: usize,
        section: &'static str,
        content: String,
    },
}

impl FrameError {
    /// An I/O failure ends the stream; every other variant only drops one frame.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FrameError::Io(_))
    }
}

#[derive(Error, Debug)]
pub enum PhiError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("File name does not match expected format {pattern}: {name}")]
    FileNameMismatch { name: String, pattern: &'static str },

    #[error("No frames could be parsed from {path}")]
    EmptyTrajectory { path: PathBuf },

    #[error("Binding row for TU {tu} has {len} states but only {total} timesteps were processed")]
    InconsistentMatrix { tu: u32, len: usize, total: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl PhiError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PhiError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a batch may skip the unit of work that raised this error and continue.
    pub fn is_recoverable(&self) -> bool {
        match self {
            PhiError::Io { .. } => true,
            PhiError::Json(_) => true,
            PhiError::InvalidDocument(_) => true,
            PhiError::FileNameMismatch { .. } => true,
            PhiError::EmptyTrajectory { .. } => true,
            PhiError::InconsistentMatrix { .. } => true,
            PhiError::Csv(_) => false,
            PhiError::Manifest(_) => false,
            PhiError::InvalidParameter(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PhiError>;
