//! # phi_core - TF/TU binding occupancy from polymer simulation dumps
//!
//! Reads trajectory dumps of a coarse-grained chromatin polymer with diffusing
//! transcription factors, decides for every transcription unit and every
//! frame whether a factor is within binding distance, and reduces that to
//! per-TU occupancy ("phi") and per-run statistics.
//!
//! ## Pipeline
//! - [`trajectory`]: streaming dump reader (raw, box-scaled or fixed-box coordinates)
//! - [`binding`]: nearest-TF classification and the binding matrix
//! - [`occupancy`]: phi per TU
//! - [`stats`]: run statistics, append-only tables, per-Np summaries
//! - [`batch`]: manifest-driven statistics over whole simulation campaigns

pub mod batch;
pub mod binding;
pub mod error;
pub mod io;
pub mod occupancy;
pub mod pipeline;
pub mod stats;
pub mod trajectory;

pub use batch::{run_batch, BatchManifest, BatchReport, ManifestEntry};
pub use binding::{BindingClassifier, BindingMatrix, DistanceSample, DEFAULT_BINDING_THRESHOLD};
pub use error::{FrameError, PhiError, Result};
pub use io::RunOutputs;
pub use occupancy::PhiRecord;
pub use pipeline::{analyze_trajectory, nearest_distance_series, parse, TrajectoryAnalysis};
pub use stats::{
    aggregate, aggregate_dir_into, recover_missing_phi, AggregateReport, RunStatistic, RunTag,
};
pub use trajectory::{CoordinateMode, Frame, Particle, ParticleKind, TrajectoryReader};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
