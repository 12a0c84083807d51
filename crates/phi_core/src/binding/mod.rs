//! Binding state classification and the per-trajectory binding matrix.

pub mod classifier;
pub mod matrix;

pub use classifier::{
    nearest_tf_distance, BindingClassifier, DistanceSample, TuState, DEFAULT_BINDING_THRESHOLD,
};
pub use matrix::{BindingAccumulator, BindingMatrix};
