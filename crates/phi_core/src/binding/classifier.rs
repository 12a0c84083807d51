//! TU/TF binding test for a single frame.

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{PhiError, Result};
use crate::trajectory::Frame;

/// Binding threshold used throughout the historical analysis (in bead diameters).
pub const DEFAULT_BINDING_THRESHOLD: f64 = 3.5;

/// TU×TF pair count above which TUs are evaluated in parallel.
const PARALLEL_PAIR_THRESHOLD: usize = 64 * 1024;

/// Binding state of one TU in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuState {
    pub tu: u32,
    pub bound: bool,
}

/// Nearest TF distance of one TU in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSample {
    pub timestep: u64,
    pub tu: u32,
    /// `None` when the frame has no TF
    pub distance: Option<f64>,
}

/// Classifies TUs as bound when any TF lies within `threshold`.
///
/// Every TU is compared against every TF. The comparison is inclusive, so a TU
/// sitting exactly at `threshold` from a TF is bound.
#[derive(Debug, Clone, Copy)]
pub struct BindingClassifier {
    threshold: f64,
}

impl Default for BindingClassifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BINDING_THRESHOLD,
        }
    }
}

impl BindingClassifier {
    pub fn new(threshold: f64) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(PhiError::InvalidParameter(format!(
                "binding threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Binding state of every TU in `frame`, in particle record order.
    ///
    /// A frame without TFs leaves every TU unbound; a frame without TUs
    /// produces no states.
    pub fn classify(&self, frame: &Frame) -> Vec<TuState> {
        self.nearest(frame)
            .into_iter()
            .map(|(tu, distance)| TuState {
                tu,
                bound: distance.map_or(false, |d| d <= self.threshold),
            })
            .collect()
    }

    /// Distance from every TU in `frame` to its closest TF.
    pub fn nearest_distances(&self, frame: &Frame) -> Vec<DistanceSample> {
        self.nearest(frame)
            .into_iter()
            .map(|(tu, distance)| DistanceSample {
                timestep: frame.timestep,
                tu,
                distance,
            })
            .collect()
    }

    fn nearest(&self, frame: &Frame) -> Vec<(u32, Option<f64>)> {
        let tus: Vec<(u32, Vector3<f64>)> = frame.tus().map(|p| (p.id, p.position)).collect();
        let tfs: Vec<Vector3<f64>> = frame.tfs().map(|p| p.position).collect();

        // Same per-TU computation either way, only the scheduling differs
        if tus.len() * tfs.len() > PARALLEL_PAIR_THRESHOLD {
            tus.par_iter()
                .map(|(id, pos)| (*id, nearest_tf_distance(pos, &tfs)))
                .collect()
        } else {
            tus.iter()
                .map(|(id, pos)| (*id, nearest_tf_distance(pos, &tfs)))
                .collect()
        }
    }
}

/// Minimum Euclidean distance from `tu` to any of `tfs`.
pub fn nearest_tf_distance(tu: &Vector3<f64>, tfs: &[Vector3<f64>]) -> Option<f64> {
    tfs.iter().map(|tf| (tu - tf).norm()).reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{Particle, ParticleKind};
    use proptest::prelude::*;

    fn particle(id: u32, kind: ParticleKind, x: f64, y: f64, z: f64) -> Particle {
        Particle::new(id, kind, Vector3::new(x, y, z))
    }

    fn frame(particles: Vec<Particle>) -> Frame {
        Frame {
            timestep: 0,
            box_bounds: None,
            particles,
        }
    }

    #[test]
    fn test_nearest_tf_within_threshold_is_bound() {
        let f = frame(vec![
            particle(1, ParticleKind::Tu, 0.0, 0.0, 0.0),
            particle(2, ParticleKind::Tf, 4.0, 0.0, 0.0),
            particle(3, ParticleKind::Tf, 3.0, 0.0, 0.0),
        ]);
        let states = BindingClassifier::new(3.5).unwrap().classify(&f);

        assert_eq!(states, vec![TuState { tu: 1, bound: true }]);
    }

    #[test]
    fn test_distant_tf_is_unbound() {
        let f = frame(vec![
            particle(1, ParticleKind::Tu, 0.0, 0.0, 0.0),
            particle(2, ParticleKind::Tf, 10.0, 0.0, 0.0),
        ]);
        let states = BindingClassifier::new(3.5).unwrap().classify(&f);

        assert_eq!(states, vec![TuState { tu: 1, bound: false }]);
    }

    #[test]
    fn test_exact_threshold_is_bound() {
        let f = frame(vec![
            particle(1, ParticleKind::Tu, 0.0, 0.0, 0.0),
            particle(2, ParticleKind::Tf, 0.0, 3.5, 0.0),
        ]);
        let states = BindingClassifier::new(3.5).unwrap().classify(&f);

        assert!(states[0].bound);
    }

    #[test]
    fn test_no_tf_leaves_every_tu_unbound() {
        let f = frame(vec![
            particle(1, ParticleKind::Tu, 0.0, 0.0, 0.0),
            particle(2, ParticleKind::Tu, 1.0, 0.0, 0.0),
            particle(3, ParticleKind::Dna, 0.5, 0.0, 0.0),
        ]);
        let classifier = BindingClassifier::default();
        let states = classifier.classify(&f);

        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|s| !s.bound));
        assert!(classifier.nearest_distances(&f).iter().all(|s| s.distance.is_none()));
    }

    #[test]
    fn test_no_tu_yields_no_states() {
        let f = frame(vec![particle(1, ParticleKind::Tf, 0.0, 0.0, 0.0)]);
        assert!(BindingClassifier::default().classify(&f).is_empty());
    }

    #[test]
    fn test_dna_beads_do_not_bind() {
        let f = frame(vec![
            particle(1, ParticleKind::Tu, 0.0, 0.0, 0.0),
            particle(2, ParticleKind::Dna, 1.0, 0.0, 0.0),
            particle(3, ParticleKind::Other(4), 1.0, 0.0, 0.0),
        ]);
        assert!(!BindingClassifier::default().classify(&f)[0].bound);
    }

    #[test]
    fn test_nearest_distance_reported() {
        let mut f = frame(vec![
            particle(7, ParticleKind::Tu, 0.0, 0.0, 0.0),
            particle(8, ParticleKind::Tf, 0.0, 0.0, 6.0),
            particle(9, ParticleKind::Tf, 0.0, 2.0, 0.0),
        ]);
        f.timestep = 500;
        let samples = BindingClassifier::default().nearest_distances(&f);

        assert_eq!(
            samples,
            vec![DistanceSample { timestep: 500, tu: 7, distance: Some(2.0) }]
        );
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(BindingClassifier::new(-1.0).is_err());
        assert!(BindingClassifier::new(f64::NAN).is_err());
        assert!(BindingClassifier::new(0.0).is_ok());
    }

    #[test]
    fn test_parallel_path_matches_sequential() {
        // 300 TUs × 300 TFs crosses the parallel threshold
        let mut particles = Vec::new();
        for i in 0..300u32 {
            let t = i as f64;
            particles.push(particle(i, ParticleKind::Tu, t * 0.7, (t * 0.3).sin() * 20.0, 0.0));
            particles.push(particle(1000 + i, ParticleKind::Tf, t * 0.69, (t * 0.31).cos() * 20.0, 1.0));
        }
        let f = frame(particles);
        let classifier = BindingClassifier::default();
        let parallel = classifier.classify(&f);

        let tfs: Vec<Vector3<f64>> = f.tfs().map(|p| p.position).collect();
        let sequential: Vec<TuState> = f
            .tus()
            .map(|p| TuState {
                tu: p.id,
                bound: nearest_tf_distance(&p.position, &tfs).map_or(false, |d| d <= 3.5),
            })
            .collect();

        assert_eq!(parallel, sequential);
    }

    proptest! {
        /// Property: classification does not depend on TF record order
        #[test]
        fn prop_tf_order_invariant(
            tfs in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0), 0..20),
            threshold in 0.0f64..8.0,
        ) {
            let tu = particle(1, ParticleKind::Tu, 0.0, 0.0, 0.0);
            let forward: Vec<Particle> = std::iter::once(tu.clone())
                .chain(tfs.iter().enumerate().map(|(i, (x, y, z))| {
                    particle(100 + i as u32, ParticleKind::Tf, *x, *y, *z)
                }))
                .collect();
            let mut reversed = forward.clone();
            reversed.reverse();

            let classifier = BindingClassifier::new(threshold).unwrap();
            prop_assert_eq!(classifier.classify(&frame(forward)), classifier.classify(&frame(reversed)));
        }
    }
}
