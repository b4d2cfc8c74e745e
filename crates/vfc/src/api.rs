//! High-level mismatch-removal API.
//!
//! [`Vfc`] holds one validated, normalized correspondence set plus a
//! configuration, and can be optimized any number of times.

use crate::correspondence::CorrespondenceSet;
use crate::error::VfcError;
use crate::estimator::{run_em, EstimationResult, Interrupt, VfcConfig};
use crate::normalize::NormalizedPair;

/// Primary estimation interface.
///
/// # Examples
///
/// ```
/// use vfc::{Vfc, VfcConfig};
///
/// let source: Vec<[f64; 2]> = (0..40)
///     .map(|i| [(i % 8) as f64 * 10.0, (i / 8) as f64 * 10.0])
///     .collect();
/// let mut target: Vec<[f64; 2]> = source.iter().map(|p| [p[0] + 3.0, p[1] - 1.0]).collect();
/// target[5] = [70.0, 2.0];
///
/// let mut vfc = Vfc::set_data(&source, &target).unwrap();
/// vfc.configure(VfcConfig { seed: Some(1), ..VfcConfig::default() }).unwrap();
/// let result = vfc.optimize();
/// assert!(!Vfc::obtain_correct_match(&result).contains(&5));
/// ```
#[derive(Debug, Clone)]
pub struct Vfc {
    set: CorrespondenceSet,
    normalized: NormalizedPair,
    config: VfcConfig,
}

impl Vfc {
    /// Store aligned source/target point lists (original indices `0..N`).
    pub fn set_data(source: &[[f64; 2]], target: &[[f64; 2]]) -> Result<Self, VfcError> {
        Ok(Self::from_correspondences(CorrespondenceSet::from_points(
            source, target,
        )?))
    }

    /// Store a validated correspondence set with default configuration.
    pub fn from_correspondences(set: CorrespondenceSet) -> Self {
        let normalized = NormalizedPair::from_set(&set);
        Self {
            set,
            normalized,
            config: VfcConfig::default(),
        }
    }

    /// Replace the configuration; rejected values leave the handle unchanged.
    pub fn configure(&mut self, config: VfcConfig) -> Result<(), VfcError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Builder-style [`configure`](Self::configure).
    pub fn with_config(mut self, config: VfcConfig) -> Result<Self, VfcError> {
        self.configure(config)?;
        Ok(self)
    }

    pub fn config(&self) -> &VfcConfig {
        &self.config
    }

    pub fn correspondences(&self) -> &CorrespondenceSet {
        &self.set
    }

    /// Number of stored correspondences.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Always `false`; a handle holds at least three correspondences.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Run the estimator to convergence or the iteration cap.
    pub fn optimize(&self) -> EstimationResult {
        self.optimize_with_interrupt(&Interrupt::none())
    }

    /// Run the estimator, stopping early when `interrupt` fires.
    pub fn optimize_with_interrupt(&self, interrupt: &Interrupt<'_>) -> EstimationResult {
        run_em(&self.set, &self.normalized, &self.config, interrupt)
    }

    /// Original indices of the correspondences classified as inliers.
    pub fn obtain_correct_match(result: &EstimationResult) -> &[usize] {
        result.inliers()
    }
}

/// One-shot filter: returns the original indices (`0..N`) of the inliers.
pub fn filter_matches(
    source: &[[f64; 2]],
    target: &[[f64; 2]],
    config: &VfcConfig,
) -> Result<Vec<usize>, VfcError> {
    let vfc = Vfc::set_data(source, target)?.with_config(config.clone())?;
    Ok(vfc.optimize().inliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{synthetic_matches, SyntheticScene};

    #[test]
    fn rejected_config_leaves_handle_unchanged() {
        let scene = synthetic_matches(&SyntheticScene::default(), 3);
        let mut vfc = Vfc::set_data(&scene.source, &scene.target).unwrap();
        let before = vfc.config().clone();

        let bad = VfcConfig {
            bandwidth: -1.0,
            ..VfcConfig::default()
        };
        assert!(matches!(
            vfc.configure(bad),
            Err(VfcError::InvalidConfig { field: "bandwidth", .. })
        ));
        assert_eq!(vfc.config(), &before);
    }

    #[test]
    fn set_data_rejects_invalid_input() {
        let two = [[0.0, 0.0], [1.0, 1.0]];
        assert!(matches!(
            Vfc::set_data(&two, &two),
            Err(VfcError::TooFewCorrespondences { .. })
        ));
        let three = [[0.0, 0.0], [1.0, 1.0], [2.0, f64::INFINITY]];
        let ok = [[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]];
        assert!(matches!(
            Vfc::set_data(&ok, &three),
            Err(VfcError::NonFiniteCoordinate { index: 2 })
        ));
    }

    #[test]
    fn optimize_is_repeatable_on_an_unmodified_handle() {
        let scene = synthetic_matches(&SyntheticScene::default(), 11);
        let vfc = Vfc::set_data(&scene.source, &scene.target)
            .unwrap()
            .with_config(VfcConfig {
                seed: Some(5),
                ..VfcConfig::default()
            })
            .unwrap();

        let a = vfc.optimize();
        let b = vfc.optimize();
        assert_eq!(a, b);
        assert_eq!(Vfc::obtain_correct_match(&a), a.inliers());
        assert_eq!(vfc.len(), scene.source.len());
    }

    #[test]
    fn filter_matches_agrees_with_handle() {
        let scene = synthetic_matches(&SyntheticScene::default(), 21);
        let config = VfcConfig {
            seed: Some(9),
            ..VfcConfig::default()
        };
        let via_fn = filter_matches(&scene.source, &scene.target, &config).unwrap();
        let via_handle = Vfc::set_data(&scene.source, &scene.target)
            .unwrap()
            .with_config(config)
            .unwrap()
            .optimize();
        assert_eq!(via_fn, via_handle.inliers);
    }

    #[test]
    fn keypoint_matches_keep_match_indices() {
        let scene = synthetic_matches(&SyntheticScene::default(), 4);
        // Keypoint lists in reverse order; matches reference them by index.
        let kp1: Vec<[f64; 2]> = scene.source.iter().rev().copied().collect();
        let kp2: Vec<[f64; 2]> = scene.target.clone();
        let n = scene.source.len();
        let pairs: Vec<(usize, usize)> = (0..n).map(|i| (n - 1 - i, i)).collect();

        let set = CorrespondenceSet::from_index_pairs(&kp1, &kp2, &pairs).unwrap();
        let result = Vfc::from_correspondences(set)
            .with_config(VfcConfig {
                seed: Some(2),
                ..VfcConfig::default()
            })
            .unwrap()
            .optimize();

        let direct = filter_matches(
            &scene.source,
            &scene.target,
            &VfcConfig {
                seed: Some(2),
                ..VfcConfig::default()
            },
        )
        .unwrap();
        assert_eq!(result.inliers, direct);
    }
}
