//! Shared synthetic correspondence generators for unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Parameters of a synthetic two-view scene.
///
/// Inliers follow `t = R(rotation) s + translation + warp`, where the warp is
/// a smooth horizontal ripple, plus uniform noise in `[-noise, noise]`.
/// Outliers pair two independent uniform points in the same extent.
#[derive(Debug, Clone)]
pub(crate) struct SyntheticScene {
    pub n_inliers: usize,
    pub n_outliers: usize,
    pub extent: [f64; 2],
    pub rotation: f64,
    pub translation: [f64; 2],
    pub warp_amplitude: f64,
    pub noise: f64,
}

impl Default for SyntheticScene {
    /// 70 inliers shifted by (0.1, 0.05) plus 30 outliers in the unit square.
    fn default() -> Self {
        Self {
            n_inliers: 70,
            n_outliers: 30,
            extent: [1.0, 1.0],
            rotation: 0.0,
            translation: [0.1, 0.05],
            warp_amplitude: 0.0,
            noise: 0.0,
        }
    }
}

impl SyntheticScene {
    /// 640×480 view pair with rotation, ripple and ±1 px noise.
    pub fn noisy_image_pair() -> Self {
        Self {
            n_inliers: 70,
            n_outliers: 30,
            extent: [640.0, 480.0],
            rotation: 0.1,
            translation: [20.0, -10.0],
            warp_amplitude: 5.0,
            noise: 1.0,
        }
    }
}

/// Generated correspondences; the first `n_inliers` entries are inliers.
#[derive(Debug, Clone)]
pub(crate) struct SyntheticMatches {
    pub source: Vec<[f64; 2]>,
    pub target: Vec<[f64; 2]>,
    pub n_inliers: usize,
}

impl SyntheticMatches {
    /// Precision and recall of an inlier index list against the ground truth.
    pub fn precision_recall(&self, inliers: &[usize]) -> (f64, f64) {
        let tp = inliers.iter().filter(|&&i| i < self.n_inliers).count() as f64;
        let precision = if inliers.is_empty() {
            1.0
        } else {
            tp / inliers.len() as f64
        };
        let recall = if self.n_inliers == 0 {
            1.0
        } else {
            tp / self.n_inliers as f64
        };
        (precision, recall)
    }
}

pub(crate) fn synthetic_matches(scene: &SyntheticScene, seed: u64) -> SyntheticMatches {
    let mut rng = StdRng::seed_from_u64(seed);
    let [w, h] = scene.extent;
    let (sin, cos) = scene.rotation.sin_cos();
    let n = scene.n_inliers + scene.n_outliers;

    let mut source = Vec::with_capacity(n);
    let mut target = Vec::with_capacity(n);
    for _ in 0..scene.n_inliers {
        let x = rng.gen_range(0.0..w);
        let y = rng.gen_range(0.0..h);
        let ripple = scene.warp_amplitude * (4.8 * y / h).sin();
        let mut jitter = || {
            if scene.noise > 0.0 {
                rng.gen_range(-scene.noise..scene.noise)
            } else {
                0.0
            }
        };
        let tx = cos * x - sin * y + scene.translation[0] + ripple + jitter();
        let ty = sin * x + cos * y + scene.translation[1] + jitter();
        source.push([x, y]);
        target.push([tx, ty]);
    }
    for _ in 0..scene.n_outliers {
        source.push([rng.gen_range(0.0..w), rng.gen_range(0.0..h)]);
        target.push([rng.gen_range(0.0..w), rng.gen_range(0.0..h)]);
    }

    SyntheticMatches {
        source,
        target,
        n_inliers: scene.n_inliers,
    }
}
