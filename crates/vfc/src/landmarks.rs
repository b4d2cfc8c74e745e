//! Landmark (kernel basis) selection.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Basis size used when the caller does not set one.
pub const DEFAULT_LANDMARK_CAP: usize = 15;

/// Ascending positions of the correspondences used as kernel centers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkSet {
    indices: Vec<usize>,
}

impl LandmarkSet {
    /// Every position `0..n`; the kernel is then exact.
    pub fn all(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    /// Landmark positions, ascending.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of landmarks (M).
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// `true` when no landmark was selected.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `true` when every one of `n` positions is a landmark.
    pub fn is_exact(&self, n: usize) -> bool {
        self.indices.len() == n
    }
}

/// Default basis size for `n` correspondences.
pub fn default_landmark_count(n: usize) -> usize {
    n.min(DEFAULT_LANDMARK_CAP)
}

/// Select `count` distinct positions out of `0..n`, uniformly at random.
///
/// When `count >= n` all positions are returned and `rng` is not consumed.
pub fn select_landmarks(n: usize, count: usize, rng: &mut impl Rng) -> LandmarkSet {
    if count >= n {
        return LandmarkSet::all(n);
    }
    let mut indices = sample_indices(rng, n, count);
    indices.sort_unstable();
    LandmarkSet { indices }
}

/// Sample `k` distinct indices from `0..n` using Fisher–Yates partial shuffle.
fn sample_indices(rng: &mut impl Rng, n: usize, k: usize) -> Vec<usize> {
    debug_assert!(k <= n);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn selection_is_distinct_sorted_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = select_landmarks(200, 15, &mut rng);

        assert_eq!(set.len(), 15);
        assert!(set.indices().windows(2).all(|w| w[0] < w[1]));
        assert!(set.indices().iter().all(|&i| i < 200));
        assert!(!set.is_exact(200));
    }

    #[test]
    fn count_at_or_above_n_selects_everything() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_landmarks(4, 4, &mut rng), LandmarkSet::all(4));
        assert_eq!(select_landmarks(4, 10, &mut rng).indices(), &[0, 1, 2, 3]);
        assert!(select_landmarks(4, 10, &mut rng).is_exact(4));
    }

    #[test]
    fn same_seed_gives_same_selection() {
        let a = select_landmarks(500, 15, &mut StdRng::seed_from_u64(99));
        let b = select_landmarks(500, 15, &mut StdRng::seed_from_u64(99));
        let c = select_landmarks(500, 15, &mut StdRng::seed_from_u64(100));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn default_count_is_capped() {
        assert_eq!(default_landmark_count(3), 3);
        assert_eq!(default_landmark_count(15), 15);
        assert_eq!(default_landmark_count(1000), DEFAULT_LANDMARK_CAP);
    }

    #[test]
    fn every_position_is_reachable() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut hits = [0usize; 10];
        for _ in 0..400 {
            for &i in select_landmarks(10, 3, &mut rng).indices() {
                hits[i] += 1;
            }
        }
        // 400 draws * 3 / 10 = 120 expected hits per position.
        assert!(hits.iter().all(|&h| h > 60), "hits: {:?}", hits);
    }
}
