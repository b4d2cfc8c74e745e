//! Correspondence sets and keypoint-match assembly.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::VfcError;

/// Smallest correspondence count the estimator accepts.
pub const MIN_CORRESPONDENCES: usize = 3;

/// One proposed source -> target pairing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Caller-side index, preserved end-to-end.
    pub index: usize,
    /// Point in the source set.
    pub source: [f64; 2],
    /// Point in the target set.
    pub target: [f64; 2],
}

/// Validated correspondence list stored as parallel vectors.
///
/// Position `i` in `source`, `target` and `indices` describes the same
/// correspondence. Construction guarantees at least
/// [`MIN_CORRESPONDENCES`] entries, finite coordinates and unique indices.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceSet {
    source: Vec<[f64; 2]>,
    target: Vec<[f64; 2]>,
    indices: Vec<usize>,
}

impl CorrespondenceSet {
    /// Build from two aligned point lists; original indices are `0..N`.
    pub fn from_points(source: &[[f64; 2]], target: &[[f64; 2]]) -> Result<Self, VfcError> {
        if source.len() != target.len() {
            return Err(VfcError::LengthMismatch {
                source: source.len(),
                target: target.len(),
            });
        }
        let set = Self {
            source: source.to_vec(),
            target: target.to_vec(),
            indices: (0..source.len()).collect(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Build from correspondences carrying their own original indices.
    pub fn from_correspondences<I>(items: I) -> Result<Self, VfcError>
    where
        I: IntoIterator<Item = Correspondence>,
    {
        let mut set = Self {
            source: Vec::new(),
            target: Vec::new(),
            indices: Vec::new(),
        };
        for c in items {
            set.push(c.index, c.source, c.target);
        }
        set.validate()?;
        Ok(set)
    }

    /// Build from keypoint lists and `(query, train)` match pairs.
    ///
    /// Match `k` becomes the correspondence with original index `k`, so the
    /// estimator's inlier list indexes directly into `pairs`.
    pub fn from_index_pairs(
        keypoints_1: &[[f64; 2]],
        keypoints_2: &[[f64; 2]],
        pairs: &[(usize, usize)],
    ) -> Result<Self, VfcError> {
        let mut set = Self {
            source: Vec::with_capacity(pairs.len()),
            target: Vec::with_capacity(pairs.len()),
            indices: Vec::with_capacity(pairs.len()),
        };
        for (match_index, &(query, train)) in pairs.iter().enumerate() {
            let source = lookup_keypoint(keypoints_1, match_index, query)?;
            let target = lookup_keypoint(keypoints_2, match_index, train)?;
            set.push(match_index, source, target);
        }
        set.validate()?;
        Ok(set)
    }

    fn push(&mut self, index: usize, source: [f64; 2], target: [f64; 2]) {
        self.source.push(source);
        self.target.push(target);
        self.indices.push(index);
    }

    fn validate(&self) -> Result<(), VfcError> {
        if self.len() < MIN_CORRESPONDENCES {
            return Err(VfcError::TooFewCorrespondences {
                needed: MIN_CORRESPONDENCES,
                got: self.len(),
            });
        }
        let mut seen = BTreeSet::new();
        for (i, &index) in self.indices.iter().enumerate() {
            let finite = self.source[i].iter().all(|v| v.is_finite())
                && self.target[i].iter().all(|v| v.is_finite());
            if !finite {
                return Err(VfcError::NonFiniteCoordinate { index });
            }
            if !seen.insert(index) {
                return Err(VfcError::DuplicateIndex { index });
            }
        }
        Ok(())
    }

    /// Number of correspondences.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Always `false` for a validated set; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Source points in input order.
    pub fn source(&self) -> &[[f64; 2]] {
        &self.source
    }

    /// Target points in input order.
    pub fn target(&self) -> &[[f64; 2]] {
        &self.target
    }

    /// Original indices in input order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Correspondence at input position `pos`.
    pub fn get(&self, pos: usize) -> Option<Correspondence> {
        Some(Correspondence {
            index: *self.indices.get(pos)?,
            source: self.source[pos],
            target: self.target[pos],
        })
    }

    /// Iterate correspondences in input order.
    pub fn iter(&self) -> impl Iterator<Item = Correspondence> + '_ {
        (0..self.len()).filter_map(|pos| self.get(pos))
    }

    /// Map input positions to original indices, ascending.
    pub(crate) fn original_indices(&self, positions: &[usize]) -> Vec<usize> {
        let mut out: Vec<usize> = positions.iter().map(|&p| self.indices[p]).collect();
        out.sort_unstable();
        out
    }
}

fn lookup_keypoint(
    keypoints: &[[f64; 2]],
    match_index: usize,
    keypoint: usize,
) -> Result<[f64; 2], VfcError> {
    keypoints
        .get(keypoint)
        .copied()
        .ok_or(VfcError::IndexOutOfRange {
            match_index,
            keypoint,
            len: keypoints.len(),
        })
}
