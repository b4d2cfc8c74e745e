//! Error type for correspondence validation and configuration.

/// Errors surfaced before estimation starts.
///
/// Every variant is a caller error: malformed correspondence lists or an
/// out-of-domain configuration. Numerical trouble inside the EM loop is never
/// reported through this type; it is recovered locally and recorded in
/// [`Diagnostics`](crate::Diagnostics).
#[derive(Debug, Clone, PartialEq)]
pub enum VfcError {
    /// Fewer correspondences than the estimator needs.
    TooFewCorrespondences {
        /// Required minimum number of correspondences.
        needed: usize,
        /// Provided number of correspondences.
        got: usize,
    },
    /// Source and target point lists differ in length.
    LengthMismatch {
        /// Number of source points.
        source: usize,
        /// Number of target points.
        target: usize,
    },
    /// A coordinate is NaN or infinite.
    NonFiniteCoordinate {
        /// Original index of the offending correspondence.
        index: usize,
    },
    /// Two correspondences share the same original index.
    DuplicateIndex {
        /// The repeated original index.
        index: usize,
    },
    /// A match refers to a keypoint that does not exist.
    IndexOutOfRange {
        /// Position of the match in the match list.
        match_index: usize,
        /// Keypoint index that was requested.
        keypoint: usize,
        /// Number of keypoints available on that side.
        len: usize,
    },
    /// A configuration value is outside its valid domain.
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },
}

impl VfcError {
    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for VfcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewCorrespondences { needed, got } => {
                write!(f, "too few correspondences: need {}, got {}", needed, got)
            }
            Self::LengthMismatch { source, target } => write!(
                f,
                "source and target lengths differ: {} source vs {} target points",
                source, target
            ),
            Self::NonFiniteCoordinate { index } => {
                write!(f, "correspondence {} has a non-finite coordinate", index)
            }
            Self::DuplicateIndex { index } => {
                write!(f, "correspondence index {} appears more than once", index)
            }
            Self::IndexOutOfRange {
                match_index,
                keypoint,
                len,
            } => write!(
                f,
                "match {} refers to keypoint {} but only {} keypoints exist",
                match_index, keypoint, len
            ),
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid config `{}`: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for VfcError {}
