//! Posterior thresholding.

/// Positions whose posterior is at or above `threshold`, ascending.
pub fn classify_matches(posteriors: &[f64], threshold: f64) -> Vec<usize> {
    posteriors
        .iter()
        .enumerate()
        .filter(|&(_, &p)| p >= threshold)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        let p = [0.9, 0.75, 0.7499, 0.0, 1.0];
        assert_eq!(classify_matches(&p, 0.75), vec![0, 1, 4]);
    }

    #[test]
    fn reclassifying_is_idempotent() {
        let p = [0.2, 0.8, 0.95, 0.5, 0.76];
        let first = classify_matches(&p, 0.75);
        let second = classify_matches(&p, 0.75);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn extreme_thresholds() {
        let p = [0.0, 0.3, 1.0];
        assert_eq!(classify_matches(&p, 0.0), vec![0, 1, 2]);
        assert_eq!(classify_matches(&p, 1.0), vec![2]);
        assert!(classify_matches(&[], 0.5).is_empty());
    }
}
