//! Trimmed mean and standard deviation.
//!
//! Robust location/scale estimates computed after discarding the extreme
//! values of a sorted sample. The total trim fraction `f` is split evenly
//! between the tails: `floor(f * n / 2)` values are dropped from each end, so
//! `n - 2 * floor(f * n / 2)` observations are retained.

use crate::error::{OrthoError, Result};
use serde::{Deserialize, Serialize};

/// Largest total trim fraction accepted (exclusive).
pub const MAX_FRACTION: f64 = 0.5;

/// Trimmed location and scale of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimmedStats {
    /// Number of observations before trimming.
    pub n: usize,
    /// Observations dropped from each tail.
    pub trimmed_per_tail: usize,
    /// Observations retained.
    pub retained: usize,
    /// Mean of the retained observations.
    pub mean: f64,
    /// Population standard deviation of the retained observations.
    pub std_dev: f64,
}

impl TrimmedStats {
    /// True when the retained observations are all equal.
    pub fn is_degenerate(&self) -> bool {
        self.std_dev == 0.0
    }

    /// Standardized deviate `(value - mean) / std_dev`, zero when degenerate.
    pub fn deviate(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            (value - self.mean) / self.std_dev
        }
    }
}

/// Check a total trim fraction lies in [0, 0.5).
pub fn validate_fraction(fraction: f64) -> Result<()> {
    if !fraction.is_finite() || !(0.0..MAX_FRACTION).contains(&fraction) {
        return Err(OrthoError::InvalidArgument(format!(
            "trim fraction must be in [0, {}), got {}",
            MAX_FRACTION, fraction
        )));
    }
    Ok(())
}

/// Observations dropped from each tail of a sample of size `n`.
pub fn trimmed_per_tail(n: usize, fraction: f64) -> usize {
    // tolerance keeps e.g. 0.3 * 10 / 2 from flooring to 1 when it is 1.5 - ulp
    ((fraction * n as f64) / 2.0 + 1e-9).floor() as usize
}

/// Observations retained from a sample of size `n`.
pub fn retained_count(n: usize, fraction: f64) -> usize {
    n.saturating_sub(2 * trimmed_per_tail(n, fraction))
}

/// Compute the trimmed mean and standard deviation of `values`.
///
/// # Errors
/// `InvalidArgument` when the fraction is outside [0, 0.5), when the sample
/// is empty or contains non-finite values, or when trimming would leave no
/// observation.
pub fn trimmed_stats(values: &[f64], fraction: f64) -> Result<TrimmedStats> {
    validate_fraction(fraction)?;
    let n = values.len();
    if n == 0 {
        return Err(OrthoError::InvalidArgument(
            "cannot compute trimmed statistics of an empty sample".to_string(),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(OrthoError::InvalidArgument(
            "sample contains non-finite values".to_string(),
        ));
    }

    let cut = trimmed_per_tail(n, fraction);
    let retained = n.saturating_sub(2 * cut);
    if retained == 0 {
        return Err(OrthoError::InvalidArgument(format!(
            "trim fraction {} removes all {} observations",
            fraction, n
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let kept = &sorted[cut..n - cut];

    let mean = kept.iter().sum::<f64>() / retained as f64;
    let std_dev = if kept[0] == kept[retained - 1] {
        0.0
    } else {
        let ss: f64 = kept.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / retained as f64).sqrt()
    };

    Ok(TrimmedStats {
        n,
        trimmed_per_tail: cut,
        retained,
        mean,
        std_dev,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_untrimmed_equals_ordinary() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = trimmed_stats(&values, 0.0).unwrap();
        assert_eq!(stats.retained, 8);
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.std_dev, 2.0);
    }

    #[test]
    fn test_trimming_drops_tails() {
        // n = 10, f = 0.4 -> 2 dropped from each tail
        let values = [100.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, -50.0];
        let stats = trimmed_stats(&values, 0.4).unwrap();
        assert_eq!(stats.trimmed_per_tail, 2);
        assert_eq!(stats.retained, 6);
        assert_relative_eq!(stats.mean, 4.5);
    }

    #[test]
    fn test_retained_count_rule() {
        for n in 1..40 {
            for &f in &[0.0, 0.1, 0.25, 0.3, 0.45, 0.49] {
                let r = retained_count(n, f);
                assert_eq!(r, n - 2 * ((f * n as f64) / 2.0 + 1e-9).floor() as usize);
                assert!(r >= 1);
            }
        }
    }

    #[test]
    fn test_mean_within_range_and_std_nonnegative() {
        let values = [3.0, 17.0, 0.0, 9.0, 9.0, 21.0, 4.0];
        for &f in &[0.0, 0.2, 0.4, 0.49] {
            let stats = trimmed_stats(&values, f).unwrap();
            assert!(stats.mean >= 0.0 && stats.mean <= 21.0);
            assert!(stats.std_dev >= 0.0);
        }
    }

    #[test]
    fn test_degenerate_std() {
        let stats = trimmed_stats(&[5.0, 5.0, 5.0], 0.0).unwrap();
        assert!(stats.is_degenerate());
        assert_eq!(stats.deviate(9.0), 0.0);

        // outliers trimmed away leave equal values
        let stats = trimmed_stats(&[0.0, 5.0, 5.0, 5.0, 99.0], 0.4).unwrap();
        assert!(stats.is_degenerate());

        let stats = trimmed_stats(&[1.0, 2.0], 0.0).unwrap();
        assert!(!stats.is_degenerate());
    }

    #[test]
    fn test_invalid_fraction() {
        assert!(trimmed_stats(&[1.0, 2.0], 0.5).unwrap_err().is_invalid_argument());
        assert!(trimmed_stats(&[1.0, 2.0], -0.1).unwrap_err().is_invalid_argument());
        assert!(trimmed_stats(&[1.0, 2.0], f64::NAN).unwrap_err().is_invalid_argument());
        assert!(trimmed_stats(&[], 0.1).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_deviate() {
        let stats = trimmed_stats(&[20.0, 2.0, 10.0], 0.0).unwrap();
        assert_relative_eq!(stats.mean, 32.0 / 3.0);
        assert!(stats.deviate(20.0) > 0.0);
        assert!(stats.deviate(2.0) < 0.0);
    }
}
