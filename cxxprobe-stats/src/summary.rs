//! Summary Statistics
//!
//! Sample moments for the small sample sizes a benchmark run produces. The
//! standard deviation is the sample (n - 1) estimator.

/// Mean, spread and standard error of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSummary {
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
    /// Standard error of the mean
    pub std_error: f64,
    /// Number of samples
    pub sample_count: usize,
}

/// Compute summary statistics. Returns `None` for an empty sample.
pub fn compute_summary(samples: &[f64]) -> Option<SampleSummary> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;

    let std_dev = if samples.len() < 2 {
        0.0
    } else {
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };

    Some(SampleSummary {
        mean,
        std_dev,
        std_error: std_dev / n.sqrt(),
        sample_count: samples.len(),
    })
}

/// Whether every sample is bit-identical to the first
pub fn all_identical(samples: &[f64]) -> bool {
    match samples.first() {
        Some(first) => samples.iter().all(|x| x.to_bits() == first.to_bits()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_summary() {
        let summary = compute_summary(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((summary.mean - 3.0).abs() < 1e-12);
        // variance = 10 / 4
        assert!((summary.std_dev - 2.5f64.sqrt()).abs() < 1e-12);
        assert!((summary.std_error - (2.5f64 / 5.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.sample_count, 5);
    }

    #[test]
    fn test_single_sample_has_no_spread() {
        let summary = compute_summary(&[7.0]).unwrap();
        assert_eq!(summary.mean, 7.0);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_empty_samples() {
        assert!(compute_summary(&[]).is_none());
    }

    #[test]
    fn test_all_identical() {
        assert!(all_identical(&[3.5, 3.5, 3.5]));
        assert!(!all_identical(&[3.5, 3.5, 3.6]));
        assert!(all_identical(&[]));
    }
}
