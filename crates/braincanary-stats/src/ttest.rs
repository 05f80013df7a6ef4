//! Welch's unequal-variance two-sample t-test

use crate::distributions::{student_t_cdf, student_t_quantile};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("welch's t-test requires at least 2 samples per side")]
    InsufficientSamples,
}

/// Result of a Welch two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WelchResult {
    pub t: f64,
    pub df: f64,
    /// Two-sided p-value.
    pub p_two: f64,
    /// One-sided p-value: the probability the true canary mean is at most the baseline
    /// mean (i.e. `P(canary <= baseline)`).
    pub p_one: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub baseline_mean: f64,
    pub canary_mean: f64,
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn sample_variance(xs: &[f64], m: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

/// Run Welch's t-test comparing baseline samples `b` against canary samples `c`.
pub fn welch(b: &[f64], c: &[f64]) -> Result<WelchResult, StatsError> {
    if b.len() < 2 || c.len() < 2 {
        return Err(StatsError::InsufficientSamples);
    }

    let n1 = b.len() as f64;
    let n2 = c.len() as f64;
    let mean1 = mean(b);
    let mean2 = mean(c);
    let var1 = sample_variance(b, mean1);
    let var2 = sample_variance(c, mean2);

    let term1 = var1 / n1;
    let term2 = var2 / n2;
    let se = (term1 + term2).sqrt();

    if se == 0.0 {
        return Ok(WelchResult {
            t: 0.0,
            df: (n1 + n2 - 2.0).max(1.0),
            p_two: 1.0,
            p_one: 0.5,
            ci_low: 0.0,
            ci_high: 0.0,
            baseline_mean: mean1,
            canary_mean: mean2,
        });
    }

    let t = (mean2 - mean1) / se;
    let df = (term1 + term2).powi(2) / (term1.powi(2) / (n1 - 1.0) + term2.powi(2) / (n2 - 1.0));

    let p_two = 2.0 * student_t_cdf(-t.abs(), df);
    let p_one = student_t_cdf(t, df);

    let critical = student_t_quantile(0.975, df);
    let delta = mean2 - mean1;
    let ci_low = delta - se * critical;
    let ci_high = delta + se * critical;

    Ok(WelchResult {
        t,
        df,
        p_two,
        p_one,
        ci_low,
        ci_high,
        baseline_mean: mean1,
        canary_mean: mean2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_samples_give_t_zero_and_p_one_half() {
        let xs = vec![0.9, 0.91, 0.89, 0.9, 0.88];
        let result = welch(&xs, &xs).unwrap();
        assert!((result.t).abs() < 1e-9);
        assert!((result.p_two - 1.0).abs() < 1e-9);
        assert!((result.p_one - 0.5).abs() < 1e-9);
    }

    #[test]
    fn single_sample_is_insufficient() {
        assert_eq!(welch(&[1.0], &[1.0, 2.0]), Err(StatsError::InsufficientSamples));
    }

    #[test]
    fn constant_equal_values_hit_se_zero_branch() {
        let b = vec![0.5, 0.5, 0.5];
        let c = vec![0.5, 0.5, 0.5];
        let result = welch(&b, &c).unwrap();
        assert_eq!(result.t, 0.0);
        assert_eq!(result.p_two, 1.0);
        assert_eq!(result.p_one, 0.5);
        assert_eq!(result.ci_low, 0.0);
        assert_eq!(result.ci_high, 0.0);
    }

    #[test]
    fn clearly_worse_canary_yields_low_one_sided_p() {
        let baseline = vec![0.9, 0.91, 0.89, 0.9, 0.91, 0.88, 0.9, 0.9, 0.91, 0.89];
        let canary = vec![0.78, 0.75, 0.8, 0.76, 0.79, 0.77, 0.75, 0.78, 0.76, 0.77];
        let result = welch(&baseline, &canary).unwrap();
        assert!(result.p_one < 0.01, "p_one={}", result.p_one);
        assert!(result.canary_mean < result.baseline_mean);
    }

    #[test]
    fn indistinguishable_canary_yields_high_one_sided_p() {
        let baseline = vec![0.9, 0.91, 0.89, 0.9, 0.91, 0.88, 0.9, 0.9, 0.91, 0.89];
        let canary = vec![0.9, 0.89, 0.9, 0.9, 0.88, 0.91, 0.9, 0.89, 0.91, 0.9];
        let result = welch(&baseline, &canary).unwrap();
        assert!(result.p_one > 0.05, "p_one={}", result.p_one);
    }
}
