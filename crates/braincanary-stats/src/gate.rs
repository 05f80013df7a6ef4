//! Pure gate evaluator: (gate spec, baseline samples, canary samples, min-samples) -> verdict

use crate::ttest::welch;
use braincanary_types::{Comparison, Gate, GateResult, GateStatus};

/// Baseline requires at least this many samples before any gate can be evaluated,
/// independent of the stage's `min_samples` (which bounds the canary side).
const MIN_BASELINE_SAMPLES: usize = 10;

/// Evaluate one gate against the current baseline/canary raw samples.
///
/// `canary_min_samples` is the stage's configured minimum; `baseline_samples` and
/// `canary_samples` are the reservoir-retained raw observations for the gate's scorer.
pub fn evaluate_gate(
    gate: &Gate,
    baseline_samples: &[f64],
    canary_samples: &[f64],
    canary_min_samples: u32,
) -> GateResult {
    let baseline_n = baseline_samples.len() as u64;
    let canary_n = canary_samples.len() as u64;
    let baseline_mean = mean(baseline_samples);
    let canary_mean = mean(canary_samples);

    // Comparative gates run Welch's t-test, which requires at least 2 samples per side;
    // `stage.min_samples` can be configured as low as 1, so the canary floor must be
    // raised to 2 whenever a statistical comparison is actually going to run.
    let canary_floor = match gate.comparison {
        Comparison::AbsoluteOnly => canary_min_samples as u64,
        _ => (canary_min_samples as u64).max(2),
    };

    if canary_n < canary_floor || baseline_samples.len() < MIN_BASELINE_SAMPLES {
        return GateResult {
            scorer: gate.scorer.clone(),
            status: GateStatus::InsufficientData,
            p_value: None,
            baseline_mean,
            canary_mean,
            baseline_n,
            canary_n,
            absolute_check: false,
            comparison_check: false,
            confidence_required: gate.confidence,
            comparison: gate.comparison,
        };
    }

    let absolute_check = canary_mean >= gate.threshold;

    let (comparison_check, p_value) = if gate.comparison == Comparison::AbsoluteOnly {
        (true, None)
    } else {
        let welch_result = welch(baseline_samples, canary_samples)
            .expect("sample counts already checked against MIN_BASELINE_SAMPLES and canary_min_samples");
        let p_one = welch_result.p_one;
        let check = match gate.comparison {
            Comparison::NotWorseThanBaseline => p_one >= 1.0 - gate.confidence,
            Comparison::BetterThanBaseline => (1.0 - p_one) >= gate.confidence,
            Comparison::AbsoluteOnly => unreachable!("handled above"),
        };
        (check, Some(p_one))
    };

    let status = if absolute_check && comparison_check {
        GateStatus::Passing
    } else {
        GateStatus::Failing
    };

    GateResult {
        scorer: gate.scorer.clone(),
        status,
        p_value,
        baseline_mean,
        canary_mean,
        baseline_n,
        canary_n,
        absolute_check,
        comparison_check,
        confidence_required: gate.confidence,
        comparison: gate.comparison,
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}
