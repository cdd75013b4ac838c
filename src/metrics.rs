//! Noise-to-thrust ratio and the derived comparison metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::acoustics::{NoiseBreakdown, FREQUENCY_LABEL, REFERENCE_PRESSURE_PA};
use crate::thrust::ThrustBreakdown;

/// Minimum NTR reduction, in percent, a design must achieve over the baseline.
pub const NTR_REDUCTION_TARGET_PCT: f64 = 15.0;

/// `SPL / (T / T_ref)`. Infinite when the thrust or the reference is not
/// positive, or the normalised thrust overflows.
pub fn ntr(noise_spl_db: f64, thrust_n: f64, reference_thrust: f64) -> f64 {
    if !(thrust_n > 0.0) || !(reference_thrust > 0.0) {
        return f64::INFINITY;
    }
    let normalized = thrust_n / reference_thrust;
    if !(normalized > 0.0) || !normalized.is_finite() {
        return f64::INFINITY;
    }
    noise_spl_db / normalized
}

/// Thrust per watt scaled by inverse loudness. Higher is better.
pub fn acoustic_efficiency(noise_spl_db: f64, thrust_n: f64, power_w: f64) -> f64 {
    if !(noise_spl_db > 0.0) || !(power_w > 0.0) {
        return 0.0;
    }
    (thrust_n / power_w) * (100.0 / noise_spl_db) * 1000.0
}

/// `(baseline - modified) / baseline · 100`; 0 for a non-positive baseline.
pub fn reduction_pct(baseline_ntr: f64, modified_ntr: f64) -> f64 {
    if !(baseline_ntr > 0.0) {
        return 0.0;
    }
    (baseline_ntr - modified_ntr) / baseline_ntr * 100.0
}

pub fn meets_target(reduction_pct: f64) -> bool {
    reduction_pct >= NTR_REDUCTION_TARGET_PCT
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PerformanceMetrics {
    pub ntr: f64,
    pub acoustic_efficiency: f64,
    pub total_noise_spl_db: f64,
    pub thrust_n: f64,
    pub power_w: f64,
    pub propulsive_efficiency: f64,
    pub broadband_noise_db: f64,
    pub tonal_noise_db: f64,
    pub vortex_noise_db: f64,
    /// Present only when evaluated against a baseline NTR.
    pub reduction_pct: Option<f64>,
    pub meets_target: Option<bool>,
}

/// Side-by-side view of one design against a baseline NTR.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub baseline_ntr: f64,
    pub current_ntr: f64,
    pub reduction_pct: f64,
    pub meets_target: bool,
    pub improvement: f64,
}

impl PerformanceMetrics {
    /// `None` when the baseline cannot be compared against.
    pub fn compare_to_baseline(&self, baseline_ntr: f64) -> Option<BaselineComparison> {
        if !(baseline_ntr > 0.0) {
            return None;
        }
        let reduction = reduction_pct(baseline_ntr, self.ntr);
        Some(BaselineComparison {
            baseline_ntr,
            current_ntr: self.ntr,
            reduction_pct: reduction,
            meets_target: meets_target(reduction),
            improvement: baseline_ntr - self.ntr,
        })
    }
}

/// Combine a noise and a thrust result into [`PerformanceMetrics`].
pub fn evaluate(
    noise: &NoiseBreakdown,
    thrust: &ThrustBreakdown,
    baseline_ntr: Option<f64>,
) -> PerformanceMetrics {
    let ratio = ntr(noise.total_spl_db, thrust.thrust_n, 1.0);
    let reduction = baseline_ntr.map(|baseline| reduction_pct(baseline, ratio));

    PerformanceMetrics {
        ntr: ratio,
        acoustic_efficiency: acoustic_efficiency(noise.total_spl_db, thrust.thrust_n, thrust.power_w),
        total_noise_spl_db: noise.total_spl_db,
        thrust_n: thrust.thrust_n,
        power_w: thrust.power_w,
        propulsive_efficiency: thrust.efficiency,
        broadband_noise_db: noise.broadband_spl_db,
        tonal_noise_db: noise.tonal_spl_db,
        vortex_noise_db: noise.vortex_spl_db,
        reduction_pct: reduction,
        meets_target: reduction.map(meets_target),
    }
}

/// Weighted energy sum over a labelled spectrum.
///
/// Entries whose label contains `frequency_hz` are metadata and skipped.
/// Labels without a weight get 1.0.
pub fn weighted_spl(
    spectrum: &BTreeMap<String, f64>,
    weights: Option<&BTreeMap<String, f64>>,
) -> f64 {
    let total_sq: f64 = spectrum
        .iter()
        .filter(|(label, _)| !label.contains(FREQUENCY_LABEL))
        .map(|(label, &spl)| {
            let weight = weights.and_then(|w| w.get(label)).copied().unwrap_or(1.0);
            let pressure = REFERENCE_PRESSURE_PA * 10f64.powf(spl / 20.0);
            (weight * pressure).powi(2)
        })
        .sum();

    if total_sq > 0.0 {
        20.0 * (total_sq.sqrt() / REFERENCE_PRESSURE_PA).log10()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise(total: f64) -> NoiseBreakdown {
        NoiseBreakdown {
            total_spl_db: total,
            broadband_spl_db: 70.0,
            tonal_spl_db: 75.0,
            vortex_spl_db: 65.0,
            vortex_frequency_hz: 400.0,
            blade_passage_frequency_hz: 166.7,
            harmonics: Vec::new(),
            bio_reduction_db: None,
        }
    }

    fn thrust() -> ThrustBreakdown {
        ThrustBreakdown {
            thrust_n: 5.0,
            torque_nm: 0.2,
            power_w: 100.0,
            efficiency: 0.65,
        }
    }

    #[test]
    fn ntr_divides_noise_by_thrust() {
        assert_eq!(ntr(80.0, 5.0, 1.0), 16.0);
        assert_eq!(ntr(80.0, 5.0, 2.5), 40.0);
    }

    #[test]
    fn ntr_without_thrust_is_infinite() {
        assert_eq!(ntr(80.0, 0.0, 1.0), f64::INFINITY);
        assert_eq!(ntr(0.0, -1.0, 1.0), f64::INFINITY);
        assert_eq!(ntr(80.0, 5.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn ntr_with_degenerate_reference_is_infinite() {
        assert_eq!(ntr(80.0, 5.0, -1.0), f64::INFINITY);
        assert_eq!(ntr(80.0, 5.0, 1e-320), f64::INFINITY);
        assert_eq!(ntr(80.0, 5.0, f64::NAN), f64::INFINITY);
    }

    #[test]
    fn reduction_percentage() {
        assert_eq!(reduction_pct(20.0, 17.0), 15.0);
        assert_eq!(reduction_pct(0.0, 5.0), 0.0);
        assert_eq!(reduction_pct(-3.0, 5.0), 0.0);
        assert!(reduction_pct(20.0, 25.0) < 0.0);
    }

    #[test]
    fn target_boundary_is_inclusive() {
        assert!(meets_target(15.0));
        assert!(!meets_target(14.999_999));
    }

    #[test]
    fn acoustic_efficiency_sentinels() {
        assert_eq!(acoustic_efficiency(0.0, 5.0, 100.0), 0.0);
        assert_eq!(acoustic_efficiency(80.0, 5.0, 0.0), 0.0);
        assert_relative_eq!(acoustic_efficiency(80.0, 5.0, 100.0), 0.05 * 1.25 * 1000.0);
    }

    #[test]
    fn evaluate_without_baseline_has_no_comparison() {
        let m = evaluate(&noise(80.0), &thrust(), None);
        assert_eq!(m.ntr, 16.0);
        assert_eq!(m.total_noise_spl_db, 80.0);
        assert_eq!(m.propulsive_efficiency, 0.65);
        assert!(m.reduction_pct.is_none());
        assert!(m.meets_target.is_none());
    }

    #[test]
    fn evaluate_against_baseline_sets_flag() {
        // 85 / 5 = 17 against 20 -> exactly 15 %
        let m = evaluate(&noise(85.0), &thrust(), Some(20.0));
        assert_eq!(m.reduction_pct, Some(15.0));
        assert_eq!(m.meets_target, Some(true));

        let m = evaluate(&noise(86.0), &thrust(), Some(20.0));
        assert_eq!(m.meets_target, Some(false));
    }

    #[test]
    fn compare_to_baseline_reports_improvement() {
        let m = evaluate(&noise(85.0), &thrust(), None);
        let cmp = m.compare_to_baseline(20.0).unwrap();
        assert_eq!(cmp.current_ntr, 17.0);
        assert_eq!(cmp.improvement, 3.0);
        assert!(cmp.meets_target);
        assert!(m.compare_to_baseline(0.0).is_none());
    }

    #[test]
    fn weighted_spl_skips_frequency_metadata() {
        let mut spectrum = BTreeMap::new();
        spectrum.insert("bpf_harmonic_1".to_string(), 80.0);
        spectrum.insert("frequency_hz_1".to_string(), 166.0);

        assert_relative_eq!(weighted_spl(&spectrum, None), 80.0, epsilon = 1e-9);
    }

    #[test]
    fn weighted_spl_applies_weights_in_pressure() {
        let mut spectrum = BTreeMap::new();
        spectrum.insert("a".to_string(), 80.0);
        spectrum.insert("b".to_string(), 80.0);
        let mut weights = BTreeMap::new();
        weights.insert("b".to_string(), 0.0);

        assert_relative_eq!(weighted_spl(&spectrum, Some(&weights)), 80.0, epsilon = 1e-9);
        assert_relative_eq!(
            weighted_spl(&spectrum, None),
            80.0 + 10.0 * 2f64.log10(),
            epsilon = 1e-9
        );
        assert_eq!(weighted_spl(&BTreeMap::new(), None), 0.0);
    }
}
