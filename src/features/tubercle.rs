//! Humpback-whale leading-edge tubercles.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{
    calibration, derived_count, linspace, BioFeature, FeatureKind, Profile, ReductionEstimate,
    ReductionTerms,
};
use crate::geometry::{GeometryRecord, OperatingConditions};

pub const DEFAULT_AMPLITUDE_RATIO: f64 = 0.12;
pub const DEFAULT_WAVELENGTH_RATIO: f64 = 0.25;

const CL_MAX_GAIN: f64 = 1.075;
const DRAG_PENALTY: f64 = 0.025;
const STALL_DELAY_DEG: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TubercleParams {
    pub count: u32,
    /// Spanwise wavelength after fitting `count` bumps exactly into the span.
    pub wavelength_m: f64,
    /// Bump amplitude over local chord.
    pub amplitude_ratio: f64,
    /// Fitted wavelength over span.
    pub wavelength_ratio: f64,
    pub span_m: f64,
}

/// Trade-off a parameter preset is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TubercleObjective {
    #[default]
    NoiseReduction,
    Efficiency,
    Balanced,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HumpbackTubercles;

impl HumpbackTubercles {
    /// Bumps along the span. The wavelength is refitted so that `count`
    /// bumps span the blade exactly.
    pub fn geometry(
        &self,
        span_m: f64,
        amplitude_ratio: f64,
        wavelength_ratio: f64,
        count: Option<u32>,
    ) -> TubercleParams {
        let nominal = span_m * wavelength_ratio;
        let count = count.unwrap_or_else(|| derived_count(span_m, nominal)).max(1);
        let wavelength = span_m / count as f64;
        let fitted_ratio = if span_m > 0.0 {
            wavelength / span_m
        } else {
            wavelength_ratio
        };

        TubercleParams {
            count,
            wavelength_m: wavelength,
            amplitude_ratio,
            wavelength_ratio: fitted_ratio,
            span_m,
        }
    }

    pub fn local_amplitude(chord_m: f64, amplitude_ratio: f64) -> f64 {
        chord_m * amplitude_ratio
    }

    /// Flat below 5°, linear to 10°, then approaches 1.0 by 20°.
    pub fn aoa_factor(angle_of_attack_deg: f64) -> f64 {
        let aoa = angle_of_attack_deg;
        if aoa < 5.0 {
            0.4
        } else if aoa < 10.0 {
            0.4 + 0.4 * (aoa - 5.0) / 5.0
        } else {
            0.8 + 0.2 * ((aoa - 10.0) / 10.0).min(1.0)
        }
    }

    pub fn preset(&self, geometry: &GeometryRecord, objective: TubercleObjective) -> TubercleParams {
        let (amplitude_ratio, wavelength_ratio) = match objective {
            TubercleObjective::NoiseReduction => (0.12, 0.25),
            TubercleObjective::Efficiency => (0.08, 0.30),
            TubercleObjective::Balanced => (0.10, 0.27),
        };
        self.geometry(geometry.radius_m, amplitude_ratio, wavelength_ratio, None)
    }

    /// Unit-amplitude sinusoid sampled at `num_points` stations along the span.
    pub fn profile(&self, params: &TubercleParams, num_points: usize) -> Profile {
        let x: Vec<f64> = linspace(0.0, params.span_m, num_points).collect();
        let y = x
            .iter()
            .map(|s| {
                if params.wavelength_m > 0.0 {
                    (2.0 * PI * s / params.wavelength_m).sin()
                } else {
                    0.0
                }
            })
            .collect();
        Profile { x, y }
    }
}

impl BioFeature for HumpbackTubercles {
    const KIND: FeatureKind = FeatureKind::Tubercle;
    type Params = TubercleParams;

    fn default_params(&self, geometry: &GeometryRecord) -> TubercleParams {
        self.geometry(
            geometry.radius_m,
            DEFAULT_AMPLITUDE_RATIO,
            DEFAULT_WAVELENGTH_RATIO,
            None,
        )
    }

    fn reduce(
        &self,
        baseline_noise_db: f64,
        params: &TubercleParams,
        conditions: &OperatingConditions,
    ) -> ReductionEstimate {
        let aoa_factor = Self::aoa_factor(conditions.angle_of_attack_deg);
        let count_factor = (params.count as f64 / 5.0).min(1.0);
        let amplitude_factor = (params.amplitude_ratio / DEFAULT_AMPLITUDE_RATIO).min(1.0);

        let vortex = (3.0 + 5.0 * aoa_factor * count_factor * amplitude_factor)
            * calibration::TUBERCLE;
        let broadband_increase = 0.5 + 0.5 * params.amplitude_ratio / DEFAULT_AMPLITUDE_RATIO;

        ReductionEstimate::new(
            Self::KIND,
            baseline_noise_db,
            vortex - broadband_increase,
            aoa_factor,
            ReductionTerms::Tubercle {
                vortex_reduction_db: vortex,
                broadband_increase_db: broadband_increase,
            },
        )
    }

    fn apply(&self, geometry: &GeometryRecord, params: Option<TubercleParams>) -> GeometryRecord {
        let params = params.unwrap_or_else(|| self.default_params(geometry));

        let mut modified = geometry.clone();
        modified.cl_max = geometry.cl_max * CL_MAX_GAIN;
        modified.drag_coefficient = geometry.drag_coefficient * (1.0 + DRAG_PENALTY);
        modified.stall_angle_deg = geometry.stall_angle_deg + STALL_DELAY_DEG;
        modified.leading_edge_tubercles = Some(params);
        if !modified.bio_features.contains(&Self::KIND) {
            modified.bio_features.push(Self::KIND);
        }
        modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wavelength_is_refitted_to_span() {
        let p = HumpbackTubercles.geometry(1.0, 0.12, 0.3, None);
        assert_eq!(p.count, 3);
        assert_relative_eq!(p.wavelength_m, 1.0 / 3.0);
        assert_relative_eq!(p.wavelength_ratio, 1.0 / 3.0);

        let p = HumpbackTubercles.geometry(1.0, 0.12, 0.1, None);
        assert!(p.count >= 9);
        assert_relative_eq!(p.wavelength_m * p.count as f64, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn aoa_factor_segments() {
        assert_eq!(HumpbackTubercles::aoa_factor(0.0), 0.4);
        assert_relative_eq!(HumpbackTubercles::aoa_factor(7.5), 0.6);
        assert_relative_eq!(HumpbackTubercles::aoa_factor(15.0), 0.9);
        assert_relative_eq!(HumpbackTubercles::aoa_factor(40.0), 1.0);
    }

    #[test]
    fn reduction_grows_with_angle_of_attack() {
        let params = HumpbackTubercles.geometry(0.127, 0.12, 0.2, Some(5));
        let low = OperatingConditions {
            angle_of_attack_deg: 2.0,
            ..OperatingConditions::default()
        };
        let high = OperatingConditions {
            angle_of_attack_deg: 25.0,
            ..OperatingConditions::default()
        };

        let at_low = HumpbackTubercles.reduce(90.0, &params, &low);
        let at_high = HumpbackTubercles.reduce(90.0, &params, &high);
        // (3 + 5 * 0.4) * 2.2 - 1.0
        assert_relative_eq!(at_low.reduction_db, 10.0, epsilon = 1e-9);
        // (3 + 5) * 2.2 - 1.0
        assert_relative_eq!(at_high.reduction_db, 16.6, epsilon = 1e-9);
        match at_high.terms {
            ReductionTerms::Tubercle {
                broadband_increase_db,
                ..
            } => assert_relative_eq!(broadband_increase_db, 1.0),
            other => panic!("unexpected terms {:?}", other),
        }
    }

    #[test]
    fn apply_improves_stall_and_leaves_input_untouched() {
        let base = GeometryRecord::default();
        let snapshot = base.clone();
        let modified = HumpbackTubercles.apply(&base, None);

        assert_eq!(base, snapshot);
        assert_relative_eq!(modified.cl_max, 1.2 * 1.075);
        assert_relative_eq!(modified.drag_coefficient, 0.02 * 1.025);
        assert_eq!(modified.stall_angle_deg, 14.0);
        assert_eq!(modified.leading_edge_tubercles.unwrap().span_m, base.radius_m);
    }

    #[test]
    fn presets_differ_by_objective() {
        let g = GeometryRecord::default();
        let noise = HumpbackTubercles.preset(&g, TubercleObjective::NoiseReduction);
        let eff = HumpbackTubercles.preset(&g, TubercleObjective::Efficiency);
        assert_eq!(noise.amplitude_ratio, 0.12);
        assert_eq!(eff.amplitude_ratio, 0.08);
        assert_relative_eq!(HumpbackTubercles::local_amplitude(0.025, 0.12), 0.003);
    }

    #[test]
    fn profile_is_periodic_over_span() {
        let params = HumpbackTubercles.geometry(1.0, 0.12, 0.25, Some(4));
        let profile = HumpbackTubercles.profile(&params, 101);
        assert_eq!(profile.len(), 101);
        assert_relative_eq!(profile.y[0], 0.0);
        assert!(profile.y.iter().all(|y| y.abs() <= 1.0));
    }
}
