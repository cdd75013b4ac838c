//! Dragonfly-wing chordwise corrugations.
//!
//! A pleated surface trips and reorganises the boundary layer and stiffens
//! the blade. Most effective at low Reynolds number.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use super::{
    calibration, derived_count, linspace, BioFeature, FeatureKind, Profile, ReductionEstimate,
    ReductionTerms,
};
use crate::geometry::{GeometryRecord, OperatingConditions};

pub const DEFAULT_DEPTH_RATIO: f64 = 0.03;
pub const DEFAULT_WAVELENGTH_RATIO: f64 = 0.05;

/// Depth at which the depth factor saturates, m.
const REFERENCE_DEPTH_M: f64 = 0.002;

const CL_MAX_GAIN: f64 = 1.05;
const DRAG_PENALTY: f64 = 0.04;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CorrugationParams {
    pub depth_m: f64,
    pub wavelength_m: f64,
    pub count: u32,
    pub profile_angle_deg: f64,
    pub depth_ratio: f64,
    pub wavelength_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlutterResistance {
    Moderate,
    High,
}

/// Stiffening from the pleat's added second moment of area.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StructuralBenefits {
    pub stiffness_increase_pct: f64,
    pub torsional_stiffness_increase_pct: f64,
    pub natural_frequency_increase_pct: f64,
    pub moment_area_factor: f64,
    pub flutter_resistance: FlutterResistance,
}

impl StructuralBenefits {
    /// `I' / I ≈ 1 + (h/λ)²`.
    pub fn estimate(params: &CorrugationParams) -> Self {
        let ratio = if params.wavelength_m > 0.0 {
            params.depth_m / params.wavelength_m
        } else {
            0.0
        };
        let moment_area_factor = 1.0 + ratio.powi(2);
        let stiffness = (moment_area_factor - 1.0) * 100.0;

        Self {
            stiffness_increase_pct: stiffness,
            torsional_stiffness_increase_pct: stiffness * 0.5,
            natural_frequency_increase_pct: (moment_area_factor.sqrt() - 1.0) * 100.0,
            moment_area_factor,
            flutter_resistance: if stiffness > 20.0 {
                FlutterResistance::High
            } else {
                FlutterResistance::Moderate
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrugationObjective {
    #[default]
    NoiseReduction,
    Structural,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileShape {
    #[default]
    Sinusoidal,
    Triangular,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragonflyCorrugations;

impl DragonflyCorrugations {
    pub fn geometry(
        &self,
        chord_m: f64,
        depth_ratio: f64,
        wavelength_ratio: f64,
        count: Option<u32>,
    ) -> CorrugationParams {
        let depth = chord_m * depth_ratio;
        let wavelength = chord_m * wavelength_ratio;
        let count = count.unwrap_or_else(|| derived_count(chord_m, wavelength));
        let profile_angle_deg = if wavelength > 0.0 {
            (2.0 * depth / wavelength).atan().to_degrees()
        } else {
            90.0
        };

        CorrugationParams {
            depth_m: depth,
            wavelength_m: wavelength,
            count,
            profile_angle_deg,
            depth_ratio,
            wavelength_ratio,
        }
    }

    /// 1.0 below Re 1e5, linear to 0.5 at 5e5, exponential decay beyond.
    pub fn reynolds_factor(reynolds_number: f64) -> f64 {
        if reynolds_number < 1e5 {
            1.0
        } else if reynolds_number < 5e5 {
            1.0 - 0.5 * (reynolds_number - 1e5) / 4e5
        } else {
            0.5 * (-(reynolds_number - 5e5) / 5e5).exp()
        }
    }

    pub fn preset(
        &self,
        geometry: &GeometryRecord,
        reynolds_number: f64,
        objective: CorrugationObjective,
    ) -> CorrugationParams {
        let (depth_ratio, wavelength_ratio) = match objective {
            CorrugationObjective::NoiseReduction if reynolds_number < 2e5 => (0.04, 0.05),
            CorrugationObjective::NoiseReduction => (0.03, 0.06),
            CorrugationObjective::Structural => (0.05, 0.04),
            CorrugationObjective::Balanced => (0.035, 0.05),
        };
        self.geometry(geometry.chord_length_m, depth_ratio, wavelength_ratio, None)
    }

    /// Chordwise height over `count` wavelengths.
    pub fn profile(&self, params: &CorrugationParams, shape: ProfileShape, num_points: usize) -> Profile {
        let extent = params.count as f64 * params.wavelength_m;
        let x: Vec<f64> = linspace(0.0, extent, num_points).collect();
        let wl = params.wavelength_m;
        let y = x
            .iter()
            .map(|&s| {
                if wl <= 0.0 {
                    return 0.0;
                }
                match shape {
                    ProfileShape::Sinusoidal => params.depth_m * (2.0 * PI * s / wl).sin(),
                    ProfileShape::Triangular => {
                        let phase = (s / wl).rem_euclid(1.0);
                        params.depth_m * (2.0 * (phase - 0.5).abs() - 0.5)
                    }
                }
            })
            .collect();
        Profile { x, y }
    }
}

impl BioFeature for DragonflyCorrugations {
    const KIND: FeatureKind = FeatureKind::Corrugation;
    type Params = CorrugationParams;

    fn default_params(&self, geometry: &GeometryRecord) -> CorrugationParams {
        self.geometry(
            geometry.chord_length_m,
            DEFAULT_DEPTH_RATIO,
            DEFAULT_WAVELENGTH_RATIO,
            None,
        )
    }

    fn reduce(
        &self,
        baseline_noise_db: f64,
        params: &CorrugationParams,
        conditions: &OperatingConditions,
    ) -> ReductionEstimate {
        let re_factor = Self::reynolds_factor(conditions.reynolds_number);
        let depth_factor = (params.depth_m / REFERENCE_DEPTH_M).min(1.0);
        let count_factor = (params.count as f64 / 10.0).min(1.0);

        let boundary_layer =
            (2.0 + 3.0 * re_factor * depth_factor * count_factor) * calibration::CORRUGATION;
        let vortex = (1.0 + 2.0 * re_factor * count_factor) * calibration::CORRUGATION;
        // Extra wetted area, (h/λ) of the flat surface.
        let friction = if params.wavelength_m > 0.0 {
            0.5 * (params.depth_m / params.wavelength_m) * 2.0
        } else {
            0.0
        };

        ReductionEstimate::new(
            Self::KIND,
            baseline_noise_db,
            boundary_layer + vortex - friction,
            re_factor,
            ReductionTerms::Corrugation {
                boundary_layer_reduction_db: boundary_layer,
                vortex_reduction_db: vortex,
                friction_increase_db: friction,
            },
        )
    }

    fn apply(&self, geometry: &GeometryRecord, params: Option<CorrugationParams>) -> GeometryRecord {
        let params = params.unwrap_or_else(|| self.default_params(geometry));

        let mut modified = geometry.clone();
        modified.structural_improvements = Some(StructuralBenefits::estimate(&params));
        modified.drag_coefficient = geometry.drag_coefficient * (1.0 + DRAG_PENALTY);
        modified.cl_max = geometry.cl_max * CL_MAX_GAIN;
        modified.surface_corrugations = Some(params);
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
    fn geometry_derives_count_along_chord() {
        let p = DragonflyCorrugations.geometry(1.0, 0.03, 0.25, None);
        assert_eq!(p.count, 4);
        assert_relative_eq!(p.depth_m, 0.03, epsilon = 1e-12);
        // atan(2 * 0.03 / 0.25)
        assert_relative_eq!(p.profile_angle_deg, 0.24f64.atan().to_degrees(), epsilon = 1e-9);

        let p = DragonflyCorrugations.geometry(0.1, 0.03, 0.6, None);
        assert_eq!(p.count, 3);
    }

    #[test]
    fn reynolds_factor_segments() {
        assert_eq!(DragonflyCorrugations::reynolds_factor(5e4), 1.0);
        assert_relative_eq!(DragonflyCorrugations::reynolds_factor(3e5), 0.75);
        assert_relative_eq!(DragonflyCorrugations::reynolds_factor(5e5), 0.5);
        assert_relative_eq!(DragonflyCorrugations::reynolds_factor(1e6), 0.5 * (-1f64).exp());
    }

    #[test]
    fn reduction_falls_with_reynolds_number() {
        let params = DragonflyCorrugations.geometry(0.1, 0.03, 0.05, Some(10));
        let slow = OperatingConditions {
            reynolds_number: 5e4,
            ..OperatingConditions::default()
        };
        let fast = OperatingConditions {
            reynolds_number: 1e6,
            ..OperatingConditions::default()
        };

        let at_slow = DragonflyCorrugations.reduce(90.0, &params, &slow);
        let at_fast = DragonflyCorrugations.reduce(90.0, &params, &fast);
        // (2 + 3) * 2.1 + (1 + 2) * 2.1 - 0.6
        assert_relative_eq!(at_slow.reduction_db, 16.2, epsilon = 1e-9);
        assert!(at_fast.reduction_db < at_slow.reduction_db);
        assert_eq!(at_slow.effectiveness_factor, 1.0);
    }

    #[test]
    fn structural_benefits_flag_high_resistance() {
        let shallow = DragonflyCorrugations.geometry(0.1, 0.03, 0.05, None);
        let deep = DragonflyCorrugations.geometry(0.1, 0.05, 0.04, None);

        let s = StructuralBenefits::estimate(&shallow);
        // (0.6)^2 = 36 %
        assert_relative_eq!(s.stiffness_increase_pct, 36.0, epsilon = 1e-9);
        assert_relative_eq!(s.torsional_stiffness_increase_pct, 18.0, epsilon = 1e-9);
        assert_eq!(s.flutter_resistance, FlutterResistance::High);

        let d = StructuralBenefits::estimate(&deep);
        assert!(d.stiffness_increase_pct > s.stiffness_increase_pct);

        let flat = DragonflyCorrugations.geometry(0.1, 0.01, 0.05, None);
        assert_eq!(
            StructuralBenefits::estimate(&flat).flutter_resistance,
            FlutterResistance::Moderate
        );
    }

    #[test]
    fn apply_stores_structure_and_leaves_input_untouched() {
        let base = GeometryRecord::default();
        let snapshot = base.clone();
        let modified = DragonflyCorrugations.apply(&base, None);

        assert_eq!(base, snapshot);
        assert_relative_eq!(modified.drag_coefficient, 0.02 * 1.04);
        assert_relative_eq!(modified.cl_max, 1.2 * 1.05);
        assert!(modified.structural_improvements.is_some());
        assert!(modified.surface_corrugations.is_some());
        assert_eq!(modified.bio_features, vec![FeatureKind::Corrugation]);
    }

    #[test]
    fn presets_follow_reynolds_regime() {
        let g = GeometryRecord::default();
        let low = DragonflyCorrugations.preset(&g, 1e5, CorrugationObjective::NoiseReduction);
        let high = DragonflyCorrugations.preset(&g, 3e5, CorrugationObjective::NoiseReduction);
        assert_eq!(low.depth_ratio, 0.04);
        assert_eq!(high.depth_ratio, 0.03);
        let stiff = DragonflyCorrugations.preset(&g, 3e5, CorrugationObjective::Structural);
        assert_eq!(stiff.wavelength_ratio, 0.04);
    }

    #[test]
    fn triangular_profile_stays_within_half_depth() {
        let params = DragonflyCorrugations.geometry(0.1, 0.03, 0.05, Some(4));
        let tri = DragonflyCorrugations.profile(&params, ProfileShape::Triangular, 200);
        let sine = DragonflyCorrugations.profile(&params, ProfileShape::Sinusoidal, 200);
        assert_eq!(tri.len(), 200);
        assert!(tri.y.iter().all(|z| z.abs() <= 0.5 * params.depth_m + 1e-15));
        assert!(sine.y.iter().all(|z| z.abs() <= params.depth_m + 1e-15));
        assert_relative_eq!(tri.y[0], 0.5 * params.depth_m);
    }
}
