//! Owl-wing trailing-edge serrations.
//!
//! Comb-like teeth on the trailing edge break up coherent vortex structures.
//! Effectiveness depends on how the tooth wavelength compares with a quarter
//! of the acoustic wavelength at the frequency of interest.

use serde::{Deserialize, Serialize};

use super::{
    calibration, derived_count, linspace, BioFeature, FeatureKind, Profile, ReductionEstimate,
    ReductionTerms, SPEED_OF_SOUND_M_S,
};
use crate::geometry::{GeometryRecord, OperatingConditions};

pub const DEFAULT_DEPTH_RATIO: f64 = 0.05;
pub const DEFAULT_WAVELENGTH_RATIO: f64 = 0.02;

/// Depth at which the depth factor saturates, m.
const REFERENCE_DEPTH_M: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SerrationParams {
    pub depth_m: f64,
    pub wavelength_m: f64,
    pub count: u32,
    pub angle_deg: f64,
    /// Depth over chord.
    pub depth_ratio: f64,
    /// Wavelength over chord.
    pub wavelength_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OwlSerrations;

impl OwlSerrations {
    /// Teeth cover half of the chord-scaled extent unless `count` is given.
    pub fn geometry(
        &self,
        chord_m: f64,
        depth_ratio: f64,
        wavelength_ratio: f64,
        count: Option<u32>,
    ) -> SerrationParams {
        let depth = chord_m * depth_ratio;
        let wavelength = chord_m * wavelength_ratio;
        let count = count.unwrap_or_else(|| derived_count(0.5 * chord_m, wavelength));
        let angle_deg = if wavelength > 0.0 {
            (depth / (wavelength / 2.0)).atan().to_degrees()
        } else {
            90.0
        };

        SerrationParams {
            depth_m: depth,
            wavelength_m: wavelength,
            count,
            angle_deg,
            depth_ratio,
            wavelength_ratio,
        }
    }

    /// Piecewise effectiveness of a serration wavelength relative to the
    /// optimum `λ_acoustic / 4`.
    pub fn effectiveness(wavelength_match: f64) -> f64 {
        if wavelength_match < 0.1 {
            0.3
        } else if wavelength_match < 0.5 {
            0.3 + 0.4 * (wavelength_match - 0.1) / 0.4
        } else if wavelength_match <= 2.0 {
            0.7 + 0.3 * (1.0 - (wavelength_match - 1.0).abs())
        } else {
            0.5 * (-(wavelength_match - 2.0) / 2.0).exp()
        }
    }

    /// Triangle wave, one rise and one fall per tooth, `points_per_tooth`
    /// samples each. Each ramp keeps at least its two end points.
    pub fn profile(&self, params: &SerrationParams, points_per_tooth: usize) -> Profile {
        let half = (points_per_tooth / 2).max(2);
        let mut profile = Profile::default();
        for i in 0..params.count {
            let start = i as f64 * params.wavelength_m;
            let peak = start + params.wavelength_m / 2.0;
            let end = start + params.wavelength_m;

            profile.x.extend(linspace(start, peak, half));
            profile.y.extend(linspace(0.0, params.depth_m, half));
            profile.x.extend(linspace(peak, end, half));
            profile.y.extend(linspace(params.depth_m, 0.0, half));
        }
        profile
    }
}

impl BioFeature for OwlSerrations {
    const KIND: FeatureKind = FeatureKind::Serration;
    type Params = SerrationParams;

    fn default_params(&self, geometry: &GeometryRecord) -> SerrationParams {
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
        params: &SerrationParams,
        conditions: &OperatingConditions,
    ) -> ReductionEstimate {
        let wavelength_match = if conditions.frequency_hz > 0.0 {
            let optimal = SPEED_OF_SOUND_M_S / conditions.frequency_hz / 4.0;
            params.wavelength_m / optimal
        } else {
            0.0
        };
        let effectiveness = Self::effectiveness(wavelength_match);

        let base = 2.0 + 5.0 * effectiveness;
        let depth_factor = (params.depth_m / REFERENCE_DEPTH_M).min(1.0);
        let reduction = base * depth_factor * calibration::SERRATION;

        ReductionEstimate::new(
            Self::KIND,
            baseline_noise_db,
            reduction,
            effectiveness,
            ReductionTerms::Serration {
                wavelength_match,
                depth_factor,
            },
        )
    }

    fn apply(&self, geometry: &GeometryRecord, params: Option<SerrationParams>) -> GeometryRecord {
        let params = params.unwrap_or_else(|| self.default_params(geometry));
        let drag_penalty = 0.02 + 0.03 * (params.depth_ratio / 0.1);

        let mut modified = geometry.clone();
        modified.drag_coefficient = geometry.drag_coefficient * (1.0 + drag_penalty);
        modified.trailing_edge_serrations = Some(params);
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
    fn geometry_scales_with_chord() {
        let p = OwlSerrations.geometry(0.1, 0.05, 0.02, None);
        assert_relative_eq!(p.depth_m, 0.005, epsilon = 1e-12);
        assert_relative_eq!(p.wavelength_m, 0.002, epsilon = 1e-12);
        assert!(p.count >= 24);
        // atan(0.005 / 0.001)
        assert_relative_eq!(p.angle_deg, 5f64.atan().to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn explicit_count_is_kept_and_derived_count_has_floor() {
        assert_eq!(OwlSerrations.geometry(0.1, 0.05, 0.02, Some(7)).count, 7);
        // 0.5 * 0.1 / 0.04 = 1.25 teeth
        assert_eq!(OwlSerrations.geometry(0.1, 0.05, 0.4, None).count, 3);
    }

    #[test]
    fn effectiveness_piecewise_segments() {
        assert_eq!(OwlSerrations::effectiveness(0.05), 0.3);
        assert_relative_eq!(OwlSerrations::effectiveness(0.3), 0.5, epsilon = 1e-12);
        assert_relative_eq!(OwlSerrations::effectiveness(1.0), 1.0);
        assert_relative_eq!(OwlSerrations::effectiveness(2.0), 0.7, epsilon = 1e-12);
        assert_relative_eq!(OwlSerrations::effectiveness(4.0), 0.5 * (-1f64).exp());
    }

    #[test]
    fn reduction_peaks_at_quarter_wavelength() {
        // 343 / 4 / 8575 = 0.01 m: matched at 8575 Hz
        let params = OwlSerrations.geometry(0.5, 0.05, 0.02, None);
        let matched = OperatingConditions {
            frequency_hz: 8575.0,
            ..OperatingConditions::default()
        };
        let off = OperatingConditions {
            frequency_hz: 100.0,
            ..OperatingConditions::default()
        };

        let best = OwlSerrations.reduce(90.0, &params, &matched);
        let worse = OwlSerrations.reduce(90.0, &params, &off);
        assert_relative_eq!(best.effectiveness_factor, 1.0, epsilon = 1e-9);
        // depth 25 mm saturates the depth factor: (2 + 5) * 1 * 2
        assert_relative_eq!(best.reduction_db, 14.0, epsilon = 1e-9);
        assert!(worse.reduction_db < best.reduction_db);
        assert_relative_eq!(best.reduced_noise_db, 76.0, epsilon = 1e-9);
    }

    #[test]
    fn apply_adds_drag_and_leaves_input_untouched() {
        let base = GeometryRecord::default();
        let snapshot = base.clone();
        let modified = OwlSerrations.apply(&base, None);

        assert_eq!(base, snapshot);
        // 0.02 * (1 + 0.02 + 0.03 * 0.5)
        assert_relative_eq!(modified.drag_coefficient, 0.02 * 1.035, epsilon = 1e-12);
        assert_eq!(modified.bio_features, vec![FeatureKind::Serration]);
        let params = modified.trailing_edge_serrations.unwrap();
        assert_relative_eq!(params.depth_m, base.chord_length_m * DEFAULT_DEPTH_RATIO);
    }

    #[test]
    fn profile_has_two_ramps_per_tooth() {
        let params = OwlSerrations.geometry(0.1, 0.05, 0.02, Some(3));
        let profile = OwlSerrations.profile(&params, 10);
        assert_eq!(profile.len(), 30);
        let peak = profile.y.iter().cloned().fold(f64::MIN, f64::max);
        assert_relative_eq!(peak, params.depth_m);
        assert_eq!(profile.y[0], 0.0);
    }

    #[test]
    fn sparse_profile_still_reaches_each_peak() {
        let params = OwlSerrations.geometry(0.1, 0.05, 0.02, Some(3));
        for points in [0, 1, 3] {
            let profile = OwlSerrations.profile(&params, points);
            assert_eq!(profile.len(), 3 * 4);
            let peaks = profile.y.iter().filter(|&&y| y == params.depth_m).count();
            assert_eq!(peaks, 6);
        }
    }
}
