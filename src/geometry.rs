//! Blade geometry records, operating conditions and the baseline presets
//! that supply them.
//!
//! Every record here is a plain value. Transformations (bio-inspired feature
//! application in particular) clone before mutating, so a record handed to
//! one consumer is never observed changing by another.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::features::corrugation::{CorrugationParams, StructuralBenefits};
use crate::features::serration::SerrationParams;
use crate::features::tubercle::TubercleParams;
use crate::features::FeatureKind;

/// Lift-curve slope used by the presets (thin-airfoil 2π, as tabulated).
pub const PRESET_CL_SLOPE: f64 = 2.0 * 3.14159;

/// Bulk material of the blade.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaterialProperties {
    /// kg/m^3
    pub density: f64,
    /// Pa
    pub youngs_modulus: f64,
    /// Pa
    pub yield_strength: f64,
}

impl Default for MaterialProperties {
    /// Carbon-fibre composite.
    fn default() -> Self {
        Self {
            density: 1200.0,
            youngs_modulus: 70e9,
            yield_strength: 600e6,
        }
    }
}

/// Full description of one propeller blade set.
///
/// Missing fields deserialize to the standard 2-blade preset values.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometryRecord {
    pub name: String,
    pub design_type: String,
    pub blade_count: u32,
    pub radius_m: f64,
    pub chord_root_m: f64,
    pub chord_tip_m: f64,
    /// Mean chord, used by the acoustic model and the chordwise features.
    pub chord_length_m: f64,
    pub blade_thickness_m: f64,
    pub pitch_angle_deg: f64,
    pub angle_of_attack_deg: f64,
    pub cl_max: f64,
    pub cl_slope: f64,
    pub drag_coefficient: f64,
    pub stall_angle_deg: f64,
    pub material: MaterialProperties,
    /// Applied bio-inspired features, in application order.
    pub bio_features: Vec<FeatureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_edge_serrations: Option<SerrationParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leading_edge_tubercles: Option<TubercleParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface_corrugations: Option<CorrugationParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structural_improvements: Option<StructuralBenefits>,
}

impl Default for GeometryRecord {
    fn default() -> Self {
        Preset::Standard2Blade.geometry()
    }
}

impl GeometryRecord {
    pub fn diameter_m(&self) -> f64 {
        2.0 * self.radius_m
    }

    /// Tip speed in m/s at the given shaft speed.
    pub fn tip_speed(&self, rpm: f64) -> f64 {
        (rpm / 60.0) * 2.0 * PI * self.radius_m
    }

    /// Radial section used by the blade-element integration.
    pub fn blade_section(&self) -> BladeSection {
        BladeSection {
            radius_m: self.radius_m,
            chord_root_m: self.chord_root_m,
            chord_tip_m: self.chord_tip_m,
            pitch_angle_deg: self.pitch_angle_deg,
            cl_slope: self.cl_slope,
        }
    }

    pub fn is_bio_inspired(&self) -> bool {
        !self.bio_features.is_empty()
    }

    /// Check the physical invariants once, at the boundary where a record
    /// enters the engine.
    pub fn validate(&self) -> Result<()> {
        if self.blade_count < 1 {
            bail!("geometry.blade_count must be >= 1");
        }
        if !(self.radius_m > 0.0) {
            bail!("geometry.radius_m must be positive");
        }
        if !(self.chord_root_m > 0.0) || !(self.chord_tip_m > 0.0) {
            bail!("geometry.chord_root_m and geometry.chord_tip_m must be positive");
        }
        if !(self.chord_length_m > 0.0) {
            bail!("geometry.chord_length_m must be positive");
        }
        if !(self.blade_thickness_m > 0.0) {
            bail!("geometry.blade_thickness_m must be positive");
        }
        if !(-90.0..=90.0).contains(&self.pitch_angle_deg) {
            bail!("geometry.pitch_angle_deg must be in [-90, 90]");
        }
        if self.drag_coefficient < 0.0 {
            bail!("geometry.drag_coefficient must be non-negative");
        }
        Ok(())
    }
}

/// The subset of a [`GeometryRecord`] the blade-element model reads.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BladeSection {
    pub radius_m: f64,
    pub chord_root_m: f64,
    pub chord_tip_m: f64,
    pub pitch_angle_deg: f64,
    pub cl_slope: f64,
}

impl Default for BladeSection {
    fn default() -> Self {
        GeometryRecord::default().blade_section()
    }
}

/// Flight and rotation state. Read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperatingConditions {
    pub rpm: f64,
    pub velocity_m_s: f64,
    pub angle_of_attack_deg: f64,
    pub reynolds_number: f64,
    /// kg/m^3
    pub air_density: f64,
    /// Frequency of interest for edge treatments.
    pub frequency_hz: f64,
    pub temperature_c: f64,
    pub altitude_m: f64,
    pub mach_number: f64,
    /// Target reduction in NTR, percent. Drives feature recommendation.
    pub noise_reduction_target_pct: f64,
}

impl Default for OperatingConditions {
    /// Typical small-UAV cruise at sea level.
    fn default() -> Self {
        Self {
            rpm: 5000.0,
            velocity_m_s: 10.0,
            angle_of_attack_deg: 5.0,
            reynolds_number: 200_000.0,
            air_density: 1.225,
            frequency_hz: 1000.0,
            temperature_c: 20.0,
            altitude_m: 0.0,
            mach_number: 0.029,
            noise_reduction_target_pct: 15.0,
        }
    }
}

impl OperatingConditions {
    pub fn validate(&self) -> Result<()> {
        if self.rpm < 0.0 {
            bail!("conditions.rpm must be non-negative");
        }
        if self.velocity_m_s < 0.0 {
            bail!("conditions.velocity_m_s must be non-negative");
        }
        if !(self.air_density > 0.0) {
            bail!("conditions.air_density must be positive");
        }
        if self.reynolds_number < 0.0 {
            bail!("conditions.reynolds_number must be non-negative");
        }
        if self.frequency_hz < 0.0 {
            bail!("conditions.frequency_hz must be non-negative");
        }
        Ok(())
    }
}

/// Commercial baseline blade sets the bio-inspired designs are measured
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    #[serde(rename = "standard_2_blade")]
    Standard2Blade,
    #[serde(rename = "standard_3_blade")]
    Standard3Blade,
    #[serde(rename = "standard_4_blade")]
    Standard4Blade,
}

impl Preset {
    pub fn geometry(self) -> GeometryRecord {
        let two_blade = GeometryRecord {
            name: "Standard 2-Blade Commercial".to_string(),
            design_type: "baseline".to_string(),
            blade_count: 2,
            radius_m: 0.127,
            chord_root_m: 0.035,
            chord_tip_m: 0.015,
            chord_length_m: 0.025,
            blade_thickness_m: 0.005,
            pitch_angle_deg: 10.0,
            angle_of_attack_deg: 5.0,
            cl_max: 1.2,
            cl_slope: PRESET_CL_SLOPE,
            drag_coefficient: 0.02,
            stall_angle_deg: 12.0,
            material: MaterialProperties::default(),
            bio_features: Vec::new(),
            trailing_edge_serrations: None,
            leading_edge_tubercles: None,
            surface_corrugations: None,
            structural_improvements: None,
        };

        match self {
            Preset::Standard2Blade => two_blade,
            Preset::Standard3Blade => GeometryRecord {
                name: "Standard 3-Blade Commercial".to_string(),
                blade_count: 3,
                chord_root_m: 0.030,
                chord_tip_m: 0.012,
                chord_length_m: 0.021,
                ..two_blade
            },
            Preset::Standard4Blade => GeometryRecord {
                name: "Standard 4-Blade Commercial".to_string(),
                blade_count: 4,
                chord_root_m: 0.028,
                chord_tip_m: 0.010,
                chord_length_m: 0.019,
                ..two_blade
            },
        }
    }
}

/// Back-of-envelope performance figures for a baseline blade set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuickEstimate {
    pub thrust_n: f64,
    pub power_w: f64,
    pub noise_spl_db: f64,
    pub ntr: f64,
    pub tip_speed_m_s: f64,
    pub efficiency: f64,
}

/// Empirical estimate for commercial propellers, used as a sanity reference
/// next to the full evaluation.
pub fn quick_estimate(geometry: &GeometryRecord, conditions: &OperatingConditions) -> QuickEstimate {
    let omega = conditions.rpm * 2.0 * PI / 60.0;
    let tip_speed = omega * geometry.radius_m;
    let blades = geometry.blade_count as f64;

    let thrust = 0.5 * 1.225 * tip_speed.powi(2) * 0.05 * blades;
    let power = thrust * conditions.velocity_m_s + 0.1 * omega.powi(2);
    let noise = if tip_speed > 0.0 && blades > 0.0 {
        50.0 + 20.0 * tip_speed.log10() + 10.0 * blades.log10()
    } else {
        0.0
    };
    let ntr = if thrust > 0.0 { noise / thrust } else { 0.0 };

    QuickEstimate {
        thrust_n: thrust,
        power_w: power,
        noise_spl_db: noise,
        ntr,
        tip_speed_m_s: tip_speed,
        efficiency: 0.65,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn presets_share_radius_and_differ_in_chord() {
        let two = Preset::Standard2Blade.geometry();
        let three = Preset::Standard3Blade.geometry();
        let four = Preset::Standard4Blade.geometry();

        assert_eq!(two.blade_count, 2);
        assert_eq!(three.blade_count, 3);
        assert_eq!(four.blade_count, 4);
        assert_eq!(two.radius_m, four.radius_m);
        assert!(four.chord_root_m < three.chord_root_m);
        assert!(three.chord_root_m < two.chord_root_m);
        assert_relative_eq!(two.diameter_m(), 0.254);
    }

    #[test]
    fn missing_fields_fall_back_to_preset() {
        let g: GeometryRecord = toml::from_str("blade_count = 3").unwrap();
        assert_eq!(g.blade_count, 3);
        assert_eq!(g.radius_m, 0.127);
        assert_eq!(g.chord_root_m, 0.035);
        assert!(g.bio_features.is_empty());

        let c: OperatingConditions = toml::from_str("rpm = 6000.0").unwrap();
        assert_eq!(c.rpm, 6000.0);
        assert_eq!(c.frequency_hz, 1000.0);
    }

    #[test]
    fn validate_rejects_non_physical_geometry() {
        assert!(GeometryRecord::default().validate().is_ok());

        let mut g = GeometryRecord::default();
        g.radius_m = 0.0;
        assert!(g.validate().is_err());

        let mut g = GeometryRecord::default();
        g.blade_count = 0;
        assert!(g.validate().is_err());

        let mut g = GeometryRecord::default();
        g.chord_tip_m = -0.01;
        assert!(g.validate().is_err());
    }

    #[test]
    fn quick_estimate_is_positive_for_baseline() {
        let est = quick_estimate(&GeometryRecord::default(), &OperatingConditions::default());
        assert!(est.thrust_n > 0.0);
        assert!(est.power_w > 0.0);
        assert!(est.noise_spl_db > 50.0);
        assert_relative_eq!(est.ntr, est.noise_spl_db / est.thrust_n);
    }

    #[test]
    fn quick_estimate_at_rest_has_zero_ntr() {
        let conditions = OperatingConditions {
            rpm: 0.0,
            ..OperatingConditions::default()
        };
        let est = quick_estimate(&GeometryRecord::default(), &conditions);
        assert_eq!(est.thrust_n, 0.0);
        assert_eq!(est.ntr, 0.0);
        assert_eq!(est.noise_spl_db, 0.0);
    }
}
