//! Empirical propeller noise model.
//!
//! Three sources are modelled: turbulent boundary-layer broadband noise,
//! tonal noise at the blade-passage frequency and its harmonics, and vortex
//! shedding from the blade thickness. Sources are combined in the pressure
//! domain; decibels are never summed directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geometry::{GeometryRecord, OperatingConditions};

/// 20 µPa, the threshold of hearing.
pub const REFERENCE_PRESSURE_PA: f64 = 2e-5;

/// Label marker for spectrum entries that carry a frequency, not a level.
pub const FREQUENCY_LABEL: &str = "frequency_hz";

/// Convert an SPL back to an RMS pressure.
pub fn pressure_from_spl(spl_db: f64, reference_pressure: f64) -> f64 {
    reference_pressure * 10f64.powf(spl_db / 20.0)
}

/// SPL of an RMS pressure at the reference distance. Non-positive pressure
/// maps to 0 dB.
pub fn spl_from_pressure(pressure: f64, reference_pressure: f64) -> f64 {
    if !(pressure > 0.0) || !(reference_pressure > 0.0) {
        return 0.0;
    }
    20.0 * (pressure / reference_pressure).log10()
}

/// Energy sum of several levels: `20·log10(sqrt(Σ p_i²) / p_ref)`.
pub fn combine_spl(levels: &[f64], reference_pressure: f64) -> f64 {
    let p_squared: f64 = levels
        .iter()
        .map(|&spl| pressure_from_spl(spl, reference_pressure).powi(2))
        .sum();
    spl_from_pressure(p_squared.sqrt(), reference_pressure)
}

/// One tonal component.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TonalHarmonic {
    /// 1 is the blade-passage frequency itself.
    pub order: u32,
    pub frequency_hz: f64,
    pub spl_db: f64,
}

/// Result of [`NoiseModel::total_noise`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NoiseBreakdown {
    pub total_spl_db: f64,
    pub broadband_spl_db: f64,
    /// Primary (first-harmonic) tonal level.
    pub tonal_spl_db: f64,
    pub vortex_spl_db: f64,
    pub vortex_frequency_hz: f64,
    pub blade_passage_frequency_hz: f64,
    pub harmonics: Vec<TonalHarmonic>,
    /// Set when a bio-inspired composition has replaced `total_spl_db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio_reduction_db: Option<f64>,
}

impl NoiseBreakdown {
    /// Labelled spectrum: one `bpf_harmonic_{h}` level and one
    /// `frequency_hz_{h}` metadata entry per harmonic, plus the broadband and
    /// vortex levels.
    pub fn spectrum(&self) -> BTreeMap<String, f64> {
        let mut spectrum = BTreeMap::new();
        spectrum.insert("broadband".to_string(), self.broadband_spl_db);
        spectrum.insert("vortex".to_string(), self.vortex_spl_db);
        spectrum.insert(
            format!("vortex_{}", FREQUENCY_LABEL),
            self.vortex_frequency_hz,
        );
        for h in &self.harmonics {
            spectrum.insert(format!("bpf_harmonic_{}", h.order), h.spl_db);
            spectrum.insert(format!("{}_{}", FREQUENCY_LABEL, h.order), h.frequency_hz);
        }
        spectrum
    }
}

/// Empirical noise model. Defaults: 20 µPa reference, three harmonics,
/// Strouhal number 0.2.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NoiseModel {
    pub reference_pressure: f64,
    pub harmonics: u32,
    pub strouhal: f64,
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self {
            reference_pressure: REFERENCE_PRESSURE_PA,
            harmonics: 3,
            strouhal: 0.2,
        }
    }
}

impl NoiseModel {
    /// SPL of an RMS pressure observed at `distance` (spherical spreading).
    pub fn spl(&self, pressure: f64, distance: f64) -> f64 {
        if !(distance > 0.0) {
            return 0.0;
        }
        spl_from_pressure(pressure / distance, self.reference_pressure)
    }

    pub fn pressure_from_spl(&self, spl_db: f64) -> f64 {
        pressure_from_spl(spl_db, self.reference_pressure)
    }

    pub fn combine_spl(&self, levels: &[f64]) -> f64 {
        combine_spl(levels, self.reference_pressure)
    }

    /// Turbulent boundary-layer noise, V^5.5 scaling.
    pub fn broadband(
        &self,
        velocity: f64,
        chord_m: f64,
        thickness_m: f64,
        angle_of_attack_deg: f64,
        distance: f64,
    ) -> f64 {
        let velocity_term = velocity.max(0.0).powf(5.5);
        let area_term = chord_m * thickness_m;
        let aoa_factor = 1.0 + 0.5 * angle_of_attack_deg.abs() / 15.0;

        let pressure = 1e-3 * velocity_term * area_term * aoa_factor / distance.powi(2);
        self.spl(pressure, distance)
    }

    /// Tonal levels at the blade-passage frequency and `self.harmonics`
    /// multiples of it.
    pub fn tonal(
        &self,
        rpm: f64,
        blade_count: u32,
        tip_speed: f64,
        distance: f64,
    ) -> Vec<TonalHarmonic> {
        let bpf = blade_passage_frequency(rpm, blade_count);
        let blades = blade_count as f64;

        (1..=self.harmonics)
            .map(|order| {
                let h = order as f64;
                let pressure =
                    5e-3 * tip_speed.powi(4) * (blades / 2.0) / (h.powf(1.5) * distance.powi(2));
                TonalHarmonic {
                    order,
                    frequency_hz: bpf * h,
                    spl_db: self.spl(pressure, distance),
                }
            })
            .collect()
    }

    /// Vortex shedding `(frequency_hz, spl_db)` from a body of characteristic
    /// size `dimension_m`.
    pub fn vortex(&self, velocity: f64, dimension_m: f64, distance: f64) -> (f64, f64) {
        let frequency = if dimension_m > 0.0 {
            self.strouhal * velocity / dimension_m
        } else {
            0.0
        };
        let pressure = 8e-4 * velocity.powi(3) * dimension_m / distance.powi(2);
        (frequency, self.spl(pressure, distance))
    }

    /// All sources for a blade set, combined in the pressure domain.
    pub fn total_noise(
        &self,
        geometry: &GeometryRecord,
        conditions: &OperatingConditions,
        distance: f64,
    ) -> NoiseBreakdown {
        let rpm = conditions.rpm;
        let velocity = conditions.velocity_m_s;
        let tip_speed = geometry.tip_speed(rpm);

        let broadband = self.broadband(
            velocity,
            geometry.chord_length_m,
            geometry.blade_thickness_m,
            geometry.angle_of_attack_deg,
            distance,
        );
        let harmonics = self.tonal(rpm, geometry.blade_count, tip_speed, distance);
        let (vortex_frequency, vortex) =
            self.vortex(velocity, geometry.blade_thickness_m, distance);

        let tonal = harmonics.first().map(|h| h.spl_db).unwrap_or(0.0);
        let total = self.combine_spl(&[broadband, tonal, vortex]);

        NoiseBreakdown {
            total_spl_db: total,
            broadband_spl_db: broadband,
            tonal_spl_db: tonal,
            vortex_spl_db: vortex,
            vortex_frequency_hz: vortex_frequency,
            blade_passage_frequency_hz: blade_passage_frequency(rpm, geometry.blade_count),
            harmonics,
            bio_reduction_db: None,
        }
    }
}

pub fn blade_passage_frequency(rpm: f64, blade_count: u32) -> f64 {
    (rpm / 60.0) * blade_count as f64
}
