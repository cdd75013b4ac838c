//! Thrust, torque and power from blade-element integration, plus the
//! momentum-theory shortcut and the usual non-dimensional coefficients.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::geometry::BladeSection;

/// Stations used by [`ThrustModel::blade_element`] unless told otherwise.
pub const DEFAULT_ELEMENTS: usize = 20;

/// Inboard limit of the integration, as a fraction of tip radius.
const ROOT_CUTOUT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThrustBreakdown {
    pub thrust_n: f64,
    pub torque_nm: f64,
    pub power_w: f64,
    /// Ideal induced power over shaft power, in [0, 1].
    pub efficiency: f64,
}

/// Hover and forward-flight coefficients derived from a [`ThrustBreakdown`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coefficients {
    pub figure_of_merit: f64,
    pub advance_ratio: f64,
    pub thrust_coefficient: f64,
    pub tip_speed_m_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThrustModel {
    /// kg/m^3
    pub air_density: f64,
}

impl Default for ThrustModel {
    fn default() -> Self {
        Self { air_density: 1.225 }
    }
}

impl ThrustModel {
    pub fn new(air_density: f64) -> Self {
        Self { air_density }
    }

    /// `T = sqrt(2·ρ·A·P)`. Zero for non-positive power.
    ///
    /// Ideal momentum theory has no shaft-speed term; `_rpm` is accepted so
    /// the signature matches [`ThrustModel::blade_element`].
    pub fn momentum_thrust(&self, _rpm: f64, diameter_m: f64, power_w: f64) -> f64 {
        let area = PI * (diameter_m / 2.0).powi(2);
        let product = 2.0 * self.air_density * area * power_w;
        if product > 0.0 {
            product.sqrt()
        } else {
            0.0
        }
    }

    /// Rectangle-rule integration over `num_elements` stations from 20% radius
    /// to the tip. Induced inflow is neglected, so the local angle of attack
    /// equals the pitch angle.
    pub fn blade_element(
        &self,
        rpm: f64,
        blade: &BladeSection,
        blade_count: u32,
        num_elements: usize,
    ) -> ThrustBreakdown {
        let omega = rpm * 2.0 * PI / 60.0;
        let radius = blade.radius_m;
        let blades = blade_count as f64;
        let n = num_elements.max(2);

        let alpha = blade.pitch_angle_deg.to_radians();
        let cl = blade.cl_slope * alpha;
        let cd = 0.01 + 0.05 * alpha.powi(2);

        let r_start = ROOT_CUTOUT * radius;
        let dr = (radius - r_start) / (n - 1) as f64;

        let (thrust, torque) = (0..n)
            .map(|i| r_start + dr * i as f64)
            .fold((0.0, 0.0), |(thrust, torque), r| {
                let chord = blade.chord_root_m + (blade.chord_tip_m - blade.chord_root_m) * (r / radius);
                let dynamic = 0.5 * self.air_density * (omega * r).powi(2) * chord * dr * blades;
                (thrust + dynamic * cl, torque + dynamic * cd * r)
            });

        let power = torque * omega;
        let efficiency = if power > 0.0 {
            (self.induced_power(thrust, radius) / power).clamp(0.0, 1.0)
        } else {
            0.0
        };

        ThrustBreakdown {
            thrust_n: thrust,
            torque_nm: torque,
            power_w: power,
            efficiency,
        }
    }

    /// Ideal hover power `T·v_i` with `v_i = sqrt(T / 2ρA)`.
    fn induced_power(&self, thrust: f64, radius: f64) -> f64 {
        let disk_area = PI * radius.powi(2);
        if !(thrust > 0.0) || !(disk_area > 0.0) {
            return 0.0;
        }
        let v_induced = (thrust / (2.0 * self.air_density * disk_area)).sqrt();
        thrust * v_induced
    }

    pub fn figure_of_merit(&self, thrust: f64, power: f64, radius: f64) -> f64 {
        if !(power > 0.0) {
            return 0.0;
        }
        (self.induced_power(thrust, radius) / power).clamp(0.0, 1.0)
    }

    /// `J = V / (n·D)`.
    pub fn advance_ratio(&self, forward_velocity: f64, rpm: f64, diameter: f64) -> f64 {
        let nd = (rpm / 60.0) * diameter;
        if nd == 0.0 {
            return 0.0;
        }
        forward_velocity / nd
    }

    /// `C_T = T / (ρ·n²·D⁴)`.
    pub fn thrust_coefficient(&self, thrust: f64, rpm: f64, diameter: f64) -> f64 {
        let n = rpm / 60.0;
        let denominator = self.air_density * n.powi(2) * diameter.powi(4);
        if denominator == 0.0 {
            return 0.0;
        }
        thrust / denominator
    }

    pub fn coefficients(
        &self,
        thrust: &ThrustBreakdown,
        rpm: f64,
        forward_velocity: f64,
        radius: f64,
    ) -> Coefficients {
        let diameter = 2.0 * radius;
        Coefficients {
            figure_of_merit: self.figure_of_merit(thrust.thrust_n, thrust.power_w, radius),
            advance_ratio: self.advance_ratio(forward_velocity, rpm, diameter),
            thrust_coefficient: self.thrust_coefficient(thrust.thrust_n, rpm, diameter),
            tip_speed_m_s: (rpm / 60.0) * 2.0 * PI * radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn section() -> BladeSection {
        BladeSection {
            radius_m: 0.127,
            chord_root_m: 0.03,
            chord_tip_m: 0.015,
            pitch_angle_deg: 10.0,
            cl_slope: 2.0 * PI,
        }
    }

    #[test]
    fn momentum_thrust_in_plausible_range() {
        let model = ThrustModel::default();
        let thrust = model.momentum_thrust(5000.0, 0.254, 100.0);
        assert!(thrust > 0.0);
        assert!(thrust < 100.0);
        assert_eq!(model.momentum_thrust(5000.0, 0.254, 0.0), 0.0);
        assert_eq!(model.momentum_thrust(5000.0, 0.254, -5.0), 0.0);
    }

    #[test]
    fn blade_element_produces_positive_thrust() {
        let model = ThrustModel::default();
        let out = model.blade_element(5000.0, &section(), 2, DEFAULT_ELEMENTS);
        assert!(out.thrust_n > 0.0);
        assert!(out.torque_nm > 0.0);
        assert_relative_eq!(out.power_w, out.torque_nm * 5000.0 * 2.0 * PI / 60.0);
        assert!((0.0..=1.0).contains(&out.efficiency));
    }

    #[test]
    fn blade_element_scales_with_blade_count() {
        let model = ThrustModel::default();
        let two = model.blade_element(5000.0, &section(), 2, DEFAULT_ELEMENTS);
        let four = model.blade_element(5000.0, &section(), 4, DEFAULT_ELEMENTS);
        assert_relative_eq!(four.thrust_n, 2.0 * two.thrust_n, max_relative = 1e-12);
    }

    #[test]
    fn blade_element_at_rest_is_zero() {
        let model = ThrustModel::default();
        let out = model.blade_element(0.0, &section(), 2, DEFAULT_ELEMENTS);
        assert_eq!(out.thrust_n, 0.0);
        assert_eq!(out.power_w, 0.0);
        assert_eq!(out.efficiency, 0.0);
    }

    #[test]
    fn single_element_request_is_clamped() {
        let model = ThrustModel::default();
        let out = model.blade_element(5000.0, &section(), 2, 1);
        assert!(out.thrust_n.is_finite());
        assert!(out.thrust_n > 0.0);
    }

    #[test]
    fn figure_of_merit_is_bounded() {
        let model = ThrustModel::default();
        let fm = model.figure_of_merit(5.0, 100.0, 0.127);
        assert!(fm > 0.0);
        assert!(fm <= 1.0);
        assert_eq!(model.figure_of_merit(5.0, 0.0, 0.127), 0.0);
        assert_eq!(model.figure_of_merit(500.0, 0.01, 0.127), 1.0);
        assert_eq!(model.figure_of_merit(-1.0, 10.0, 0.127), 0.0);
    }

    #[test]
    fn coefficient_denominators_are_guarded() {
        let model = ThrustModel::default();
        assert_eq!(model.advance_ratio(10.0, 0.0, 0.254), 0.0);
        assert_eq!(model.advance_ratio(10.0, 5000.0, 0.0), 0.0);
        assert_eq!(model.thrust_coefficient(5.0, 0.0, 0.254), 0.0);
        assert_relative_eq!(
            model.advance_ratio(10.0, 6000.0, 0.25),
            10.0 / (100.0 * 0.25)
        );
    }
}
