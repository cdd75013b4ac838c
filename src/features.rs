//! Bio-inspired blade modifications.
//!
//! Each variant derives its geometric parameters from the blade, estimates
//! the noise reduction it delivers under given operating conditions, and
//! produces a modified copy of a [`GeometryRecord`]. The three variants share
//! the [`BioFeature`] contract and differ only in their empirical formulas.

pub mod corrugation;
pub mod serration;
pub mod tubercle;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::geometry::{GeometryRecord, OperatingConditions};

pub use corrugation::{CorrugationParams, DragonflyCorrugations};
pub use serration::{OwlSerrations, SerrationParams};
pub use tubercle::{HumpbackTubercles, TubercleParams};

/// Speed of sound at 20 °C, m/s.
pub const SPEED_OF_SOUND_M_S: f64 = 343.0;

/// Fewest repeating elements any derived feature geometry may have.
pub const MIN_FEATURE_COUNT: u32 = 3;

/// Literature-calibration multipliers applied on top of each variant's base
/// reduction formula. These are fitted, not derived.
pub mod calibration {
    pub const SERRATION: f64 = 2.0;
    pub const TUBERCLE: f64 = 2.2;
    pub const CORRUGATION: f64 = 2.1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum FeatureKind {
    #[serde(rename = "owl_serrations")]
    Serration,
    #[serde(rename = "humpback_tubercles")]
    Tubercle,
    #[serde(rename = "dragonfly_corrugations")]
    Corrugation,
}

impl FeatureKind {
    /// Declaration order. Geometry composition always follows it.
    pub const ALL: [FeatureKind; 3] = [
        FeatureKind::Serration,
        FeatureKind::Tubercle,
        FeatureKind::Corrugation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::Serration => "owl_serrations",
            FeatureKind::Tubercle => "humpback_tubercles",
            FeatureKind::Corrugation => "dragonfly_corrugations",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeatureKind::Serration => "Owl Serrations",
            FeatureKind::Tubercle => "Humpback Tubercles",
            FeatureKind::Corrugation => "Dragonfly Corrugations",
        }
    }

    /// Parse a list of names, dropping (and logging) any that are unknown.
    pub fn parse_lenient<S: AsRef<str>>(names: &[S]) -> Vec<FeatureKind> {
        names
            .iter()
            .filter_map(|name| match name.as_ref().parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    warn!("ignoring feature: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owl_serrations" | "serrations" | "serration" => Ok(FeatureKind::Serration),
            "humpback_tubercles" | "tubercles" | "tubercle" => Ok(FeatureKind::Tubercle),
            "dragonfly_corrugations" | "corrugations" | "corrugation" => Ok(FeatureKind::Corrugation),
            other => Err(anyhow!("unknown bio-inspired feature '{}'", other)),
        }
    }
}

/// Variant-specific intermediate terms of a [`ReductionEstimate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum ReductionTerms {
    Serration {
        /// Serration wavelength over a quarter acoustic wavelength.
        wavelength_match: f64,
        depth_factor: f64,
    },
    Tubercle {
        vortex_reduction_db: f64,
        broadband_increase_db: f64,
    },
    Corrugation {
        boundary_layer_reduction_db: f64,
        vortex_reduction_db: f64,
        friction_increase_db: f64,
    },
}

/// Net effect of one feature on a noise level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReductionEstimate {
    pub kind: FeatureKind,
    pub reduction_db: f64,
    pub reduced_noise_db: f64,
    /// Regime sensitivity in [0, 1]: wavelength match, AoA or Reynolds factor.
    pub effectiveness_factor: f64,
    pub reduction_pct: f64,
    pub terms: ReductionTerms,
}

impl ReductionEstimate {
    fn new(
        kind: FeatureKind,
        baseline_noise_db: f64,
        reduction_db: f64,
        effectiveness_factor: f64,
        terms: ReductionTerms,
    ) -> Self {
        let reduction_pct = if baseline_noise_db > 0.0 {
            reduction_db / baseline_noise_db * 100.0
        } else {
            0.0
        };
        Self {
            kind,
            reduction_db,
            reduced_noise_db: baseline_noise_db - reduction_db,
            effectiveness_factor,
            reduction_pct,
            terms,
        }
    }
}

/// Shared contract of the bio-inspired variants.
pub trait BioFeature {
    const KIND: FeatureKind;
    type Params: Clone;

    /// Parameters derived from the blade with the variant's default ratios.
    fn default_params(&self, geometry: &GeometryRecord) -> Self::Params;

    fn reduce(
        &self,
        baseline_noise_db: f64,
        params: &Self::Params,
        conditions: &OperatingConditions,
    ) -> ReductionEstimate;

    /// Returns a modified copy. `geometry` is left untouched.
    fn apply(&self, geometry: &GeometryRecord, params: Option<Self::Params>) -> GeometryRecord;
}

/// Optional per-feature parameter overrides, keyed by variant.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureConfigs {
    pub serration: Option<SerrationParams>,
    pub tubercle: Option<TubercleParams>,
    pub corrugation: Option<CorrugationParams>,
}

impl FeatureConfigs {
    /// The parameters a composed geometry carries.
    pub fn from_geometry(geometry: &GeometryRecord) -> Self {
        Self {
            serration: geometry.trailing_edge_serrations.clone(),
            tubercle: geometry.leading_edge_tubercles.clone(),
            corrugation: geometry.surface_corrugations.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.serration.is_none() && self.tubercle.is_none() && self.corrugation.is_none()
    }
}

/// Sampled 2-D outline for manufacturing export.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Profile {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Profile {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// `n` evenly spaced points over `[start, end]`, both ends included.
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| start + step * i as f64)
}

/// `floor(extent / wavelength)`, never below [`MIN_FEATURE_COUNT`].
pub(crate) fn derived_count(extent: f64, wavelength: f64) -> u32 {
    if wavelength > 0.0 && extent > 0.0 {
        ((extent / wavelength).floor() as u32).max(MIN_FEATURE_COUNT)
    } else {
        MIN_FEATURE_COUNT
    }
}
