use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::composer::DesignConstraints;
use crate::features::{
    DragonflyCorrugations, FeatureConfigs, FeatureKind, HumpbackTubercles, OwlSerrations,
};
use crate::geometry::{GeometryRecord, OperatingConditions, Preset};
use crate::optimizer::{Objective, ObjectiveWeights, ParameterRanges};

pub const PROGRAM: &str = "strix";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Root {
    pub strix: Header,
    #[serde(default)]
    pub geometry: GeometrySection,
    #[serde(default)]
    pub conditions: OperatingConditions,
    #[serde(default)]
    pub features: Features,
    #[serde(default)]
    pub optimizer: OptimizerSection,
    #[serde(default)]
    pub constraints: DesignConstraints,
    #[serde(default)]
    pub observer: Observer,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Header {
    pub program: String,
    pub module: String,
    pub version: String,
}

/// A preset with optional per-field overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometrySection {
    pub preset: Preset,
    pub name: Option<String>,
    pub blade_count: Option<u32>,
    pub radius_m: Option<f64>,
    pub chord_root_m: Option<f64>,
    pub chord_tip_m: Option<f64>,
    pub chord_length_m: Option<f64>,
    pub blade_thickness_m: Option<f64>,
    pub pitch_angle_deg: Option<f64>,
    pub angle_of_attack_deg: Option<f64>,
}

impl GeometrySection {
    pub fn build(&self) -> GeometryRecord {
        let mut g = self.preset.geometry();
        if let Some(name) = &self.name {
            g.name = name.clone();
        }
        if let Some(v) = self.blade_count {
            g.blade_count = v;
        }
        if let Some(v) = self.radius_m {
            g.radius_m = v;
        }
        if let Some(v) = self.chord_root_m {
            g.chord_root_m = v;
        }
        if let Some(v) = self.chord_tip_m {
            g.chord_tip_m = v;
        }
        if let Some(v) = self.chord_length_m {
            g.chord_length_m = v;
        }
        if let Some(v) = self.blade_thickness_m {
            g.blade_thickness_m = v;
        }
        if let Some(v) = self.pitch_angle_deg {
            g.pitch_angle_deg = v;
        }
        if let Some(v) = self.angle_of_attack_deg {
            g.angle_of_attack_deg = v;
        }
        g
    }
}

/// Ratio overrides for one feature. `depth_ratio` is the amplitude ratio
/// for tubercles.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RatioOverride {
    pub depth_ratio: f64,
    pub wavelength_ratio: f64,
    #[serde(default)]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Features {
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
    pub serration: Option<RatioOverride>,
    pub tubercle: Option<RatioOverride>,
    pub corrugation: Option<RatioOverride>,
}

fn default_enabled() -> Vec<String> {
    FeatureKind::ALL.iter().map(|k| k.name().to_string()).collect()
}

impl Default for Features {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            serration: None,
            tubercle: None,
            corrugation: None,
        }
    }
}

impl Features {
    pub fn kinds(&self) -> Result<Vec<FeatureKind>> {
        self.enabled.iter().map(|name| name.parse()).collect()
    }

    /// Parameters for every override present, derived for `base`.
    pub fn configs(&self, base: &GeometryRecord) -> FeatureConfigs {
        FeatureConfigs {
            serration: self.serration.map(|r| {
                OwlSerrations.geometry(base.chord_length_m, r.depth_ratio, r.wavelength_ratio, r.count)
            }),
            tubercle: self.tubercle.map(|r| {
                HumpbackTubercles.geometry(base.radius_m, r.depth_ratio, r.wavelength_ratio, r.count)
            }),
            corrugation: self.corrugation.map(|r| {
                DragonflyCorrugations.geometry(
                    base.chord_length_m,
                    r.depth_ratio,
                    r.wavelength_ratio,
                    r.count,
                )
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizerSection {
    #[serde(default)]
    pub objective: Objective,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub ranges: ParameterRanges,
    #[serde(default)]
    pub weights: ObjectiveWeights,
}

fn default_iterations() -> usize { 20 }
fn default_seed() -> u64 { 42 }

impl Default for OptimizerSection {
    fn default() -> Self {
        Self {
            objective: Objective::default(),
            iterations: 20,
            seed: 42,
            ranges: ParameterRanges::default(),
            weights: ObjectiveWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Observer {
    /// Microphone distance from the hub, m.
    #[serde(default = "default_distance")]
    pub distance_m: f64,
}

fn default_distance() -> f64 { 1.0 }

impl Default for Observer {
    fn default() -> Self {
        Self { distance_m: 1.0 }
    }
}

impl Root {
    pub fn load(path: &str) -> Result<(Self, String)> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path))?;
        let cfg: Root = toml::from_str(&text)
            .with_context(|| format!("failed to parse config: {}", path))?;
        cfg.validate()?;
        Ok((cfg, text))
    }

    pub fn validate(&self) -> Result<()> {
        if self.strix.program != PROGRAM {
            bail!("strix.program must be {}", PROGRAM);
        }

        self.geometry
            .build()
            .validate()
            .context("invalid [geometry]")?;
        self.conditions.validate().context("invalid [conditions]")?;

        self.features.kinds().context("invalid features.enabled")?;
        let overrides = [
            ("serration", self.features.serration),
            ("tubercle", self.features.tubercle),
            ("corrugation", self.features.corrugation),
        ];
        for (name, r) in overrides {
            if let Some(r) = r {
                if !(0.0..=0.5).contains(&r.depth_ratio) {
                    bail!("features.{}.depth_ratio must be in [0, 0.5]", name);
                }
                if !(r.wavelength_ratio > 0.0 && r.wavelength_ratio <= 1.0) {
                    bail!("features.{}.wavelength_ratio must be in (0, 1]", name);
                }
                if r.count == Some(0) {
                    bail!("features.{}.count must be >= 1", name);
                }
            }
        }

        if self.optimizer.iterations == 0 || self.optimizer.iterations > 100_000 {
            bail!("optimizer.iterations must be in [1, 100000]");
        }
        self.optimizer.ranges.validate()?;
        let w = &self.optimizer.weights;
        if w.noise_reduction < 0.0 || w.efficiency < 0.0 || w.manufacturability < 0.0 {
            bail!("optimizer.weights must be non-negative");
        }

        if !(self.observer.distance_m > 0.0) {
            bail!("observer.distance_m must be positive");
        }

        Ok(())
    }
}
