//! Combining bio-inspired features on one blade.
//!
//! Geometry is always modified in declaration order (serration, tubercle,
//! corrugation). Noise reductions are chained in the order the caller lists
//! the features, each one estimated against the level the previous one left.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::features::{
    BioFeature, DragonflyCorrugations, FeatureConfigs, FeatureKind, HumpbackTubercles,
    OwlSerrations, ReductionEstimate,
};
use crate::geometry::{GeometryRecord, OperatingConditions, Preset};

/// Extra reduction per additional combined feature.
pub const SYNERGY_PER_FEATURE: f64 = 0.18;

/// `1 + 0.18·(k − 1)`, and 1.0 for a single feature or none.
pub fn synergy_multiplier(feature_count: usize) -> f64 {
    if feature_count > 1 {
        1.0 + SYNERGY_PER_FEATURE * (feature_count - 1) as f64
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionResult {
    pub total_reduction_db: f64,
    pub final_noise_db: f64,
    /// Per-feature estimates in application order.
    pub individual: Vec<ReductionEstimate>,
    pub synergy_multiplier: f64,
    pub reduction_pct: f64,
}

impl CompositionResult {
    pub fn reduction_for(&self, kind: FeatureKind) -> Option<f64> {
        self.individual
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.reduction_db)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

/// Manufacturing limits a recommendation has to respect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DesignConstraints {
    pub manufacturing_complexity: Complexity,
    pub require_stiffness: bool,
}

/// One entry of [`FeatureComposer::generate_variants`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignVariant {
    pub name: String,
    pub geometry: GeometryRecord,
    pub features: Vec<FeatureKind>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureComposer {
    pub serration: OwlSerrations,
    pub tubercle: HumpbackTubercles,
    pub corrugation: DragonflyCorrugations,
}

impl FeatureComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every requested feature to a copy of `base`.
    ///
    /// The order of `features` does not matter and duplicates are ignored.
    pub fn compose(
        &self,
        base: &GeometryRecord,
        features: &[FeatureKind],
        configs: Option<&FeatureConfigs>,
    ) -> GeometryRecord {
        let configs = configs.cloned().unwrap_or_default();
        let mut design = base.clone();
        let mut applied = Vec::new();

        for kind in FeatureKind::ALL {
            if !features.contains(&kind) {
                continue;
            }
            design = match kind {
                FeatureKind::Serration => self.serration.apply(&design, configs.serration.clone()),
                FeatureKind::Tubercle => self.tubercle.apply(&design, configs.tubercle.clone()),
                FeatureKind::Corrugation => {
                    self.corrugation.apply(&design, configs.corrugation.clone())
                }
            };
            applied.push(kind);
        }

        design.bio_features = applied;
        design
    }

    /// Chain the per-feature reductions and scale the sum by the synergy
    /// multiplier. Features without parameters in `params` use the variant's
    /// defaults for the standard 2-blade preset.
    pub fn combined_reduction(
        &self,
        baseline_noise_db: f64,
        features: &[FeatureKind],
        params: &FeatureConfigs,
        conditions: &OperatingConditions,
    ) -> CompositionResult {
        let fallback = Preset::default().geometry();
        let mut current = baseline_noise_db;
        let mut total = 0.0;
        let mut individual = Vec::with_capacity(features.len());

        for &kind in features {
            let estimate = match kind {
                FeatureKind::Serration => {
                    let p = params
                        .serration
                        .clone()
                        .unwrap_or_else(|| self.serration.default_params(&fallback));
                    self.serration.reduce(current, &p, conditions)
                }
                FeatureKind::Tubercle => {
                    let p = params
                        .tubercle
                        .clone()
                        .unwrap_or_else(|| self.tubercle.default_params(&fallback));
                    self.tubercle.reduce(current, &p, conditions)
                }
                FeatureKind::Corrugation => {
                    let p = params
                        .corrugation
                        .clone()
                        .unwrap_or_else(|| self.corrugation.default_params(&fallback));
                    self.corrugation.reduce(current, &p, conditions)
                }
            };
            debug!(
                feature = kind.name(),
                reduction_db = estimate.reduction_db,
                "feature reduction"
            );
            current = estimate.reduced_noise_db;
            total += estimate.reduction_db;
            individual.push(estimate);
        }

        let synergy = synergy_multiplier(features.len());
        let effective = total * synergy;
        let reduction_pct = if baseline_noise_db > 0.0 {
            effective / baseline_noise_db * 100.0
        } else {
            0.0
        };

        CompositionResult {
            total_reduction_db: effective,
            final_noise_db: baseline_noise_db - effective,
            individual,
            synergy_multiplier: synergy,
            reduction_pct,
        }
    }

    /// Rule table over manufacturing tolerance, angle of attack, Reynolds
    /// number and the NTR reduction target.
    pub fn recommend(
        &self,
        conditions: &OperatingConditions,
        constraints: Option<&DesignConstraints>,
    ) -> Vec<FeatureKind> {
        let constraints = constraints.copied().unwrap_or_default();
        let complexity = constraints.manufacturing_complexity;
        let mut picks = Vec::new();

        if matches!(complexity, Complexity::Medium | Complexity::High) {
            picks.push(FeatureKind::Serration);
        }
        if conditions.angle_of_attack_deg > 5.0 && complexity == Complexity::High {
            picks.push(FeatureKind::Tubercle);
        }
        if conditions.reynolds_number < 3e5 || constraints.require_stiffness {
            picks.push(FeatureKind::Corrugation);
        }

        if conditions.noise_reduction_target_pct >= 15.0 && picks.len() < 2 {
            if !picks.contains(&FeatureKind::Serration) {
                picks.push(FeatureKind::Serration);
            }
            if !picks.contains(&FeatureKind::Tubercle) && complexity == Complexity::High {
                picks.push(FeatureKind::Tubercle);
            }
        }

        picks
    }

    /// Baseline, each feature alone, then all three together when
    /// `count >= 5`; truncated to `count`.
    pub fn generate_variants(&self, base: &GeometryRecord, count: usize) -> Vec<DesignVariant> {
        let mut variants = vec![DesignVariant {
            name: "Baseline".to_string(),
            geometry: base.clone(),
            features: Vec::new(),
        }];

        for kind in FeatureKind::ALL {
            variants.push(DesignVariant {
                name: kind.label().to_string(),
                geometry: self.compose(base, &[kind], None),
                features: vec![kind],
            });
        }

        if count >= 5 {
            let all = FeatureKind::ALL.to_vec();
            variants.push(DesignVariant {
                name: "Combined Bio-Inspired".to_string(),
                geometry: self.compose(base, &all, None),
                features: all,
            });
        }

        variants.truncate(count);
        variants
    }
}
