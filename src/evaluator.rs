//! Full evaluation pipeline: noise, thrust, metrics, and the two-pass
//! bio-inspired path on top of it.

use serde::Serialize;
use tracing::debug;

use crate::acoustics::{NoiseBreakdown, NoiseModel};
use crate::composer::{CompositionResult, FeatureComposer};
use crate::features::{FeatureConfigs, FeatureKind};
use crate::geometry::{GeometryRecord, OperatingConditions};
use crate::metrics::{self, PerformanceMetrics};
use crate::thrust::{Coefficients, ThrustBreakdown, ThrustModel, DEFAULT_ELEMENTS};

/// Everything known about one design at one operating point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub noise: NoiseBreakdown,
    pub thrust: ThrustBreakdown,
    pub coefficients: Coefficients,
    pub metrics: PerformanceMetrics,
    /// The evaluated geometry (the composed one on the bio-inspired path).
    pub geometry: GeometryRecord,
    pub conditions: OperatingConditions,
    /// Features as requested by the caller, in caller order.
    pub features: Vec<FeatureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<CompositionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDesign {
    pub name: String,
    pub ntr: f64,
    pub noise_db: f64,
    pub thrust_n: f64,
    pub evaluation: EvaluationResult,
}

/// Designs sorted by ascending NTR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignComparison {
    pub designs: Vec<RankedDesign>,
}

impl DesignComparison {
    pub fn best(&self) -> Option<&RankedDesign> {
        self.designs.first()
    }

    pub fn len(&self) -> usize {
        self.designs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    pub noise: NoiseModel,
    pub composer: FeatureComposer,
    pub observer_distance_m: f64,
    pub num_elements: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            noise: NoiseModel::default(),
            composer: FeatureComposer::default(),
            observer_distance_m: 1.0,
            num_elements: DEFAULT_ELEMENTS,
        }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer_distance(mut self, distance_m: f64) -> Self {
        self.observer_distance_m = distance_m;
        self
    }

    /// Noise, then thrust, then metrics. No feature logic.
    pub fn evaluate(
        &self,
        geometry: &GeometryRecord,
        conditions: &OperatingConditions,
        baseline_ntr: Option<f64>,
    ) -> EvaluationResult {
        let noise = self
            .noise
            .total_noise(geometry, conditions, self.observer_distance_m);

        let thrust_model = ThrustModel::new(conditions.air_density);
        let thrust = thrust_model.blade_element(
            conditions.rpm,
            &geometry.blade_section(),
            geometry.blade_count,
            self.num_elements,
        );
        let coefficients = thrust_model.coefficients(
            &thrust,
            conditions.rpm,
            conditions.velocity_m_s,
            geometry.radius_m,
        );

        let metrics = metrics::evaluate(&noise, &thrust, baseline_ntr);
        debug!(
            design = %geometry.name,
            total_spl_db = noise.total_spl_db,
            thrust_n = thrust.thrust_n,
            ntr = metrics.ntr,
            "evaluated design"
        );

        EvaluationResult {
            noise,
            thrust,
            coefficients,
            metrics,
            geometry: geometry.clone(),
            conditions: *conditions,
            features: geometry.bio_features.clone(),
            composition: None,
        }
    }

    pub fn evaluate_bio_inspired(
        &self,
        base: &GeometryRecord,
        features: &[FeatureKind],
        conditions: &OperatingConditions,
        baseline_ntr: Option<f64>,
    ) -> EvaluationResult {
        self.evaluate_bio_inspired_with(base, features, conditions, baseline_ntr, None)
    }

    /// Compose, evaluate once for the pre-treatment noise level, chain the
    /// feature reductions from that level, then recompute the metrics with
    /// the reduced total and the unchanged thrust.
    pub fn evaluate_bio_inspired_with(
        &self,
        base: &GeometryRecord,
        features: &[FeatureKind],
        conditions: &OperatingConditions,
        baseline_ntr: Option<f64>,
        configs: Option<&FeatureConfigs>,
    ) -> EvaluationResult {
        let composed = self.composer.compose(base, features, configs);
        let mut result = self.evaluate(&composed, conditions, baseline_ntr);
        result.features = features.to_vec();

        if features.is_empty() {
            return result;
        }

        let params = FeatureConfigs::from_geometry(&composed);
        let composition = self.composer.combined_reduction(
            result.noise.total_spl_db,
            features,
            &params,
            conditions,
        );

        result.noise.total_spl_db = composition.final_noise_db;
        result.noise.bio_reduction_db = Some(composition.total_reduction_db);
        result.metrics = metrics::evaluate(&result.noise, &result.thrust, baseline_ntr);
        result.composition = Some(composition);
        result
    }

    /// Evaluate each design and rank by ascending NTR.
    pub fn compare(
        &self,
        designs: &[GeometryRecord],
        conditions: &OperatingConditions,
    ) -> DesignComparison {
        let mut ranked: Vec<RankedDesign> = designs
            .iter()
            .enumerate()
            .map(|(i, design)| {
                let evaluation = self.evaluate(design, conditions, None);
                let name = if design.name.is_empty() {
                    format!("Design {}", i + 1)
                } else {
                    design.name.clone()
                };
                RankedDesign {
                    name,
                    ntr: evaluation.metrics.ntr,
                    noise_db: evaluation.metrics.total_noise_spl_db,
                    thrust_n: evaluation.metrics.thrust_n,
                    evaluation,
                }
            })
            .collect();

        ranked.sort_by(|a, b| a.ntr.total_cmp(&b.ntr));
        DesignComparison { designs: ranked }
    }
}
