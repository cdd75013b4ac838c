//! Random-search optimisation of bio-inspired feature parameters.
//!
//! Each trial draws depth/amplitude and wavelength ratios uniformly from
//! fixed per-feature ranges, evaluates the composed design through the
//! bio-inspired path, and keeps the strictly best trial. Every trial is
//! recorded in the optimiser's history.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use crate::evaluator::{EvaluationResult, Evaluator};
use crate::features::{FeatureConfigs, FeatureKind};
use crate::geometry::{GeometryRecord, OperatingConditions};
use crate::metrics;

/// Uniform sampling over closed intervals.
pub trait Sampler {
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

impl<R: rand::Rng> Sampler for R {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.gen_range(low..=high)
        } else {
            low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    MinimizeNtr,
    MaximizeEfficiency,
    MaximizeReduction,
}

impl Objective {
    pub fn name(self) -> &'static str {
        match self {
            Objective::MinimizeNtr => "minimize_ntr",
            Objective::MaximizeEfficiency => "maximize_efficiency",
            Objective::MaximizeReduction => "maximize_reduction",
        }
    }

    pub fn minimizes(self) -> bool {
        matches!(self, Objective::MinimizeNtr)
    }

    /// Score that every real trial beats.
    pub fn worst(self) -> f64 {
        if self.minimizes() {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    }

    pub fn score(self, evaluation: &EvaluationResult) -> f64 {
        match self {
            Objective::MinimizeNtr => evaluation.metrics.ntr,
            Objective::MaximizeEfficiency => evaluation.thrust.efficiency,
            Objective::MaximizeReduction => evaluation.metrics.reduction_pct.unwrap_or(0.0),
        }
    }

    /// Strict comparison; ties keep the incumbent.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        if self.minimizes() {
            candidate < incumbent
        } else {
            candidate > incumbent
        }
    }
}

impl FromStr for Objective {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimize_ntr" | "ntr" => Ok(Objective::MinimizeNtr),
            "maximize_efficiency" | "efficiency" => Ok(Objective::MaximizeEfficiency),
            "maximize_reduction" | "reduction" => Ok(Objective::MaximizeReduction),
            other => bail!("unknown objective '{}'", other),
        }
    }
}

/// Closed sampling intervals, `(low, high)`, per feature ratio.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParameterRanges {
    pub serration_depth_ratio: (f64, f64),
    pub serration_wavelength_ratio: (f64, f64),
    pub tubercle_amplitude_ratio: (f64, f64),
    pub tubercle_wavelength_ratio: (f64, f64),
    pub corrugation_depth_ratio: (f64, f64),
    pub corrugation_wavelength_ratio: (f64, f64),
}

impl Default for ParameterRanges {
    fn default() -> Self {
        Self {
            serration_depth_ratio: (0.03, 0.08),
            serration_wavelength_ratio: (0.015, 0.04),
            tubercle_amplitude_ratio: (0.08, 0.14),
            tubercle_wavelength_ratio: (0.20, 0.35),
            corrugation_depth_ratio: (0.025, 0.045),
            corrugation_wavelength_ratio: (0.04, 0.07),
        }
    }
}

impl ParameterRanges {
    pub fn validate(&self) -> Result<()> {
        let ranges = [
            ("serration_depth_ratio", self.serration_depth_ratio),
            ("serration_wavelength_ratio", self.serration_wavelength_ratio),
            ("tubercle_amplitude_ratio", self.tubercle_amplitude_ratio),
            ("tubercle_wavelength_ratio", self.tubercle_wavelength_ratio),
            ("corrugation_depth_ratio", self.corrugation_depth_ratio),
            ("corrugation_wavelength_ratio", self.corrugation_wavelength_ratio),
        ];
        for (name, (low, high)) in ranges {
            if !(low > 0.0) || !(high >= low) {
                bail!("optimizer.ranges.{} must satisfy 0 < low <= high", name);
            }
        }
        Ok(())
    }
}

/// Depth (amplitude, for tubercles) and wavelength ratios of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SampledRatios {
    pub depth_ratio: f64,
    pub wavelength_ratio: f64,
}

/// Ratios drawn for one trial. Only requested features are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct SampledParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serration: Option<SampledRatios>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tubercle: Option<SampledRatios>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrugation: Option<SampledRatios>,
}

impl SampledParams {
    /// Draw in declaration order so a seeded sampler replays identically
    /// whatever order `features` lists them in.
    pub fn draw<S: Sampler + ?Sized>(
        sampler: &mut S,
        ranges: &ParameterRanges,
        features: &[FeatureKind],
    ) -> Self {
        let mut draw_pair = |depth: (f64, f64), wavelength: (f64, f64)| SampledRatios {
            depth_ratio: sampler.uniform(depth.0, depth.1),
            wavelength_ratio: sampler.uniform(wavelength.0, wavelength.1),
        };

        let mut params = SampledParams::default();
        if features.contains(&FeatureKind::Serration) {
            params.serration = Some(draw_pair(
                ranges.serration_depth_ratio,
                ranges.serration_wavelength_ratio,
            ));
        }
        if features.contains(&FeatureKind::Tubercle) {
            params.tubercle = Some(draw_pair(
                ranges.tubercle_amplitude_ratio,
                ranges.tubercle_wavelength_ratio,
            ));
        }
        if features.contains(&FeatureKind::Corrugation) {
            params.corrugation = Some(draw_pair(
                ranges.corrugation_depth_ratio,
                ranges.corrugation_wavelength_ratio,
            ));
        }
        params
    }

    /// Full feature parameters for `base`, derived through each variant's
    /// geometry rules.
    pub fn to_configs(&self, evaluator: &Evaluator, base: &GeometryRecord) -> FeatureConfigs {
        let composer = &evaluator.composer;
        FeatureConfigs {
            serration: self.serration.map(|r| {
                composer
                    .serration
                    .geometry(base.chord_length_m, r.depth_ratio, r.wavelength_ratio, None)
            }),
            tubercle: self.tubercle.map(|r| {
                composer
                    .tubercle
                    .geometry(base.radius_m, r.depth_ratio, r.wavelength_ratio, None)
            }),
            corrugation: self.corrugation.map(|r| {
                composer
                    .corrugation
                    .geometry(base.chord_length_m, r.depth_ratio, r.wavelength_ratio, None)
            }),
        }
    }
}

/// One history entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimizationTrial {
    pub iteration: usize,
    pub score: f64,
    pub ntr: f64,
    pub params: SampledParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestDesign {
    pub geometry: GeometryRecord,
    pub evaluation: EvaluationResult,
    pub params: SampledParams,
    pub iteration: usize,
    pub score: f64,
    pub objective: Objective,
    pub baseline_ntr: f64,
    /// NTR reduction against the baseline, percent.
    pub improvement_pct: f64,
}

/// Weights of the scalarised multi-objective score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub noise_reduction: f64,
    pub efficiency: f64,
    pub manufacturability: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            noise_reduction: 0.6,
            efficiency: 0.3,
            manufacturability: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiObjectiveScore {
    pub features: Vec<FeatureKind>,
    pub evaluation: EvaluationResult,
    pub noise_reduction_pct: f64,
    pub efficiency: f64,
    pub manufacturability: f64,
    pub total_score: f64,
}

/// Fewer features are easier to build: `100 − 15·k`.
pub fn manufacturability(feature_count: usize) -> f64 {
    100.0 - 15.0 * feature_count as f64
}

pub struct Optimizer<S: Sampler> {
    pub evaluator: Evaluator,
    pub ranges: ParameterRanges,
    sampler: S,
    history: Vec<OptimizationTrial>,
}

impl<S: Sampler> Optimizer<S> {
    pub fn new(sampler: S) -> Self {
        Self {
            evaluator: Evaluator::default(),
            ranges: ParameterRanges::default(),
            sampler,
            history: Vec::new(),
        }
    }

    pub fn with_ranges(mut self, ranges: ParameterRanges) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Trials from every `optimize` call since the last clear, in order.
    pub fn history(&self) -> &[OptimizationTrial] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// `None` when no trial beat the initial score, e.g. zero iterations.
    pub fn optimize(
        &mut self,
        base: &GeometryRecord,
        features: &[FeatureKind],
        conditions: &OperatingConditions,
        objective: Objective,
        iterations: usize,
    ) -> Option<BestDesign> {
        let baseline_ntr = self.evaluator.evaluate(base, conditions, None).metrics.ntr;
        let mut best: Option<BestDesign> = None;
        let mut best_score = objective.worst();

        for iteration in 0..iterations {
            let params = SampledParams::draw(&mut self.sampler, &self.ranges, features);
            let configs = params.to_configs(&self.evaluator, base);
            let evaluation = self.evaluator.evaluate_bio_inspired_with(
                base,
                features,
                conditions,
                Some(baseline_ntr),
                Some(&configs),
            );
            let score = objective.score(&evaluation);
            let ntr = evaluation.metrics.ntr;

            debug!(iteration, score, ntr, "optimizer trial");
            self.history.push(OptimizationTrial {
                iteration,
                score,
                ntr,
                params,
            });

            if objective.is_better(score, best_score) {
                best_score = score;
                best = Some(BestDesign {
                    geometry: evaluation.geometry.clone(),
                    improvement_pct: metrics::reduction_pct(baseline_ntr, ntr),
                    evaluation,
                    params,
                    iteration,
                    score,
                    objective,
                    baseline_ntr,
                });
            }
        }

        if let Some(b) = &best {
            info!(
                objective = objective.name(),
                iterations,
                best_iteration = b.iteration,
                score = b.score,
                improvement_pct = b.improvement_pct,
                "optimization complete"
            );
        }
        best
    }

    /// Score fixed feature combinations and rank them, best first.
    pub fn multi_objective(
        &self,
        base: &GeometryRecord,
        combinations: &[Vec<FeatureKind>],
        conditions: &OperatingConditions,
        weights: &ObjectiveWeights,
    ) -> Vec<MultiObjectiveScore> {
        let baseline_ntr = self.evaluator.evaluate(base, conditions, None).metrics.ntr;

        let mut scored: Vec<MultiObjectiveScore> = combinations
            .iter()
            .map(|features| {
                let evaluation =
                    self.evaluator
                        .evaluate_bio_inspired(base, features, conditions, Some(baseline_ntr));
                let noise_reduction = evaluation.metrics.reduction_pct.unwrap_or(0.0);
                let efficiency = evaluation.thrust.efficiency;
                let buildability = manufacturability(features.len());
                let total_score = weights.noise_reduction * noise_reduction
                    + weights.efficiency * efficiency * 100.0
                    + weights.manufacturability * buildability;

                MultiObjectiveScore {
                    features: features.clone(),
                    evaluation,
                    noise_reduction_pct: noise_reduction,
                    efficiency,
                    manufacturability: buildability,
                    total_score,
                }
            })
            .collect();

        scored.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::features::FeatureKind::{Corrugation, Serration, Tubercle};

    fn optimizer(seed: u64) -> Optimizer<StdRng> {
        Optimizer::new(StdRng::seed_from_u64(seed))
    }

    #[test]
    fn history_records_every_trial_in_order() {
        let mut opt = optimizer(7);
        let base = GeometryRecord::default();
        let conditions = OperatingConditions::default();

        opt.optimize(&base, &[Serration], &conditions, Objective::MinimizeNtr, 6);
        assert_eq!(opt.history().len(), 6);
        let iterations: Vec<usize> = opt.history().iter().map(|t| t.iteration).collect();
        assert_eq!(iterations, vec![0, 1, 2, 3, 4, 5]);

        opt.optimize(&base, &[Serration], &conditions, Objective::MinimizeNtr, 2);
        assert_eq!(opt.history().len(), 8);

        opt.clear_history();
        assert!(opt.history().is_empty());
    }

    #[test]
    fn best_is_the_minimum_of_history() {
        let mut opt = optimizer(11);
        let best = opt
            .optimize(
                &GeometryRecord::default(),
                &[Serration, Tubercle, Corrugation],
                &OperatingConditions::default(),
                Objective::MinimizeNtr,
                12,
            )
            .unwrap();

        let min = opt
            .history()
            .iter()
            .map(|t| t.score)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(best.score, min);
        // first occurrence wins ties
        let first = opt.history().iter().position(|t| t.score == min).unwrap();
        assert_eq!(best.iteration, first);
        assert!(best.improvement_pct > 0.0);
    }

    #[test]
    fn more_iterations_never_worsen_the_best() {
        let base = GeometryRecord::default();
        let conditions = OperatingConditions::default();
        let features = [Serration, Corrugation];

        let mut previous = f64::INFINITY;
        for n in 1..=8 {
            let best = optimizer(3)
                .optimize(&base, &features, &conditions, Objective::MinimizeNtr, n)
                .unwrap();
            assert!(best.score <= previous);
            previous = best.score;
        }
    }

    #[test]
    fn sampled_ratios_stay_in_range_and_reach_geometry() {
        let mut opt = optimizer(5);
        let ranges = ParameterRanges::default();
        let best = opt
            .optimize(
                &GeometryRecord::default(),
                &[Tubercle],
                &OperatingConditions::default(),
                Objective::MaximizeReduction,
                10,
            )
            .unwrap();

        for trial in opt.history() {
            assert!(trial.params.serration.is_none());
            let t = trial.params.tubercle.unwrap();
            assert!(t.depth_ratio >= ranges.tubercle_amplitude_ratio.0);
            assert!(t.depth_ratio <= ranges.tubercle_amplitude_ratio.1);
            assert!(t.wavelength_ratio >= ranges.tubercle_wavelength_ratio.0);
            assert!(t.wavelength_ratio <= ranges.tubercle_wavelength_ratio.1);
        }

        let applied = best.geometry.leading_edge_tubercles.unwrap();
        assert_eq!(applied.amplitude_ratio, best.params.tubercle.unwrap().depth_ratio);
    }

    #[test]
    fn zero_iterations_has_no_best() {
        let mut opt = optimizer(1);
        let best = opt.optimize(
            &GeometryRecord::default(),
            &[Serration],
            &OperatingConditions::default(),
            Objective::MinimizeNtr,
            0,
        );
        assert!(best.is_none());
        assert!(opt.history().is_empty());
    }

    #[test]
    fn same_seed_replays_identically() {
        let base = GeometryRecord::default();
        let conditions = OperatingConditions::default();
        let mut a = optimizer(42);
        let mut b = optimizer(42);
        a.optimize(&base, &[Serration, Tubercle], &conditions, Objective::MinimizeNtr, 5);
        b.optimize(&base, &[Tubercle, Serration], &conditions, Objective::MinimizeNtr, 5);
        let pa: Vec<SampledParams> = a.history().iter().map(|t| t.params).collect();
        let pb: Vec<SampledParams> = b.history().iter().map(|t| t.params).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn multi_objective_ranks_descending() {
        let opt = optimizer(0);
        let combos = vec![
            vec![Serration],
            vec![Serration, Tubercle, Corrugation],
            vec![Corrugation],
        ];
        let ranked = opt.multi_objective(
            &GeometryRecord::default(),
            &combos,
            &OperatingConditions::default(),
            &ObjectiveWeights::default(),
        );

        assert_eq!(ranked.len(), 3);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].total_score >= w[1].total_score));
        let triple = ranked.iter().find(|r| r.features.len() == 3).unwrap();
        assert_eq!(triple.manufacturability, 55.0);
    }

    #[test]
    fn objective_parsing_and_direction() {
        assert_eq!("minimize_ntr".parse::<Objective>().unwrap(), Objective::MinimizeNtr);
        assert_eq!("Efficiency".parse::<Objective>().unwrap(), Objective::MaximizeEfficiency);
        assert!("fastest".parse::<Objective>().is_err());
        assert!(Objective::MinimizeNtr.is_better(1.0, 2.0));
        assert!(!Objective::MinimizeNtr.is_better(2.0, 2.0));
        assert!(Objective::MaximizeReduction.is_better(3.0, 2.0));
    }

    #[test]
    fn default_ranges_validate() {
        assert!(ParameterRanges::default().validate().is_ok());
        let bad = ParameterRanges {
            tubercle_wavelength_ratio: (0.3, 0.2),
            ..ParameterRanges::default()
        };
        assert!(bad.validate().is_err());
    }
}
