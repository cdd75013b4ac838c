//! Strix: aeroacoustic evaluation of small propeller blades and of the
//! bio-inspired edge and surface treatments applied to them.
//!
//! Geometry and operating conditions flow down through the noise and thrust
//! models into the noise-to-thrust metrics; the [`evaluator`] ties these
//! together, the [`composer`] layers feature reductions on top, and the
//! [`optimizer`] searches feature parameters.

pub mod acoustics;
pub mod composer;
pub mod config;
pub mod evaluator;
pub mod features;
pub mod geometry;
pub mod io;
pub mod metrics;
pub mod optimizer;
pub mod thrust;

pub use acoustics::{NoiseBreakdown, NoiseModel};
pub use composer::{CompositionResult, DesignConstraints, FeatureComposer};
pub use evaluator::{DesignComparison, EvaluationResult, Evaluator};
pub use features::{BioFeature, FeatureConfigs, FeatureKind};
pub use geometry::{GeometryRecord, OperatingConditions, Preset};
pub use metrics::PerformanceMetrics;
pub use optimizer::{BestDesign, Objective, Optimizer};
pub use thrust::{ThrustBreakdown, ThrustModel};
