//! Scenario engine: declarative analysis specs, topological composition,
//! and the built-in per-file analyzers.

pub mod analyzer;
pub mod analyzers;
pub mod metrics;
pub mod registry;
pub mod spec;

pub use analyzer::{AnalysisContext, AnalysisResult, ScenarioAnalyzer};
pub use registry::ScenarioRegistry;
pub use spec::ScenarioSpec;
