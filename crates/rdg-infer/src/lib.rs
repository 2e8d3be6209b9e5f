//! Inference engine: structural queries over the graph store using the
//! typed edge registry.
//!
//! All queries are side-effect free, run against a store snapshot (safe to
//! use concurrently with writes), and honor a per-call timeout by returning
//! partial results flagged `partial = true` instead of hanging.

pub mod cycles;
pub mod engine;
pub mod explore;

pub use cycles::{Cycle, CycleReport};
pub use engine::{
    HierarchicalOptions, InferenceEngine, InheritedRelation, QueryOutcome, TransitivePath,
    TraversalOptions,
};
pub use explore::ExploreNode;
