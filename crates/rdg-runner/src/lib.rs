//! Namespace runner: resolves files, computes scenario execution order,
//! drives analyzers over each file in a bounded worker pool, and merges
//! results into the graph store.

pub mod config;
pub mod files;
pub mod runner;

pub use config::{NamespaceConfig, NamespaceFile, RdfOptions};
pub use runner::{
    bootstrap_registries, CancellationToken, FileError, GraphStats, NamespaceRunner, RunOptions,
    RunSummary,
};
