//! Core types for the repository dependency graph.
//!
//! Provides the RDF address scheme ([`address::RdfAddress`]), the node and edge
//! data model, the typed edge registry ([`edge_types::EdgeTypeRegistry`]),
//! the error taxonomy, and runtime configuration.

pub mod address;
pub mod config;
pub mod edge_types;
pub mod error;
pub mod model;
pub mod uniqueness;
