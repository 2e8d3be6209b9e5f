//! Persistent graph store: idempotent upserts, indexed lookup, per-file
//! transactions, snapshots for queries, and JSON(+zstd) disk persistence.

pub mod diff;
pub mod storage;
pub mod store;

pub use storage::GraphStorage;
pub use store::{
    Direction, EdgeCriteria, GraphStore, NodeCriteria, StoreImage, StoreSnapshot, Transaction,
};
