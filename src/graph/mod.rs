//! Graph layer: SQLite-backed property-graph store, statement builders,
//! retrieval, recommendation and mutation.

pub mod lookup;
pub mod movies;
pub mod mutation;
pub mod query;
pub mod ranking;
pub mod search;
pub mod store;
pub mod traversal;

pub use store::{GraphStats, GraphStore};
