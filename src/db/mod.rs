//! Database layer.
//!
//! - [`schema`]: DDL and initialization (`initialize_database`).
//! - [`converters`]: row-to-record conversions (`row_to_graph_node`, `row_to_record`).

pub mod converters;
pub mod schema;

pub use converters::{row_to_graph_node, row_to_record, row_to_relationship};
pub use schema::{initialize_database, initialize_database_with_timeout};
