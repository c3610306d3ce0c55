//! GraphRAG MCP server library.
//!
//! Exposes an embedded property graph to MCP clients: free-text context
//! retrieval, neighborhood expansion, node creation, and a movie catalog
//! with filtered search and genre-overlap recommendations.

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod mcp;
pub mod observability;
pub mod seed;
pub mod types;
