//! Unified error type for the GraphRAG server.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphRagError {
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required argument '{argument}' for tool '{tool}'")]
    MissingArgument { tool: String, argument: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{0}' is disabled by configuration")]
    ToolDisabled(String),

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Invalid {kind} '{value}': expected letters, digits or '_' and not starting with a digit")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Invalid property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    #[error("Graph connection is closed")]
    ConnectionClosed,

    #[error("Only read-only statements are accepted by query_graph")]
    ReadOnlyViolation,

    #[error("MCP protocol error: {0}")]
    Mcp(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GraphRagError>;
