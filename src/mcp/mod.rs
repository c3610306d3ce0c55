//! MCP surface: tool dispatch, response shaping and the stdio server.

pub mod dispatch;
pub mod envelope;
pub mod server;

pub use dispatch::{tool_catalog, ToolDispatcher, ToolName, ToolSpec};
pub use envelope::ToolResponse;
pub use server::{run_server, GraphRagServer};
