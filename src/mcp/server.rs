//! MCP server implementation using rmcp over stdio transport.
//!
//! Bridges `tools/list` and `tools/call` to the [`ToolDispatcher`]. Each
//! call answers with a single text content block.

use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use tracing::info;

use crate::error::{GraphRagError, Result};
use crate::mcp::dispatch::{JsonObject, ToolDispatcher};
use crate::mcp::envelope::ToolResponse;

const INSTRUCTIONS: &str = "GraphRAG server over a property graph. Use search_graph_context \
to find nodes, get_node_relationships to expand around one, and save_graph_context to \
persist new knowledge. Movie tools: search_movies, get_user_preferences, recommend_movies, \
get_movie_details. query_graph runs raw SQL against the nodes/edges tables.";

// ---------------------------------------------------------------------------
// Server struct
// ---------------------------------------------------------------------------

/// GraphRAG MCP server.
///
/// Cheap to clone; all clones share one dispatcher and so one graph handle.
#[derive(Clone)]
pub struct GraphRagServer {
    dispatcher: Arc<ToolDispatcher>,
}

impl GraphRagServer {
    pub fn new(dispatcher: Arc<ToolDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// MCP descriptors for every enabled tool.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .enabled_tools()
            .map(|spec| {
                Tool::new(
                    spec.name.as_str(),
                    spec.description,
                    Arc::new(spec.input_schema.clone()),
                )
            })
            .collect()
    }

    fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let arguments = arguments.unwrap_or_default();
        into_call_result(self.dispatcher.dispatch(name, &arguments))
    }
}

fn into_call_result(response: ToolResponse) -> CallToolResult {
    let content = vec![Content::text(response.text)];
    if response.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

// ---------------------------------------------------------------------------
// ServerHandler impl
// ---------------------------------------------------------------------------

impl ServerHandler for GraphRagServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "graphrag".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        Ok(self.call(request.name.as_ref(), request.arguments))
    }
}

// ---------------------------------------------------------------------------
// Public entry point: run the MCP server over stdio
// ---------------------------------------------------------------------------

/// Serve MCP on stdin/stdout until the client disconnects, then release
/// the graph connection.
pub async fn run_server(dispatcher: Arc<ToolDispatcher>) -> Result<()> {
    let server = GraphRagServer::new(Arc::clone(&dispatcher));
    info!(
        db_path = %dispatcher.config().database.path,
        tools = server.tools().len(),
        "starting MCP server on stdio"
    );

    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| GraphRagError::Mcp(e.to_string()))?;
    let quit_reason = running
        .waiting()
        .await
        .map_err(|e| GraphRagError::Mcp(e.to_string()))?;

    dispatcher.close();
    info!(reason = ?quit_reason, metrics = %dispatcher.metrics().to_json(), "MCP server stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
