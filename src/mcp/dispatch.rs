//! Tool dispatcher: catalog, argument validation, routing and the uniform
//! response envelope.
//!
//! Every call ends in a [`ToolResponse`]. Errors raised anywhere below the
//! dispatcher are converted here, exactly once, into
//! `{status: "error", error}` so nothing escapes to the protocol host.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::GraphRagConfig;
use crate::error::{GraphRagError, Result};
use crate::graph::lookup::MovieLookup;
use crate::graph::mutation::{GraphMutation, SaveRequest};
use crate::graph::query::MovieFilter;
use crate::graph::ranking::GraphRanking;
use crate::graph::search::{ContextSearch, MovieSearch};
use crate::graph::store::GraphStore;
use crate::graph::traversal::GraphTraversal;
use crate::mcp::envelope::{self, ToolResponse};
use crate::observability::{redact_secrets, CallMetrics};
use crate::types::{deserialize_loose_id, Properties, RelationSpec};

pub type JsonObject = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Tool names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchGraphContext,
    GetNodeRelationships,
    SaveGraphContext,
    SearchMovies,
    GetUserPreferences,
    RecommendMovies,
    GetMovieDetails,
    QueryGraph,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::SearchGraphContext,
        ToolName::GetNodeRelationships,
        ToolName::SaveGraphContext,
        ToolName::SearchMovies,
        ToolName::GetUserPreferences,
        ToolName::RecommendMovies,
        ToolName::GetMovieDetails,
        ToolName::QueryGraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchGraphContext => "search_graph_context",
            ToolName::GetNodeRelationships => "get_node_relationships",
            ToolName::SaveGraphContext => "save_graph_context",
            ToolName::SearchMovies => "search_movies",
            ToolName::GetUserPreferences => "get_user_preferences",
            ToolName::RecommendMovies => "recommend_movies",
            ToolName::GetMovieDetails => "get_movie_details",
            ToolName::QueryGraph => "query_graph",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            ToolName::SearchGraphContext => {
                "Search the knowledge graph for context. Returns nodes whose properties \
                 contain the query text, with their ids, types and properties."
            }
            ToolName::GetNodeRelationships => {
                "Get the relationships of one node (id from search_graph_context) to \
                 explore the connections around a concept or entity."
            }
            ToolName::SaveGraphContext => {
                "Save new context to the graph as a node, optionally linked to existing \
                 nodes. Relations whose target does not exist are reported as skipped."
            }
            ToolName::SearchMovies => "Search for movies by genre, actor, director, or rating",
            ToolName::GetUserPreferences => "Get the movies a user likes and their ratings",
            ToolName::RecommendMovies => {
                "Recommend movies for a user based on genres shared with the movies they like"
            }
            ToolName::GetMovieDetails => "Get detailed information about a specific movie",
            ToolName::QueryGraph => {
                "Execute a raw SQL statement against the graph tables \
                 (nodes: id, labels, properties; edges: id, source_id, target_id, type, properties)"
            }
        }
    }

    /// Argument echoed back in error envelopes, for the tools whose
    /// success envelope carries it.
    fn context_key(self) -> Option<&'static str> {
        match self {
            ToolName::SearchGraphContext => Some("query"),
            ToolName::GetNodeRelationships => Some("node_id"),
            _ => None,
        }
    }

    fn input_schema(self) -> JsonObject {
        match self {
            ToolName::SearchGraphContext => schema_object::<SearchGraphContextArgs>(),
            ToolName::GetNodeRelationships => schema_object::<NodeRelationshipsArgs>(),
            ToolName::SaveGraphContext => schema_object::<SaveGraphContextArgs>(),
            ToolName::SearchMovies => schema_object::<SearchMoviesArgs>(),
            ToolName::GetUserPreferences | ToolName::RecommendMovies => {
                schema_object::<UserArgs>()
            }
            ToolName::GetMovieDetails => schema_object::<MovieTitleArgs>(),
            ToolName::QueryGraph => schema_object::<QueryGraphArgs>(),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Typed arguments (also the source of each tool's input schema)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchGraphContextArgs {
    /// Search text (keywords, concepts, ...)
    query: String,
    /// Maximum number of results (default: 5)
    limit: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct NodeRelationshipsArgs {
    /// Node id, as returned by search_graph_context
    #[serde(deserialize_with = "deserialize_loose_id")]
    #[schemars(with = "String")]
    node_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SaveGraphContextArgs {
    /// Node type (e.g. Concept, Entity, Context, Agent_Output)
    #[serde(rename = "type")]
    node_type: String,
    /// Node properties (e.g. {"name": "...", "description": "..."})
    properties: Properties,
    /// Relations to create from the new node (e.g. [{"target_id": "12", "type": "RELATED_TO"}])
    #[serde(default)]
    relations: Vec<RelationSpec>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchMoviesArgs {
    /// Genre of the movie (Sci-Fi, Action, Thriller, Drama, Comedy, Mystery)
    genre: Option<String>,
    /// Name of the actor
    actor: Option<String>,
    /// Name of the director
    director: Option<String>,
    /// Minimum rating (0-10)
    min_rating: Option<f64>,
}

impl SearchMoviesArgs {
    /// Empty strings and a zero rating impose no constraint.
    fn into_filter(self) -> MovieFilter {
        let present = |s: Option<String>| s.filter(|v| !v.is_empty());
        MovieFilter {
            genre: present(self.genre),
            actor: present(self.actor),
            director: present(self.director),
            min_rating: self.min_rating.filter(|r| *r != 0.0),
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UserArgs {
    /// Name of the user (Alice, Bob, or Charlie)
    user_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MovieTitleArgs {
    /// Title of the movie
    title: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryGraphArgs {
    /// SQL statement to execute
    query: String,
}

fn schema_object<T: JsonSchema>() -> JsonObject {
    let schema = schemars::schema_for!(T);
    let mut object = match serde_json::to_value(&schema) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    };
    object.remove("$schema");
    object.remove("title");
    object
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, arguments: &JsonObject) -> Result<T> {
    serde_json::from_value(Value::Object(arguments.clone())).map_err(|e| {
        GraphRagError::InvalidArguments {
            tool: tool.as_str().to_string(),
            reason: e.to_string(),
        }
    })
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One entry of `tools/list`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub input_schema: JsonObject,
    pub required: Vec<String>,
}

pub fn tool_catalog() -> Vec<ToolSpec> {
    ToolName::ALL
        .into_iter()
        .map(|name| {
            let input_schema = name.input_schema();
            let required = input_schema
                .get("required")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            ToolSpec {
                name,
                description: name.description(),
                input_schema,
                required,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes tool calls to the graph layer.
///
/// Holds the single graph handle for the process. Calls are served one at a
/// time through the mutex.
pub struct ToolDispatcher {
    store: Arc<Mutex<GraphStore>>,
    config: GraphRagConfig,
    catalog: Vec<ToolSpec>,
    metrics: Mutex<CallMetrics>,
}

impl ToolDispatcher {
    pub fn new(store: GraphStore, config: GraphRagConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config,
            catalog: tool_catalog(),
            metrics: Mutex::new(CallMetrics::new()),
        }
    }

    /// Dispatcher over a lazily opened store at `config.database.path`.
    pub fn from_config(config: GraphRagConfig) -> Self {
        let store = GraphStore::new(&config.database.path)
            .with_busy_timeout(config.database.busy_timeout());
        Self::new(store, config)
    }

    pub fn config(&self) -> &GraphRagConfig {
        &self.config
    }

    pub fn catalog(&self) -> &[ToolSpec] {
        &self.catalog
    }

    /// Catalog entries not disabled by configuration.
    pub fn enabled_tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.catalog
            .iter()
            .filter(|spec| self.config.is_tool_enabled(spec.name.as_str()))
    }

    fn store(&self) -> MutexGuard<'_, GraphStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` against the graph handle outside of any tool call.
    pub fn with_store<T>(&self, f: impl FnOnce(&GraphStore) -> T) -> T {
        f(&self.store())
    }

    pub fn metrics(&self) -> CallMetrics {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, tool: &str, ok: bool) {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(tool, ok);
    }

    /// Release the graph connection. Later calls answer with an error
    /// envelope.
    pub fn close(&self) {
        self.store().close();
    }

    /// Handle one tool call. Never fails: every outcome is an envelope.
    pub fn dispatch(&self, name: &str, arguments: &JsonObject) -> ToolResponse {
        info!(tool = name, "tool invoked");

        let Some(tool) = ToolName::parse(name) else {
            warn!(tool = name, "unknown tool");
            self.record("<unknown>", false);
            return ToolResponse::error(GraphRagError::UnknownTool(name.to_string()).to_string(), None);
        };

        let context = tool
            .context_key()
            .map(|key| (key, arguments.get(key).cloned().unwrap_or(Value::Null)));

        let result = self
            .validate(tool, arguments)
            .and_then(|()| self.execute(tool, arguments));

        match result {
            Ok(response) => {
                self.record(tool.as_str(), true);
                response
            }
            Err(e) => {
                if is_caller_error(&e) {
                    warn!(%tool, error = %e, "tool call rejected");
                } else {
                    error!(%tool, error = %e, "tool call failed");
                }
                self.record(tool.as_str(), false);
                ToolResponse::error(e.to_string(), context)
            }
        }
    }

    /// Enabled state and required-argument presence. Nothing touches the
    /// graph before this passes.
    fn validate(&self, tool: ToolName, arguments: &JsonObject) -> Result<()> {
        if !self.config.is_tool_enabled(tool.as_str()) {
            return Err(GraphRagError::ToolDisabled(tool.as_str().to_string()));
        }
        let spec = self.catalog.iter().find(|spec| spec.name == tool);
        for argument in spec.map(|s| s.required.as_slice()).unwrap_or_default() {
            if arguments.get(argument).map_or(true, Value::is_null) {
                return Err(GraphRagError::MissingArgument {
                    tool: tool.as_str().to_string(),
                    argument: argument.clone(),
                });
            }
        }
        Ok(())
    }

    fn execute(&self, tool: ToolName, arguments: &JsonObject) -> Result<ToolResponse> {
        let max_entries = self.config.summaries.max_entries;

        match tool {
            ToolName::SearchGraphContext => {
                let args: SearchGraphContextArgs = parse_args(tool, arguments)?;
                let limit = self.config.search_limit(args.limit);
                let store = self.store();
                let nodes = ContextSearch::new(&store).search(&args.query, limit)?;
                Ok(ToolResponse::json(&envelope::context_search_envelope(&args.query, &nodes)))
            }
            ToolName::GetNodeRelationships => {
                let args: NodeRelationshipsArgs = parse_args(tool, arguments)?;
                let store = self.store();
                let relationships = GraphTraversal::new(&store)
                    .neighborhood(&args.node_id, self.config.relationships.limit)?;
                Ok(ToolResponse::json(&envelope::relationships_envelope(
                    &args.node_id,
                    &relationships,
                )))
            }
            ToolName::SaveGraphContext => {
                let args: SaveGraphContextArgs = parse_args(tool, arguments)?;
                let request = SaveRequest {
                    node_type: args.node_type,
                    properties: args.properties,
                    relations: args.relations,
                };
                let store = self.store();
                let outcome = GraphMutation::new(&store).save(&request)?;
                Ok(ToolResponse::json(&envelope::save_envelope(&outcome)))
            }
            ToolName::SearchMovies => {
                let args: SearchMoviesArgs = parse_args(tool, arguments)?;
                let filter = args.into_filter();
                let store = self.store();
                let movies = MovieSearch::new(&store).search(&filter)?;
                Ok(ToolResponse::text(envelope::movie_search_text(&movies, max_entries)))
            }
            ToolName::GetUserPreferences => {
                let args: UserArgs = parse_args(tool, arguments)?;
                let store = self.store();
                let liked = MovieLookup::new(&store).user_preferences(&args.user_name)?;
                Ok(ToolResponse::text(envelope::preferences_text(&args.user_name, &liked)))
            }
            ToolName::RecommendMovies => {
                let args: UserArgs = parse_args(tool, arguments)?;
                let store = self.store();
                let recommendations = GraphRanking::new(&store)
                    .recommend_for_user(&args.user_name, self.config.recommendations.limit)?;
                Ok(ToolResponse::text(envelope::recommendations_text(
                    &args.user_name,
                    &recommendations,
                    max_entries,
                )))
            }
            ToolName::GetMovieDetails => {
                let args: MovieTitleArgs = parse_args(tool, arguments)?;
                let store = self.store();
                let details = MovieLookup::new(&store).movie_details(&args.title)?;
                Ok(ToolResponse::text(envelope::movie_details_text(
                    &args.title,
                    details.as_ref(),
                )))
            }
            ToolName::QueryGraph => {
                let args: QueryGraphArgs = parse_args(tool, arguments)?;
                debug!(statement = %redact_secrets(&args.query), "passthrough statement");
                let store = self.store();
                let rows = store.execute_raw(&args.query, self.config.passthrough.read_only)?;
                Ok(ToolResponse::text(envelope::query_results_text(&rows)))
            }
        }
    }
}

fn is_caller_error(e: &GraphRagError) -> bool {
    matches!(
        e,
        GraphRagError::MissingArgument { .. }
            | GraphRagError::ToolDisabled(_)
            | GraphRagError::InvalidArguments { .. }
            | GraphRagError::InvalidIdentifier { .. }
            | GraphRagError::InvalidProperty { .. }
            | GraphRagError::ReadOnlyViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolOverride;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(GraphStore::new(":memory:"), GraphRagConfig::default())
    }

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    fn body(response: &ToolResponse) -> Value {
        serde_json::from_str(&response.text).unwrap()
    }

    #[test]
    fn catalog_lists_every_tool_once() {
        let catalog = tool_catalog();
        let names: Vec<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "search_graph_context",
                "get_node_relationships",
                "save_graph_context",
                "search_movies",
                "get_user_preferences",
                "recommend_movies",
                "get_movie_details",
                "query_graph",
            ]
        );
        for spec in &catalog {
            assert_eq!(spec.input_schema.get("type"), Some(&json!("object")));
            assert!(spec.input_schema.get("$schema").is_none());
        }
    }

    #[test_case(ToolName::SearchGraphContext, &["query"])]
    #[test_case(ToolName::GetNodeRelationships, &["node_id"])]
    #[test_case(ToolName::SaveGraphContext, &["properties", "type"])]
    #[test_case(ToolName::SearchMovies, &[])]
    #[test_case(ToolName::GetUserPreferences, &["user_name"])]
    #[test_case(ToolName::RecommendMovies, &["user_name"])]
    #[test_case(ToolName::GetMovieDetails, &["title"])]
    #[test_case(ToolName::QueryGraph, &["query"])]
    fn required_arguments(tool: ToolName, expected: &[&str]) {
        let catalog = tool_catalog();
        let spec = catalog.iter().find(|s| s.name == tool).unwrap();
        let mut required = spec.required.clone();
        required.sort();
        assert_eq!(required, expected.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    #[test_case("search_graph_context", json!({}), "query")]
    #[test_case("get_node_relationships", json!({"node_id": null}), "node_id")]
    #[test_case("save_graph_context", json!({"type": "Concept"}), "properties")]
    #[test_case("get_user_preferences", json!({}), "user_name")]
    #[test_case("recommend_movies", json!({"name": "Alice"}), "user_name")]
    #[test_case("get_movie_details", json!({}), "title")]
    #[test_case("query_graph", json!({}), "query")]
    fn missing_argument_rejected_before_graph_access(tool: &str, arguments: Value, argument: &str) {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch(tool, &args(arguments));
        assert!(response.is_error);
        let error = body(&response)["error"].as_str().unwrap().to_string();
        assert!(error.contains(argument), "{error}");
        assert!(!dispatcher.with_store(|s| s.is_connected()));
    }

    #[test]
    fn unknown_tool_names_the_tool() {
        let dispatcher = dispatcher();
        let response = dispatcher.dispatch("delete_everything", &JsonObject::new());
        assert!(response.is_error);
        assert_eq!(
            body(&response),
            json!({"error": "Unknown tool: delete_everything", "status": "error"})
        );
        assert!(!dispatcher.with_store(|s| s.is_connected()));
        assert_eq!(dispatcher.metrics().failed_calls, 1);
    }

    #[test]
    fn disabled_tool_is_refused_and_hidden() {
        let mut config = GraphRagConfig::default();
        config
            .tools
            .overrides
            .insert("query_graph".into(), ToolOverride::disabled("no raw access"));
        let dispatcher = ToolDispatcher::new(GraphStore::new(":memory:"), config);

        assert!(dispatcher
            .enabled_tools()
            .all(|spec| spec.name != ToolName::QueryGraph));
        assert_eq!(dispatcher.enabled_tools().count(), 7);

        let response = dispatcher.dispatch("query_graph", &args(json!({"query": "SELECT 1"})));
        assert!(response.is_error);
        assert!(response.text.contains("disabled"));
    }

    #[test]
    fn wrong_argument_type_is_an_error_envelope() {
        let response = dispatcher().dispatch(
            "search_graph_context",
            &args(json!({"query": "graph", "limit": "many"})),
        );
        assert!(response.is_error);
        let value = body(&response);
        assert_eq!(value["query"], json!("graph"));
        assert_eq!(value["status"], json!("error"));
    }

    #[test]
    fn search_envelope_shape() {
        let dispatcher = dispatcher();
        dispatcher.dispatch(
            "save_graph_context",
            &args(json!({"type": "Concept", "properties": {"name": "GraphRAG"}})),
        );
        let response =
            dispatcher.dispatch("search_graph_context", &args(json!({"query": "graphrag"})));
        assert!(!response.is_error);
        let value = body(&response);
        assert_eq!(value["found"], json!(1));
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["results"][0]["type"], json!(["Concept"]));
        assert_eq!(value["results"][0]["properties"]["name"], json!("GraphRAG"));
    }

    #[test]
    fn node_id_accepts_numbers() {
        let response =
            dispatcher().dispatch("get_node_relationships", &args(json!({"node_id": 42})));
        assert!(!response.is_error);
        assert_eq!(
            body(&response),
            json!({"node_id": "42", "relationships": [], "count": 0, "status": "success"})
        );
    }

    #[test]
    fn read_only_passthrough_rejects_writes() {
        let mut config = GraphRagConfig::default();
        config.passthrough.read_only = true;
        let dispatcher = ToolDispatcher::new(GraphStore::new(":memory:"), config);

        let response = dispatcher.dispatch("query_graph", &args(json!({"query": "DELETE FROM nodes"})));
        assert!(response.is_error);

        let response = dispatcher.dispatch(
            "query_graph",
            &args(json!({"query": "SELECT COUNT(*) AS n FROM nodes"})),
        );
        assert!(!response.is_error);
        assert!(response.text.starts_with("Query results (1 rows):"));
    }

    #[test]
    fn engine_errors_become_envelopes() {
        let response = dispatcher().dispatch("query_graph", &args(json!({"query": "SELEKT nope"})));
        assert!(response.is_error);
        assert_eq!(body(&response)["status"], json!("error"));
    }

    #[test]
    fn closed_store_answers_with_error() {
        let dispatcher = dispatcher();
        dispatcher.close();
        let response = dispatcher.dispatch("search_movies", &JsonObject::new());
        assert!(response.is_error);
        assert!(response.text.contains("closed"));
    }

    #[test]
    fn empty_filters_are_ignored() {
        let filter = SearchMoviesArgs {
            genre: Some(String::new()),
            actor: Some("Keanu".into()),
            director: None,
            min_rating: Some(0.0),
        }
        .into_filter();
        assert_eq!(
            filter,
            MovieFilter {
                actor: Some("Keanu".into()),
                ..MovieFilter::default()
            }
        );
    }
}
