use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use graphrag_mcp::config::{load_config, CliOverrides, GraphRagConfig};
use graphrag_mcp::mcp::dispatch::JsonObject;
use graphrag_mcp::mcp::ToolDispatcher;
use graphrag_mcp::observability::init_logging;
use graphrag_mcp::seed::{seed_concepts, seed_movies, SeedSummary};

#[derive(Parser)]
#[command(name = "graphrag-mcp")]
#[command(version, about = "GraphRAG MCP server over an embedded property graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (stdio transport)
    Serve {
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Reject query_graph statements that modify the graph
        #[arg(long)]
        read_only_queries: bool,
    },
    /// Load a sample dataset
    Seed {
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Dataset::All)]
        dataset: Dataset,
        /// Delete every node and edge first
        #[arg(long)]
        reset: bool,
    },
    /// Free-text search over node properties
    Search {
        /// Search text
        query: String,
        /// Maximum results
        #[arg(short = 'n', long)]
        limit: Option<u64>,
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Invoke any tool through the dispatcher
    Call {
        /// Tool name (e.g. recommend_movies)
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Show node, edge and label counts
    Stats {
        /// Database path (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Dataset {
    Movies,
    Concepts,
    All,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            db,
            read_only_queries,
        } => {
            cmd_serve(resolve_config(db, read_only_queries));
        }
        Commands::Seed { db, dataset, reset } => {
            cmd_seed(resolve_config(db, false), dataset, reset);
        }
        Commands::Search { query, limit, db } => {
            cmd_search(resolve_config(db, false), &query, limit);
        }
        Commands::Call { tool, args, db } => {
            cmd_call(resolve_config(db, false), &tool, &args);
        }
        Commands::Stats { db } => {
            cmd_stats(resolve_config(db, false));
        }
    }
}

// ---------------------------------------------------------------------------
// CLI command implementations
// ---------------------------------------------------------------------------

fn resolve_config(db: Option<PathBuf>, read_only_queries: bool) -> GraphRagConfig {
    let cli = CliOverrides {
        db_path: db,
        read_only_queries,
    };
    let project_dir = std::env::current_dir().ok();
    load_config(&cli, project_dir.as_deref())
}

fn open_dispatcher(config: GraphRagConfig) -> ToolDispatcher {
    let db_path = config.database.path.as_str();
    if db_path != ":memory:" {
        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                eprintln!("Error: cannot create {}: {}", parent.display(), e);
                process::exit(1);
            });
        }
    }
    ToolDispatcher::from_config(config)
}

fn cmd_serve(config: GraphRagConfig) {
    let dispatcher = Arc::new(open_dispatcher(config));

    // Build a minimal tokio runtime for the MCP server
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: cannot create async runtime: {}", e);
            process::exit(1);
        });

    rt.block_on(async {
        if let Err(e) = graphrag_mcp::mcp::run_server(dispatcher).await {
            eprintln!("Error: MCP server failed: {}", e);
            process::exit(1);
        }
    });
}

fn cmd_seed(config: GraphRagConfig, dataset: Dataset, reset: bool) {
    let dispatcher = open_dispatcher(config);
    let result = dispatcher.with_store(|store| {
        if reset {
            store.clear()?;
        }
        let mut summary = SeedSummary::default();
        if matches!(dataset, Dataset::Movies | Dataset::All) {
            summary = summary + seed_movies(store)?;
        }
        if matches!(dataset, Dataset::Concepts | Dataset::All) {
            summary = summary + seed_concepts(store)?;
        }
        Ok::<_, graphrag_mcp::error::GraphRagError>(summary)
    });

    match result {
        Ok(summary) => println!("Seeded {} nodes and {} edges.", summary.nodes, summary.edges),
        Err(e) => {
            eprintln!("Error: seeding failed: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_search(config: GraphRagConfig, query: &str, limit: Option<u64>) {
    let mut arguments = JsonObject::new();
    arguments.insert("query".into(), Value::String(query.to_string()));
    if let Some(limit) = limit {
        arguments.insert("limit".into(), json!(limit));
    }
    run_tool(config, "search_graph_context", &arguments);
}

fn cmd_call(config: GraphRagConfig, tool: &str, raw_args: &str) {
    let arguments = match serde_json::from_str::<Value>(raw_args) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            eprintln!("Error: --args must be a JSON object");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: invalid --args JSON: {}", e);
            process::exit(2);
        }
    };
    run_tool(config, tool, &arguments);
}

fn run_tool(config: GraphRagConfig, tool: &str, arguments: &JsonObject) {
    let dispatcher = open_dispatcher(config);
    let response = dispatcher.dispatch(tool, arguments);
    dispatcher.close();
    println!("{}", response.text);
    if response.is_error {
        process::exit(1);
    }
}

fn cmd_stats(config: GraphRagConfig) {
    let dispatcher = open_dispatcher(config);
    let db_path = dispatcher.config().database.path.clone();
    match dispatcher.with_store(|store| store.get_stats()) {
        Ok(stats) => {
            println!("Database: {}", db_path);
            println!("  Nodes: {}", stats.nodes);
            println!("  Edges: {}", stats.edges);
            if !stats.labels.is_empty() {
                println!("  Labels:");
                for (label, count) in &stats.labels {
                    println!("    {:<12} {}", label, count);
                }
            }
            if !stats.relationship_types.is_empty() {
                println!("  Relationship types:");
                for (rel_type, count) in &stats.relationship_types {
                    println!("    {:<12} {}", rel_type, count);
                }
            }
        }
        Err(e) => {
            eprintln!("Error: cannot read stats: {}", e);
            process::exit(1);
        }
    }
}
