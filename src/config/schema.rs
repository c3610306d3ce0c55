//! Configuration data structures.
//!
//! Defines the YAML config format: database location, result limits,
//! passthrough policy and per-tool overrides. Every section has serde
//! defaults so a partial file is always valid.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the GraphRAG server.
///
/// Loaded from YAML files, environment variables, and CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRagConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub relationships: RelationshipsConfig,

    #[serde(default)]
    pub recommendations: RecommendationsConfig,

    #[serde(default)]
    pub summaries: SummaryConfig,

    #[serde(default)]
    pub passthrough: PassthroughConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for GraphRagConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            search: SearchConfig::default(),
            relationships: RelationshipsConfig::default(),
            recommendations: RecommendationsConfig::default(),
            summaries: SummaryConfig::default(),
            passthrough: PassthroughConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl GraphRagConfig {
    /// Check whether a specific tool is enabled (defaults to true).
    pub fn is_tool_enabled(&self, tool_name: &str) -> bool {
        self.tools
            .overrides
            .get(tool_name)
            .map(|o| o.enabled)
            .unwrap_or(true)
    }

    /// Resolve a caller-requested search limit: default when absent, never
    /// above `search.max_limit`.
    pub fn search_limit(&self, requested: Option<u64>) -> usize {
        let requested = requested
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .unwrap_or(self.search.default_limit);
        requested.min(self.search.max_limit)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite graph file (`:memory:` for a throwaway graph).
    #[serde(default = "default_db_path")]
    pub path: String,

    /// How long to wait on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,

    /// Hard ceiling on any requested limit.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipsConfig {
    #[serde(default = "default_relationships_limit")]
    pub limit: usize,
}

impl Default for RelationshipsConfig {
    fn default() -> Self {
        Self {
            limit: default_relationships_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    #[serde(default = "default_recommendations_limit")]
    pub limit: usize,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            limit: default_recommendations_limit(),
        }
    }
}

/// Human-readable summaries list at most this many entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Policy for the raw `query_graph` tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassthroughConfig {
    /// Refuse statements that would modify the graph.
    #[serde(default)]
    pub read_only: bool,
}

// ---------------------------------------------------------------------------
// ToolsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Individual tool overrides (enable/disable specific tools).
    #[serde(default)]
    pub overrides: HashMap<String, ToolOverride>,
}

/// Override the enabled state of a single tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOverride {
    pub enabled: bool,

    /// Human-readable reason for the override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ToolOverride {
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            enabled: false,
            reason: Some(reason.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_db_path() -> String {
    ".graphrag/graph.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_search_limit() -> usize {
    5
}

fn default_max_limit() -> usize {
    100
}

fn default_relationships_limit() -> usize {
    20
}

fn default_recommendations_limit() -> usize {
    5
}

fn default_max_entries() -> usize {
    5
}
