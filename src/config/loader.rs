//! Multi-source config loading with priority merging.
//!
//! Priority order (highest wins):
//!   CLI flags > Environment vars > Project config > User config > Defaults

use std::path::{Path, PathBuf};

use tracing::warn;

use super::schema::{GraphRagConfig, ToolOverride};

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = ".graphrag.yaml";

/// Settings supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub db_path: Option<PathBuf>,
    pub read_only_queries: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load configuration from all available sources and merge them.
///
/// Sources (low → high priority):
///   1. Built-in defaults
///   2. User config (`<config dir>/graphrag/config.yaml`)
///   3. Project config (`.graphrag.yaml` in `project_dir`)
///   4. Environment variables (`GRAPHRAG_DB_PATH`, `GRAPHRAG_DISABLED_TOOLS`, ...)
///   5. CLI flags
pub fn load_config(cli: &CliOverrides, project_dir: Option<&Path>) -> GraphRagConfig {
    let mut config = GraphRagConfig::default();

    if let Some(user) = load_user_config() {
        config = merge_configs(config, user);
    }

    if let Some(dir) = project_dir {
        if let Some(project) = load_project_config(dir) {
            config = merge_configs(config, project);
        }
    }

    load_env_overrides(&mut config);
    apply_cli_overrides(&mut config, cli);
    config
}

/// Load user config from the platform-specific config directory.
pub fn load_user_config() -> Option<GraphRagConfig> {
    let path = user_config_path()?;
    load_config_file(&path)
}

/// Load project config from `.graphrag.yaml` in the given directory.
pub fn load_project_config(dir: &Path) -> Option<GraphRagConfig> {
    load_config_file(&dir.join(PROJECT_CONFIG_FILE))
}

/// Apply environment variable overrides.
///
/// Supported variables:
/// - `GRAPHRAG_DB_PATH`: graph database path
/// - `GRAPHRAG_DISABLED_TOOLS`: comma-separated tool names to disable
/// - `GRAPHRAG_READ_ONLY_QUERIES`: `1`/`true`/`yes` makes `query_graph` read-only
/// - `GRAPHRAG_SEARCH_LIMIT`: default free-text search limit
pub fn load_env_overrides(config: &mut GraphRagConfig) {
    apply_env(config, |key| std::env::var(key).ok());
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn apply_env(config: &mut GraphRagConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup("GRAPHRAG_DB_PATH").filter(|p| !p.trim().is_empty()) {
        config.database.path = path;
    }

    if let Some(val) = lookup("GRAPHRAG_DISABLED_TOOLS") {
        for name in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            config.tools.overrides.insert(
                name.to_string(),
                ToolOverride::disabled("Disabled via GRAPHRAG_DISABLED_TOOLS"),
            );
        }
    }

    if let Some(val) = lookup("GRAPHRAG_READ_ONLY_QUERIES") {
        config.passthrough.read_only = matches!(val.trim(), "1" | "true" | "yes");
    }

    if let Some(val) = lookup("GRAPHRAG_SEARCH_LIMIT") {
        match val.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => config.search.default_limit = limit,
            _ => warn!(value = %val, "ignoring invalid GRAPHRAG_SEARCH_LIMIT"),
        }
    }
}

fn apply_cli_overrides(config: &mut GraphRagConfig, cli: &CliOverrides) {
    if let Some(path) = &cli.db_path {
        config.database.path = path.to_string_lossy().into_owned();
    }
    if cli.read_only_queries {
        config.passthrough.read_only = true;
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "graphrag", "graphrag")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Try to load and parse a YAML config file. Missing files are silent;
/// unparseable ones are logged and skipped.
fn load_config_file(path: &Path) -> Option<GraphRagConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

/// Merge two configs: `overlay` fields that differ from the defaults win.
fn merge_configs(mut base: GraphRagConfig, overlay: GraphRagConfig) -> GraphRagConfig {
    let defaults = GraphRagConfig::default();

    if overlay.version != defaults.version {
        base.version = overlay.version;
    }
    if overlay.database.path != defaults.database.path {
        base.database.path = overlay.database.path;
    }
    if overlay.database.busy_timeout_ms != defaults.database.busy_timeout_ms {
        base.database.busy_timeout_ms = overlay.database.busy_timeout_ms;
    }
    if overlay.search.default_limit != defaults.search.default_limit {
        base.search.default_limit = overlay.search.default_limit;
    }
    if overlay.search.max_limit != defaults.search.max_limit {
        base.search.max_limit = overlay.search.max_limit;
    }
    if overlay.relationships.limit != defaults.relationships.limit {
        base.relationships.limit = overlay.relationships.limit;
    }
    if overlay.recommendations.limit != defaults.recommendations.limit {
        base.recommendations.limit = overlay.recommendations.limit;
    }
    if overlay.summaries.max_entries != defaults.summaries.max_entries {
        base.summaries.max_entries = overlay.summaries.max_entries;
    }
    if overlay.passthrough.read_only {
        base.passthrough.read_only = true;
    }

    // Tool overrides: overlay keys win
    for (name, ov) in overlay.tools.overrides {
        base.tools.overrides.insert(name, ov);
    }

    base
}
