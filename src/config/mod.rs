//! Configuration system: YAML files, environment variables, CLI flags.

pub mod loader;
pub mod schema;

pub use loader::{load_config, CliOverrides};
pub use schema::{GraphRagConfig, ToolOverride};
