//! Logging setup, redaction of logged statements, and tool-call metrics.
//!
//! - [`init_logging`]: one-time subscriber setup with `RUST_LOG` support
//! - [`redact_secrets`]: masks literals and credentials before a statement is logged
//! - [`CallMetrics`]: per-tool invocation counters

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `graphrag=info`. Output goes to stderr because stdout carries
/// the MCP stdio transport. Subsequent calls are ignored.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graphrag=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}

fn redaction_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (
                r#"(?i)(api[_-]?key|password|passwd|secret|token)\s*[:=]\s*['"]?[^\s'",;]{6,}['"]?"#,
                "$1=***REDACTED***",
            ),
            (r"(?i)Bearer\s+[a-zA-Z0-9_\-\.]{20,}", "Bearer ***REDACTED***"),
            // SQL string literals, with '' as the escaped quote
            (r"'(?:[^']|'')*'", "'***'"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Redact credentials and string literals from text that is about to be
/// logged. Used for caller-supplied passthrough statements.
pub fn redact_secrets(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in redaction_patterns() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

/// Counters for tool invocations since process start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallMetrics {
    pub total_calls: u64,
    pub failed_calls: u64,
    pub per_tool: BTreeMap<String, u64>,
}

impl CallMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tool: &str, ok: bool) {
        self.total_calls += 1;
        if !ok {
            self.failed_calls += 1;
        }
        *self.per_tool.entry(tool.to_string()).or_insert(0) += 1;
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.failed_calls as f64 / self.total_calls as f64
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "total_calls": self.total_calls,
            "failed_calls": self.failed_calls,
            "error_rate": self.error_rate(),
            "per_tool": self.per_tool,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
