//! SQLite schema for the property graph.
//!
//! Nodes hold a JSON array of labels and a JSON object of properties;
//! edges hold a single type name plus their own property object. All
//! label and property lookups go through SQLite's JSON1 functions.

use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

// ---------------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------------

const CREATE_NODES: &str = "\
CREATE TABLE IF NOT EXISTS nodes (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  labels TEXT NOT NULL DEFAULT '[]' CHECK (json_valid(labels)),
  properties TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(properties))
)";

const CREATE_EDGES: &str = "\
CREATE TABLE IF NOT EXISTS edges (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  source_id INTEGER NOT NULL,
  target_id INTEGER NOT NULL,
  type TEXT NOT NULL,
  properties TEXT NOT NULL DEFAULT '{}' CHECK (json_valid(properties)),
  FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
  FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
)";

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id, type)",
    "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id, type)",
    "CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type)",
];

/// Default wait on a locked database before giving up.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Open (or create) the graph database at `db_path` and apply the schema.
///
/// The returned connection has WAL mode and synchronous NORMAL configured.
/// Foreign keys stay OFF: relation creation checks both endpoints itself,
/// and a reset deletes edges before nodes.
pub fn initialize_database(db_path: &str) -> rusqlite::Result<Connection> {
    initialize_database_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT)
}

/// [`initialize_database`] with an explicit busy timeout.
pub fn initialize_database_with_timeout(
    db_path: &str,
    busy_timeout: Duration,
) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "OFF")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(busy_timeout)?;
    register_functions(&conn)?;

    conn.execute_batch(CREATE_NODES)?;
    conn.execute_batch(CREATE_EDGES)?;
    for ddl in CREATE_INDEXES {
        conn.execute_batch(ddl)?;
    }

    Ok(conn)
}

/// `fold_case(text)`: Unicode lowercase for case-insensitive matching.
/// SQLite's built-in `lower()` only folds ASCII.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        initialize_database(":memory:").expect("schema creation should succeed on :memory:")
    }

    fn object_exists(conn: &Connection, obj_type: &str, obj_name: &str) -> bool {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2",
                rusqlite::params![obj_type, obj_name],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }

    #[test]
    fn core_tables_exist() {
        let conn = setup();
        for table in &["nodes", "edges"] {
            assert!(object_exists(&conn, "table", table), "table '{table}' should exist");
        }
    }

    #[test]
    fn indexes_exist() {
        let conn = setup();
        for idx in &["idx_edges_source", "idx_edges_target", "idx_edges_type"] {
            assert!(object_exists(&conn, "index", idx), "index '{idx}' should exist");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let path = path.to_str().unwrap();

        drop(initialize_database(path).unwrap());
        let conn = initialize_database(path).expect("re-opening an existing graph should succeed");
        assert!(object_exists(&conn, "table", "nodes"));
    }

    #[test]
    fn pragmas_are_set() {
        let conn = setup();

        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert!(
            journal_mode == "wal" || journal_mode == "memory",
            "journal_mode should be 'wal' or 'memory', got '{journal_mode}'"
        );

        let fk: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 0);

        let sync: i64 = conn
            .pragma_query_value(None, "synchronous", |row| row.get(0))
            .unwrap();
        assert_eq!(sync, 1, "synchronous should be NORMAL (1)");
    }

    #[test]
    fn fold_case_handles_non_ascii() {
        let conn = setup();
        let folded: String = conn
            .query_row("SELECT fold_case('ÖKOSYSTEM Amélie')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(folded, "ökosystem amélie");

        let null: Option<String> = conn
            .query_row("SELECT fold_case(NULL)", [], |row| row.get(0))
            .unwrap();
        assert_eq!(null, None);
    }

    #[test]
    fn rejects_malformed_json_columns() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO nodes (labels, properties) VALUES ('not json', '{}')",
            [],
        );
        assert!(result.is_err(), "labels must be valid JSON");
    }

    #[test]
    fn json1_label_lookup_works() {
        let conn = setup();
        conn.execute(
            "INSERT INTO nodes (labels, properties) VALUES ('[\"Movie\"]', '{\"title\":\"Arrival\"}')",
            [],
        )
        .unwrap();

        let title: String = conn
            .query_row(
                "SELECT json_extract(n.properties, '$.title') FROM nodes n
                 WHERE EXISTS (SELECT 1 FROM json_each(n.labels) WHERE value = 'Movie')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(title, "Arrival");
    }
}
