//! Graph store adapter.
//!
//! Owns the single engine connection. The connection is established
//! lazily on first use and reused afterwards; once [`GraphStore::close`]
//! runs, every later call fails with [`GraphRagError::ConnectionClosed`].
//! All queries go through [`Connection::prepare_cached`] except
//! passthrough SQL, which is caller-authored and not worth caching.

use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::time::Duration;

use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::db::converters::{row_to_graph_node, row_to_record};
use crate::db::schema::{initialize_database_with_timeout, DEFAULT_BUSY_TIMEOUT};
use crate::error::{GraphRagError, Result};
use crate::graph::query::{self, Statement};
use crate::types::{GraphNode, NodeId, Properties, Record};

// ---------------------------------------------------------------------------
// GraphStats
// ---------------------------------------------------------------------------

/// Aggregate statistics about the stored graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub labels: BTreeMap<String, usize>,
    pub relationship_types: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// GraphStore
// ---------------------------------------------------------------------------

pub struct GraphStore {
    db_path: String,
    busy_timeout: Duration,
    conn: OnceCell<Connection>,
    closed: bool,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("db_path", &self.db_path)
            .field("connected", &self.is_connected())
            .field("closed", &self.closed)
            .finish()
    }
}

const STATS_LABELS_SQL: &str = "\
SELECT l.value AS label, COUNT(*) AS n
FROM nodes n, json_each(n.labels) l
GROUP BY l.value
ORDER BY l.value";

const STATS_TYPES_SQL: &str = "\
SELECT type, COUNT(*) AS n FROM edges GROUP BY type ORDER BY type";

const GET_NODE_SQL: &str = "SELECT id, labels, properties FROM nodes WHERE id = ?1";

impl GraphStore {
    /// Create a store for `db_path` without connecting yet.
    pub fn new(db_path: &str) -> Self {
        Self {
            db_path: db_path.to_string(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            conn: OnceCell::new(),
            closed: false,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Create a store and connect immediately, surfacing open errors early.
    pub fn open(db_path: &str) -> Result<Self> {
        let store = Self::new(db_path);
        store.connection()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub fn is_connected(&self) -> bool {
        self.conn.get().is_some()
    }

    /// The live connection, opening it on first use.
    pub fn connection(&self) -> Result<&Connection> {
        if self.closed {
            return Err(GraphRagError::ConnectionClosed);
        }
        if let Some(conn) = self.conn.get() {
            return Ok(conn);
        }
        let conn = initialize_database_with_timeout(&self.db_path, self.busy_timeout)?;
        info!(db_path = %self.db_path, "graph connection established");
        Ok(self.conn.get_or_init(|| conn))
    }

    /// Release the connection. Later calls fail rather than reconnect.
    pub fn close(&mut self) {
        self.closed = true;
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => info!(db_path = %self.db_path, "graph connection closed"),
                Err((_, e)) => warn!(error = %e, "graph connection did not close cleanly"),
            }
        }
    }

    // -------------------------------------------------------------------
    // Query execution
    // -------------------------------------------------------------------

    /// Run `statement` and map every row with `f`.
    pub fn query<T, F>(&self, statement: &Statement, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(&statement.sql)?;
        let rows = stmt.query_map(params_from_iter(statement.params.iter()), f)?;
        let collected = rows.collect::<rusqlite::Result<Vec<T>>>()?;
        debug!(rows = collected.len(), "statement executed");
        Ok(collected)
    }

    /// Run caller-authored SQL verbatim. With `read_only`, statements that
    /// would modify the database are refused before they run.
    pub fn execute_raw(&self, sql: &str, read_only: bool) -> Result<Vec<Record>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        if read_only && !stmt.readonly() {
            return Err(GraphRagError::ReadOnlyViolation);
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt.query_map([], |row| row_to_record(row, &columns))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Run `f` inside a transaction; commit on `Ok`, roll back on `Err`.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.connection()?.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // -------------------------------------------------------------------
    // Node / edge helpers
    // -------------------------------------------------------------------

    pub fn create_node(&self, labels: &[String], properties: &Properties) -> Result<NodeId> {
        insert_node(self.connection()?, labels, properties)
    }

    /// Link two existing nodes. Returns `false` when either endpoint is
    /// missing, in which case nothing is written.
    pub fn create_relationship(
        &self,
        from: NodeId,
        to: NodeId,
        rel_type: &str,
        properties: &Properties,
    ) -> Result<bool> {
        insert_relationship(self.connection()?, from, to, rel_type, properties)
    }

    pub fn get_node(&self, id: NodeId) -> Result<Option<GraphNode>> {
        let statement = Statement::new(GET_NODE_SQL, vec![rusqlite::types::Value::Integer(id.0)]);
        Ok(self.query(&statement, row_to_graph_node)?.into_iter().next())
    }

    /// First node labelled `label` whose property `key` equals `value`.
    pub fn find_node(&self, label: &str, key: &str, value: &Value) -> Result<Option<NodeId>> {
        let statement = query::find_node(label, key, value);
        let ids = self.query(&statement, |row| row.get::<_, i64>("id"))?;
        Ok(ids.into_iter().next().map(NodeId))
    }

    // -------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------

    pub fn get_stats(&self) -> Result<GraphStats> {
        let conn = self.connection()?;
        let nodes: i64 = conn.query_row("SELECT count(*) FROM nodes", [], |row| row.get(0))?;
        let edges: i64 = conn.query_row("SELECT count(*) FROM edges", [], |row| row.get(0))?;

        let mut labels = BTreeMap::new();
        let mut stmt = conn.prepare_cached(STATS_LABELS_SQL)?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (label, n) = row?;
            labels.insert(label, count_to_usize(n));
        }

        let mut relationship_types = BTreeMap::new();
        let mut stmt = conn.prepare_cached(STATS_TYPES_SQL)?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (rel_type, n) = row?;
            relationship_types.insert(rel_type, count_to_usize(n));
        }

        Ok(GraphStats {
            nodes: count_to_usize(nodes),
            edges: count_to_usize(edges),
            labels,
            relationship_types,
        })
    }

    /// Delete every node and edge.
    pub fn clear(&self) -> Result<()> {
        self.transaction(|conn| {
            conn.execute("DELETE FROM edges", [])?;
            conn.execute("DELETE FROM nodes", [])?;
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Connection-level helpers (usable inside transactions)
// ---------------------------------------------------------------------------

pub(crate) fn write_on(conn: &Connection, statement: &Statement) -> Result<usize> {
    let mut stmt = conn.prepare_cached(&statement.sql)?;
    Ok(stmt.execute(params_from_iter(statement.params.iter()))?)
}

pub(crate) fn insert_node(
    conn: &Connection,
    labels: &[String],
    properties: &Properties,
) -> Result<NodeId> {
    write_on(conn, &query::create_node(labels, properties))?;
    Ok(NodeId(conn.last_insert_rowid()))
}

pub(crate) fn insert_relationship(
    conn: &Connection,
    from: NodeId,
    to: NodeId,
    rel_type: &str,
    properties: &Properties,
) -> Result<bool> {
    let affected = write_on(conn, &query::create_relationship(from, to, rel_type, properties))?;
    Ok(affected > 0)
}

/// SQLite counts are never negative; anything unrepresentable reads as 0.
fn count_to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
