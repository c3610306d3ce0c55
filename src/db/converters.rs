//! Row-to-record converters for graph queries.
//!
//! Turns raw `rusqlite::Row` values into the domain types in
//! `crate::types`, decoding the JSON label/property columns on the way.

use rusqlite::types::{FromSqlError, Type, ValueRef};
use rusqlite::Row;
use serde_json::Value;

use crate::types::{ConnectedNode, GraphNode, NodeId, Properties, Record, Relationship};

// ---------------------------------------------------------------------------
// Scalar conversion
// ---------------------------------------------------------------------------

/// Convert one SQLite cell into a JSON value.
///
/// Non-finite reals become `null`; blobs are summarised rather than
/// dumped since they have no JSON form.
pub fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob: {} bytes>", bytes.len())),
    }
}

/// Text form of a scalar used as a display name (actor, genre, user).
/// `null` yields `None` so absent names never enter aggregated lists.
pub fn value_to_name(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_json_column<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|e| {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

// ---------------------------------------------------------------------------
// Node / relationship conversion
// ---------------------------------------------------------------------------

/// Convert a row with columns `id, labels, properties` into a [`GraphNode`].
pub fn row_to_graph_node(row: &Row<'_>) -> rusqlite::Result<GraphNode> {
    let id: i64 = row.get("id")?;
    let labels: Vec<String> = parse_json_column(row, "labels")?;
    let properties: Properties = parse_json_column(row, "properties")?;

    Ok(GraphNode {
        id: NodeId(id),
        labels,
        properties,
    })
}

/// Convert a row with columns `relation_type, labels, properties` into a
/// [`Relationship`] seen from the queried node.
pub fn row_to_relationship(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    let rel_type: String = row.get("relation_type")?;
    let labels: Vec<String> = parse_json_column(row, "labels")?;
    let properties: Properties = parse_json_column(row, "properties")?;

    Ok(Relationship {
        rel_type,
        connected_node: ConnectedNode { labels, properties },
    })
}

/// Convert an arbitrary result row into a column-name keyed [`Record`].
///
/// Column values stay as SQLite returned them; no JSON decoding happens
/// here, so a passthrough query sees exactly what the engine produced.
pub fn row_to_record(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (idx, name) in columns.iter().enumerate() {
        record.insert(name.clone(), value_ref_to_json(row.get_ref(idx)?));
    }
    Ok(record)
}

/// Read a column as JSON, whatever its storage class.
pub fn column_json(row: &Row<'_>, column: &str) -> rusqlite::Result<Value> {
    Ok(value_ref_to_json(row.get_ref(column)?))
}

/// Read an optional text column that must be a string when present.
pub fn column_opt_text(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<String>> {
    match row.get_ref(column)? {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => Ok(Some(String::from_utf8_lossy(bytes).into_owned())),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            row.as_ref().column_index(column).unwrap_or(0),
            other.data_type(),
            Box::new(FromSqlError::InvalidType),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
