//! Core domain types for the GraphRAG server.
//!
//! Nodes carry a set of labels plus an open property map; edges carry a
//! single type name. Everything that crosses the tool boundary serializes
//! into the shapes documented on each type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{GraphRagError, Result};

/// Open property map attached to nodes and edges.
pub type Properties = serde_json::Map<String, Value>;

/// One projected result row: column name to value.
pub type Record = serde_json::Map<String, Value>;

/// Default relationship type for `save_graph_context` relations.
pub const DEFAULT_RELATION_TYPE: &str = "RELATED_TO";

/// Longest accepted label or relationship-type name.
pub const MAX_IDENTIFIER_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

/// Opaque node identifier. Rendered to callers as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub i64);

impl NodeId {
    /// Parse a caller-supplied id. Anything that is not a decimal integer
    /// simply identifies no node.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse::<i64>().map(NodeId)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Graph records
// ---------------------------------------------------------------------------

/// A node as returned by free-text search: `{id, type, properties}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// The far endpoint of a relationship, without its id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectedNode {
    #[serde(rename = "type")]
    pub labels: Vec<String>,
    pub properties: Properties,
}

/// One edge incident to a node, seen from that node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub connected_node: ConnectedNode,
}

/// A requested edge from a freshly created node to an existing one.
#[derive(Debug, Clone, PartialEq, Deserialize, schemars::JsonSchema)]
pub struct RelationSpec {
    /// Id of the existing node to link to.
    #[serde(deserialize_with = "deserialize_loose_id")]
    #[schemars(with = "String")]
    pub target_id: String,
    /// Relationship type (default: RELATED_TO).
    #[serde(rename = "type", default = "default_relation_type")]
    pub rel_type: String,
}

fn default_relation_type() -> String {
    DEFAULT_RELATION_TYPE.to_string()
}

/// Accept ids sent either as strings or as bare integers.
pub(crate) fn deserialize_loose_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "target_id must be a string or integer, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    Created,
    Skipped,
}

/// What happened to one requested relation during a save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationOutcome {
    pub target_id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub status: RelationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Identifier and property validation
// ---------------------------------------------------------------------------

/// Check that a label or relationship type is a plain identifier.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && value.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(GraphRagError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Properties must be scalars or flat lists of scalars.
pub fn validate_properties(properties: &Properties) -> Result<()> {
    for (key, value) in properties {
        if key.is_empty() {
            return Err(GraphRagError::InvalidProperty {
                key: key.clone(),
                reason: "property names must not be empty".into(),
            });
        }
        match value {
            Value::Object(_) => {
                return Err(GraphRagError::InvalidProperty {
                    key: key.clone(),
                    reason: "nested objects are not supported".into(),
                })
            }
            Value::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
                return Err(GraphRagError::InvalidProperty {
                    key: key.clone(),
                    reason: "lists may only contain scalar values".into(),
                })
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("Concept" ; "pascal case")]
    #[test_case("RELATED_TO" ; "upper snake")]
    #[test_case("_internal" ; "leading underscore")]
    #[test_case("Label2" ; "trailing digit")]
    fn accepts_plain_identifiers(value: &str) {
        assert!(validate_identifier("label", value).is_ok());
    }

    #[test_case("" ; "empty")]
    #[test_case("2Fast" ; "leading digit")]
    #[test_case("Bad Label" ; "space")]
    #[test_case("X`) DETACH DELETE (n" ; "injection attempt")]
    #[test_case("Über" ; "non ascii")]
    fn rejects_unsafe_identifiers(value: &str) {
        let err = validate_identifier("label", value).unwrap_err();
        assert!(matches!(err, GraphRagError::InvalidIdentifier { kind: "label", .. }));
    }

    #[test]
    fn rejects_overlong_identifier() {
        let long = "A".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(validate_identifier("relationship type", &long).is_err());
    }

    #[test]
    fn node_id_parses_decimal_only() {
        assert_eq!(NodeId::parse("42"), Some(NodeId(42)));
        assert_eq!(NodeId::parse(" 7 "), Some(NodeId(7)));
        assert_eq!(NodeId::parse("4:abc:12"), None);
        assert_eq!(NodeId::parse(""), None);
    }

    #[test]
    fn graph_node_serializes_labels_as_type() {
        let node = GraphNode {
            id: NodeId(3),
            labels: vec!["Concept".into()],
            properties: json!({"name": "MCP"}).as_object().cloned().unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"id": "3", "type": ["Concept"], "properties": {"name": "MCP"}})
        );
    }

    #[test]
    fn relation_spec_defaults_type_and_accepts_numeric_ids() {
        let spec: RelationSpec = serde_json::from_value(json!({"target_id": 12})).unwrap();
        assert_eq!(spec.target_id, "12");
        assert_eq!(spec.rel_type, DEFAULT_RELATION_TYPE);
    }

    #[test]
    fn properties_reject_nested_values() {
        let nested = json!({"meta": {"a": 1}}).as_object().cloned().unwrap();
        assert!(validate_properties(&nested).is_err());

        let list_of_lists = json!({"grid": [[1, 2]]}).as_object().cloned().unwrap();
        assert!(validate_properties(&list_of_lists).is_err());

        let flat = json!({"name": "x", "tags": ["a", "b"], "n": 1, "ok": true, "none": null})
            .as_object()
            .cloned()
            .unwrap();
        assert!(validate_properties(&flat).is_ok());
    }
}
