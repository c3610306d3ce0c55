//! One-hop neighbourhood expansion.

use tracing::debug;

use crate::db::converters::row_to_relationship;
use crate::error::Result;
use crate::graph::query;
use crate::graph::store::GraphStore;
use crate::types::{NodeId, Relationship};

pub struct GraphTraversal<'a> {
    store: &'a GraphStore,
}

impl<'a> GraphTraversal<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Up to `limit` edges touching `node_id` in either direction, each
    /// with the node on the other end. Ids that do not parse or do not
    /// exist yield an empty list.
    pub fn neighborhood(&self, node_id: &str, limit: usize) -> Result<Vec<Relationship>> {
        let Some(id) = NodeId::parse(node_id) else {
            debug!(node_id, "unparseable node id; no relationships");
            return Ok(Vec::new());
        };
        let statement = query::neighborhood(id, limit);
        self.store.query(&statement, row_to_relationship)
    }
}
