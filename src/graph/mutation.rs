//! Node creation with optional outgoing relations.
//!
//! Every identifier and property is checked before anything is written.
//! The node and all of its relations are then written in one transaction;
//! relations whose target does not exist are reported as skipped rather
//! than failing the save.

use tracing::{debug, info};

use crate::error::Result;
use crate::graph::store::{insert_node, insert_relationship, GraphStore};
use crate::types::{
    validate_identifier, validate_properties, NodeId, Properties, RelationOutcome,
    RelationSpec, RelationStatus,
};

/// A request to create one node and link it to existing nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub node_type: String,
    pub properties: Properties,
    pub relations: Vec<RelationSpec>,
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub node_id: NodeId,
    pub node_type: String,
    pub relations: Vec<RelationOutcome>,
}

impl SaveOutcome {
    pub fn relations_created(&self) -> usize {
        self.relations
            .iter()
            .filter(|r| r.status == RelationStatus::Created)
            .count()
    }
}

pub struct GraphMutation<'a> {
    store: &'a GraphStore,
}

impl<'a> GraphMutation<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    pub fn save(&self, request: &SaveRequest) -> Result<SaveOutcome> {
        validate_identifier("label", &request.node_type)?;
        for relation in &request.relations {
            validate_identifier("relationship type", &relation.rel_type)?;
        }
        validate_properties(&request.properties)?;

        let labels = vec![request.node_type.clone()];
        let outcome = self.store.transaction(|conn| {
            let node_id = insert_node(conn, &labels, &request.properties)?;
            let mut relations = Vec::with_capacity(request.relations.len());

            for relation in &request.relations {
                let created = match NodeId::parse(&relation.target_id) {
                    Some(target) => {
                        insert_relationship(conn, node_id, target, &relation.rel_type, &Properties::new())?
                    }
                    None => false,
                };
                let (status, reason) = if created {
                    (RelationStatus::Created, None)
                } else {
                    debug!(target_id = %relation.target_id, "relation target not found");
                    (RelationStatus::Skipped, Some("target node not found".to_string()))
                };
                relations.push(RelationOutcome {
                    target_id: relation.target_id.clone(),
                    rel_type: relation.rel_type.clone(),
                    status,
                    reason,
                });
            }

            Ok(SaveOutcome {
                node_id,
                node_type: request.node_type.clone(),
                relations,
            })
        })?;

        info!(
            node_id = %outcome.node_id,
            node_type = %outcome.node_type,
            relations_created = outcome.relations_created(),
            "node saved"
        );
        Ok(outcome)
    }
}
