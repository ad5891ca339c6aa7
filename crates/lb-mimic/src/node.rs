//! Node sub-resources
//!
//! Nodes belong to exactly one load balancer. A record with no nodes has no
//! node list at all (`None`), never an empty one.

use crate::error::Result;
use crate::ids::{draw_unique, IdGenerator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Node condition requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeCondition {
    Enabled,
    Disabled,
    Draining,
}

/// Node status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Online,
    Offline,
}

/// Node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Primary,
    Secondary,
}

/// Node as supplied in a create or add-nodes request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
}

impl NodeSpec {
    /// Create an enabled node spec
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            condition: NodeCondition::Enabled,
            weight: None,
            node_type: None,
        }
    }
}

/// Node attached to a load balancer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    pub address: String,
    pub port: u16,
    pub condition: NodeCondition,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
}

impl Node {
    /// Identity tuple used for duplicate detection
    pub fn endpoint(&self) -> (&str, u16) {
        (self.address.as_str(), self.port)
    }
}

/// Find the first (address, port) pair that collides within `candidates` or
/// with an `existing` node
pub fn find_duplicate<'a>(existing: &[Node], candidates: &'a [NodeSpec]) -> Option<(&'a str, u16)> {
    let mut seen: HashSet<(&str, u16)> = existing.iter().map(Node::endpoint).collect();
    candidates
        .iter()
        .map(|spec| (spec.address.as_str(), spec.port))
        .find(|endpoint| !seen.insert(*endpoint))
}

/// Turn specs into nodes with fresh ids not used by `existing`
pub fn build_nodes(
    specs: &[NodeSpec],
    existing: &[Node],
    ids: &dyn IdGenerator,
) -> Result<Vec<Node>> {
    let mut taken: HashSet<u64> = existing.iter().map(|n| n.id).collect();
    let mut nodes = Vec::with_capacity(specs.len());

    for spec in specs {
        let id = draw_unique(|| ids.next_node_id(), |id| taken.contains(&id))?;
        taken.insert(id);
        nodes.push(Node {
            id,
            address: spec.address.clone(),
            port: spec.port,
            condition: spec.condition,
            status: NodeStatus::Online,
            weight: spec.weight,
            node_type: spec.node_type,
        });
    }

    Ok(nodes)
}

/// Append nodes to a node list, creating it if absent
///
/// Returns `true` if this was the first node assignment. An empty batch
/// leaves `target` untouched, so the list is never stored empty.
pub fn attach_nodes(target: &mut Option<Vec<Node>>, nodes: Vec<Node>) -> bool {
    if nodes.is_empty() {
        return false;
    }
    match target {
        Some(existing) => {
            existing.extend(nodes);
            false
        }
        None => {
            *target = Some(nodes);
            true
        }
    }
}

/// Remove a node by id, dropping the list entirely once it is empty
///
/// Returns whether a node was removed.
pub fn detach_node(target: &mut Option<Vec<Node>>, node_id: u64) -> bool {
    let Some(nodes) = target.as_mut() else {
        return false;
    };
    let initial_len = nodes.len();
    nodes.retain(|n| n.id != node_id);
    let removed = nodes.len() < initial_len;
    if nodes.is_empty() {
        *target = None;
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn nodes(specs: &[NodeSpec]) -> Vec<Node> {
        build_nodes(specs, &[], &SequentialIds::new()).unwrap()
    }

    #[test]
    fn test_build_nodes() {
        let mut spec = NodeSpec::new("10.0.0.2", 443);
        spec.weight = Some(5);
        spec.node_type = Some(NodeType::Secondary);

        let built = nodes(&[NodeSpec::new("10.0.0.1", 80), spec]);
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].id, 1);
        assert_eq!(built[1].id, 2);
        assert!(built.iter().all(|n| n.status == NodeStatus::Online));
        assert_eq!(built[1].weight, Some(5));
        assert_eq!(built[0].weight, None);
    }

    #[test]
    fn test_build_nodes_avoids_existing_ids() {
        let ids = SequentialIds::new();
        let existing = build_nodes(&[NodeSpec::new("a", 1)], &[], &ids).unwrap();
        let fresh = SequentialIds::new();
        let more = build_nodes(&[NodeSpec::new("b", 1)], &existing, &fresh).unwrap();
        assert_ne!(existing[0].id, more[0].id);
    }

    #[test]
    fn test_duplicate_against_existing() {
        let existing = nodes(&[NodeSpec::new("10.0.0.1", 80)]);
        let candidates = [NodeSpec::new("10.0.0.9", 80), NodeSpec::new("10.0.0.1", 80)];
        assert_eq!(find_duplicate(&existing, &candidates), Some(("10.0.0.1", 80)));
        assert_eq!(find_duplicate(&existing, &candidates[..1]), None);
    }

    #[test]
    fn test_duplicate_within_batch() {
        let candidates = [NodeSpec::new("10.0.0.1", 80), NodeSpec::new("10.0.0.1", 80)];
        assert_eq!(find_duplicate(&[], &candidates), Some(("10.0.0.1", 80)));

        let same_address = [NodeSpec::new("10.0.0.1", 80), NodeSpec::new("10.0.0.1", 81)];
        assert_eq!(find_duplicate(&[], &same_address), None);
    }

    #[test]
    fn test_attach_and_detach() {
        let mut target = None;
        assert!(attach_nodes(&mut target, nodes(&[NodeSpec::new("a", 1)])));
        let id = target.as_ref().unwrap()[0].id;

        assert!(!detach_node(&mut target, id + 100));
        assert_eq!(target.as_ref().map(Vec::len), Some(1));

        assert!(detach_node(&mut target, id));
        assert!(target.is_none());
        assert!(!detach_node(&mut target, id));
    }

    #[test]
    fn test_attach_empty_batch_is_noop() {
        let mut target = None;
        assert!(!attach_nodes(&mut target, Vec::new()));
        assert!(target.is_none());

        assert!(attach_nodes(&mut target, nodes(&[NodeSpec::new("a", 1)])));
        assert!(!attach_nodes(&mut target, Vec::new()));
        assert_eq!(target.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_node_serialization() {
        let node = &nodes(&[NodeSpec::new("10.0.0.1", 80)])[0];
        let value = serde_json::to_value(node).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 1,
                "address": "10.0.0.1",
                "port": 80,
                "condition": "ENABLED",
                "status": "ONLINE"
            })
        );
    }
}
