//! Flow templates: ordered approval steps for a class of documents
//!
//! A Flow is configured outside the engine and is read-only to it.
//! Nodes are ordered by `sequence`, which must be unique within a flow.

use crate::{ApprovalError, ApprovalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Hours granted to the first node when a flow does not configure a timeout
pub const DEFAULT_TIMEOUT_HOURS: u32 = 48;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a flow version
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl FlowId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a flow node
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Flow ─────────────────────────────────────────────────────────────

/// A flow template: the ordered approval steps for one kind of document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flow {
    /// Unique identifier of this flow version
    #[serde(default = "FlowId::generate")]
    pub id: FlowId,
    /// Business key, unique among active flows
    pub flow_code: String,
    /// Human-readable name
    pub flow_name: String,
    /// Legacy lookup key (older callers address flows by module)
    pub module_name: String,
    /// Free-form classification, e.g. "ENGINEERING" or "SALES"
    #[serde(default)]
    pub flow_type: String,
    /// Template version; higher versions supersede lower ones
    #[serde(default = "default_version")]
    pub version: u32,
    /// Only active flows can be resolved
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Hours the first node may stay pending before the instance expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_node_timeout: Option<u32>,
    /// The approval steps, in any order; use [`Flow::ordered_nodes`] to walk them
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// When this flow version was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

impl Flow {
    /// Create a new, active, empty flow
    pub fn new(
        flow_code: impl Into<String>,
        flow_name: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            id: FlowId::generate(),
            flow_code: flow_code.into(),
            flow_name: flow_name.into(),
            module_name: module_name.into(),
            flow_type: String::new(),
            version: 1,
            is_active: true,
            first_node_timeout: None,
            nodes: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_flow_type(mut self, flow_type: impl Into<String>) -> Self {
        self.flow_type = flow_type.into();
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_first_node_timeout(mut self, hours: u32) -> Self {
        self.first_node_timeout = Some(hours);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Add a node, binding it to this flow.
    ///
    /// Fails if the node's `sequence` or `node_code` is already taken.
    pub fn add_node(&mut self, mut node: Node) -> ApprovalResult<()> {
        if self.nodes.iter().any(|n| n.sequence == node.sequence) {
            return Err(ApprovalError::InvalidFlow(format!(
                "flow '{}' already has a node with sequence {}",
                self.flow_code, node.sequence
            )));
        }
        if self.nodes.iter().any(|n| n.node_code == node.node_code) {
            return Err(ApprovalError::InvalidFlow(format!(
                "flow '{}' already has a node with code '{}'",
                self.flow_code, node.node_code
            )));
        }
        node.flow_id = self.id.clone();
        self.nodes.push(node);
        Ok(())
    }

    /// Re-bind every node to this flow, e.g. after deserializing a
    /// template whose nodes carry no `flow_id`.
    pub fn bind_nodes(mut self) -> Self {
        for node in &mut self.nodes {
            node.flow_id = self.id.clone();
        }
        self
    }

    /// Builder form of [`Flow::add_node`]
    pub fn with_node(mut self, node: Node) -> ApprovalResult<Self> {
        self.add_node(node)?;
        Ok(self)
    }

    /// Nodes sorted by ascending `sequence`
    pub fn ordered_nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.iter().collect();
        nodes.sort_by_key(|n| n.sequence);
        nodes
    }

    /// The node with the lowest `sequence`
    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.iter().min_by_key(|n| n.sequence)
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Effective first-node timeout in hours
    pub fn timeout_hours(&self, fallback: u32) -> u32 {
        self.first_node_timeout.unwrap_or(fallback)
    }

    /// Validate structural invariants: at least one node, unique sequences,
    /// unique node codes, and every node bound to this flow.
    pub fn validate(&self) -> ApprovalResult<()> {
        if self.flow_code.trim().is_empty() {
            return Err(ApprovalError::InvalidFlow("flow_code must not be empty".into()));
        }
        if self.nodes.is_empty() {
            return Err(ApprovalError::InvalidFlow(format!(
                "flow '{}' must have at least one node",
                self.flow_code
            )));
        }

        let mut sequences = HashSet::new();
        let mut codes = HashSet::new();
        for node in &self.nodes {
            if !sequences.insert(node.sequence) {
                return Err(ApprovalError::InvalidFlow(format!(
                    "duplicate sequence {} in flow '{}'",
                    node.sequence, self.flow_code
                )));
            }
            if !codes.insert(node.node_code.as_str()) {
                return Err(ApprovalError::InvalidFlow(format!(
                    "duplicate node code '{}' in flow '{}'",
                    node.node_code, self.flow_code
                )));
            }
            if node.flow_id != self.id {
                return Err(ApprovalError::InvalidFlow(format!(
                    "node '{}' belongs to flow {}, not {}",
                    node.node_code, node.flow_id, self.id
                )));
            }
        }

        Ok(())
    }
}

// ── Node ─────────────────────────────────────────────────────────────

/// Who may act on a node. Resolution to concrete users is external.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    #[default]
    User,
    Role,
    Department,
}

impl std::fmt::Display for RoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "USER"),
            Self::Role => write!(f, "ROLE"),
            Self::Department => write!(f, "DEPARTMENT"),
        }
    }
}

/// One approval step of a flow
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default = "NodeId::generate")]
    pub id: NodeId,
    /// The flow this node belongs to; set by [`Flow::add_node`]
    #[serde(default = "unbound_flow")]
    pub flow_id: FlowId,
    pub node_code: String,
    pub node_name: String,
    /// Position within the flow, unique per flow
    pub sequence: u32,
    #[serde(default)]
    pub role_type: RoleType,
    /// User id, role key or department key, interpreted per `role_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Gate: the node is active only while this evaluates true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_hours: Option<u32>,
}

fn unbound_flow() -> FlowId {
    FlowId::new("")
}

impl Node {
    /// Create an unconditional node assigned by user
    pub fn new(node_code: impl Into<String>, node_name: impl Into<String>, sequence: u32) -> Self {
        Self {
            id: NodeId::generate(),
            flow_id: unbound_flow(),
            node_code: node_code.into(),
            node_name: node_name.into(),
            sequence,
            role_type: RoleType::User,
            assignee: None,
            condition_expression: None,
            timeout_hours: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = NodeId::new(id);
        self
    }

    pub fn with_role(mut self, role_type: RoleType, assignee: impl Into<String>) -> Self {
        self.role_type = role_type;
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_condition(mut self, expression: impl Into<String>) -> Self {
        self.condition_expression = Some(expression.into());
        self
    }

    pub fn with_timeout(mut self, hours: u32) -> Self {
        self.timeout_hours = Some(hours);
        self
    }

    /// The gate expression, if it has any non-blank content
    pub fn gate(&self) -> Option<&str> {
        self.condition_expression
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

// ── Sequence lookups ─────────────────────────────────────────────────

/// The node with the smallest sequence strictly greater than `sequence`
pub fn find_next_node(nodes: &[Node], sequence: u32) -> Option<&Node> {
    nodes
        .iter()
        .filter(|n| n.sequence > sequence)
        .min_by_key(|n| n.sequence)
}

/// The node with the largest sequence strictly smaller than `sequence`
pub fn find_previous_node(nodes: &[Node], sequence: u32) -> Option<&Node> {
    nodes
        .iter()
        .filter(|n| n.sequence < sequence)
        .max_by_key(|n| n.sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ecn_flow() -> Flow {
        Flow::new("ECN_FLOW", "Engineering change", "ecn")
            .with_node(Node::new("review", "Engineering review", 1))
            .unwrap()
            .with_node(Node::new("cost", "Cost review", 2).with_condition("entity.estimated_cost > 10000"))
            .unwrap()
            .with_node(Node::new("sign", "Final sign-off", 3))
            .unwrap()
    }

    #[test]
    fn test_add_node_binds_flow() {
        let flow = ecn_flow();
        assert!(flow.nodes.iter().all(|n| n.flow_id == flow.id));
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let mut flow = ecn_flow();
        let result = flow.add_node(Node::new("other", "Other", 2));
        assert!(matches!(result, Err(ApprovalError::InvalidFlow(_))));
        assert_eq!(flow.node_count(), 3);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut flow = ecn_flow();
        let result = flow.add_node(Node::new("review", "Again", 9));
        assert!(matches!(result, Err(ApprovalError::InvalidFlow(_))));
    }

    #[test]
    fn test_empty_flow_invalid() {
        let flow = Flow::new("EMPTY", "Empty", "empty");
        assert!(matches!(flow.validate(), Err(ApprovalError::InvalidFlow(_))));
    }

    #[test]
    fn test_validate_catches_tampered_sequences() {
        let mut flow = ecn_flow();
        flow.nodes[2].sequence = 1;
        assert!(flow.validate().is_err());
    }

    #[test]
    fn test_ordering_and_first_node() {
        let mut flow = Flow::new("F", "F", "f");
        flow.add_node(Node::new("c", "C", 30)).unwrap();
        flow.add_node(Node::new("a", "A", 10)).unwrap();
        flow.add_node(Node::new("b", "B", 20)).unwrap();

        let codes: Vec<_> = flow.ordered_nodes().iter().map(|n| n.node_code.as_str()).collect();
        assert_eq!(codes, vec!["a", "b", "c"]);
        assert_eq!(flow.first_node().unwrap().node_code, "a");
    }

    #[test]
    fn test_next_and_previous_lookups() {
        let flow = ecn_flow();
        assert_eq!(find_next_node(&flow.nodes, 1).unwrap().node_code, "cost");
        assert_eq!(find_next_node(&flow.nodes, 0).unwrap().node_code, "review");
        assert!(find_next_node(&flow.nodes, 3).is_none());

        assert_eq!(find_previous_node(&flow.nodes, 3).unwrap().node_code, "cost");
        assert!(find_previous_node(&flow.nodes, 1).is_none());
    }

    #[test]
    fn test_blank_gate_is_no_gate() {
        let node = Node::new("n", "N", 1).with_condition("   ");
        assert!(node.gate().is_none());
        let node = Node::new("n", "N", 1).with_condition(" a > 1 ");
        assert_eq!(node.gate(), Some("a > 1"));
    }

    #[test]
    fn test_timeout_fallback() {
        let flow = ecn_flow();
        assert_eq!(flow.timeout_hours(DEFAULT_TIMEOUT_HOURS), 48);
        let flow = flow.with_first_node_timeout(12);
        assert_eq!(flow.timeout_hours(DEFAULT_TIMEOUT_HOURS), 12);
    }

    #[test]
    fn test_role_type_serde() {
        let json = serde_json::to_string(&RoleType::Department).unwrap();
        assert_eq!(json, "\"DEPARTMENT\"");
        let role: RoleType = serde_json::from_str("\"ROLE\"").unwrap();
        assert_eq!(role, RoleType::Role);
    }
}
