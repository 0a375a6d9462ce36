//! Approval instances: one running approval process per business document
//!
//! An instance snapshots its flow's nodes at creation, so later template
//! edits never change the path of an in-flight approval. The current node
//! id is resolved once at creation and is `None` only after the instance
//! reaches a terminal status.

use crate::{find_next_node, find_previous_node, Flow, FlowId, Node, NodeId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for an approval instance
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl InstanceId {
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

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user in the external user directory
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Status ───────────────────────────────────────────────────────────

/// Stored status of an approval instance.
///
/// Expiry is not a status: it is derived on read from `due_date`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Created, no decision yet
    Pending,
    /// At least one approval recorded, more nodes to go
    InProgress,
    Approved,
    Rejected,
    Withdrawn,
}

impl InstanceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Withdrawn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Withdrawn => "WITHDRAWN",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Instance ─────────────────────────────────────────────────────────

/// A running approval process bound to exactly one business document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    /// Human-facing unique number, e.g. `AP20261018093000a1b2c3d4`
    pub instance_no: String,
    pub flow_id: FlowId,
    pub flow_code: String,
    pub flow_version: u32,
    pub business_type: String,
    pub business_id: String,
    pub business_title: String,
    pub submitted_by: UserId,
    pub submitted_at: DateTime<Utc>,
    /// The node awaiting a decision; `None` once terminal
    pub current_node_id: Option<NodeId>,
    pub current_status: InstanceStatus,
    pub total_nodes: u32,
    pub completed_nodes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Opaque form snapshot taken at submission
    #[serde(default)]
    pub form_data: Map<String, Value>,
    /// The flow's nodes at creation time, ordered by sequence
    pub nodes: Vec<Node>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Instance {
    /// Create a pending instance positioned on the flow's first node.
    ///
    /// `due_date` is `now + timeout_hours`.
    pub fn new(
        instance_no: impl Into<String>,
        flow: &Flow,
        business_type: impl Into<String>,
        business_id: impl Into<String>,
        business_title: impl Into<String>,
        submitted_by: UserId,
        timeout_hours: u32,
    ) -> Self {
        let now = Utc::now();
        let nodes: Vec<Node> = flow.ordered_nodes().into_iter().cloned().collect();
        let current_node_id = nodes.first().map(|n| n.id.clone());

        Self {
            id: InstanceId::generate(),
            instance_no: instance_no.into(),
            flow_id: flow.id.clone(),
            flow_code: flow.flow_code.clone(),
            flow_version: flow.version,
            business_type: business_type.into(),
            business_id: business_id.into(),
            business_title: business_title.into(),
            submitted_by,
            submitted_at: now,
            current_node_id,
            current_status: InstanceStatus::Pending,
            total_nodes: node_count(nodes.len()),
            completed_nodes: 0,
            due_date: Some(now + Duration::hours(i64::from(timeout_hours))),
            form_data: Map::new(),
            nodes,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_form_data(mut self, form_data: Map<String, Value>) -> Self {
        self.form_data = form_data;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.current_status.is_terminal()
    }

    /// The node awaiting a decision, or `None` if the instance is terminal
    pub fn current_node(&self) -> Option<&Node> {
        if self.is_terminal() {
            return None;
        }
        let id = self.current_node_id.as_ref()?;
        self.node(id)
    }

    /// Look up a node of this instance's flow snapshot
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// The node after `node` in sequence order
    pub fn next_node(&self, node: &Node) -> Option<&Node> {
        find_next_node(&self.nodes, node.sequence)
    }

    /// The node before `node` in sequence order
    pub fn previous_node(&self, node: &Node) -> Option<&Node> {
        find_previous_node(&self.nodes, node.sequence)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Move to `next` after an approval of the current node
    pub fn advance_to(&mut self, next: NodeId) {
        self.current_node_id = Some(next);
        self.current_status = InstanceStatus::InProgress;
        self.completed_nodes = (self.completed_nodes + 1).min(self.total_nodes);
        self.updated_at = Utc::now();
    }

    /// Finish with every node accounted for
    pub fn approve(&mut self) {
        self.current_node_id = None;
        self.current_status = InstanceStatus::Approved;
        self.completed_nodes = self.total_nodes;
        self.finish();
    }

    pub fn reject(&mut self) {
        self.current_node_id = None;
        self.current_status = InstanceStatus::Rejected;
        self.finish();
    }

    pub fn withdraw(&mut self) {
        self.current_node_id = None;
        self.current_status = InstanceStatus::Withdrawn;
        self.finish();
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Time since creation
    pub fn elapsed(&self) -> Duration {
        Utc::now() - self.created_at
    }
}

/// Node counts are stored as `u32`; larger flows saturate
fn node_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_count_saturates() {
        assert_eq!(node_count(0), 0);
        assert_eq!(node_count(3), 3);
        assert_eq!(node_count(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(node_count(u32::MAX as usize + 1), u32::MAX);
    }

    fn two_step_flow() -> Flow {
        Flow::new("ECN_FLOW", "Engineering change", "ecn")
            .with_node(Node::new("node2", "Cost review", 20).with_condition("entity.estimated_cost > 10000"))
            .unwrap()
            .with_node(Node::new("node1", "Engineering review", 10))
            .unwrap()
    }

    fn make_instance() -> Instance {
        Instance::new(
            "AP-1",
            &two_step_flow(),
            "ECN",
            "ecn-42",
            "Replace bracket",
            UserId::new("alice"),
            48,
        )
    }

    #[test]
    fn test_new_instance_starts_on_first_node() {
        let inst = make_instance();
        assert_eq!(inst.current_status, InstanceStatus::Pending);
        assert_eq!(inst.total_nodes, 2);
        assert_eq!(inst.completed_nodes, 0);
        assert_eq!(inst.current_node().unwrap().node_code, "node1");
        assert_eq!(inst.nodes[0].sequence, 10);
        assert!(inst.due_date.unwrap() > inst.submitted_at);
    }

    #[test]
    fn test_snapshot_is_detached_from_flow() {
        let mut flow = two_step_flow();
        let inst = Instance::new("AP-2", &flow, "ECN", "1", "t", UserId::new("u"), 48);
        flow.add_node(Node::new("node3", "Late addition", 30)).unwrap();
        assert_eq!(inst.nodes.len(), 2);
        assert_eq!(inst.total_nodes, 2);
    }

    #[test]
    fn test_advance_and_approve() {
        let mut inst = make_instance();
        let next = inst.next_node(inst.current_node().unwrap()).unwrap().id.clone();
        inst.advance_to(next);
        assert_eq!(inst.current_status, InstanceStatus::InProgress);
        assert_eq!(inst.completed_nodes, 1);
        assert_eq!(inst.current_node().unwrap().node_code, "node2");

        inst.approve();
        assert!(inst.is_terminal());
        assert_eq!(inst.completed_nodes, inst.total_nodes);
        assert!(inst.current_node().is_none());
        assert!(inst.completed_at.is_some());
    }

    #[test]
    fn test_reject_and_withdraw_are_terminal() {
        let mut inst = make_instance();
        inst.reject();
        assert_eq!(inst.current_status, InstanceStatus::Rejected);
        assert!(inst.current_node().is_none());

        let mut inst = make_instance();
        inst.withdraw();
        assert_eq!(inst.current_status, InstanceStatus::Withdrawn);
        assert!(inst.is_terminal());
    }

    #[test]
    fn test_previous_node() {
        let inst = make_instance();
        let last = &inst.nodes[1];
        assert_eq!(inst.previous_node(last).unwrap().node_code, "node1");
        assert!(inst.previous_node(&inst.nodes[0]).is_none());
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&InstanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(InstanceStatus::Withdrawn.to_string(), "WITHDRAWN");
    }
}
