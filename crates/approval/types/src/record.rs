//! Decision records: the append-only audit trail of an instance

use crate::{InstanceId, NodeId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a decision record
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An approver's verdict on one node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Immutable log entry of one decision against one node of one instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub instance_id: InstanceId,
    pub node_id: NodeId,
    pub node_code: String,
    pub approver_id: UserId,
    pub approver_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_role: Option<String>,
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl Record {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance_id: InstanceId,
        node_id: NodeId,
        node_code: impl Into<String>,
        approver_id: UserId,
        approver_name: impl Into<String>,
        approver_role: Option<String>,
        decision: Decision,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            instance_id,
            node_id,
            node_code: node_code.into(),
            approver_id,
            approver_name: approver_name.into(),
            approver_role,
            decision,
            comment,
            decided_at: Utc::now(),
        }
    }
}
