//! Error types for the approval layer

use crate::{InstanceId, NodeId, UserId};

/// Errors surfaced by approval operations to the calling service
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("No active approval flow matches '{0}'")]
    FlowNotFound(String),

    #[error("Approval instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("Approval instance {0} has no active node")]
    NoActiveNode(InstanceId),

    #[error("Condition of node '{node}' no longer holds for instance {instance}")]
    ConditionNotMet { instance: InstanceId, node: NodeId },

    #[error("Instance {0} was modified concurrently, retry the operation")]
    ConcurrencyConflict(InstanceId),

    #[error("User '{user}' did not submit instance {instance}")]
    NotSubmitter { instance: InstanceId, user: UserId },

    #[error("Invalid flow definition: {0}")]
    InvalidFlow(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApprovalError {
    /// Whether the caller may safely retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

/// Result type alias for approval operations
pub type ApprovalResult<T> = Result<T, ApprovalError>;
