use approval_types::{Instance, InstanceStatus, NodeId, Record};

/// One atomic write of an instance transition.
///
/// The store applies `instance` and appends `record` together, and only if
/// the stored instance still has the expected current node and status.
/// Otherwise nothing is written and the commit fails with
/// [`StorageError::Conflict`](crate::StorageError::Conflict).
#[derive(Debug, Clone)]
pub struct InstanceCommit {
    /// The instance after the transition
    pub instance: Instance,
    /// `current_node_id` read at the start of the operation
    pub expected_current_node: Option<NodeId>,
    /// `current_status` read at the start of the operation
    pub expected_status: InstanceStatus,
    /// Decision record to append, if the transition produced one
    pub record: Option<Record>,
}

impl InstanceCommit {
    /// Prepare a commit of `after`, guarded by the state of `before`
    pub fn new(before: &Instance, after: Instance) -> Self {
        Self {
            instance: after,
            expected_current_node: before.current_node_id.clone(),
            expected_status: before.current_status,
            record: None,
        }
    }

    pub fn with_record(mut self, record: Record) -> Self {
        self.record = Some(record);
        self
    }
}
