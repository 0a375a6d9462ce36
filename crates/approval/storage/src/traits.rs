use crate::model::InstanceCommit;
use crate::StorageResult;
use approval_types::{Flow, FlowId, Instance, InstanceId, Record};

/// Read access to flow templates, plus registration for configuration tools.
pub trait FlowStore: Send + Sync {
    /// Register a flow version. Rejects structurally invalid flows and
    /// duplicate `(flow_code, version)` pairs.
    fn register_flow(&self, flow: Flow) -> StorageResult<()>;

    /// Highest active version with this `flow_code`.
    fn find_active_by_code(&self, flow_code: &str) -> StorageResult<Option<Flow>>;

    /// Highest active version with this `module_name`.
    fn find_active_by_module(&self, module_name: &str) -> StorageResult<Option<Flow>>;

    /// One flow version by id, active or not.
    fn get_flow(&self, flow_id: &FlowId) -> StorageResult<Option<Flow>>;

    /// Every registered version, ordered by code then version.
    fn list_flows(&self) -> StorageResult<Vec<Flow>>;

    fn set_active(&self, flow_id: &FlowId, active: bool) -> StorageResult<()>;
}

/// Persistence for instances and their append-only decision records.
pub trait InstanceStore: Send + Sync {
    /// Insert a new instance. `id` and `instance_no` must be unique.
    fn insert_instance(&self, instance: Instance) -> StorageResult<()>;

    fn get_instance(&self, instance_id: &InstanceId) -> StorageResult<Option<Instance>>;

    /// Instances bound to one business document, newest first.
    fn find_by_business(&self, business_type: &str, business_id: &str)
        -> StorageResult<Vec<Instance>>;

    /// Apply a transition and its record atomically, or neither.
    fn commit(&self, commit: InstanceCommit) -> StorageResult<()>;

    /// Decision records of an instance, oldest first.
    fn records_for(&self, instance_id: &InstanceId) -> StorageResult<Vec<Record>>;
}

/// Unified storage bundle used by the workflow engine.
pub trait ApprovalStorage: FlowStore + InstanceStore + Send + Sync {}

impl<T> ApprovalStorage for T where T: FlowStore + InstanceStore + Send + Sync {}
