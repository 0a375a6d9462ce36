//! Workflow engine: instance creation, traversal, decisions and expiry
//!
//! The engine never holds instance state between calls. The instance a caller
//! passes to a mutation only identifies it: every mutation reloads the stored
//! instance, checks that the caller's current node still matches it, computes
//! the next state from the stored copy, and commits it guarded by the current
//! node and status it read. A caller holding a stale view loses with a
//! retryable [`ApprovalError::ConcurrencyConflict`]; a caller acting on an
//! instance that has since ended gets [`ApprovalError::NoActiveNode`].

use crate::config::EngineConfig;
use crate::directory::{StaticUserDirectory, UserDirectory};
use crate::entity::EntitySnapshotRegistry;
use crate::gate::NodeGate;
use crate::resolver::FlowResolver;
use crate::router::ApprovalRouter;
use crate::storage_error;
use approval_storage::{ApprovalStorage, InstanceCommit, StorageError};
use approval_types::{
    ApprovalError, ApprovalResult, Decision, Instance, InstanceId, Node, Record, UserId,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

/// The approval workflow engine
pub struct WorkflowEngine {
    storage: Arc<dyn ApprovalStorage>,
    resolver: FlowResolver<dyn ApprovalStorage>,
    router: ApprovalRouter<dyn ApprovalStorage>,
    entities: EntitySnapshotRegistry,
    directory: Arc<dyn UserDirectory>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Engine with default configuration, no entity providers and an empty
    /// user directory
    pub fn new(storage: Arc<dyn ApprovalStorage>) -> Self {
        Self {
            resolver: FlowResolver::new(Arc::clone(&storage)),
            router: ApprovalRouter::new(Arc::clone(&storage)),
            storage,
            entities: EntitySnapshotRegistry::new(),
            directory: Arc::new(StaticUserDirectory::new()),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_entities(mut self, entities: EntitySnapshotRegistry) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_router(mut self, router: ApprovalRouter<dyn ApprovalStorage>) -> Self {
        self.router = router;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &FlowResolver<dyn ApprovalStorage> {
        &self.resolver
    }

    pub fn router(&self) -> &ApprovalRouter<dyn ApprovalStorage> {
        &self.router
    }

    fn gate(&self) -> NodeGate<'_> {
        NodeGate::new(&self.entities, self.directory.as_ref(), &self.config.condition)
    }

    // ── Instance Lifecycle ───────────────────────────────────────────

    /// Start an approval of one business document under the active flow
    /// `flow_code` (or, for legacy callers, the flow with that module name).
    ///
    /// The instance starts `PENDING` on the lowest-sequence node, with
    /// `due_date = now + first_node_timeout` (or the configured default).
    pub fn create_instance(
        &self,
        flow_code: &str,
        business_type: &str,
        business_id: &str,
        business_title: &str,
        submitted_by: &UserId,
        form_data: Option<Map<String, Value>>,
    ) -> ApprovalResult<Instance> {
        let flow = self.resolver.get_approval_flow(flow_code)?;
        if flow.first_node().is_none() {
            return Err(ApprovalError::InvalidFlow(format!(
                "flow '{}' has no nodes",
                flow.flow_code
            )));
        }

        let instance = Instance::new(
            generate_instance_no(&self.config.instance_no_prefix),
            &flow,
            business_type,
            business_id,
            business_title,
            submitted_by.clone(),
            flow.timeout_hours(self.config.default_timeout_hours),
        )
        .with_form_data(form_data.unwrap_or_default());

        self.storage
            .insert_instance(instance.clone())
            .map_err(storage_error)?;

        tracing::info!(
            instance_id = %instance.id,
            instance_no = %instance.instance_no,
            flow_code = %instance.flow_code,
            business_type,
            business_id,
            "Approval instance created"
        );
        Ok(instance)
    }

    /// Route a document to its flow variant and start an approval.
    ///
    /// The router's rule table is consulted first, then the resolver's
    /// static business type table.
    pub fn create_routed_instance(
        &self,
        business_type: &str,
        business_id: &str,
        business_title: &str,
        submitted_by: &UserId,
        form_data: Map<String, Value>,
    ) -> ApprovalResult<Instance> {
        let flow_code = self
            .router
            .determine_approval_flow(business_type, &form_data)
            .or_else(|| {
                self.resolver
                    .determine_approval_flow(business_type)
                    .map(str::to_string)
            })
            .ok_or_else(|| ApprovalError::FlowNotFound(business_type.to_string()))?;

        self.create_instance(
            &flow_code,
            business_type,
            business_id,
            business_title,
            submitted_by,
            Some(form_data),
        )
    }

    /// The node awaiting a decision; `None` once the instance is terminal
    pub fn get_current_node<'a>(&self, instance: &'a Instance) -> Option<&'a Node> {
        instance.current_node()
    }

    /// Whether `node`'s gate passes for `instance`. Never fails.
    pub fn evaluate_node_conditions(&self, node: &Node, instance: &Instance) -> bool {
        self.gate().evaluate(node, instance)
    }

    /// Record `approver_id`'s decision on the current node.
    ///
    /// A rejection ends the instance. An approval advances to the next node
    /// whose gate passes, skipping the rest, or completes the instance when
    /// none is left. The new state and the decision record are committed
    /// together.
    ///
    /// `view` only identifies the instance and pins the node the approver
    /// saw; nodes, gates and form data come from the stored instance.
    pub fn submit_approval(
        &self,
        view: &Instance,
        approver_id: &UserId,
        decision: Decision,
        comment: Option<String>,
    ) -> ApprovalResult<Instance> {
        let stored = self.load_for_update(view)?;
        let instance = &stored;
        let node = instance
            .current_node()
            .ok_or_else(|| ApprovalError::NoActiveNode(instance.id.clone()))?;

        let gate = self.gate();
        let ctx = gate.build_context(instance);
        if !gate.evaluate_in(node, &ctx) {
            return Err(ApprovalError::ConditionNotMet {
                instance: instance.id.clone(),
                node: node.id.clone(),
            });
        }

        let (approver_name, approver_role) = match self.directory.find_user(approver_id) {
            Some(profile) => (profile.display_name, profile.role),
            None => (
                format!("{}{}", self.config.placeholder_name_prefix, approver_id),
                None,
            ),
        };

        let record = Record::new(
            instance.id.clone(),
            node.id.clone(),
            node.node_code.clone(),
            approver_id.clone(),
            approver_name,
            approver_role,
            decision,
            comment,
        );

        let mut next = instance.clone();
        match decision {
            Decision::Rejected => next.reject(),
            Decision::Approved => {
                let mut cursor = node;
                loop {
                    match instance.next_node(cursor) {
                        Some(candidate) if gate.evaluate_in(candidate, &ctx) => {
                            next.advance_to(candidate.id.clone());
                            break;
                        }
                        Some(skipped) => {
                            tracing::debug!(
                                instance_id = %instance.id,
                                node_code = %skipped.node_code,
                                "Node gate closed, skipping"
                            );
                            cursor = skipped;
                        }
                        None => {
                            next.approve();
                            break;
                        }
                    }
                }
            }
        }

        self.commit(InstanceCommit::new(instance, next.clone()).with_record(record))?;

        tracing::info!(
            instance_id = %next.id,
            node_code = %node.node_code,
            approver = %approver_id,
            decision = %decision,
            status = %next.current_status,
            completed_nodes = next.completed_nodes,
            total_nodes = next.total_nodes,
            "Approval decision recorded"
        );
        Ok(next)
    }

    /// Withdraw a non-terminal instance. Only its stored submitter may do so.
    pub fn withdraw(&self, view: &Instance, user_id: &UserId) -> ApprovalResult<Instance> {
        let stored = self.load_for_update(view)?;
        let instance = &stored;
        if &instance.submitted_by != user_id {
            return Err(ApprovalError::NotSubmitter {
                instance: instance.id.clone(),
                user: user_id.clone(),
            });
        }

        let mut next = instance.clone();
        next.withdraw();
        self.commit(InstanceCommit::new(instance, next.clone()))?;

        tracing::info!(instance_id = %next.id, user = %user_id, "Approval instance withdrawn");
        Ok(next)
    }

    /// The stored copy of `view`, the only state a mutation may act on.
    ///
    /// Fails with `NoActiveNode` once the stored instance is terminal, and
    /// with `ConcurrencyConflict` when it has moved past `view`'s node.
    fn load_for_update(&self, view: &Instance) -> ApprovalResult<Instance> {
        let stored = self.get_instance(&view.id)?;
        if stored.is_terminal() {
            return Err(ApprovalError::NoActiveNode(stored.id));
        }
        if stored.current_node_id != view.current_node_id {
            tracing::warn!(
                instance_id = %stored.id,
                status = %stored.current_status,
                "Caller acted on a stale instance"
            );
            return Err(ApprovalError::ConcurrencyConflict(stored.id));
        }
        Ok(stored)
    }

    fn commit(&self, commit: InstanceCommit) -> ApprovalResult<()> {
        let id = commit.instance.id.clone();
        self.storage.commit(commit).map_err(|e| match e {
            StorageError::Conflict(reason) => {
                tracing::warn!(instance_id = %id, %reason, "Lost concurrent update");
                ApprovalError::ConcurrencyConflict(id)
            }
            StorageError::NotFound(_) => ApprovalError::InstanceNotFound(id),
            other => storage_error(other),
        })
    }

    // ── Expiry ───────────────────────────────────────────────────────

    /// Whether `instance` is past its due date now
    pub fn is_expired(&self, instance: &Instance) -> bool {
        self.is_expired_at(instance, Utc::now())
    }

    /// Whether `instance` is past its due date at `now`.
    ///
    /// Without a `due_date`, the deadline is creation time plus the owning
    /// flow's first-node timeout (or the configured default). If the flow
    /// cannot be loaded the instance is not considered expired.
    pub fn is_expired_at(&self, instance: &Instance, now: DateTime<Utc>) -> bool {
        if let Some(due) = instance.due_date {
            return now > due;
        }

        match self.storage.get_flow(&instance.flow_id) {
            Ok(Some(flow)) => {
                let hours = flow.timeout_hours(self.config.default_timeout_hours);
                now > instance.created_at + Duration::hours(i64::from(hours))
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(instance_id = %instance.id, error = %e, "Cannot load flow for expiry check");
                false
            }
        }
    }

    // ── Node Lookups ─────────────────────────────────────────────────

    /// The node after `node` in `instance`'s flow, by sequence
    pub fn find_next_node<'a>(&self, instance: &'a Instance, node: &Node) -> Option<&'a Node> {
        instance.next_node(node)
    }

    /// The node before `node` in `instance`'s flow, by sequence
    pub fn find_previous_node<'a>(&self, instance: &'a Instance, node: &Node) -> Option<&'a Node> {
        instance.previous_node(node)
    }

    // ── Read Accessors ───────────────────────────────────────────────

    pub fn get_instance(&self, instance_id: &InstanceId) -> ApprovalResult<Instance> {
        self.storage
            .get_instance(instance_id)
            .map_err(storage_error)?
            .ok_or_else(|| ApprovalError::InstanceNotFound(instance_id.clone()))
    }

    /// Decision records of an instance, oldest first
    pub fn records_for(&self, instance_id: &InstanceId) -> ApprovalResult<Vec<Record>> {
        self.storage.records_for(instance_id).map_err(storage_error)
    }

    /// Every instance of one business document, newest first
    pub fn find_by_business(
        &self,
        business_type: &str,
        business_id: &str,
    ) -> ApprovalResult<Vec<Instance>> {
        self.storage
            .find_by_business(business_type, business_id)
            .map_err(storage_error)
    }

    /// Non-terminal instances of one business document, newest first
    pub fn pending_instances_for_business(
        &self,
        business_type: &str,
        business_id: &str,
    ) -> ApprovalResult<Vec<Instance>> {
        Ok(self
            .find_by_business(business_type, business_id)?
            .into_iter()
            .filter(|i| !i.is_terminal())
            .collect())
    }
}

/// `<prefix><UTC yyyyMMddHHmmss><8 hex chars>`
pub fn generate_instance_no(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        prefix,
        Utc::now().format("%Y%m%d%H%M%S"),
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_no_format() {
        let no = generate_instance_no("AP");
        assert_eq!(no.len(), 2 + 14 + 8);
        assert!(no.starts_with("AP"));
        assert!(no[2..16].chars().all(|c| c.is_ascii_digit()));
        assert!(no[16..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_instance_no("AP"), no);
    }
}
