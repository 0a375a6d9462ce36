//! In-memory reference implementation of the approval storage traits.
//!
//! This adapter is deterministic and test-friendly. Instances and records
//! share one lock, so a commit is observed entirely or not at all. Production
//! deployments should back these traits with a transactional database.

use crate::model::InstanceCommit;
use crate::traits::{FlowStore, InstanceStore};
use crate::{StorageError, StorageResult};
use approval_types::{Flow, FlowId, Instance, InstanceId, Record};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Ledger {
    instances: HashMap<InstanceId, Instance>,
    records: Vec<Record>,
}

/// In-memory approval storage adapter.
#[derive(Default)]
pub struct InMemoryApprovalStorage {
    flows: RwLock<HashMap<FlowId, Flow>>,
    ledger: RwLock<Ledger>,
}

impl InMemoryApprovalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-loaded with `flows`
    pub fn with_flows(flows: impl IntoIterator<Item = Flow>) -> StorageResult<Self> {
        let storage = Self::new();
        for flow in flows {
            storage.register_flow(flow)?;
        }
        Ok(storage)
    }

    fn find_active<F>(&self, matches: F) -> StorageResult<Option<Flow>>
    where
        F: Fn(&Flow) -> bool,
    {
        let guard = self
            .flows
            .read()
            .map_err(|_| StorageError::Backend("flows lock poisoned".to_string()))?;
        Ok(guard
            .values()
            .filter(|f| f.is_active && matches(f))
            .max_by_key(|f| f.version)
            .cloned())
    }
}

impl FlowStore for InMemoryApprovalStorage {
    fn register_flow(&self, flow: Flow) -> StorageResult<()> {
        flow.validate()
            .map_err(|e| StorageError::InvalidInput(e.to_string()))?;

        let mut guard = self
            .flows
            .write()
            .map_err(|_| StorageError::Backend("flows lock poisoned".to_string()))?;

        if guard.contains_key(&flow.id) {
            return Err(StorageError::Conflict(format!("flow {} already exists", flow.id)));
        }
        if guard
            .values()
            .any(|f| f.flow_code == flow.flow_code && f.version == flow.version)
        {
            return Err(StorageError::Conflict(format!(
                "flow '{}' version {} already exists",
                flow.flow_code, flow.version
            )));
        }

        guard.insert(flow.id.clone(), flow);
        Ok(())
    }

    fn find_active_by_code(&self, flow_code: &str) -> StorageResult<Option<Flow>> {
        self.find_active(|f| f.flow_code == flow_code)
    }

    fn find_active_by_module(&self, module_name: &str) -> StorageResult<Option<Flow>> {
        self.find_active(|f| f.module_name == module_name)
    }

    fn get_flow(&self, flow_id: &FlowId) -> StorageResult<Option<Flow>> {
        let guard = self
            .flows
            .read()
            .map_err(|_| StorageError::Backend("flows lock poisoned".to_string()))?;
        Ok(guard.get(flow_id).cloned())
    }

    fn list_flows(&self) -> StorageResult<Vec<Flow>> {
        let guard = self
            .flows
            .read()
            .map_err(|_| StorageError::Backend("flows lock poisoned".to_string()))?;
        let mut values = guard.values().cloned().collect::<Vec<_>>();
        values.sort_by(|a, b| {
            a.flow_code
                .cmp(&b.flow_code)
                .then(a.version.cmp(&b.version))
        });
        Ok(values)
    }

    fn set_active(&self, flow_id: &FlowId, active: bool) -> StorageResult<()> {
        let mut guard = self
            .flows
            .write()
            .map_err(|_| StorageError::Backend("flows lock poisoned".to_string()))?;
        let flow = guard
            .get_mut(flow_id)
            .ok_or_else(|| StorageError::NotFound(format!("flow {} not found", flow_id)))?;
        flow.is_active = active;
        Ok(())
    }
}

impl InstanceStore for InMemoryApprovalStorage {
    fn insert_instance(&self, instance: Instance) -> StorageResult<()> {
        let mut guard = self
            .ledger
            .write()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;

        if guard.instances.contains_key(&instance.id) {
            return Err(StorageError::Conflict(format!(
                "instance {} already exists",
                instance.id
            )));
        }
        if guard
            .instances
            .values()
            .any(|i| i.instance_no == instance.instance_no)
        {
            return Err(StorageError::Conflict(format!(
                "instance number {} already in use",
                instance.instance_no
            )));
        }

        guard.instances.insert(instance.id.clone(), instance);
        Ok(())
    }

    fn get_instance(&self, instance_id: &InstanceId) -> StorageResult<Option<Instance>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard.instances.get(instance_id).cloned())
    }

    fn find_by_business(
        &self,
        business_type: &str,
        business_id: &str,
    ) -> StorageResult<Vec<Instance>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;
        let mut values = guard
            .instances
            .values()
            .filter(|i| i.business_type == business_type && i.business_id == business_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(values)
    }

    fn commit(&self, commit: InstanceCommit) -> StorageResult<()> {
        let mut guard = self
            .ledger
            .write()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;

        let id = commit.instance.id.clone();
        let stored = guard
            .instances
            .get(&id)
            .ok_or_else(|| StorageError::NotFound(format!("instance {} not found", id)))?;

        if stored.current_node_id != commit.expected_current_node
            || stored.current_status != commit.expected_status
        {
            return Err(StorageError::Conflict(format!(
                "instance {} moved to {:?}/{} since it was read",
                id,
                stored.current_node_id.as_ref().map(|n| n.0.as_str()),
                stored.current_status
            )));
        }

        if let Some(record) = commit.record {
            if record.instance_id != id {
                return Err(StorageError::InvalidInput(format!(
                    "record {} belongs to instance {}, not {}",
                    record.id, record.instance_id, id
                )));
            }
            guard.records.push(record);
        }
        guard.instances.insert(id, commit.instance);
        Ok(())
    }

    fn records_for(&self, instance_id: &InstanceId) -> StorageResult<Vec<Record>> {
        let guard = self
            .ledger
            .read()
            .map_err(|_| StorageError::Backend("ledger lock poisoned".to_string()))?;
        Ok(guard
            .records
            .iter()
            .filter(|r| &r.instance_id == instance_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_types::{Decision, InstanceStatus, Node, UserId};

    fn flow(code: &str, module: &str, version: u32) -> Flow {
        Flow::new(code, "Test flow", module)
            .with_version(version)
            .with_node(Node::new("first", "First", 1))
            .unwrap()
            .with_node(Node::new("second", "Second", 2))
            .unwrap()
    }

    fn instance(flow: &Flow, no: &str) -> Instance {
        Instance::new(no, flow, "ECN", "ecn-1", "Bracket", UserId::new("alice"), 48)
    }

    fn record(inst: &Instance, decision: Decision) -> Record {
        let node = inst.current_node().unwrap();
        Record::new(
            inst.id.clone(),
            node.id.clone(),
            node.node_code.clone(),
            UserId::new("bob"),
            "Bob",
            None,
            decision,
            None,
        )
    }

    #[test]
    fn highest_active_version_wins() {
        let storage = InMemoryApprovalStorage::new();
        storage.register_flow(flow("ECN_FLOW", "ecn", 1)).unwrap();
        let v2 = flow("ECN_FLOW", "ecn", 2);
        let v2_id = v2.id.clone();
        storage.register_flow(v2).unwrap();
        storage.register_flow(flow("ECN_FLOW", "ecn", 3).inactive()).unwrap();

        let found = storage.find_active_by_code("ECN_FLOW").unwrap().unwrap();
        assert_eq!(found.version, 2);
        let by_module = storage.find_active_by_module("ecn").unwrap().unwrap();
        assert_eq!(by_module.id, v2_id);

        storage.set_active(&v2_id, false).unwrap();
        assert_eq!(storage.find_active_by_code("ECN_FLOW").unwrap().unwrap().version, 1);
        assert!(storage.find_active_by_code("NOPE").unwrap().is_none());
        assert_eq!(storage.list_flows().unwrap().len(), 3);
    }

    #[test]
    fn register_rejects_invalid_and_duplicate_flows() {
        let storage = InMemoryApprovalStorage::new();
        let empty = Flow::new("EMPTY", "Empty", "empty");
        assert!(matches!(
            storage.register_flow(empty),
            Err(StorageError::InvalidInput(_))
        ));

        storage.register_flow(flow("ECN_FLOW", "ecn", 1)).unwrap();
        assert!(matches!(
            storage.register_flow(flow("ECN_FLOW", "ecn", 1)),
            Err(StorageError::Conflict(_))
        ));
    }

    #[test]
    fn instance_numbers_are_unique() {
        let storage = InMemoryApprovalStorage::new();
        let f = flow("ECN_FLOW", "ecn", 1);
        storage.insert_instance(instance(&f, "AP-1")).unwrap();
        assert!(matches!(
            storage.insert_instance(instance(&f, "AP-1")),
            Err(StorageError::Conflict(_))
        ));
        storage.insert_instance(instance(&f, "AP-2")).unwrap();
        assert_eq!(storage.find_by_business("ECN", "ecn-1").unwrap().len(), 2);
        assert!(storage.find_by_business("ECN", "other").unwrap().is_empty());
    }

    #[test]
    fn commit_applies_instance_and_record_together() {
        let storage = InMemoryApprovalStorage::new();
        let f = flow("ECN_FLOW", "ecn", 1);
        let before = instance(&f, "AP-1");
        storage.insert_instance(before.clone()).unwrap();

        let mut after = before.clone();
        after.form_data.insert("note".into(), serde_json::json!("ok"));
        after.advance_to(after.nodes[1].id.clone());
        let rec = record(&before, Decision::Approved);
        storage
            .commit(InstanceCommit::new(&before, after).with_record(rec.clone()))
            .unwrap();

        let stored = storage.get_instance(&before.id).unwrap().unwrap();
        assert_eq!(stored.current_status, InstanceStatus::InProgress);
        assert_eq!(storage.records_for(&before.id).unwrap(), vec![rec]);
    }

    #[test]
    fn stale_commit_conflicts_and_writes_nothing() {
        let storage = InMemoryApprovalStorage::new();
        let f = flow("ECN_FLOW", "ecn", 1);
        let before = instance(&f, "AP-1");
        storage.insert_instance(before.clone()).unwrap();

        let mut winner = before.clone();
        winner.advance_to(winner.nodes[1].id.clone());
        storage
            .commit(InstanceCommit::new(&before, winner).with_record(record(&before, Decision::Approved)))
            .unwrap();

        let mut loser = before.clone();
        loser.reject();
        let result = storage
            .commit(InstanceCommit::new(&before, loser).with_record(record(&before, Decision::Rejected)));
        assert!(matches!(result, Err(StorageError::Conflict(_))));

        let stored = storage.get_instance(&before.id).unwrap().unwrap();
        assert_eq!(stored.current_status, InstanceStatus::InProgress);
        assert_eq!(storage.records_for(&before.id).unwrap().len(), 1);
    }

    #[test]
    fn commit_of_unknown_instance_is_not_found() {
        let storage = InMemoryApprovalStorage::new();
        let f = flow("ECN_FLOW", "ecn", 1);
        let inst = instance(&f, "AP-1");
        let result = storage.commit(InstanceCommit::new(&inst, inst.clone()));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
