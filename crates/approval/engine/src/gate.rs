//! Node gates: evaluates a node's condition against an instance
//!
//! The evaluation context exposes:
//! - `instance`: id, number, flow, business keys, status, submitter, submission time
//! - `form`: the submission snapshot, also flattened to the top level
//! - `entity`: the live entity snapshot for the business document
//! - `initiator` and its alias `user`: the submitter's profile, when resolvable
//!
//! Flattened form fields never shadow those reserved names.
//!
//! Gates fail open: a condition that cannot be parsed or evaluated lets the
//! node through and logs a warning.

use crate::directory::{UserDirectory, UserProfile};
use crate::entity::EntitySnapshotRegistry;
use approval_condition::{Condition, Context, Limits, Value};
use approval_types::{Instance, Node};
use serde_json::json;

const RESERVED_NAMES: [&str; 5] = ["instance", "form", "entity", "initiator", "user"];

/// Evaluates node gates for instances
#[derive(Clone, Copy)]
pub struct NodeGate<'a> {
    entities: &'a EntitySnapshotRegistry,
    directory: &'a dyn UserDirectory,
    limits: &'a Limits,
}

impl<'a> NodeGate<'a> {
    pub fn new(
        entities: &'a EntitySnapshotRegistry,
        directory: &'a dyn UserDirectory,
        limits: &'a Limits,
    ) -> Self {
        Self {
            entities,
            directory,
            limits,
        }
    }

    /// Build the evaluation context for `instance`
    pub fn build_context(&self, instance: &Instance) -> Context {
        let mut ctx = Context::new();

        ctx.insert(
            "instance",
            Value::from(json!({
                "id": instance.id.0,
                "instance_no": instance.instance_no,
                "flow_code": instance.flow_code,
                "business_type": instance.business_type,
                "business_id": instance.business_id,
                "business_title": instance.business_title,
                "status": instance.current_status.as_str(),
                "submitted_by": instance.submitted_by.0,
                "submitted_at": instance.submitted_at.to_rfc3339(),
            })),
        );

        ctx.insert(
            "entity",
            Value::from(
                self.entities
                    .fetch(&instance.business_type, &instance.business_id),
            ),
        );

        if let Some(profile) = self.directory.find_user(&instance.submitted_by) {
            let initiator = profile_value(&profile);
            ctx.insert("user", initiator.clone());
            ctx.insert("initiator", initiator);
        }

        let top_level = Value::map(
            instance
                .form_data
                .iter()
                .filter(|(k, _)| !RESERVED_NAMES.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), Value::from(v.clone()))),
        );
        ctx.flatten(&top_level);
        ctx.insert("form", Value::from(instance.form_data.clone()));

        ctx
    }

    /// Whether `node` is active for `instance`
    pub fn evaluate(&self, node: &Node, instance: &Instance) -> bool {
        if node.gate().is_none() {
            return true;
        }
        self.evaluate_in(node, &self.build_context(instance))
    }

    /// Evaluate `node`'s gate in a prepared context
    pub fn evaluate_in(&self, node: &Node, ctx: &Context) -> bool {
        let Some(expression) = node.gate() else {
            return true;
        };

        match Condition::parse(expression, self.limits).and_then(|c| c.test(ctx)) {
            Ok(passed) => passed,
            Err(e) => {
                tracing::warn!(
                    node_code = %node.node_code,
                    expression,
                    error = %e,
                    "Gate condition failed to evaluate, allowing node"
                );
                true
            }
        }
    }
}

fn profile_value(profile: &UserProfile) -> Value {
    Value::from(json!({
        "id": profile.id.0,
        "username": profile.username,
        "display_name": profile.display_name,
        "department": profile.department,
        "role": profile.role,
    }))
}
