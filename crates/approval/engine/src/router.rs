//! Approval router: picks the flow variant for a document from its payload
//!
//! Unlike the resolver's static type table, routing rules look at runtime
//! attributes of the submitted document, e.g. an invoice amount.

use approval_storage::FlowStore;
use approval_types::Flow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Invoice amount at which a second approver becomes mandatory
pub const SALES_INVOICE_MULTI_THRESHOLD: f64 = 50_000.0;

/// How one business type selects its flow variant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RouteRule {
    /// Always the same flow
    Fixed { flow_code: String },
    /// `below` when `payload[field] < threshold`, else `at_or_above`.
    ///
    /// A missing or non-numeric amount counts as zero.
    AmountThreshold {
        field: String,
        threshold: f64,
        below: String,
        at_or_above: String,
    },
}

impl RouteRule {
    pub fn fixed(flow_code: impl Into<String>) -> Self {
        Self::Fixed {
            flow_code: flow_code.into(),
        }
    }

    /// The flow code this rule selects for `payload`
    pub fn route(&self, payload: &Map<String, Value>) -> &str {
        match self {
            Self::Fixed { flow_code } => flow_code,
            Self::AmountThreshold {
                field,
                threshold,
                below,
                at_or_above,
            } => {
                if read_amount(payload.get(field)) < *threshold {
                    below
                } else {
                    at_or_above
                }
            }
        }
    }
}

fn read_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// The built-in rule table
pub fn default_rules() -> HashMap<String, RouteRule> {
    HashMap::from([
        ("ECN".to_string(), RouteRule::fixed("ECN_STANDARD")),
        (
            "SALES_INVOICE".to_string(),
            RouteRule::AmountThreshold {
                field: "amount".to_string(),
                threshold: SALES_INVOICE_MULTI_THRESHOLD,
                below: "SALES_INVOICE_SINGLE".to_string(),
                at_or_above: "SALES_INVOICE_MULTI".to_string(),
            },
        ),
        ("SALES_QUOTE".to_string(), RouteRule::fixed("SALES_QUOTE_SINGLE")),
    ])
}

/// Chooses which flow variant applies to a business document
pub struct ApprovalRouter<S: ?Sized> {
    store: Arc<S>,
    rules: HashMap<String, RouteRule>,
}

impl<S: FlowStore + ?Sized> ApprovalRouter<S> {
    /// Router with the built-in rule table
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            rules: default_rules(),
        }
    }

    /// Router with no rules
    pub fn empty(store: Arc<S>) -> Self {
        Self {
            store,
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for `business_type`
    pub fn register_rule(&mut self, business_type: impl Into<String>, rule: RouteRule) {
        self.rules.insert(business_type.into(), rule);
    }

    pub fn with_rule(mut self, business_type: impl Into<String>, rule: RouteRule) -> Self {
        self.register_rule(business_type, rule);
        self
    }

    pub fn rule(&self, business_type: &str) -> Option<&RouteRule> {
        self.rules.get(business_type)
    }

    /// Active flow whose `module_name` equals `business_type`.
    ///
    /// Never fails: lookup errors are logged and reported as `None`.
    pub fn get_approval_flow(&self, business_type: &str) -> Option<Flow> {
        match self.store.find_active_by_module(business_type) {
            Ok(flow) => flow,
            Err(e) => {
                tracing::warn!(business_type, error = %e, "Flow lookup failed");
                None
            }
        }
    }

    /// Flow code for this document, `None` if the type has no rule
    pub fn determine_approval_flow(
        &self,
        business_type: &str,
        payload: &Map<String, Value>,
    ) -> Option<String> {
        let rule = self.rules.get(business_type)?;
        let flow_code = rule.route(payload).to_string();
        tracing::debug!(business_type, flow_code = %flow_code, "Routed document");
        Some(flow_code)
    }
}
