//! Flow resolver: active flow lookup by code, with legacy module fallback

use crate::storage_error;
use approval_storage::FlowStore;
use approval_types::{ApprovalError, ApprovalResult, Flow};
use std::sync::Arc;

/// Default flow code per business type tag
const DEFAULT_FLOW_CODES: &[(&str, &str)] = &[
    ("ECN", "ECN_FLOW"),
    ("SALES_QUOTE", "SALES_QUOTE_FLOW"),
    ("SALES_INVOICE", "SALES_INVOICE_FLOW"),
    ("PURCHASE_ORDER", "PURCHASE_ORDER_FLOW"),
    ("OUTSOURCING_ORDER", "OUTSOURCING_FLOW"),
];

/// Loads active flow templates from a [`FlowStore`]
pub struct FlowResolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: FlowStore + ?Sized> FlowResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve an active flow by `flow_code`, falling back to `module_name`.
    ///
    /// Fails with [`ApprovalError::FlowNotFound`] when neither key matches
    /// an active flow.
    pub fn get_approval_flow(&self, identifier: &str) -> ApprovalResult<Flow> {
        if let Some(flow) = self.store.find_active_by_code(identifier).map_err(storage_error)? {
            return Ok(flow);
        }

        if let Some(flow) = self
            .store
            .find_active_by_module(identifier)
            .map_err(storage_error)?
        {
            tracing::debug!(
                identifier,
                flow_code = %flow.flow_code,
                "Flow resolved by legacy module name"
            );
            return Ok(flow);
        }

        Err(ApprovalError::FlowNotFound(identifier.to_string()))
    }

    /// Default flow code for a business type, `None` if unmapped
    pub fn determine_approval_flow(&self, business_type: &str) -> Option<&'static str> {
        DEFAULT_FLOW_CODES
            .iter()
            .find(|(tag, _)| *tag == business_type)
            .map(|(_, code)| *code)
    }
}
