//! Entity snapshots: per business type, a fixed-field projection of a document
//!
//! Gate expressions reach these fields as `entity.<field>`. Providers are
//! registered by business type tag, so new document kinds plug in without
//! engine changes.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Errors a snapshot provider may report
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Snapshot source failed: {0}")]
    Source(String),
}

/// Result of a snapshot fetch
pub type SnapshotResult = Result<Map<String, Value>, SnapshotError>;

/// Fetches the projection of one document of one business type
pub trait EntitySnapshotProvider: Send + Sync {
    fn snapshot(&self, business_id: &str) -> SnapshotResult;
}

impl<F> EntitySnapshotProvider for F
where
    F: Fn(&str) -> SnapshotResult + Send + Sync,
{
    fn snapshot(&self, business_id: &str) -> SnapshotResult {
        self(business_id)
    }
}

/// Provider over a fixed set of documents, keyed by business id
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshotProvider {
    documents: HashMap<String, Map<String, Value>>,
}

impl StaticSnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, business_id: impl Into<String>, fields: Map<String, Value>) {
        self.documents.insert(business_id.into(), fields);
    }

    pub fn with_document(mut self, business_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        self.insert(business_id, fields);
        self
    }
}

impl EntitySnapshotProvider for StaticSnapshotProvider {
    fn snapshot(&self, business_id: &str) -> SnapshotResult {
        self.documents
            .get(business_id)
            .cloned()
            .ok_or_else(|| SnapshotError::NotFound(business_id.to_string()))
    }
}

/// Business type tag → snapshot provider
#[derive(Clone, Default)]
pub struct EntitySnapshotRegistry {
    providers: HashMap<String, Arc<dyn EntitySnapshotProvider>>,
}

impl EntitySnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for `business_type`
    pub fn register(
        &mut self,
        business_type: impl Into<String>,
        provider: impl EntitySnapshotProvider + 'static,
    ) {
        self.providers.insert(business_type.into(), Arc::new(provider));
    }

    pub fn with_provider(
        mut self,
        business_type: impl Into<String>,
        provider: impl EntitySnapshotProvider + 'static,
    ) -> Self {
        self.register(business_type, provider);
        self
    }

    pub fn contains(&self, business_type: &str) -> bool {
        self.providers.contains_key(business_type)
    }

    /// Registered business types, sorted
    pub fn business_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Snapshot of one document. Unknown types and failed fetches yield an
    /// empty map.
    pub fn fetch(&self, business_type: &str, business_id: &str) -> Map<String, Value> {
        let Some(provider) = self.providers.get(business_type) else {
            tracing::debug!(business_type, "No entity snapshot provider registered");
            return Map::new();
        };

        match provider.snapshot(business_id) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::warn!(
                    business_type,
                    business_id,
                    error = %e,
                    "Entity snapshot unavailable, using empty entity"
                );
                Map::new()
            }
        }
    }
}

impl std::fmt::Debug for EntitySnapshotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySnapshotRegistry")
            .field("business_types", &self.business_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_fetch_from_registered_provider() {
        let registry = EntitySnapshotRegistry::new().with_provider(
            "ECN",
            StaticSnapshotProvider::new()
                .with_document("ecn-1", fields(json!({"estimated_cost": 5000}))),
        );
        assert_eq!(registry.fetch("ECN", "ecn-1")["estimated_cost"], json!(5000));
        assert!(registry.contains("ECN"));
    }

    #[test]
    fn test_unknown_type_or_document_is_empty() {
        let registry = EntitySnapshotRegistry::new()
            .with_provider("ECN", StaticSnapshotProvider::new());
        assert!(registry.fetch("SALES_QUOTE", "q-1").is_empty());
        assert!(registry.fetch("ECN", "missing").is_empty());
    }

    #[test]
    fn test_closure_provider_failure_is_empty() {
        let registry = EntitySnapshotRegistry::new()
            .with_provider("PURCHASE_ORDER", |_id: &str| -> SnapshotResult {
                Err(SnapshotError::Source("database offline".into()))
            })
            .with_provider("ECN", |id: &str| -> SnapshotResult {
                Ok(fields(json!({"code": id})))
            });
        assert!(registry.fetch("PURCHASE_ORDER", "po-1").is_empty());
        assert_eq!(registry.fetch("ECN", "ecn-7")["code"], json!("ecn-7"));
        assert_eq!(registry.business_types(), vec!["ECN", "PURCHASE_ORDER"]);
    }
}
