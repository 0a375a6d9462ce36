//! Flow definition files
//!
//! TOML:
//!
//! ```toml
//! [[flows]]
//! flow_code = "ECN_FLOW"
//! flow_name = "Engineering change"
//! module_name = "ECN"
//! first_node_timeout = 48
//!
//! [[flows.nodes]]
//! node_code = "review"
//! node_name = "Engineering review"
//! sequence = 1
//! ```
//!
//! JSON files use the same shape: `{"flows": [...]}`.

use crate::error::{CliError, CliResult};
use approval_storage::InMemoryApprovalStorage;
use approval_types::Flow;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FlowFile {
    #[serde(default)]
    flows: Vec<Flow>,
}

/// Read every flow from a `.toml` or `.json` file, nodes bound to their flow
pub fn read_flows(path: &Path) -> CliResult<Vec<Flow>> {
    let contents = std::fs::read_to_string(path)?;
    let file: FlowFile = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&contents)?,
        _ => toml::from_str(&contents).map_err(|e| CliError::FlowFile(e.to_string()))?,
    };
    Ok(file.flows.into_iter().map(Flow::bind_nodes).collect())
}

/// An in-memory store holding the flows of `path`, or an empty store
pub fn load_store(path: Option<&Path>) -> CliResult<InMemoryApprovalStorage> {
    let Some(path) = path else {
        return Ok(InMemoryApprovalStorage::new());
    };
    let flows = read_flows(path)?;
    tracing::debug!(path = %path.display(), count = flows.len(), "Loaded flow definitions");
    Ok(InMemoryApprovalStorage::with_flows(flows)?)
}
