//! Approval Workflow Engine
//!
//! Attaches multi-step, conditionally gated approval processes to business
//! documents. The engine composes:
//!
//! - [`FlowResolver`]: active flow lookup by code, with legacy module fallback
//! - [`ApprovalRouter`]: flow variant selection from document attributes
//! - [`EntitySnapshotRegistry`]: per-business-type document projections
//! - [`NodeGate`]: condition evaluation with fail-open semantics
//! - [`WorkflowEngine`]: instance creation, decisions, withdrawal and expiry
//!
//! The engine is synchronous. Persistence, user lookup and entity snapshots
//! are collaborators injected through traits.
//!
//! # Example
//!
//! ```rust
//! use approval_engine::WorkflowEngine;
//! use approval_storage::{FlowStore, InMemoryApprovalStorage};
//! use approval_types::{Decision, Flow, InstanceStatus, Node, UserId};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(InMemoryApprovalStorage::new());
//! let flow = Flow::new("ECN_FLOW", "Engineering change", "ECN")
//!     .with_node(Node::new("review", "Engineering review", 1))
//!     .unwrap();
//! storage.register_flow(flow).unwrap();
//!
//! let engine = WorkflowEngine::new(storage);
//! let alice = UserId::new("alice");
//! let instance = engine
//!     .create_instance("ECN_FLOW", "ECN", "ecn-1", "Replace bracket", &alice, None)
//!     .unwrap();
//! let done = engine
//!     .submit_approval(&instance, &UserId::new("bob"), Decision::Approved, None)
//!     .unwrap();
//! assert_eq!(done.current_status, InstanceStatus::Approved);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod directory;
pub mod engine;
pub mod entity;
pub mod gate;
pub mod resolver;
pub mod router;

pub use config::{ConfigError, EngineConfig};
pub use directory::{StaticUserDirectory, UserDirectory, UserProfile};
pub use engine::{generate_instance_no, WorkflowEngine};
pub use entity::{
    EntitySnapshotProvider, EntitySnapshotRegistry, SnapshotError, SnapshotResult,
    StaticSnapshotProvider,
};
pub use gate::NodeGate;
pub use resolver::FlowResolver;
pub use router::{ApprovalRouter, RouteRule};

use approval_storage::StorageError;
use approval_types::ApprovalError;

pub(crate) fn storage_error(e: StorageError) -> ApprovalError {
    ApprovalError::Storage(e.to_string())
}
