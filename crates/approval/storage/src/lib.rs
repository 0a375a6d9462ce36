//! Approval storage abstractions.
//!
//! This crate defines the outbound contracts the workflow engine depends on:
//! - a flow config store (templates by code or module, filtered to active)
//! - instance persistence with optimistic, atomic commits of state + record
//!
//! An in-memory adapter lives in [`memory`]; database adapters implement the
//! same traits.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryApprovalStorage;
pub use model::InstanceCommit;
pub use traits::{ApprovalStorage, FlowStore, InstanceStore};
