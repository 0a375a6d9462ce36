//! Approval Domain Types
//!
//! An approval process is a **flow** of ordered, optionally gated steps
//! attached to exactly one business document. This crate holds the data
//! model shared by the condition evaluator, the storage contracts and the
//! workflow engine.
//!
//! # Key Concepts
//!
//! - **Flow**: a reusable template of ordered approval [`Node`]s for one class
//!   of business documents. Read-only to the engine.
//! - **Node**: one step in a flow, ordered by `sequence`, optionally gated by
//!   a condition expression.
//! - **Instance**: one running approval process bound to one document. It
//!   carries a snapshot of its flow's nodes taken at creation.
//! - **Record**: an immutable, append-only log entry of one decision.
//!
//! # Lifecycle
//!
//! ```text
//! PENDING ──approve──▶ IN_PROGRESS ──approve (last)──▶ APPROVED
//!    │                     │
//!    ├──reject─────────────┴──────────────────────────▶ REJECTED
//!    └──withdraw───────────┴──────────────────────────▶ WITHDRAWN
//! ```
//!
//! Terminal instances are immutable.

#![deny(unsafe_code)]

mod errors;
mod flow;
mod instance;
mod record;

pub use errors::*;
pub use flow::*;
pub use instance::*;
pub use record::*;
