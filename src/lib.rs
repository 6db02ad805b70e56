//! rulegraph - layered decision graph for access-control rule sets
//!
//! Models a packet-filter rule set as a six-layer decision graph: source
//! address, destination address, source port, destination port, protocol, and
//! a terminal action. Edges between layers are labeled with literal header
//! values, and inserting an edge consumes that value from the source node's
//! admissible pool - so two rules can never silently claim the same value at
//! the same layer.
//!
//! # Architecture
//!
//! - [`core::field`] - Header-dimension tags and the fixed layer order
//! - [`core::domain`] - Admissible value pools with encode/decode and
//!   one-shot consumption
//! - [`core::graph`] - Node arena, edges, and validated edge insertion
//! - [`core::pipeline`] - Builder that wires the six-layer pipeline
//! - [`core::error`] - Error types for construction failures
//!
//! # What this crate is not
//!
//! Rule ingestion (parsing an external rule language into construction calls)
//! and packet classification (walking the graph against a concrete packet)
//! are collaborator layers outside this crate. There is no persistence and no
//! CLI; the whole surface is a constructive API.

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]

pub mod core;

// Re-export commonly used types
pub use core::domain::{Domain, DomainValue};
pub use core::error::{Error, Result};
pub use core::field::Field;
pub use core::graph::{Edge, Node, NodeId, RuleGraph};
pub use core::pipeline::{Pipeline, PipelineBuilder, Rule};
