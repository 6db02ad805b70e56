//! Core decision-graph model
//!
//! This module contains the types and logic for building layered
//! access-control decision graphs. It provides:
//!
//! - [`field`]: Header-dimension tags and the fixed layer pipeline
//! - [`domain`]: Admissible value pools (ranges and enumerations)
//! - [`graph`]: Node arena, edges, and consumption-validated insertion
//! - [`pipeline`]: Six-layer pipeline assembly
//! - [`error`]: Error types for graph construction

pub mod domain;
pub mod error;
pub mod field;
pub mod graph;
pub mod pipeline;

#[cfg(test)]
pub mod test_helpers;
