//! Shared test utilities for core module tests
//!
//! Provides common fixtures to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::core::domain::Domain;
use crate::core::field::Field;
use crate::core::pipeline::{Pipeline, PipelineBuilder, Rule};

/// Canonical small source-address domain: `109.230.37.1 ..= 109.230.37.10`
pub fn source_addr_domain() -> Domain {
    Domain::address_range(Field::SourceAddr, "109.230.37.1", "109.230.37.10").unwrap()
}

/// Canonical small destination-address domain: `10.0.0.1 ..= 10.0.0.10`
pub fn dest_addr_domain() -> Domain {
    Domain::address_range(Field::DestAddr, "10.0.0.1", "10.0.0.10").unwrap()
}

/// A pipeline over the canonical address domains with default port,
/// protocol, and decision layers.
pub fn test_pipeline() -> Pipeline {
    PipelineBuilder::new()
        .source_addresses(source_addr_domain())
        .dest_addresses(dest_addr_domain())
        .build()
        .unwrap()
}

/// A rule whose every literal lies inside the canonical domains
pub fn sample_rule() -> Rule {
    Rule {
        source_addr: "109.230.37.1".to_string(),
        dest_addr: "10.0.0.1".to_string(),
        source_port: "40000".to_string(),
        dest_port: "22".to_string(),
        protocol: "tcp".to_string(),
        decision: "allow".to_string(),
    }
}
