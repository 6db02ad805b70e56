//! Six-layer pipeline assembly
//!
//! [`PipelineBuilder`] wires one branch node per non-terminal header
//! dimension plus one leaf per decision into a [`RuleGraph`], in the fixed
//! order source address, destination address, source port, destination
//! port, protocol, action. Assembly only happens inside an explicit
//! `build()` call - there is no module-level demo graph or other global
//! state.
//!
//! [`Pipeline::add_rule`] then turns a five-literal rule into one edge per
//! adjacent layer pair, so an external ingestion layer can stay a thin loop
//! over its rule source.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::domain::Domain;
use crate::core::error::{Error, Result};
use crate::core::field::Field;
use crate::core::graph::{NodeId, RuleGraph};

/// One access-control rule in external literal form
///
/// Literals are carried verbatim; validation happens at edge insertion
/// against each layer's domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub source_addr: String,
    pub dest_addr: String,
    pub source_port: String,
    pub dest_port: String,
    pub protocol: String,
    pub decision: String,
}

/// Builder for the fixed six-layer pipeline
///
/// Address domains must be supplied; port domains default to the full
/// `[1, 65535]` range, the protocol domain to the declared `tcp`/`udp`/
/// `icmp` enumeration, and the decision set to every declared action
/// literal.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    source_addrs: Option<Domain>,
    dest_addrs: Option<Domain>,
    source_ports: Option<Domain>,
    dest_ports: Option<Domain>,
    protocols: Option<Domain>,
    decisions: Vec<String>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source-address layer domain
    pub fn source_addresses(mut self, domain: Domain) -> Self {
        self.source_addrs = Some(domain);
        self
    }

    /// Sets the destination-address layer domain
    pub fn dest_addresses(mut self, domain: Domain) -> Self {
        self.dest_addrs = Some(domain);
        self
    }

    /// Sets the source-port layer domain
    pub fn source_ports(mut self, domain: Domain) -> Self {
        self.source_ports = Some(domain);
        self
    }

    /// Sets the destination-port layer domain
    pub fn dest_ports(mut self, domain: Domain) -> Self {
        self.dest_ports = Some(domain);
        self
    }

    /// Sets the protocol layer domain
    pub fn protocols(mut self, domain: Domain) -> Self {
        self.protocols = Some(domain);
        self
    }

    /// Adds a decision leaf to the pipeline; may be called repeatedly
    pub fn decision(mut self, literal: &str) -> Self {
        self.decisions.push(literal.to_string());
        self
    }

    /// Assembles the pipeline.
    ///
    /// Fails if an address layer was never supplied, a supplied domain
    /// belongs to the wrong dimension, or a decision literal is not in the
    /// declared action enumeration.
    pub fn build(self) -> Result<Pipeline> {
        let mut graph = RuleGraph::new();

        let source_addrs = self.source_addrs.ok_or(Error::MissingLayer {
            field: Field::SourceAddr,
        })?;
        let dest_addrs = self.dest_addrs.ok_or(Error::MissingLayer {
            field: Field::DestAddr,
        })?;
        let source_ports = match self.source_ports {
            Some(domain) => domain,
            None => Domain::port_range(Field::SourcePort, 1, 65535)?,
        };
        let dest_ports = match self.dest_ports {
            Some(domain) => domain,
            None => Domain::port_range(Field::DestPort, 1, 65535)?,
        };
        let protocols = self.protocols.unwrap_or_else(Domain::protocols);

        let layers = [
            graph.add_branch(Field::SourceAddr, source_addrs)?,
            graph.add_branch(Field::DestAddr, dest_addrs)?,
            graph.add_branch(Field::SourcePort, source_ports)?,
            graph.add_branch(Field::DestPort, dest_ports)?,
            graph.add_branch(Field::Protocol, protocols)?,
        ];

        let requested = if self.decisions.is_empty() {
            crate::core::domain::ACTION_LITERALS
                .iter()
                .map(|l| (*l).to_string())
                .collect()
        } else {
            self.decisions
        };
        let mut decisions = Vec::with_capacity(requested.len());
        for literal in requested {
            let id = graph.add_leaf(Domain::actions(), &literal)?;
            decisions.push((literal, id));
        }

        debug!(nodes = graph.len(), "pipeline assembled");
        Ok(Pipeline {
            graph,
            layers,
            decisions,
        })
    }
}

/// A wired six-layer pipeline and its layer handles
#[derive(Debug)]
pub struct Pipeline {
    graph: RuleGraph,
    layers: [NodeId; 5],
    decisions: Vec<(String, NodeId)>,
}

impl Pipeline {
    /// The underlying graph, for traversal-side consumers
    pub fn graph(&self) -> &RuleGraph {
        &self.graph
    }

    /// Handle of the branch node for a non-terminal dimension
    pub fn layer(&self, field: Field) -> Option<NodeId> {
        let index = match field {
            Field::SourceAddr => 0,
            Field::DestAddr => 1,
            Field::SourcePort => 2,
            Field::DestPort => 3,
            Field::Protocol => 4,
            Field::Action => return None,
        };
        Some(self.layers[index])
    }

    /// Handle of the leaf carrying a decision literal
    pub fn decision(&self, literal: &str) -> Option<NodeId> {
        self.decisions
            .iter()
            .find(|(l, _)| l == literal)
            .map(|(_, id)| *id)
    }

    /// Inserts one edge per layer for a full rule, ending at the decision
    /// leaf.
    ///
    /// Fails fast on the first rejected edge with the underlying graph
    /// error; edges inserted for earlier layers of the same rule remain, as
    /// each edge insertion is an independent, already-committed step.
    pub fn add_rule(&mut self, rule: &Rule) -> Result<()> {
        let leaf = self
            .decision(&rule.decision)
            .ok_or_else(|| Error::UnrecognizedDecision {
                decision: rule.decision.clone(),
            })?;
        let hops = [
            &rule.source_addr,
            &rule.dest_addr,
            &rule.source_port,
            &rule.dest_port,
            &rule.protocol,
        ];
        for (i, literal) in hops.iter().enumerate() {
            let target = if i + 1 < self.layers.len() {
                self.layers[i + 1]
            } else {
                leaf
            };
            self.graph.add_edge(self.layers[i], target, literal.as_str())?;
        }
        Ok(())
    }
}
