//! Node arena and consumption-validated edge insertion
//!
//! Nodes live in a [`RuleGraph`] arena and are addressed by stable
//! [`NodeId`] handles, so any number of edges from any number of source
//! nodes can share one target without lifetime gymnastics: the arena owns
//! every node, an edge only records the target's handle.
//!
//! The entire mutable surface after construction is [`RuleGraph::add_edge`].
//! A successful insertion consumes the edge's decoded value from the source
//! node's domain and appends the edge in one step; a failed validation
//! leaves both untouched. This is the mechanism that makes two rules
//! claiming the same header value at the same layer a hard error instead of
//! a silent conflict. Overlapping *ranges* are not detected - only
//! exact-value collisions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::domain::Domain;
use crate::core::error::{Error, Result};
use crate::core::field::Field;

/// Stable handle to a node in a [`RuleGraph`] arena
///
/// Handles are plain indices: cheap to copy, meaningless outside the graph
/// that issued them. Using a handle from another graph yields
/// [`Error::UnknownNode`] or, at worst, a node of the wrong layer - never
/// undefined behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Directed, literal-labeled transition to the next layer
///
/// Immutable once inserted. The source node is implied by ownership: an
/// edge lives in exactly one node's edge list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    /// Handle of the node this edge leads to
    pub target: NodeId,
    /// The external literal as supplied at insertion, not yet decoded
    pub literal: String,
}

/// Vertex in the decision graph
#[derive(Debug)]
pub enum Node {
    /// Non-terminal node: gates and records transitions to the next layer.
    /// Edge order is insertion order, which is rule-precedence order.
    Branch {
        field: Field,
        domain: Domain,
        edges: Vec<Edge>,
    },
    /// Terminal node holding a reached decision. The retained domain is a
    /// descriptive snapshot only - leaves never validate or consume, since
    /// they have no outgoing edges.
    Leaf {
        field: Field,
        domain: Domain,
        decision: String,
    },
}

impl Node {
    /// The header dimension this node examines
    pub const fn field(&self) -> Field {
        match self {
            Node::Branch { field, .. } | Node::Leaf { field, .. } => *field,
        }
    }

    /// Returns `true` for decision leaves
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

/// Arena-owned decision graph
///
/// Construction is top-down and session-scoped: nodes are added once,
/// edges are only ever appended, and nothing is deleted or edited
/// afterwards.
#[derive(Debug, Default)]
pub struct RuleGraph {
    nodes: Vec<Node>,
}

impl RuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a non-terminal node for `field`, owning `domain` as its pool of
    /// admissible outgoing values.
    ///
    /// The domain must have been constructed for the same dimension, and the
    /// dimension must not be the terminal one.
    pub fn add_branch(&mut self, field: Field, domain: Domain) -> Result<NodeId> {
        if field.is_terminal() {
            return Err(Error::TerminalSource { field });
        }
        if domain.field() != field {
            return Err(Error::DomainMismatch { field });
        }
        let id = NodeId(self.nodes.len());
        debug!(field = field.as_str(), id = id.0, "branch node added");
        self.nodes.push(Node::Branch {
            field,
            domain,
            edges: Vec::new(),
        });
        Ok(id)
    }

    /// Adds a terminal decision node.
    ///
    /// The decision literal is validated against the domain's enumeration -
    /// an undeclared literal (say `"accept"` against `allow`/`discard`) is
    /// an [`Error::UnrecognizedDecision`], never silently mapped to a
    /// declared one. The domain is retained as a descriptive snapshot.
    pub fn add_leaf(&mut self, domain: Domain, decision: &str) -> Result<NodeId> {
        let field = domain.field();
        if !field.is_terminal() {
            return Err(Error::DomainMismatch { field });
        }
        if domain.encode(decision).is_err() {
            return Err(Error::UnrecognizedDecision {
                decision: decision.to_string(),
            });
        }
        let id = NodeId(self.nodes.len());
        debug!(decision, id = id.0, "leaf node added");
        self.nodes.push(Node::Leaf {
            field,
            domain,
            decision: decision.to_string(),
        });
        Ok(id)
    }

    /// Inserts a value-labeled edge from `source` to `target`.
    ///
    /// Validation order: both handles must resolve, the source must be a
    /// branch, the target must sit at the layer immediately after the
    /// source, and the literal must decode to a value the source's domain
    /// still holds. Only then is the value consumed and the edge appended;
    /// any failure leaves the graph exactly as it was.
    ///
    /// Consumption is what guarantees at most one edge per decoded value
    /// ever leaves a given node.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, literal: &str) -> Result<()> {
        let target_field = self.node(target)?.field();
        let source_node = self
            .nodes
            .get_mut(source.0)
            .ok_or(Error::UnknownNode(source))?;
        match source_node {
            Node::Leaf { field, .. } => Err(Error::TerminalSource { field: *field }),
            Node::Branch {
                field,
                domain,
                edges,
            } => {
                let Some(expected) = field.next_layer() else {
                    return Err(Error::TerminalSource { field: *field });
                };
                if target_field != expected {
                    return Err(Error::LayerMismatch {
                        source: *field,
                        target: target_field,
                        expected,
                    });
                }
                let value = domain.claim(literal)?;
                edges.push(Edge {
                    target,
                    literal: literal.to_string(),
                });
                debug!(
                    field = field.as_str(),
                    literal,
                    value,
                    target = target.0,
                    "edge inserted"
                );
                Ok(())
            }
        }
    }

    /// Resolves a handle to its node
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    /// The header dimension a node examines
    pub fn field_of(&self, id: NodeId) -> Result<Field> {
        Ok(self.node(id)?.field())
    }

    /// A node's outgoing edges in precedence order; empty for leaves
    pub fn edges(&self, id: NodeId) -> Result<&[Edge]> {
        match self.node(id)? {
            Node::Branch { edges, .. } => Ok(edges),
            Node::Leaf { .. } => Ok(&[]),
        }
    }

    /// Number of outgoing edges
    pub fn out_degree(&self, id: NodeId) -> Result<usize> {
        Ok(self.edges(id)?.len())
    }

    /// The decision literal if the node is a leaf
    pub fn decision(&self, id: NodeId) -> Result<Option<&str>> {
        match self.node(id)? {
            Node::Leaf { decision, .. } => Ok(Some(decision)),
            Node::Branch { .. } => Ok(None),
        }
    }

    /// A node's domain (a branch's live pool, or a leaf's descriptive snapshot)
    pub fn domain(&self, id: NodeId) -> Result<&Domain> {
        match self.node(id)? {
            Node::Branch { domain, .. } | Node::Leaf { domain, .. } => Ok(domain),
        }
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_helpers::{dest_addr_domain, source_addr_domain};

    fn two_layer_graph() -> (RuleGraph, NodeId, NodeId) {
        let mut graph = RuleGraph::new();
        let src = graph
            .add_branch(Field::SourceAddr, source_addr_domain())
            .unwrap();
        let dst = graph
            .add_branch(Field::DestAddr, dest_addr_domain())
            .unwrap();
        (graph, src, dst)
    }

    #[test]
    fn test_edge_insertion_consumes_value() {
        let (mut graph, src, dst) = two_layer_graph();
        graph.add_edge(src, dst, "109.230.37.1").unwrap();

        assert_eq!(graph.out_degree(src).unwrap(), 1);
        assert_eq!(graph.edges(src).unwrap()[0].target, dst);
        assert_eq!(graph.edges(src).unwrap()[0].literal, "109.230.37.1");

        let domain = graph.domain(src).unwrap();
        let v = domain.encode("109.230.37.1").unwrap();
        assert!(!domain.contains(v), "consumed value must be unavailable");
    }

    #[test]
    fn test_duplicate_value_fails_without_mutation() {
        let (mut graph, src, dst) = two_layer_graph();
        graph.add_edge(src, dst, "109.230.37.1").unwrap();
        let pool_before = graph.domain(src).unwrap().len();

        let err = graph.add_edge(src, dst, "109.230.37.1").unwrap_err();
        assert_eq!(
            err,
            Error::AlreadyConsumed {
                field: Field::SourceAddr,
                literal: "109.230.37.1".to_string()
            }
        );
        assert_eq!(graph.out_degree(src).unwrap(), 1);
        assert_eq!(graph.domain(src).unwrap().len(), pool_before);
    }

    #[test]
    fn test_out_of_range_value_fails_without_mutation() {
        let (mut graph, src, dst) = two_layer_graph();
        let pool_before = graph.domain(src).unwrap().len();

        let err = graph.add_edge(src, dst, "109.230.37.11").unwrap_err();
        assert_eq!(
            err,
            Error::NeverInDomain {
                field: Field::SourceAddr,
                literal: "109.230.37.11".to_string()
            }
        );
        assert_eq!(graph.out_degree(src).unwrap(), 0);
        assert_eq!(graph.domain(src).unwrap().len(), pool_before);
    }

    #[test]
    fn test_malformed_literal_fails_without_mutation() {
        let (mut graph, src, dst) = two_layer_graph();
        let err = graph.add_edge(src, dst, "not-an-address").unwrap_err();
        assert!(matches!(err, Error::MalformedLiteral { .. }));
        assert_eq!(graph.out_degree(src).unwrap(), 0);
    }

    #[test]
    fn test_layer_mismatch_rejected() {
        let mut graph = RuleGraph::new();
        let src = graph
            .add_branch(Field::SourceAddr, source_addr_domain())
            .unwrap();
        let ports = graph
            .add_branch(
                Field::SourcePort,
                Domain::port_range(Field::SourcePort, 1, 65535).unwrap(),
            )
            .unwrap();

        let err = graph.add_edge(src, ports, "109.230.37.1").unwrap_err();
        assert_eq!(
            err,
            Error::LayerMismatch {
                source: Field::SourceAddr,
                target: Field::SourcePort,
                expected: Field::DestAddr,
            }
        );
        assert_eq!(graph.out_degree(src).unwrap(), 0);
    }

    #[test]
    fn test_leaf_cannot_be_a_source() {
        let mut graph = RuleGraph::new();
        let leaf = graph.add_leaf(Domain::actions(), "allow").unwrap();
        let other = graph.add_leaf(Domain::actions(), "discard").unwrap();
        let err = graph.add_edge(leaf, other, "allow").unwrap_err();
        assert_eq!(
            err,
            Error::TerminalSource {
                field: Field::Action
            }
        );
    }

    #[test]
    fn test_branch_rejects_terminal_field_and_mismatched_domain() {
        let mut graph = RuleGraph::new();
        assert_eq!(
            graph
                .add_branch(Field::Action, Domain::actions())
                .unwrap_err(),
            Error::TerminalSource {
                field: Field::Action
            }
        );
        assert_eq!(
            graph
                .add_branch(Field::DestAddr, source_addr_domain())
                .unwrap_err(),
            Error::DomainMismatch {
                field: Field::DestAddr
            }
        );
    }

    #[test]
    fn test_leaf_validates_decision_literal() {
        let mut graph = RuleGraph::new();
        // "accept" is not in the declared allow/discard enumeration: the
        // mismatch surfaces instead of being silently treated as "allow"
        assert_eq!(
            graph.add_leaf(Domain::actions(), "accept").unwrap_err(),
            Error::UnrecognizedDecision {
                decision: "accept".to_string()
            }
        );
        assert_eq!(graph.len(), 0);

        let allow = graph.add_leaf(Domain::actions(), "allow").unwrap();
        assert_eq!(graph.decision(allow).unwrap(), Some("allow"));
        assert!(graph.node(allow).unwrap().is_terminal());
    }

    #[test]
    fn test_leaf_rejects_non_terminal_domain() {
        let mut graph = RuleGraph::new();
        assert!(graph.add_leaf(source_addr_domain(), "allow").is_err());
    }

    #[test]
    fn test_target_shared_across_source_nodes() {
        let mut graph = RuleGraph::new();
        let src_a = graph
            .add_branch(Field::SourceAddr, source_addr_domain())
            .unwrap();
        let src_b = graph
            .add_branch(
                Field::SourceAddr,
                Domain::address_range(Field::SourceAddr, "10.1.0.1", "10.1.0.5").unwrap(),
            )
            .unwrap();
        let shared = graph
            .add_branch(Field::DestAddr, dest_addr_domain())
            .unwrap();

        graph.add_edge(src_a, shared, "109.230.37.2").unwrap();
        graph.add_edge(src_b, shared, "10.1.0.3").unwrap();

        assert_eq!(graph.edges(src_a).unwrap()[0].target, shared);
        assert_eq!(graph.edges(src_b).unwrap()[0].target, shared);
    }

    #[test]
    fn test_distinct_values_from_one_node() {
        let (mut graph, src, dst) = two_layer_graph();
        for addr in ["109.230.37.1", "109.230.37.2", "109.230.37.3"] {
            graph.add_edge(src, dst, addr).unwrap();
        }
        let literals: Vec<_> = graph
            .edges(src)
            .unwrap()
            .iter()
            .map(|e| e.literal.as_str())
            .collect();
        // Insertion order is precedence order
        assert_eq!(literals, ["109.230.37.1", "109.230.37.2", "109.230.37.3"]);
    }

    #[test]
    fn test_unknown_handle_rejected() {
        let (mut graph, src, _) = two_layer_graph();
        let stale = NodeId(99);
        assert_eq!(
            graph.add_edge(src, stale, "109.230.37.1").unwrap_err(),
            Error::UnknownNode(stale)
        );
        assert_eq!(
            graph.add_edge(stale, src, "109.230.37.1").unwrap_err(),
            Error::UnknownNode(stale)
        );
        assert!(graph.node(stale).is_err());
    }

    #[test]
    fn test_node_id_serde_round_trip() {
        let id = NodeId(7);
        let json = serde_json::to_string(&id).unwrap();
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
