use thiserror::Error;

use crate::core::field::Field;
use crate::core::graph::NodeId;

/// Core error types for rulegraph
///
/// Every failure is synchronous and local: a returned error guarantees the
/// graph and all domain pools are exactly as they were before the call.
///
/// The historical "value not available" condition is split in two so callers
/// can tell a mistyped rule from a colliding one: [`Error::NeverInDomain`]
/// means the literal was never part of the declared range or enumeration,
/// [`Error::AlreadyConsumed`] means an earlier edge claimed it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Literal encodes fine but was never in the declared range/enumeration
    #[error("{field} value {literal:?} is outside the declared range or enumeration")]
    NeverInDomain { field: Field, literal: String },

    /// Literal was admissible once but an earlier edge consumed it
    #[error("{field} value {literal:?} was already claimed by an earlier edge")]
    AlreadyConsumed { field: Field, literal: String },

    /// Literal does not parse as the field's external form at all
    #[error("malformed {field} literal {literal:?}")]
    MalformedLiteral { field: Field, literal: String },

    /// Literal is well-formed but not one of the enumeration's declared names
    #[error("{literal:?} is not a declared {field} literal")]
    UnrecognizedLiteral { field: Field, literal: String },

    /// Terminal decision literal is not in the action enumeration
    #[error("{decision:?} is not a declared action literal")]
    UnrecognizedDecision { decision: String },

    /// Enumeration construction saw the same literal twice
    #[error("duplicate {field} literal {literal:?} in enumeration")]
    DuplicateLiteral { field: Field, literal: String },

    /// Edge target sits at the wrong layer for this source node
    #[error("cannot wire {source} to {target}: the layer after {source} is {expected}")]
    LayerMismatch {
        source: Field,
        target: Field,
        expected: Field,
    },

    /// Terminal nodes never own outgoing edges
    #[error("{field} node is terminal and cannot own outgoing edges")]
    TerminalSource { field: Field },

    /// Domain variant does not belong to the node's header dimension
    #[error("domain does not match header dimension {field}")]
    DomainMismatch { field: Field },

    /// Range constructed with start above end
    #[error("invalid bounds: start {start} is greater than end {end}")]
    InvalidBounds { start: u64, end: u64 },

    /// Range would need more pool memory than allowed
    #[error("range spans {span} values, exceeding the maximum of {max}")]
    RangeTooLarge { span: u64, max: u64 },

    /// No external literal corresponds to this integer value
    #[error("no {field} literal corresponds to domain value {value}")]
    UndecodableValue { field: Field, value: u64 },

    /// Pipeline built without a required layer domain
    #[error("pipeline is missing a domain for the {field} layer")]
    MissingLayer { field: Field },

    /// Node handle does not belong to this graph
    #[error("unknown node handle {0:?}")]
    UnknownNode(NodeId),
}

pub type Result<T> = std::result::Result<T, Error>;
