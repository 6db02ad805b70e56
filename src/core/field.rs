//! Header-dimension tags and the fixed layer pipeline
//!
//! Every node in the decision graph is tagged with the packet-header
//! dimension it examines. The pipeline order is fixed: source address,
//! destination address, source port, destination port, protocol, action.
//! [`Field::next_layer`] is the single lookup table that pins which
//! dimension may follow which; edge insertion consults it so an illegal
//! layer connection is rejected at the call site that builds the graph.

use serde::{Deserialize, Serialize};

/// Packet-header dimension examined at one layer of the decision graph
///
/// `Copy` trait allows efficient passing by value for this small enum.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum Field {
    /// Source IPv4 address (first layer)
    #[strum(serialize = "source-address")]
    SourceAddr,
    /// Destination IPv4 address
    #[strum(serialize = "destination-address")]
    DestAddr,
    /// Source transport port
    #[strum(serialize = "source-port")]
    SourcePort,
    /// Destination transport port
    #[strum(serialize = "destination-port")]
    DestPort,
    /// Transport protocol name
    #[strum(serialize = "protocol")]
    Protocol,
    /// Terminal action (decision layer, no successor)
    #[strum(serialize = "action")]
    Action,
}

impl Field {
    /// Returns the lowercase tag as a static string for log and error output
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::SourceAddr => "source-address",
            Field::DestAddr => "destination-address",
            Field::SourcePort => "source-port",
            Field::DestPort => "destination-port",
            Field::Protocol => "protocol",
            Field::Action => "action",
        }
    }

    /// Returns display name for diagnostics
    pub const fn display_name(self) -> &'static str {
        match self {
            Field::SourceAddr => "Source Address",
            Field::DestAddr => "Destination Address",
            Field::SourcePort => "Source Port",
            Field::DestPort => "Destination Port",
            Field::Protocol => "Protocol",
            Field::Action => "Action",
        }
    }

    /// The dimension that must follow this one in the pipeline.
    ///
    /// Returns `None` for [`Field::Action`], which terminates every path.
    /// Edge insertion uses this table to reject wiring a node to a target
    /// at the wrong layer.
    pub const fn next_layer(self) -> Option<Field> {
        match self {
            Field::SourceAddr => Some(Field::DestAddr),
            Field::DestAddr => Some(Field::SourcePort),
            Field::SourcePort => Some(Field::DestPort),
            Field::DestPort => Some(Field::Protocol),
            Field::Protocol => Some(Field::Action),
            Field::Action => None,
        }
    }

    /// Returns `true` for the decision layer, which carries no outgoing edges
    pub const fn is_terminal(self) -> bool {
        matches!(self, Field::Action)
    }
}

/// Required because [`crate::core::error::Error::LayerMismatch`] names a
/// field `source`, which thiserror treats as the error-source position.
impl std::error::Error for Field {}
