//! Admissible value pools for header dimensions
//!
//! A [`Domain`] is the finite set of values a node may still hand out to
//! outgoing edges, together with the codec between a dimension's external
//! literal form (dotted-quad address, decimal port, protocol or action name)
//! and a dense integer space. Four concrete shapes exist behind one surface:
//!
//! | Dimension | External form | Encoding | Initial population |
//! |---|---|---|---|
//! | Source/destination address | dotted-quad string | big-endian 4-octet u32 | every value in `[encode(start), encode(end)]` |
//! | Source/destination port | decimal string | identity over `u16` | every value in `[start, end]` |
//! | Protocol | name (`tcp`, `udp`, `icmp`) | index in declared order | every declared name |
//! | Action | name (`allow`, `discard`) | index in declared order | every declared name |
//!
//! Unifying the four behind one encode/decode/availability contract lets the
//! graph layer be written once against "a pool of admissible integers",
//! independent of how each header field is textually represented.
//!
//! Consumption is one-shot and atomic: [`Domain::try_consume`] either claims
//! the value or reports why it cannot ([`Error::NeverInDomain`] vs
//! [`Error::AlreadyConsumed`]) without touching the pool. There is no
//! separate check-then-delete sequence to race against.

use std::net::Ipv4Addr;

use ipnetwork::IpNetwork;
use tracing::trace;

use crate::core::error::{Error, Result};
use crate::core::field::Field;

/// The dense integer space all external literals encode into
pub type DomainValue = u64;

/// Maximum number of values a single bounded-range pool may span
///
/// Range pools are dense bitsets sized to `end - start + 1`, so an
/// unconstrained address range (a full /0 is 2^32 values, 512 MiB of bits)
/// could exhaust memory from one malformed rule source. 2^24 values (a /8,
/// 2 MiB of bits) is well beyond any practical per-node rule population.
pub const MAX_RANGE_SPAN: u64 = 1 << 24;

/// Protocol names in declared encoding order (`tcp` -> 0, `udp` -> 1, `icmp` -> 2)
pub const PROTOCOL_LITERALS: [&str; 3] = ["tcp", "udp", "icmp"];

/// Action names in declared encoding order (`allow` -> 0, `discard` -> 1)
pub const ACTION_LITERALS: [&str; 2] = ["allow", "discard"];

/// Admissible value pool for one header dimension
///
/// Owns the codec for its dimension and the availability bookkeeping. The
/// graph layer mutates a domain only through [`Domain::claim`] /
/// [`Domain::try_consume`]; the low-level [`Domain::insert`] and
/// [`Domain::remove`] exist for pool surgery in ingestion layers and tests.
#[derive(Debug, Clone)]
pub struct Domain {
    field: Field,
    pool: Pool,
}

#[derive(Debug, Clone)]
enum Pool {
    /// Dense bitset over an inclusive `[lo, hi]` integer range
    Range(RangePool),
    /// Fixed ordered literal list with per-index availability
    Enumeration(EnumPool),
}

impl Domain {
    /// Builds an address pool over the inclusive dotted-quad range `[start, end]`.
    ///
    /// `field` must be one of the two address dimensions.
    pub fn address_range(field: Field, start: &str, end: &str) -> Result<Self> {
        if !matches!(field, Field::SourceAddr | Field::DestAddr) {
            return Err(Error::DomainMismatch { field });
        }
        let lo = encode_address(field, start)?;
        let hi = encode_address(field, end)?;
        Ok(Self {
            field,
            pool: Pool::Range(RangePool::new(lo, hi)?),
        })
    }

    /// Builds an address pool covering every address in a CIDR block.
    ///
    /// Convenience over [`Domain::address_range`] for rule sources expressed
    /// in network notation. IPv6 blocks are rejected: the address codec is
    /// 32-bit.
    pub fn address_block(field: Field, network: &IpNetwork) -> Result<Self> {
        match network {
            IpNetwork::V4(net) => {
                if !matches!(field, Field::SourceAddr | Field::DestAddr) {
                    return Err(Error::DomainMismatch { field });
                }
                let lo = DomainValue::from(u32::from(net.network()));
                let hi = DomainValue::from(u32::from(net.broadcast()));
                Ok(Self {
                    field,
                    pool: Pool::Range(RangePool::new(lo, hi)?),
                })
            }
            IpNetwork::V6(_) => Err(Error::MalformedLiteral {
                field,
                literal: network.to_string(),
            }),
        }
    }

    /// Builds a port pool over the inclusive range `[start, end]`.
    ///
    /// `field` must be one of the two port dimensions.
    pub fn port_range(field: Field, start: u16, end: u16) -> Result<Self> {
        if !matches!(field, Field::SourcePort | Field::DestPort) {
            return Err(Error::DomainMismatch { field });
        }
        Ok(Self {
            field,
            pool: Pool::Range(RangePool::new(
                DomainValue::from(start),
                DomainValue::from(end),
            )?),
        })
    }

    /// The declared protocol enumeration: `tcp`, `udp`, `icmp`
    pub fn protocols() -> Self {
        Self::enumeration(Field::Protocol, &PROTOCOL_LITERALS)
            .unwrap_or_else(|_| unreachable!("declared protocol literals are distinct"))
    }

    /// The declared action enumeration: `allow`, `discard`
    pub fn actions() -> Self {
        Self::enumeration(Field::Action, &ACTION_LITERALS)
            .unwrap_or_else(|_| unreachable!("declared action literals are distinct"))
    }

    /// Builds an enumeration pool from an ordered literal list.
    ///
    /// Encoding is the literal's index in the declared order, so duplicate
    /// literals would break the collision-free contract and are rejected.
    pub fn enumeration(field: Field, literals: &[&str]) -> Result<Self> {
        if !matches!(field, Field::Protocol | Field::Action) {
            return Err(Error::DomainMismatch { field });
        }
        let mut seen: Vec<String> = Vec::with_capacity(literals.len());
        for literal in literals {
            if seen.iter().any(|l| l == literal) {
                return Err(Error::DuplicateLiteral {
                    field,
                    literal: (*literal).to_string(),
                });
            }
            seen.push((*literal).to_string());
        }
        let available = vec![true; seen.len()];
        Ok(Self {
            field,
            pool: Pool::Enumeration(EnumPool {
                literals: seen,
                available,
            }),
        })
    }

    /// The header dimension this pool belongs to
    pub const fn field(&self) -> Field {
        self.field
    }

    /// Encodes an external literal into its integer form.
    ///
    /// Deterministic and collision-free; does not consult availability, so a
    /// well-formed literal outside the declared range still encodes (and then
    /// reports as not [`Domain::contains`]).
    pub fn encode(&self, literal: &str) -> Result<DomainValue> {
        match &self.pool {
            Pool::Range(_) => match self.field {
                Field::SourceAddr | Field::DestAddr => encode_address(self.field, literal),
                Field::SourcePort | Field::DestPort => encode_port(self.field, literal),
                // Constructors pin range pools to address/port dimensions
                Field::Protocol | Field::Action => Err(Error::DomainMismatch { field: self.field }),
            },
            Pool::Enumeration(pool) => pool
                .literals
                .iter()
                .position(|l| l == literal)
                .map(|i| i as DomainValue)
                .ok_or_else(|| Error::UnrecognizedLiteral {
                    field: self.field,
                    literal: literal.to_string(),
                }),
        }
    }

    /// Decodes an integer back to its external literal form.
    ///
    /// Exact inverse of [`Domain::encode`] for every value that encoding can
    /// produce; independent of availability.
    pub fn decode(&self, value: DomainValue) -> Result<String> {
        match &self.pool {
            Pool::Range(_) => match self.field {
                Field::SourceAddr | Field::DestAddr => u32::try_from(value)
                    .map(|v| Ipv4Addr::from(v).to_string())
                    .map_err(|_| Error::UndecodableValue {
                        field: self.field,
                        value,
                    }),
                Field::SourcePort | Field::DestPort => u16::try_from(value)
                    .map(|v| v.to_string())
                    .map_err(|_| Error::UndecodableValue {
                        field: self.field,
                        value,
                    }),
                Field::Protocol | Field::Action => Err(Error::DomainMismatch { field: self.field }),
            },
            Pool::Enumeration(pool) => pool
                .literals
                .get(usize::try_from(value).unwrap_or(usize::MAX))
                .cloned()
                .ok_or(Error::UndecodableValue {
                    field: self.field,
                    value,
                }),
        }
    }

    /// Membership test against *current* availability, not the original population
    pub fn contains(&self, value: DomainValue) -> bool {
        match &self.pool {
            Pool::Range(pool) => pool.contains(value),
            Pool::Enumeration(pool) => pool
                .available
                .get(usize::try_from(value).unwrap_or(usize::MAX))
                .copied()
                .unwrap_or(false),
        }
    }

    /// Low-level pool mutation: makes a value available again.
    ///
    /// Returns `false` if the value lies outside the declared universe or is
    /// already available. Graph edge insertion never calls this; consumed
    /// values stay consumed.
    pub fn insert(&mut self, value: DomainValue) -> bool {
        match &mut self.pool {
            Pool::Range(pool) => pool.set(value),
            Pool::Enumeration(pool) => {
                match pool.available.get_mut(usize::try_from(value).unwrap_or(usize::MAX)) {
                    Some(slot @ false) => {
                        *slot = true;
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    /// Low-level pool mutation: withdraws a value without error reporting.
    ///
    /// Returns `true` if the value was available and is now gone.
    pub fn remove(&mut self, value: DomainValue) -> bool {
        match &mut self.pool {
            Pool::Range(pool) => pool.claim(value),
            Pool::Enumeration(pool) => {
                match pool.available.get_mut(usize::try_from(value).unwrap_or(usize::MAX)) {
                    Some(slot @ true) => {
                        *slot = false;
                        true
                    }
                    _ => false,
                }
            }
        }
    }

    /// Atomically claims an integer value from the pool.
    ///
    /// On failure nothing changes: [`Error::NeverInDomain`] if the value was
    /// never in the declared universe, [`Error::AlreadyConsumed`] if an
    /// earlier claim took it.
    pub fn try_consume(&mut self, value: DomainValue) -> Result<()> {
        let shown = self
            .decode(value)
            .unwrap_or_else(|_| value.to_string());
        let claimed = match &mut self.pool {
            Pool::Range(pool) => {
                if !pool.in_bounds(value) {
                    return Err(Error::NeverInDomain {
                        field: self.field,
                        literal: shown,
                    });
                }
                pool.claim(value)
            }
            Pool::Enumeration(pool) => {
                match pool.available.get_mut(usize::try_from(value).unwrap_or(usize::MAX)) {
                    None => {
                        return Err(Error::NeverInDomain {
                            field: self.field,
                            literal: shown,
                        });
                    }
                    Some(slot @ true) => {
                        *slot = false;
                        true
                    }
                    Some(_) => false,
                }
            }
        };
        if claimed {
            trace!(field = self.field.as_str(), value = %shown, "value consumed");
            Ok(())
        } else {
            Err(Error::AlreadyConsumed {
                field: self.field,
                literal: shown,
            })
        }
    }

    /// Encodes a literal and atomically claims it in one step.
    ///
    /// This is the primitive graph edge insertion uses; errors carry the raw
    /// literal as the caller supplied it.
    pub fn claim(&mut self, literal: &str) -> Result<DomainValue> {
        let value = self.encode(literal)?;
        match self.try_consume(value) {
            Ok(()) => Ok(value),
            Err(Error::NeverInDomain { field, .. }) => Err(Error::NeverInDomain {
                field,
                literal: literal.to_string(),
            }),
            Err(Error::AlreadyConsumed { field, .. }) => Err(Error::AlreadyConsumed {
                field,
                literal: literal.to_string(),
            }),
            Err(other) => Err(other),
        }
    }

    /// Number of values still available
    pub fn len(&self) -> u64 {
        match &self.pool {
            Pool::Range(pool) => pool.remaining,
            Pool::Enumeration(pool) => pool.available.iter().filter(|a| **a).count() as u64,
        }
    }

    /// Returns `true` once every value has been consumed or withdrawn
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn encode_address(field: Field, literal: &str) -> Result<DomainValue> {
    literal
        .parse::<Ipv4Addr>()
        .map(|addr| DomainValue::from(u32::from(addr)))
        .map_err(|_| Error::MalformedLiteral {
            field,
            literal: literal.to_string(),
        })
}

fn encode_port(field: Field, literal: &str) -> Result<DomainValue> {
    literal
        .trim()
        .parse::<u16>()
        .map(DomainValue::from)
        .map_err(|_| Error::MalformedLiteral {
            field,
            literal: literal.to_string(),
        })
}

/// Dense bitset over an inclusive integer range, one bit per value
#[derive(Debug, Clone)]
struct RangePool {
    lo: DomainValue,
    hi: DomainValue,
    words: Vec<u64>,
    remaining: u64,
}

impl RangePool {
    fn new(lo: DomainValue, hi: DomainValue) -> Result<Self> {
        if lo > hi {
            return Err(Error::InvalidBounds { start: lo, end: hi });
        }
        let span = hi - lo + 1;
        if span > MAX_RANGE_SPAN {
            return Err(Error::RangeTooLarge {
                span,
                max: MAX_RANGE_SPAN,
            });
        }
        let word_count = (span as usize).div_ceil(64);
        let mut words = vec![u64::MAX; word_count];
        // Clear the bits past the end of the range in the final word
        let tail = (span % 64) as u32;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        Ok(Self {
            lo,
            hi,
            words,
            remaining: span,
        })
    }

    fn in_bounds(&self, value: DomainValue) -> bool {
        value >= self.lo && value <= self.hi
    }

    fn slot(&self, value: DomainValue) -> Option<(usize, u64)> {
        if !self.in_bounds(value) {
            return None;
        }
        let offset = (value - self.lo) as usize;
        Some((offset / 64, 1u64 << (offset % 64)))
    }

    fn contains(&self, value: DomainValue) -> bool {
        self.slot(value)
            .is_some_and(|(word, mask)| self.words[word] & mask != 0)
    }

    fn claim(&mut self, value: DomainValue) -> bool {
        match self.slot(value) {
            Some((word, mask)) if self.words[word] & mask != 0 => {
                self.words[word] &= !mask;
                self.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn set(&mut self, value: DomainValue) -> bool {
        match self.slot(value) {
            Some((word, mask)) if self.words[word] & mask == 0 => {
                self.words[word] |= mask;
                self.remaining += 1;
                true
            }
            _ => false,
        }
    }
}

/// Fixed ordered literal list with per-index availability
#[derive(Debug, Clone)]
struct EnumPool {
    literals: Vec<String>,
    available: Vec<bool>,
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_address_codec_round_trips(value in any::<u32>()) {
            let domain = Domain::address_range(Field::SourceAddr, "10.0.0.1", "10.0.0.2").unwrap();
            let literal = domain.decode(DomainValue::from(value)).unwrap();
            prop_assert_eq!(domain.encode(&literal).unwrap(), DomainValue::from(value));
        }

        #[test]
        fn test_port_codec_round_trips(port in any::<u16>()) {
            let domain = Domain::port_range(Field::DestPort, 1, 65535).unwrap();
            let literal = domain.decode(DomainValue::from(port)).unwrap();
            prop_assert_eq!(domain.encode(&literal).unwrap(), DomainValue::from(port));
        }

        #[test]
        fn test_port_availability_matches_declared_bounds(
            start in 1u16..=1000,
            span in 0u16..=1000,
            probe in 0u32..=70000,
        ) {
            let end = start.saturating_add(span);
            let domain = Domain::port_range(Field::SourcePort, start, end).unwrap();
            let in_bounds = probe >= u32::from(start) && probe <= u32::from(end);
            prop_assert_eq!(domain.contains(DomainValue::from(probe)), in_bounds);
        }

        #[test]
        fn test_second_claim_always_fails(offset in 0u64..10) {
            let mut domain = Domain::port_range(Field::SourcePort, 100, 110).unwrap();
            let value = 100 + offset;
            prop_assert!(domain.try_consume(value).is_ok());
            prop_assert_eq!(
                domain.try_consume(value).unwrap_err(),
                Error::AlreadyConsumed {
                    field: Field::SourcePort,
                    literal: value.to_string(),
                }
            );
        }
    }
}
