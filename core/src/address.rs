//! Node addressing and packet identity
//!
//! Addresses are small integers handed out by the network. A packet id is a
//! fixed-width bit field that rides along unchanged through every hop, so a
//! node can recognize a message it has already handled no matter which
//! neighbor is currently carrying it. Together with the route endpoints and
//! the ack flag, the id forms the `RelayKey` that names one logical
//! transmission.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RelayError;

/// Integer node identifier assigned by the network
pub type Address = u16;

/// Packet identity — a 12-bit value packed into the wire header.
///
/// Stable across retransmissions: every hop carries the same id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub struct PacketId(u16);

impl PacketId {
    /// Width of the id field on the wire
    pub const BITS: u32 = 12;
    /// Largest representable id
    pub const MAX: u16 = (1 << Self::BITS) - 1;

    /// Validate a raw id against the wire width.
    ///
    /// Out-of-range values are rejected rather than masked — masking would
    /// let two distinct raw values collide after decoding.
    pub fn new(raw: u16) -> Result<Self, RelayError> {
        if raw > Self::MAX {
            return Err(RelayError::IdOutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// The raw value as packed on the wire
    pub fn value(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for PacketId {
    type Error = RelayError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<PacketId> for u16 {
    fn from(id: PacketId) -> Self {
        id.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique lookup key for one logical transmission.
///
/// Two packets producing the same key are retransmissions of the same
/// logical event, never new messages. An acknowledgment shares the data
/// message's id but is a separate logical event, so the ack flag
/// participates in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelayKey {
    pub id: PacketId,
    pub source: Address,
    pub dest: Address,
    pub is_ack: bool,
}

impl RelayKey {
    /// Derive the key for a transmission. Pure and total: identical inputs
    /// always yield the identical key.
    pub fn new(id: PacketId, source: Address, dest: Address, is_ack: bool) -> Self {
        Self {
            id,
            source,
            dest,
            is_ack,
        }
    }
}

impl fmt::Display for RelayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}{}",
            self.id,
            self.source,
            self.dest,
            if self.is_ack { " (ack)" } else { "" }
        )
    }
}
