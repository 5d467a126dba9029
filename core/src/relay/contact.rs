//! Per-message relay bookkeeping for point-to-point traffic
//!
//! One `ContactRelayMetadata` tracks one logical transmission: where it
//! first entered our radio horizon, where the current copy came from, and
//! every neighbor that already received a copy. The sent-to set is the
//! anti-loop invariant — a given neighbor must never get the same logical
//! message twice.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{Address, PacketId, RelayKey};
use crate::packet::Packet;
use crate::relay::current_timestamp;
use crate::RelayError;

/// Relay state for one logical point-to-point exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRelayMetadata {
    id: PacketId,
    source: Address,
    dest: Address,
    /// Hop observed on the very first copy; never overwritten
    initial_hop: Address,
    /// Hop the current copy arrived from
    prev_hop: Address,
    /// Most recently chosen forwarding target
    next_hop: Address,
    is_ack: bool,
    /// Neighbors that already received this message
    sent_to: HashSet<Address>,
    /// Unix seconds of the last sent-to mutation; table aging reads this
    last_seen: u64,
}

impl ContactRelayMetadata {
    /// Build metadata from the first observed copy of a message.
    ///
    /// Only contact relay packets carry relay bookkeeping; any other class
    /// is a `TypeMismatch` and constructs nothing.
    pub fn from_packet(packet: &Packet) -> Result<Self, RelayError> {
        let relay = match packet {
            Packet::ContactRelay(p) => p,
            other => {
                return Err(RelayError::TypeMismatch {
                    expected: "contact relay",
                    got: other.kind(),
                })
            }
        };

        Ok(Self {
            id: relay.id,
            source: relay.source,
            dest: relay.dest,
            initial_hop: relay.prev_hop,
            prev_hop: relay.prev_hop,
            next_hop: relay.next_hop,
            is_ack: relay.is_ack(),
            sent_to: HashSet::new(),
            last_seen: 0,
        })
    }

    /// Lookup key into the relay table
    pub fn key(&self) -> RelayKey {
        RelayKey::new(self.id, self.source, self.dest, self.is_ack)
    }

    /// Record a retransmission arriving via `prev_hop`, aimed at
    /// `next_hop`. The initial hop stays untouched.
    pub fn observe(&mut self, prev_hop: Address, next_hop: Address) {
        self.prev_hop = prev_hop;
        self.next_hop = next_hop;
    }

    /// Has this neighbor already received a copy?
    pub fn was_sent_to(&self, addr: Address) -> bool {
        self.sent_to.contains(&addr)
    }

    /// Record a forward to `addr`.
    ///
    /// Idempotent on the set; always updates the chosen next hop and
    /// refreshes the freshness stamp.
    pub fn mark_sent_to(&mut self, addr: Address) {
        self.sent_to.insert(addr);
        self.next_hop = addr;
        self.last_seen = current_timestamp();
    }

    /// Forget every previous forward (retransmission epoch reset)
    pub fn clear_sent_history(&mut self) {
        self.sent_to.clear();
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn source(&self) -> Address {
        self.source
    }

    pub fn dest(&self) -> Address {
        self.dest
    }

    pub fn initial_hop(&self) -> Address {
        self.initial_hop
    }

    pub fn prev_hop(&self) -> Address {
        self.prev_hop
    }

    pub fn next_hop(&self) -> Address {
        self.next_hop
    }

    pub fn is_ack(&self) -> bool {
        self.is_ack
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    /// Number of neighbors that already received a copy
    pub fn sent_count(&self) -> usize {
        self.sent_to.len()
    }
}

impl fmt::Display for ContactRelayMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = if self.is_ack { "Ack" } else { "Relay" };
        let mut sent: Vec<Address> = self.sent_to.iter().copied().collect();
        sent.sort_unstable();
        write!(
            f,
            "<{} id={} route={}->{} init_hop={} hop={}->{} sent={:?}>",
            class, self.id, self.source, self.dest, self.initial_hop, self.prev_hop,
            self.next_hop, sent
        )
    }
}
