// Decoded over-the-air packets — what the transport hands us
//
// The transport owns framing, parsing, and the physical send. What reaches
// this crate is the already-decoded record. A zero-length payload on a
// contact packet signals an acknowledgment for the data message carrying
// the same id.

use serde::{Deserialize, Serialize};

use crate::address::{Address, PacketId, RelayKey};

/// Point-to-point relay traffic (data or ack)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRelayPacket {
    pub id: PacketId,
    pub source: Address,
    pub dest: Address,
    /// Neighbor this copy arrived from
    pub prev_hop: Address,
    /// Neighbor the sender intends next (meaningful on fixed routes)
    pub next_hop: Address,
    pub payload: Vec<u8>,
}

/// Mesh route-discovery probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequestPacket {
    pub id: PacketId,
    pub source: Address,
    pub dest: Address,
    /// Opaque probe data, carried unmodified through the flood
    pub payload: Vec<u8>,
}

/// Every packet class the transport can hand us
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    ContactRelay(ContactRelayPacket),
    RouteRequest(RouteRequestPacket),
}

impl ContactRelayPacket {
    /// Zero-length payload signals an acknowledgment
    pub fn is_ack(&self) -> bool {
        self.payload.is_empty()
    }

    /// Key of the logical transmission this packet belongs to
    pub fn key(&self) -> RelayKey {
        RelayKey::new(self.id, self.source, self.dest, self.is_ack())
    }
}

impl RouteRequestPacket {
    pub fn is_ack(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn key(&self) -> RelayKey {
        RelayKey::new(self.id, self.source, self.dest, self.is_ack())
    }
}

impl Packet {
    /// Short class name for diagnostics and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Packet::ContactRelay(_) => "contact relay",
            Packet::RouteRequest(_) => "route request",
        }
    }

    pub fn key(&self) -> RelayKey {
        match self {
            Packet::ContactRelay(p) => p.key(),
            Packet::RouteRequest(p) => p.key(),
        }
    }

    pub fn dest(&self) -> Address {
        match self {
            Packet::ContactRelay(p) => p.dest,
            Packet::RouteRequest(p) => p.dest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_relay(payload: Vec<u8>) -> ContactRelayPacket {
        ContactRelayPacket {
            id: PacketId::new(10).unwrap(),
            source: 1,
            dest: 2,
            prev_hop: 1,
            next_hop: 3,
            payload,
        }
    }

    #[test]
    fn test_zero_payload_is_ack() {
        assert!(make_relay(vec![]).is_ack());
        assert!(!make_relay(vec![0xAB]).is_ack());
    }

    #[test]
    fn test_data_and_ack_produce_distinct_keys() {
        let data = make_relay(vec![1, 2, 3]);
        let ack = make_relay(vec![]);

        assert_ne!(data.key(), ack.key());
        assert!(ack.key().is_ack);
        assert!(!data.key().is_ack);
    }

    #[test]
    fn test_retransmission_keeps_the_key() {
        let first = make_relay(vec![1]);
        let mut second = first.clone();
        // A later hop rewrites only the hop fields
        second.prev_hop = 3;
        second.next_hop = 2;

        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn test_packet_kind_names() {
        let relay = Packet::ContactRelay(make_relay(vec![]));
        let probe = Packet::RouteRequest(RouteRequestPacket {
            id: PacketId::new(1).unwrap(),
            source: 1,
            dest: 2,
            payload: vec![9],
        });

        assert_eq!(relay.kind(), "contact relay");
        assert_eq!(probe.kind(), "route request");
    }

    #[test]
    fn test_packet_serialization() {
        let packet = Packet::ContactRelay(make_relay(vec![5, 6]));
        let bytes = bincode::serialize(&packet).unwrap();
        let restored: Packet = bincode::deserialize(&bytes).unwrap();

        assert_eq!(packet, restored);
    }

    #[test]
    fn test_oversized_id_fails_deserialization() {
        // Serde goes through the same validation as PacketId::new
        let bytes = bincode::serialize(&(PacketId::MAX + 1)).unwrap();
        assert!(bincode::deserialize::<PacketId>(&bytes).is_err());
    }
}
