//! Flood-mode probe bookkeeping
//!
//! Mesh mode has no precomputed route; duplicate suppression is the only
//! thing standing between a probe and an endless relay loop. The metadata
//! is a pure record of the probe as first heard — any mutation belongs to
//! the route table that consumes discovery results.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::{Address, PacketId, RelayKey};
use crate::packet::Packet;
use crate::RelayError;

/// One flood-mode route-discovery probe, immutable once recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshMetadata {
    id: PacketId,
    source: Address,
    dest: Address,
    /// Opaque probe payload, carried unmodified through the flood
    data: Vec<u8>,
}

impl MeshMetadata {
    /// Pure data holder; always succeeds.
    pub fn new(id: PacketId, source: Address, dest: Address, data: Vec<u8>) -> Self {
        Self {
            id,
            source,
            dest,
            data,
        }
    }

    /// Build from a decoded route request; any other class is a
    /// `TypeMismatch`.
    pub fn from_packet(packet: &Packet) -> Result<Self, RelayError> {
        match packet {
            Packet::RouteRequest(p) => Ok(Self::new(p.id, p.source, p.dest, p.payload.clone())),
            other => Err(RelayError::TypeMismatch {
                expected: "route request",
                got: other.kind(),
            }),
        }
    }

    /// Lookup key into the relay table
    pub fn key(&self) -> RelayKey {
        RelayKey::new(self.id, self.source, self.dest, self.data.is_empty())
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

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for MeshMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<RouteProbe id={} route={}->?->{} payload={}>",
            self.id,
            self.source,
            self.dest,
            hex::encode(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ContactRelayPacket, RouteRequestPacket};

    fn make_probe(payload: Vec<u8>) -> Packet {
        Packet::RouteRequest(RouteRequestPacket {
            id: PacketId::new(33).unwrap(),
            source: 2,
            dest: 9,
            payload,
        })
    }

    #[test]
    fn test_new_always_succeeds() {
        let meta = MeshMetadata::new(PacketId::new(1).unwrap(), 2, 9, vec![0xCA, 0xFE]);

        assert_eq!(meta.source(), 2);
        assert_eq!(meta.dest(), 9);
        assert_eq!(meta.data(), &[0xCA, 0xFE]);
    }

    #[test]
    fn test_from_packet_copies_probe_data() {
        let meta = MeshMetadata::from_packet(&make_probe(vec![7, 8])).unwrap();
        assert_eq!(meta.data(), &[7, 8]);
        assert!(!meta.key().is_ack);
    }

    #[test]
    fn test_from_wrong_packet_class_fails() {
        let relay = Packet::ContactRelay(ContactRelayPacket {
            id: PacketId::new(33).unwrap(),
            source: 2,
            dest: 9,
            prev_hop: 2,
            next_hop: 3,
            payload: vec![],
        });

        let err = MeshMetadata::from_packet(&relay).unwrap_err();
        assert!(matches!(err, RelayError::TypeMismatch { .. }));
    }

    #[test]
    fn test_empty_probe_keys_as_ack_class() {
        let data = MeshMetadata::from_packet(&make_probe(vec![1])).unwrap();
        let empty = MeshMetadata::from_packet(&make_probe(vec![])).unwrap();

        assert_ne!(data.key(), empty.key());
    }

    #[test]
    fn test_display_rendering() {
        let meta = MeshMetadata::new(PacketId::new(5).unwrap(), 2, 9, vec![0xAB]);
        assert_eq!(meta.to_string(), "<RouteProbe id=5 route=2->?->9 payload=ab>");
    }
}
