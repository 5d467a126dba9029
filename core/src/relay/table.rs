//! Relay table — the keyed arena of relay state
//!
//! Owns every metadata entity, keyed by `RelayKey`. The engine only borrows
//! entries for the duration of a single decision; aging and capacity
//! eviction happen here and nowhere else. The table is dependency-injected
//! into the engine, never process-wide state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::RelayKey;
use crate::packet::Packet;
use crate::relay::contact::ContactRelayMetadata;
use crate::relay::current_timestamp;
use crate::relay::mesh::MeshMetadata;
use crate::RelayError;

/// Default cap on tracked entries per class
const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Default entry lifetime in seconds
const DEFAULT_TTL_SECS: u64 = 600;

/// A recorded flood probe plus the moment we first heard it
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteEntry {
    meta: MeshMetadata,
    recorded_at: u64,
}

/// What a sweep removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_contacts: usize,
    pub expired_routes: usize,
}

/// Table occupancy, for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub contact_entries: usize,
    pub route_entries: usize,
}

/// Keyed store for relay metadata, with TTL aging and a capacity cap
pub struct RelayTable {
    contacts: HashMap<RelayKey, ContactRelayMetadata>,
    routes: HashMap<RelayKey, RouteEntry>,
    max_entries: usize,
    ttl_secs: u64,
}

impl RelayTable {
    /// Create a table with default limits
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS)
    }

    /// Create a table with custom capacity and entry lifetime
    pub fn with_limits(max_entries: usize, ttl_secs: u64) -> Self {
        Self {
            contacts: HashMap::new(),
            routes: HashMap::new(),
            max_entries,
            ttl_secs,
        }
    }

    // ------------------------------------------------------------------
    // Contact relay entries
    // ------------------------------------------------------------------

    pub fn contact(&self, key: &RelayKey) -> Option<&ContactRelayMetadata> {
        self.contacts.get(key)
    }

    pub fn contact_mut(&mut self, key: &RelayKey) -> Option<&mut ContactRelayMetadata> {
        self.contacts.get_mut(key)
    }

    /// Look up the entry for this packet, creating it on first observation.
    ///
    /// Fails with `TypeMismatch` for non-relay packet classes; the table is
    /// left untouched in that case.
    pub fn contact_entry(
        &mut self,
        packet: &Packet,
    ) -> Result<&mut ContactRelayMetadata, RelayError> {
        let key = match packet {
            Packet::ContactRelay(p) => p.key(),
            other => {
                return Err(RelayError::TypeMismatch {
                    expected: "contact relay",
                    got: other.kind(),
                })
            }
        };

        if !self.contacts.contains_key(&key) && self.contacts.len() >= self.max_entries {
            self.evict_oldest_contact();
        }

        match self.contacts.entry(key) {
            std::collections::hash_map::Entry::Occupied(e) => Ok(e.into_mut()),
            std::collections::hash_map::Entry::Vacant(e) => {
                Ok(e.insert(ContactRelayMetadata::from_packet(packet)?))
            }
        }
    }

    /// Insert prebuilt metadata, keyed by its own key
    pub fn record_contact(&mut self, meta: ContactRelayMetadata) {
        if !self.contacts.contains_key(&meta.key()) && self.contacts.len() >= self.max_entries {
            self.evict_oldest_contact();
        }
        self.contacts.insert(meta.key(), meta);
    }

    pub fn remove_contact(&mut self, key: &RelayKey) -> Option<ContactRelayMetadata> {
        self.contacts.remove(key)
    }

    // ------------------------------------------------------------------
    // Flood probe entries
    // ------------------------------------------------------------------

    pub fn route(&self, key: &RelayKey) -> Option<&MeshMetadata> {
        self.routes.get(key).map(|e| &e.meta)
    }

    pub fn has_route(&self, key: &RelayKey) -> bool {
        self.routes.contains_key(key)
    }

    /// Record a flood probe the node just heard for the first time
    pub fn record_route(&mut self, meta: MeshMetadata) {
        if !self.routes.contains_key(&meta.key()) && self.routes.len() >= self.max_entries {
            self.evict_oldest_route();
        }
        self.routes.insert(
            meta.key(),
            RouteEntry {
                meta,
                recorded_at: current_timestamp(),
            },
        );
    }

    pub fn remove_route(&mut self, key: &RelayKey) -> Option<MeshMetadata> {
        self.routes.remove(key).map(|e| e.meta)
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Remove entries whose freshness stamp is older than the TTL.
    ///
    /// Contacts age on `last_seen` (the last sent-to mutation), probes on
    /// the moment they were recorded.
    pub fn sweep(&mut self, now: u64) -> SweepReport {
        let ttl = self.ttl_secs;

        let contacts_before = self.contacts.len();
        self.contacts
            .retain(|_, meta| now.saturating_sub(meta.last_seen()) < ttl);

        let routes_before = self.routes.len();
        self.routes
            .retain(|_, entry| now.saturating_sub(entry.recorded_at) < ttl);

        SweepReport {
            expired_contacts: contacts_before - self.contacts.len(),
            expired_routes: routes_before - self.routes.len(),
        }
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            contact_entries: self.contacts.len(),
            route_entries: self.routes.len(),
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Drop the contact entry with the smallest freshness stamp
    fn evict_oldest_contact(&mut self) {
        let oldest = self
            .contacts
            .iter()
            .min_by_key(|(_, meta)| meta.last_seen())
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.contacts.remove(&key);
        }
    }

    /// Drop the probe entry heard longest ago
    fn evict_oldest_route(&mut self) {
        let oldest = self
            .routes
            .iter()
            .min_by_key(|(_, entry)| entry.recorded_at)
            .map(|(key, _)| *key);
        if let Some(key) = oldest {
            self.routes.remove(&key);
        }
    }
}

impl Default for RelayTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::PacketId;
    use crate::packet::{ContactRelayPacket, RouteRequestPacket};

    fn make_packet(id: u16) -> Packet {
        Packet::ContactRelay(ContactRelayPacket {
            id: PacketId::new(id).unwrap(),
            source: 1,
            dest: 5,
            prev_hop: 1,
            next_hop: 3,
            payload: vec![1],
        })
    }

    fn make_probe(id: u16) -> MeshMetadata {
        MeshMetadata::from_packet(&Packet::RouteRequest(RouteRequestPacket {
            id: PacketId::new(id).unwrap(),
            source: 1,
            dest: 5,
            payload: vec![9],
        }))
        .unwrap()
    }

    #[test]
    fn test_contact_entry_creates_then_reuses() {
        let mut table = RelayTable::new();
        let packet = make_packet(1);

        let key = table.contact_entry(&packet).unwrap().key();
        assert_eq!(table.contact_count(), 1);

        table.contact_entry(&packet).unwrap().mark_sent_to(4);
        // Second lookup reuses the same entry instead of resetting it
        assert!(table.contact(&key).unwrap().was_sent_to(4));
        assert_eq!(table.contact_count(), 1);
    }

    #[test]
    fn test_contact_entry_rejects_wrong_class() {
        let mut table = RelayTable::new();
        let probe = Packet::RouteRequest(RouteRequestPacket {
            id: PacketId::new(1).unwrap(),
            source: 1,
            dest: 5,
            payload: vec![],
        });

        assert!(table.contact_entry(&probe).is_err());
        assert_eq!(table.contact_count(), 0);
    }

    #[test]
    fn test_remove_contact() {
        let mut table = RelayTable::new();
        let key = table.contact_entry(&make_packet(1)).unwrap().key();

        assert!(table.remove_contact(&key).is_some());
        assert!(table.contact(&key).is_none());
        assert!(table.remove_contact(&key).is_none());
    }

    #[test]
    fn test_route_record_and_lookup() {
        let mut table = RelayTable::new();
        let probe = make_probe(2);
        let key = probe.key();

        assert!(!table.has_route(&key));
        table.record_route(probe);
        assert!(table.has_route(&key));
        assert_eq!(table.route(&key).unwrap().data(), &[9]);

        assert!(table.remove_route(&key).is_some());
        assert!(!table.has_route(&key));
    }

    #[test]
    fn test_capacity_evicts_oldest_contact() {
        let mut table = RelayTable::with_limits(2, 600);

        table.contact_entry(&make_packet(1)).unwrap();
        table.contact_entry(&make_packet(2)).unwrap().mark_sent_to(4);
        // id=1 still has last_seen == 0, so it is the eviction victim
        let key3 = table.contact_entry(&make_packet(3)).unwrap().key();

        assert_eq!(table.contact_count(), 2);
        assert!(table.contact(&make_packet(1).key()).is_none());
        assert!(table.contact(&make_packet(2).key()).is_some());
        assert!(table.contact(&key3).is_some());
    }

    #[test]
    fn test_sweep_expires_stale_entries() {
        let mut table = RelayTable::with_limits(16, 600);

        table.contact_entry(&make_packet(1)).unwrap().mark_sent_to(4);
        table.record_route(make_probe(2));

        let report = table.sweep(current_timestamp() + 1);
        assert_eq!(
            report,
            SweepReport {
                expired_contacts: 0,
                expired_routes: 0
            }
        );

        let report = table.sweep(current_timestamp() + 601);
        assert_eq!(report.expired_contacts, 1);
        assert_eq!(report.expired_routes, 1);
        assert_eq!(table.contact_count(), 0);
        assert_eq!(table.route_count(), 0);
    }

    #[test]
    fn test_summary_counts() {
        let mut table = RelayTable::new();
        table.contact_entry(&make_packet(1)).unwrap();
        table.record_route(make_probe(2));
        table.record_route(make_probe(3));

        let summary = table.summary();
        assert_eq!(summary.contact_entries, 1);
        assert_eq!(summary.route_entries, 2);
    }
}
