//! Relay decision engine
//!
//! The transport hands every packet it hears to [`RelayEngine::decide`]
//! together with the sender's delivery mode and the current neighbor set.
//! The decision says whether to forward (and to whom), suppress, or treat
//! the packet as an acknowledgment. The engine owns no sockets and never
//! blocks — sends, retries, and backoff all belong to the transport.
//!
//! Decision discipline per mode:
//! 1. **Direct route**: one predetermined next hop, sent at most once
//! 2. **Opportunistic**: any neighbor that hasn't seen the message and
//!    passes the address filter; the forward policy picks among them
//! 3. **Mesh**: unconstrained flood; duplicate suppression by relay key
//!    outranks the address filter

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::address::{Address, RelayKey};
use crate::filter::AddressFilter;
use crate::packet::Packet;
use crate::relay::mesh::MeshMetadata;
use crate::relay::table::{RelayTable, SweepReport, TableSummary};
use crate::RelayError;

/// Delivery strategy for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunicationMode {
    /// Fixed single next hop chosen by the sender
    DirectRoute,
    /// Any eligible neighbor may carry the message onward
    Opportunistic,
    /// Unconstrained flood with duplicate suppression
    Mesh,
}

impl CommunicationMode {
    /// Decode the wire code (1 = direct route, 2 = opportunistic, 3 = mesh)
    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::DirectRoute),
            2 => Some(Self::Opportunistic),
            3 => Some(Self::Mesh),
            _ => None,
        }
    }
}

impl fmt::Display for CommunicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectRoute => "direct route",
            Self::Opportunistic => "opportunistic",
            Self::Mesh => "mesh",
        })
    }
}

/// How to pick among several eligible neighbors.
///
/// Deliberately an injected policy: the subsystem guarantees only the
/// eligibility predicate, not the choice heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardPolicy {
    /// Forward to the first eligible neighbor only
    FirstEligible,
    /// Forward a copy to every eligible neighbor
    AllEligible,
}

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Addressing policy applied before any forward is committed
    pub filter: AddressFilter,
    /// Choice among eligible neighbors in opportunistic mode
    pub forward: ForwardPolicy,
    /// Capacity cap per metadata class in the relay table
    pub table_capacity: usize,
    /// Lifetime of an untouched table entry in seconds
    pub entry_ttl_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            filter: AddressFilter::AllowAll,
            forward: ForwardPolicy::FirstEligible,
            table_capacity: 1024,
            entry_ttl_secs: 600,
        }
    }
}

/// Why a packet was not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// The packet is addressed to this node; nothing to relay
    AddressedToLocal,
    /// The predetermined target already received this message
    AlreadyForwarded,
    /// The address filter bars the pair from communicating
    FilterRejected,
    /// Every neighbor either already has the message or fails the filter
    NoEligibleNeighbor,
    /// Flood probe already recorded; re-flooding would loop
    DuplicateFlood,
}

/// What the transport should do with a packet it just heard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayDecision {
    /// Send a copy to each target
    Forward {
        mode: CommunicationMode,
        targets: Vec<Address>,
    },
    /// Send nothing
    Suppress { reason: SuppressReason },
    /// Zero-payload packet addressed to us — the transmission it
    /// acknowledges can stop retransmitting
    AckConfirmed { key: RelayKey },
}

/// The relay decision engine.
///
/// Shared-state discipline: the table lives behind one `RwLock`; every
/// decision holds the write lock for a single bounded computation, the
/// periodic sweep takes the same lock. Nothing here suspends or sleeps.
pub struct RelayEngine {
    local_addr: Address,
    table: Arc<RwLock<RelayTable>>,
    config: RelayConfig,
}

impl RelayEngine {
    /// Create an engine with default configuration
    pub fn new(local_addr: Address) -> Self {
        Self::with_config(local_addr, RelayConfig::default())
    }

    /// Create an engine with custom configuration and its own table
    pub fn with_config(local_addr: Address, config: RelayConfig) -> Self {
        let table = RelayTable::with_limits(config.table_capacity, config.entry_ttl_secs);
        Self::with_table(local_addr, config, Arc::new(RwLock::new(table)))
    }

    /// Create an engine around an injected table (shared with other callers,
    /// e.g. the aging sweep or tests)
    pub fn with_table(
        local_addr: Address,
        config: RelayConfig,
        table: Arc<RwLock<RelayTable>>,
    ) -> Self {
        init_tracing();
        tracing::info!(local_addr, filter = %config.filter, "relay engine ready");
        Self {
            local_addr,
            table,
            config,
        }
    }

    /// THE CORE FUNCTION: decide what to do with a packet we just heard.
    ///
    /// Derives the key, looks up or creates metadata, applies the address
    /// filter, updates send history, and returns the decision. The actual
    /// send is the transport's job.
    pub fn decide(
        &self,
        packet: &Packet,
        mode: CommunicationMode,
        neighbors: &[Address],
    ) -> Result<RelayDecision, RelayError> {
        // Local delivery is not a relay decision
        if packet.dest() == self.local_addr {
            let decision = match packet {
                Packet::ContactRelay(p) if p.is_ack() => RelayDecision::AckConfirmed { key: p.key() },
                _ => RelayDecision::Suppress {
                    reason: SuppressReason::AddressedToLocal,
                },
            };
            tracing::debug!(key = %packet.key(), ?decision, "packet for us");
            return Ok(decision);
        }

        let decision = match mode {
            CommunicationMode::DirectRoute => self.decide_direct(packet)?,
            CommunicationMode::Opportunistic => self.decide_opportunistic(packet, neighbors)?,
            CommunicationMode::Mesh => self.decide_mesh(packet, neighbors)?,
        };

        tracing::debug!(mode = %mode, key = %packet.key(), ?decision, "relay decision");
        Ok(decision)
    }

    fn decide_direct(&self, packet: &Packet) -> Result<RelayDecision, RelayError> {
        let relay = match packet {
            Packet::ContactRelay(p) => p,
            other => {
                return Err(RelayError::TypeMismatch {
                    expected: "contact relay",
                    got: other.kind(),
                })
            }
        };

        let target = relay.next_hop;
        let mut table = self.table.write();
        let meta = table.contact_entry(packet)?;
        meta.observe(relay.prev_hop, relay.next_hop);

        if meta.was_sent_to(target) {
            return Ok(RelayDecision::Suppress {
                reason: SuppressReason::AlreadyForwarded,
            });
        }
        if !self.config.filter.allows(self.local_addr, target) {
            return Ok(RelayDecision::Suppress {
                reason: SuppressReason::FilterRejected,
            });
        }

        meta.mark_sent_to(target);
        Ok(RelayDecision::Forward {
            mode: CommunicationMode::DirectRoute,
            targets: vec![target],
        })
    }

    fn decide_opportunistic(
        &self,
        packet: &Packet,
        neighbors: &[Address],
    ) -> Result<RelayDecision, RelayError> {
        let relay = match packet {
            Packet::ContactRelay(p) => p,
            other => {
                return Err(RelayError::TypeMismatch {
                    expected: "contact relay",
                    got: other.kind(),
                })
            }
        };

        let mut table = self.table.write();
        let meta = table.contact_entry(packet)?;
        meta.observe(relay.prev_hop, relay.next_hop);

        let eligible = neighbors
            .iter()
            .copied()
            .filter(|&n| !meta.was_sent_to(n))
            .filter(|&n| self.config.filter.allows(self.local_addr, n));

        let targets: Vec<Address> = match self.config.forward {
            ForwardPolicy::FirstEligible => eligible.take(1).collect(),
            ForwardPolicy::AllEligible => eligible.collect(),
        };

        if targets.is_empty() {
            return Ok(RelayDecision::Suppress {
                reason: SuppressReason::NoEligibleNeighbor,
            });
        }

        for &target in &targets {
            meta.mark_sent_to(target);
        }
        Ok(RelayDecision::Forward {
            mode: CommunicationMode::Opportunistic,
            targets,
        })
    }

    fn decide_mesh(
        &self,
        packet: &Packet,
        neighbors: &[Address],
    ) -> Result<RelayDecision, RelayError> {
        let probe = MeshMetadata::from_packet(packet)?;
        let key = probe.key();

        let mut table = self.table.write();
        // Loop prevention outranks the address filter in flood mode
        if table.has_route(&key) {
            return Ok(RelayDecision::Suppress {
                reason: SuppressReason::DuplicateFlood,
            });
        }
        table.record_route(probe);

        if neighbors.is_empty() {
            return Ok(RelayDecision::Suppress {
                reason: SuppressReason::NoEligibleNeighbor,
            });
        }
        Ok(RelayDecision::Forward {
            mode: CommunicationMode::Mesh,
            targets: neighbors.to_vec(),
        })
    }

    /// Periodic aging pass; call from the maintenance path, not the
    /// receive path.
    pub fn sweep(&self, now: u64) -> SweepReport {
        let report = self.table.write().sweep(now);
        if report.expired_contacts > 0 || report.expired_routes > 0 {
            tracing::info!(
                contacts = report.expired_contacts,
                routes = report.expired_routes,
                "swept expired relay state"
            );
        }
        report
    }

    /// Share the table with another caller (e.g. a maintenance task)
    pub fn table(&self) -> Arc<RwLock<RelayTable>> {
        Arc::clone(&self.table)
    }

    pub fn table_summary(&self) -> TableSummary {
        self.table.read().summary()
    }

    pub fn local_addr(&self) -> Address {
        self.local_addr
    }
}

/// Idempotent tracing setup; honors `RUST_LOG`, defaults to `info`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
