//! Relay bookkeeping — who has seen what, and who already got a copy
//!
//! Everything a store-and-forward node needs to relay without looping:
//! - `contact`: per-message metadata for point-to-point relays (hop chain,
//!   ack flag, per-neighbor send history, freshness)
//! - `mesh`: per-probe metadata for flood-mode route discovery
//! - `table`: the keyed store owning both, with TTL aging and a capacity cap
//! - `engine`: the decision engine the transport consults for every packet

pub mod contact;
pub mod engine;
pub mod mesh;
pub mod table;

pub use contact::ContactRelayMetadata;
pub use engine::{
    CommunicationMode, ForwardPolicy, RelayConfig, RelayDecision, RelayEngine, SuppressReason,
};
pub use mesh::MeshMetadata;
pub use table::{RelayTable, SweepReport, TableSummary};

/// Current unix timestamp in seconds
pub(crate) fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
