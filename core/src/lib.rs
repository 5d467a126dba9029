// Hopnet Core — relay metadata and flood control
//
// "For every packet a node hears: is it new, is it already handled, is it
//  an ack, and who still needs a copy?"
//
// Everything else — framing, radios, crypto, route tables — lives outside.

pub mod address;
pub mod filter;
pub mod packet;
pub mod relay;

use thiserror::Error;

pub use address::{Address, PacketId, RelayKey};
pub use filter::{may_communicate, AddressFilter};
pub use packet::{ContactRelayPacket, Packet, RouteRequestPacket};
pub use relay::contact::ContactRelayMetadata;
pub use relay::engine::{
    CommunicationMode, ForwardPolicy, RelayConfig, RelayDecision, RelayEngine, SuppressReason,
};
pub use relay::mesh::MeshMetadata;
pub use relay::table::{RelayTable, SweepReport, TableSummary};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors surfaced by the relay subsystem.
///
/// Every error is local to a single call; nothing is left partially
/// constructed and no table entry is corrupted. Unknown address-filter
/// wire codes are deliberately NOT an error — the policy fails closed and
/// returns `false` instead (see [`filter::may_communicate`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// Tried to build relay metadata from the wrong packet class
    #[error("wrong packet: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// Raw packet id does not fit the wire id field
    #[error("packet id {0} does not fit the {bits}-bit id field", bits = PacketId::BITS)]
    IdOutOfRange(u16),
}
