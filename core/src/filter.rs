// Address filter policy — which node pairs may exchange traffic
//
// The policy reaches a node as a small integer in its configuration.
// Unknown codes fail closed: a misconfigured node must never turn into an
// open relay.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Addressing policy restricting which node pairs may exchange traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFilter {
    /// No restriction
    AllowAll,
    /// Exactly one of the two addresses must be even
    OnlyOppositeEvenness,
}

impl AddressFilter {
    /// Decode the operator-facing code (1 = allow all, 2 = opposite evenness)
    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::AllowAll),
            2 => Some(Self::OnlyOppositeEvenness),
            _ => None,
        }
    }

    /// May these two addresses exchange traffic? Pure, no side effects.
    pub fn allows(self, a: Address, b: Address) -> bool {
        match self {
            Self::AllowAll => true,
            Self::OnlyOppositeEvenness => is_even(a) != is_even(b),
        }
    }
}

impl fmt::Display for AddressFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllowAll => "allow all",
            Self::OnlyOppositeEvenness => "only opposite evenness",
        })
    }
}

/// Fail-closed policy check over a raw wire code.
///
/// Unknown codes return `false` — never an error. Must be evaluated before
/// any forwarding decision is committed.
pub fn may_communicate(code: u8, a: Address, b: Address) -> bool {
    match AddressFilter::from_wire(code) {
        Some(filter) => filter.allows(a, b),
        None => false,
    }
}

fn is_even(addr: Address) -> bool {
    addr % 2 == 0
}
