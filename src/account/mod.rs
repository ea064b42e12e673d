//! Ledger account types and operations
use std::fmt;

use serde::{Deserialize, Serialize};

pub(crate) mod history;
pub(crate) mod ledger;

pub use history::{HistoryEntry, HistoryEvent};
pub use ledger::LedgerAccount;

/// Kind of a balance-bearing sub-account owned by a card.
///
/// Closed enumeration so new kinds are a compile-time concern, not a
/// runtime string lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Interest-bearing, no overdraft
    Savings,
    /// Overdraft-bearing, no interest
    Current,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Savings => write!(f, "Savings"),
            AccountKind::Current => write!(f, "Current"),
        }
    }
}
