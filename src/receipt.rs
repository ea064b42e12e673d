//! Receipt snapshots and admin summary rows.
//!
//! The engine only produces these snapshots; writing them anywhere is the
//! embedding application's job.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::{AccountKind, LedgerAccount};
use crate::card::CardIdentity;
use crate::CardNumber;

/// History lines included in a receipt or mini statement
pub const RECEIPT_RECENT_LINES: usize = 5;

/// Summary of one ledger account, as shown in the admin listing and the
/// binary's CSV output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct AccountSummary {
    pub card: CardNumber,
    pub kind: AccountKind,
    pub balance: Decimal,
    pub daily_withdrawn: Decimal,
    pub locked: bool,
}

impl AccountSummary {
    pub(crate) fn collect(
        identity: &CardIdentity,
        account: &mut LedgerAccount,
        today: NaiveDate,
    ) -> Self {
        Self {
            card: identity.card_number().to_string(),
            kind: account.kind(),
            balance: account.balance().round_dp(2),
            daily_withdrawn: account.daily_withdrawn(today).round_dp(2),
            locked: identity.is_locked(),
        }
    }
}

/// Formatted snapshot of one account: balance plus the most recent
/// history lines. Card number is masked.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Receipt {
    /// Masked card number
    pub card: String,
    /// Account the receipt is for
    pub kind: AccountKind,
    /// When the snapshot was taken
    pub at: NaiveDateTime,
    /// Balance at snapshot time
    pub balance: Decimal,
    /// Last few narrative lines, most-recent-last
    pub recent: Vec<String>,
}

impl Receipt {
    /// Render the receipt body as plain text
    pub fn render(&self) -> String {
        let mut out = format!(
            "Receipt for {} ({})\nTime: {}\nBalance: {:.2}\nRecent transactions:\n",
            self.card,
            self.kind,
            self.at.format("%Y-%m-%d %H:%M:%S"),
            self.balance,
        );
        for line in &self.recent {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
