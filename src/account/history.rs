//! Append-only, timestamped transaction history.
//!
//! Entries are stored structured and rendered to narrative lines on
//! demand; the engine never stores locale text.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::AccountKind;
use crate::CardNumber;

/// One timestamped event in an account's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    at: NaiveDateTime,
    event: HistoryEvent,
}

/// What happened to the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// Account created with its opening balance
    Opened {
        /// Kind of the opened account
        kind: AccountKind,
        /// Opening balance
        balance: Decimal,
    },
    /// Cash deposited
    Deposited {
        /// Amount credited
        amount: Decimal,
        /// Balance after the credit
        balance: Decimal,
    },
    /// Cash withdrawn
    Withdrawn {
        /// Amount debited
        amount: Decimal,
        /// Balance after the debit
        balance: Decimal,
    },
    /// Debit leg of a transfer
    TransferredOut {
        /// Amount debited
        amount: Decimal,
        /// Counterparty card number
        to: CardNumber,
        /// Balance after the debit
        balance: Decimal,
    },
    /// Credit leg of a transfer (or a loan payout)
    Received {
        /// Amount credited
        amount: Decimal,
        /// Source card number, or a synthetic lender identifier
        from: CardNumber,
        /// Balance after the credit
        balance: Decimal,
    },
    /// Simple monthly interest credited
    InterestApplied {
        /// Interest amount, already rounded to the minor unit
        interest: Decimal,
        /// Balance after the credit
        balance: Decimal,
    },
    /// Loan approval audit line, precedes the matching [`HistoryEvent::Received`]
    LoanCredited {
        /// Approved loan amount
        amount: Decimal,
    },
    /// Card was provisioned; recorded on the primary account
    Provisioned,
    /// Card was unlocked by an administrator; recorded on the primary account
    Unlocked,
    /// Profile attributes changed; recorded on the primary account
    ProfileUpdated,
}

impl HistoryEntry {
    pub(crate) fn new(at: NaiveDateTime, event: HistoryEvent) -> Self {
        Self { at, event }
    }

    /// Event recorded by this entry
    pub fn event(&self) -> &HistoryEvent {
        &self.event
    }

    /// When the event happened
    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    /// Narrative line, most-recent-last ordering is the owning account's job
    pub fn render(&self) -> String {
        let body = match &self.event {
            HistoryEvent::Opened { kind, balance } => {
                format!("Account ({kind}) opened: {balance:.2}")
            }
            HistoryEvent::Deposited { amount, balance } => {
                format!("Deposited: {amount:.2} | Balance: {balance:.2}")
            }
            HistoryEvent::Withdrawn { amount, balance } => {
                format!("Withdrawn: {amount:.2} | Balance: {balance:.2}")
            }
            HistoryEvent::TransferredOut {
                amount,
                to,
                balance,
            } => format!("Transferred {amount:.2} to {to} | Balance: {balance:.2}"),
            HistoryEvent::Received {
                amount,
                from,
                balance,
            } => format!("Received {amount:.2} from {from} | Balance: {balance:.2}"),
            HistoryEvent::InterestApplied { interest, balance } => {
                format!("Interest applied: {interest:.2} | Balance: {balance:.2}")
            }
            HistoryEvent::LoanCredited { amount } => format!("Loan credited: {amount:.2}"),
            HistoryEvent::Provisioned => "Card provisioned with Savings & Current".to_string(),
            HistoryEvent::Unlocked => "Card unlocked by admin".to_string(),
            HistoryEvent::ProfileUpdated => "Profile updated".to_string(),
        };
        format!("{} {body}", self.at.format("%Y-%m-%d %H:%M"))
    }
}
