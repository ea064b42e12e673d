use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};

use super::history::{HistoryEntry, HistoryEvent};
use super::AccountKind;
use crate::amount::Amount;
use crate::errors::AccountErr;

/// Single-currency ledger account: balance, overdraft, daily counters and
/// an append-only history.
///
/// All mutations are check-then-commit: a failed operation leaves the
/// account untouched. Invariants held across any operation sequence:
/// `balance >= -overdraft_limit`, and within one calendar day
/// `daily_withdrawn <= daily_withdraw_limit` and
/// `daily_transferred <= daily_transfer_limit`.
#[derive(Debug, Clone)]
pub struct LedgerAccount {
    kind: AccountKind,
    balance: Decimal,
    overdraft_limit: Decimal,
    monthly_interest_percent: Decimal,

    // Daily tracking, reset lazily when the calendar date advances
    daily_withdrawn: Decimal,
    daily_transferred: Decimal,
    daily_withdraw_limit: Decimal,
    daily_transfer_limit: Decimal,
    last_reset: NaiveDate,

    history: Vec<HistoryEntry>,
}

/// Default cumulative withdrawal cap per calendar day
pub fn default_daily_withdraw_limit() -> Decimal {
    Decimal::new(20_000, 0)
}

/// Default cumulative transfer cap per calendar day
pub fn default_daily_transfer_limit() -> Decimal {
    Decimal::new(50_000, 0)
}

impl LedgerAccount {
    /// Open a new account with an opening balance and default daily limits
    pub fn open(
        kind: AccountKind,
        initial_balance: Decimal,
        overdraft_limit: Decimal,
        monthly_interest_percent: Decimal,
        opened: NaiveDateTime,
    ) -> Self {
        let mut account = Self {
            kind,
            balance: initial_balance,
            overdraft_limit,
            monthly_interest_percent,
            daily_withdrawn: Decimal::ZERO,
            daily_transferred: Decimal::ZERO,
            daily_withdraw_limit: default_daily_withdraw_limit(),
            daily_transfer_limit: default_daily_transfer_limit(),
            last_reset: opened.date(),
            history: Vec::new(),
        };
        account.record(
            opened,
            HistoryEvent::Opened {
                kind,
                balance: initial_balance,
            },
        );
        account
    }

    fn reset_daily_if_needed(&mut self, today: NaiveDate) {
        if today != self.last_reset {
            self.daily_withdrawn = Decimal::ZERO;
            self.daily_transferred = Decimal::ZERO;
            self.last_reset = today;
        }
    }

    /// Credit cash into the account. Deposits have no daily cap.
    pub fn deposit(&mut self, amount: &Amount, now: NaiveDateTime) {
        let amt: Decimal = **amount;
        self.balance += amt;
        self.record(
            now,
            HistoryEvent::Deposited {
                amount: amt,
                balance: self.balance,
            },
        );
    }

    /// Debit cash, respecting the daily withdrawal cap and the overdraft
    /// limit. On failure the balance and counters are unchanged.
    pub fn withdraw(&mut self, amount: &Amount, now: NaiveDateTime) -> Result<(), AccountErr> {
        self.reset_daily_if_needed(now.date());
        let amt: Decimal = **amount;
        if self.daily_withdrawn + amt > self.daily_withdraw_limit {
            return Err(AccountErr::DailyLimitExceeded);
        }
        if self.balance - amt < -self.overdraft_limit {
            return Err(AccountErr::InsufficientFunds);
        }

        self.balance -= amt;
        self.daily_withdrawn += amt;
        self.record(
            now,
            HistoryEvent::Withdrawn {
                amount: amt,
                balance: self.balance,
            },
        );
        Ok(())
    }

    /// Debit the outgoing leg of a transfer, respecting the daily transfer
    /// cap and the overdraft limit. The caller credits the counterparty
    /// with [`LedgerAccount::receive_transfer`] under the same logical
    /// operation.
    pub fn transfer_out(
        &mut self,
        amount: &Amount,
        to: &str,
        now: NaiveDateTime,
    ) -> Result<(), AccountErr> {
        self.reset_daily_if_needed(now.date());
        let amt: Decimal = **amount;
        if self.daily_transferred + amt > self.daily_transfer_limit {
            return Err(AccountErr::DailyLimitExceeded);
        }
        if self.balance - amt < -self.overdraft_limit {
            return Err(AccountErr::InsufficientFunds);
        }

        self.balance -= amt;
        self.daily_transferred += amt;
        self.record(
            now,
            HistoryEvent::TransferredOut {
                amount: amt,
                to: to.to_string(),
                balance: self.balance,
            },
        );
        Ok(())
    }

    /// Credit the incoming leg of a transfer. Infallible: callers only
    /// pass validated positive amounts, so a debited counterparty can
    /// always be credited.
    pub fn receive_transfer(&mut self, amount: &Amount, from: &str, now: NaiveDateTime) {
        let amt: Decimal = **amount;
        self.balance += amt;
        self.record(
            now,
            HistoryEvent::Received {
                amount: amt,
                from: from.to_string(),
                balance: self.balance,
            },
        );
    }

    /// Credit one month of simple interest on the signed balance.
    ///
    /// Interest is rounded half-to-even to the minor unit before
    /// crediting, so repeated application stays exact. Negative balances
    /// accrue negative interest proportionally. Returns the credited
    /// interest, or `None` when the account bears no interest.
    pub fn apply_monthly_interest(&mut self, now: NaiveDateTime) -> Option<Decimal> {
        if self.monthly_interest_percent <= Decimal::ZERO {
            return None;
        }
        let interest = (self.balance * self.monthly_interest_percent / Decimal::new(100, 0))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        self.balance += interest;
        self.record(
            now,
            HistoryEvent::InterestApplied {
                interest,
                balance: self.balance,
            },
        );
        Some(interest)
    }

    /// Would [`LedgerAccount::withdraw`] succeed for `amount` today?
    pub fn can_withdraw_daily(&mut self, amount: &Amount, today: NaiveDate) -> bool {
        self.reset_daily_if_needed(today);
        let amt: Decimal = **amount;
        self.daily_withdrawn + amt <= self.daily_withdraw_limit
            && self.balance - amt >= -self.overdraft_limit
    }

    /// Would [`LedgerAccount::transfer_out`] succeed for `amount` today?
    pub fn can_transfer_daily(&mut self, amount: &Amount, today: NaiveDate) -> bool {
        self.reset_daily_if_needed(today);
        let amt: Decimal = **amount;
        self.daily_transferred + amt <= self.daily_transfer_limit
            && self.balance - amt >= -self.overdraft_limit
    }

    /// Override the per-day caps for this account
    pub fn set_daily_limits(&mut self, withdraw_limit: Decimal, transfer_limit: Decimal) {
        self.daily_withdraw_limit = withdraw_limit;
        self.daily_transfer_limit = transfer_limit;
    }

    /// Append an audit event outside the money operations (unlock,
    /// profile change, loan approval note).
    pub(crate) fn note(&mut self, event: HistoryEvent, now: NaiveDateTime) {
        self.record(now, event);
    }

    fn record(&mut self, at: NaiveDateTime, event: HistoryEvent) {
        self.history.push(HistoryEntry::new(at, event));
    }

    /// Kind of this account
    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    /// Current signed balance
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Magnitude by which the balance may go negative
    pub fn overdraft_limit(&self) -> Decimal {
        self.overdraft_limit
    }

    /// Amount withdrawn so far today
    pub fn daily_withdrawn(&mut self, today: NaiveDate) -> Decimal {
        self.reset_daily_if_needed(today);
        self.daily_withdrawn
    }

    /// Amount transferred out so far today
    pub fn daily_transferred(&mut self, today: NaiveDate) -> Decimal {
        self.reset_daily_if_needed(today);
        self.daily_transferred
    }

    /// Full history, oldest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// All history rendered to narrative lines, most-recent-last
    pub fn narratives(&self) -> Vec<String> {
        self.history.iter().map(HistoryEntry::render).collect()
    }

    /// Last `n` narrative lines, most-recent-last (mini statement)
    pub fn recent_narratives(&self, n: usize) -> Vec<String> {
        let start = self.history.len().saturating_sub(n);
        self.history[start..].iter().map(HistoryEntry::render).collect()
    }
}
