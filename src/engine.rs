//! Stateless transaction engine over an [`AccountRegistry`].
//!
//! Every operation validates before it mutates, returns a typed error
//! kind, and holds the per-account locks it needs for the whole mutation,
//! so concurrent operations on the same account cannot interleave into an
//! invariant violation.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use crate::account::{AccountKind, HistoryEvent};
use crate::amount::Amount;
use crate::card::{CardIdentity, Profile};
use crate::clock::Clock;
use crate::errors::{AuthErr, EngineErr};
use crate::receipt::{AccountSummary, Receipt, RECEIPT_RECENT_LINES};
use crate::registry::AccountRegistry;

/// Transfers and loans always credit the destination's account of this
/// kind, regardless of the sender-selected source kind. Deliberate
/// preserved behavior, not a per-kind generalization.
pub const RECEIVING_KIND: AccountKind = AccountKind::Current;

/// Synthetic source identifier recorded on loan credits
pub const BANK_LOAN_SOURCE: &str = "BankLoan";

/// Default ceiling for the simulated loan facility
pub fn default_max_loan() -> Decimal {
    Decimal::new(20_000, 0)
}

/// Orchestrates all account and authentication operations. Holds no
/// state of its own beyond the injected clock.
#[derive(Debug)]
pub struct Engine<'r, C: Clock> {
    registry: &'r AccountRegistry,
    clock: C,
}

impl<'r, C: Clock> Engine<'r, C> {
    /// Build an engine over a seeded registry
    pub fn new(registry: &'r AccountRegistry, clock: C) -> Self {
        Self { registry, clock }
    }

    /// Resolve a card number, or fail with `AccountNotFound`
    pub fn identity(&self, card: &str) -> Result<Arc<CardIdentity>, EngineErr> {
        self.registry.lookup(card).ok_or(EngineErr::AccountNotFound {
            card: card.to_string(),
        })
    }

    /// Verify a card/PIN pair and hand out the identity for the session.
    ///
    /// Unknown cards and wrong PINs are indistinguishable to the caller;
    /// a locked card (including one locked by this very attempt) reports
    /// `CardLocked`.
    pub fn authenticate(&self, card: &str, pin: &str) -> Result<Arc<CardIdentity>, EngineErr> {
        let identity = self
            .registry
            .lookup(card)
            .ok_or(EngineErr::Auth(AuthErr::InvalidCredentials))?;
        if identity.is_locked() {
            return Err(AuthErr::CardLocked.into());
        }
        if identity.check_pin(pin) {
            info!(card = %identity.masked(), admin = identity.is_admin(), "authenticated");
            Ok(identity)
        } else if identity.is_locked() {
            Err(AuthErr::CardLocked.into())
        } else {
            Err(AuthErr::InvalidCredentials.into())
        }
    }

    /// Credit cash into an account. Returns the new balance.
    pub fn deposit(
        &self,
        card: &str,
        kind: AccountKind,
        amount: Decimal,
    ) -> Result<Decimal, EngineErr> {
        let amount: Amount = amount.try_into()?;
        let identity = self.identity(card)?;
        let account = identity.account(kind).ok_or(EngineErr::AccountNotFound {
            card: card.to_string(),
        })?;

        let mut account = account.lock();
        account.deposit(&amount, self.clock.now());
        info!(card = %identity.masked(), %kind, amount = %*amount, "deposit");
        Ok(account.balance())
    }

    /// Debit cash from an account, against its daily cap and overdraft
    /// limit. Returns the new balance.
    pub fn withdraw(
        &self,
        card: &str,
        kind: AccountKind,
        amount: Decimal,
    ) -> Result<Decimal, EngineErr> {
        let amount: Amount = amount.try_into()?;
        let identity = self.identity(card)?;
        let account = identity.account(kind).ok_or(EngineErr::AccountNotFound {
            card: card.to_string(),
        })?;

        let mut account = account.lock();
        account.withdraw(&amount, self.clock.now())?;
        info!(card = %identity.masked(), %kind, amount = %*amount, "withdrawal");
        Ok(account.balance())
    }

    /// Move money between two cards. The debit comes from the sender's
    /// selected account; the credit always lands on the destination's
    /// [`RECEIVING_KIND`] account. Returns the sender's new balance.
    ///
    /// Both account locks are held across the debit and credit, acquired
    /// in card-number order so opposing transfers cannot deadlock. The
    /// credit leg is infallible, so a debit can never be left dangling.
    pub fn transfer(
        &self,
        source_card: &str,
        source_kind: AccountKind,
        dest_card: &str,
        amount: Decimal,
    ) -> Result<Decimal, EngineErr> {
        if source_card == dest_card {
            return Err(EngineErr::SelfTransferNotAllowed);
        }
        let amount: Amount = amount.try_into()?;
        let source = self.identity(source_card)?;
        let dest = self
            .registry
            .lookup(dest_card)
            .ok_or(EngineErr::DestinationNotFound {
                card: dest_card.to_string(),
            })?;

        let source_account = source
            .account(source_kind)
            .ok_or(EngineErr::AccountNotFound {
                card: source_card.to_string(),
            })?;
        let dest_account = dest
            .account(RECEIVING_KIND)
            .ok_or(EngineErr::DestinationNotFound {
                card: dest_card.to_string(),
            })?;

        let now = self.clock.now();
        let (mut debit_leg, mut credit_leg) = if source_card < dest_card {
            let s = source_account.lock();
            let d = dest_account.lock();
            (s, d)
        } else {
            let d = dest_account.lock();
            let s = source_account.lock();
            (s, d)
        };

        debit_leg.transfer_out(&amount, dest_card, now)?;
        credit_leg.receive_transfer(&amount, source_card, now);
        info!(
            from = %source.masked(),
            to = %dest.masked(),
            amount = %*amount,
            "transfer"
        );
        Ok(debit_leg.balance())
    }

    /// Replace a card's PIN after a fresh check of the old one.
    ///
    /// A wrong old PIN consumes a regular failed attempt and can lock the
    /// card.
    pub fn change_pin(&self, card: &str, old_pin: &str, new_pin: &str) -> Result<(), EngineErr> {
        let identity = self.identity(card)?;
        if !identity.check_pin(old_pin) {
            return Err(AuthErr::IncorrectOldPin.into());
        }
        identity.change_pin(new_pin)?;
        info!(card = %identity.masked(), "PIN changed");
        Ok(())
    }

    /// Simulated loan: approved iff `amount <= max_loan_limit`, credited
    /// unconditionally into the [`RECEIVING_KIND`] account. Returns the
    /// new balance there; denial changes nothing.
    pub fn apply_loan(
        &self,
        card: &str,
        amount: Decimal,
        max_loan_limit: Decimal,
    ) -> Result<Decimal, EngineErr> {
        let amount: Amount = amount.try_into()?;
        let identity = self.identity(card)?;
        if *amount > max_loan_limit {
            return Err(EngineErr::LoanDenied {
                requested: *amount,
                limit: max_loan_limit,
            });
        }
        let account = identity
            .account(RECEIVING_KIND)
            .ok_or(EngineErr::AccountNotFound {
                card: card.to_string(),
            })?;

        let now = self.clock.now();
        let mut account = account.lock();
        account.note(HistoryEvent::LoanCredited { amount: *amount }, now);
        account.receive_transfer(&amount, BANK_LOAN_SOURCE, now);
        info!(card = %identity.masked(), amount = %*amount, "loan credited");
        Ok(account.balance())
    }

    /// Credit monthly interest on every interest-bearing account in the
    /// registry. Returns how many accounts were credited.
    ///
    /// Admin-triggered; calling twice in one interest period
    /// double-applies. That is an operational concern, not engine-enforced.
    pub fn apply_monthly_interest_to_all(&self) -> usize {
        let now = self.clock.now();
        let mut credited = 0;
        for identity in self.registry.identities() {
            for kind in identity.account_kinds() {
                let mut account = identity.account(kind).unwrap().lock();
                if account.apply_monthly_interest(now).is_some() {
                    credited += 1;
                }
            }
        }
        info!(accounts = credited, "monthly interest applied");
        credited
    }

    /// Clear a card's lockout. The admin capability of the invoker is the
    /// caller boundary's responsibility.
    pub fn admin_unlock(&self, card: &str) -> Result<(), EngineErr> {
        let identity = self.identity(card)?;
        identity.unlock(self.clock.now());
        info!(card = %identity.masked(), "unlocked by admin");
        Ok(())
    }

    /// Current balance of one account
    pub fn balance(&self, card: &str, kind: AccountKind) -> Result<Decimal, EngineErr> {
        let identity = self.identity(card)?;
        let account = identity.account(kind).ok_or(EngineErr::AccountNotFound {
            card: card.to_string(),
        })?;
        let balance = account.lock().balance();
        Ok(balance)
    }

    /// Full narrative history of one account, most-recent-last
    pub fn history(&self, card: &str, kind: AccountKind) -> Result<Vec<String>, EngineErr> {
        let identity = self.identity(card)?;
        let account = identity.account(kind).ok_or(EngineErr::AccountNotFound {
            card: card.to_string(),
        })?;
        let narratives = account.lock().narratives();
        Ok(narratives)
    }

    /// Profile attributes of a card
    pub fn profile(&self, card: &str) -> Result<Profile, EngineErr> {
        Ok(self.identity(card)?.profile())
    }

    /// Replace the profile attributes of a card
    pub fn set_profile(&self, card: &str, phone: &str, email: &str) -> Result<(), EngineErr> {
        self.identity(card)?
            .set_profile(phone, email, self.clock.now());
        Ok(())
    }

    /// Receipt snapshot for one account: balance plus the last few
    /// history lines
    pub fn receipt(&self, card: &str, kind: AccountKind) -> Result<Receipt, EngineErr> {
        let identity = self.identity(card)?;
        let account = identity.account(kind).ok_or(EngineErr::AccountNotFound {
            card: card.to_string(),
        })?;
        let account = account.lock();
        Ok(Receipt {
            card: identity.masked(),
            kind,
            at: self.clock.now(),
            balance: account.balance(),
            recent: account.recent_narratives(RECEIPT_RECENT_LINES),
        })
    }

    /// Summary rows for every account of every card (admin listing),
    /// in card-number order
    pub fn summaries(&self) -> Vec<AccountSummary> {
        let today = self.clock.today();
        let mut rows = Vec::new();
        for identity in self.registry.identities() {
            for kind in identity.account_kinds() {
                let mut account = identity.account(kind).unwrap().lock();
                rows.push(AccountSummary::collect(identity, &mut account, today));
            }
        }
        rows
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::FixedClock;
    use crate::errors::AccountErr;
    use chrono::NaiveDate;

    fn clock() -> FixedClock {
        FixedClock::at(
            NaiveDate::from_ymd_opt(2026, 8, 29)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        )
    }

    fn setup() -> (AccountRegistry, FixedClock) {
        let clock = clock();
        let registry = AccountRegistry::sample(clock.now());
        (registry, clock)
    }

    #[test]
    fn transfer_debits_source_and_credits_destination_current() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);

        let left = engine
            .transfer("12345678", AccountKind::Savings, "87654321", Decimal::new(100, 0))
            .unwrap();
        assert_eq!(left, Decimal::new(9900, 0));
        assert_eq!(
            engine.balance("87654321", AccountKind::Current).unwrap(),
            Decimal::new(8100, 0)
        );
        // savings of the destination is untouched
        assert_eq!(
            engine.balance("87654321", AccountKind::Savings).unwrap(),
            Decimal::new(13_000, 0)
        );

        let out = engine.history("12345678", AccountKind::Savings).unwrap();
        assert!(out.last().unwrap().contains("Transferred 100.00 to 87654321"));
        let inc = engine.history("87654321", AccountKind::Current).unwrap();
        assert!(inc.last().unwrap().contains("Received 100.00 from 12345678"));
    }

    #[test]
    fn transfer_rejects_self_and_unknown_destination() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);

        assert_eq!(
            engine.transfer("12345678", AccountKind::Savings, "12345678", Decimal::ONE),
            Err(EngineErr::SelfTransferNotAllowed)
        );
        assert_eq!(
            engine.transfer("12345678", AccountKind::Savings, "99999999", Decimal::ONE),
            Err(EngineErr::DestinationNotFound {
                card: "99999999".to_string()
            })
        );
        // nothing moved
        assert_eq!(
            engine.balance("12345678", AccountKind::Savings).unwrap(),
            Decimal::new(10_000, 0)
        );
    }

    #[test]
    fn transfer_daily_limit_blocks_before_any_mutation() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);
        engine
            .deposit("12345678", AccountKind::Savings, Decimal::new(100_000, 0))
            .unwrap();

        let e = engine
            .transfer("12345678", AccountKind::Savings, "87654321", Decimal::new(50_001, 0))
            .unwrap_err();
        assert_eq!(e, EngineErr::Account(AccountErr::DailyLimitExceeded));
        assert_eq!(
            engine.balance("87654321", AccountKind::Current).unwrap(),
            Decimal::new(8000, 0)
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected_up_front() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);
        for amount in [Decimal::ZERO, Decimal::new(-5, 0)] {
            assert!(matches!(
                engine.deposit("12345678", AccountKind::Savings, amount),
                Err(EngineErr::Account(AccountErr::InvalidAmount(_)))
            ));
            assert!(matches!(
                engine.withdraw("12345678", AccountKind::Current, amount),
                Err(EngineErr::Account(AccountErr::InvalidAmount(_)))
            ));
        }
    }

    #[test]
    fn loan_threshold_rule() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);

        let balance = engine
            .apply_loan("12345678", Decimal::new(15_000, 0), default_max_loan())
            .unwrap();
        assert_eq!(balance, Decimal::new(22_000, 0));
        let history = engine.history("12345678", AccountKind::Current).unwrap();
        assert!(history
            .iter()
            .any(|line| line.contains("Loan credited: 15000.00")));
        assert!(history.last().unwrap().contains("Received 15000.00 from BankLoan"));

        let e = engine
            .apply_loan("12345678", Decimal::new(25_000, 0), default_max_loan())
            .unwrap_err();
        assert_eq!(
            e,
            EngineErr::LoanDenied {
                requested: Decimal::new(25_000, 0),
                limit: default_max_loan(),
            }
        );
        assert_eq!(
            engine.balance("12345678", AccountKind::Current).unwrap(),
            Decimal::new(22_000, 0)
        );
    }

    #[test]
    fn authenticate_flows_and_lockout() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);

        assert_eq!(
            engine.authenticate("99999999", "1234").unwrap_err(),
            EngineErr::Auth(AuthErr::InvalidCredentials)
        );
        assert_eq!(
            engine.authenticate("12345678", "9999").unwrap_err(),
            EngineErr::Auth(AuthErr::InvalidCredentials)
        );
        engine.authenticate("12345678", "9999").unwrap_err();
        // the third failure locks the card
        assert_eq!(
            engine.authenticate("12345678", "9999").unwrap_err(),
            EngineErr::Auth(AuthErr::CardLocked)
        );
        assert_eq!(
            engine.authenticate("12345678", "1234").unwrap_err(),
            EngineErr::Auth(AuthErr::CardLocked)
        );

        engine.admin_unlock("12345678").unwrap();
        let identity = engine.authenticate("12345678", "1234").unwrap();
        assert!(!identity.is_locked());
    }

    #[test]
    fn change_pin_requires_fresh_old_pin_and_valid_format() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);

        assert_eq!(
            engine.change_pin("12345678", "0000", "5566").unwrap_err(),
            EngineErr::Auth(AuthErr::IncorrectOldPin)
        );
        assert_eq!(
            engine.change_pin("12345678", "1234", "12a4").unwrap_err(),
            EngineErr::Auth(AuthErr::InvalidPinFormat)
        );
        // old PIN still in force after the failed format check
        engine.authenticate("12345678", "1234").unwrap();

        engine.change_pin("12345678", "1234", "5566").unwrap();
        engine.authenticate("12345678", "5566").unwrap();
        assert_eq!(
            engine.authenticate("12345678", "1234").unwrap_err(),
            EngineErr::Auth(AuthErr::InvalidCredentials)
        );
    }

    #[test]
    fn interest_batch_credits_every_savings_account() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);

        // three identities, each with one interest-bearing savings account
        assert_eq!(engine.apply_monthly_interest_to_all(), 3);
        assert_eq!(
            engine.balance("12345678", AccountKind::Savings).unwrap(),
            Decimal::new(10_050, 0)
        );
        // current accounts bear no interest
        assert_eq!(
            engine.balance("12345678", AccountKind::Current).unwrap(),
            Decimal::new(7000, 0)
        );
    }

    #[test]
    fn receipt_snapshots_balance_and_tail() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);
        for _ in 0..7 {
            engine
                .deposit("12345678", AccountKind::Savings, Decimal::ONE)
                .unwrap();
        }

        let receipt = engine.receipt("12345678", AccountKind::Savings).unwrap();
        assert_eq!(receipt.card, "**** **** 5678");
        assert_eq!(receipt.balance, Decimal::new(10_007, 0));
        assert_eq!(receipt.recent.len(), 5);
        assert!(receipt.render().contains("Balance: 10007.00"));
    }

    #[test]
    fn summaries_cover_every_account_in_card_order() {
        let (registry, clock) = setup();
        let engine = Engine::new(&registry, &clock);
        engine
            .withdraw("87654321", AccountKind::Current, Decimal::new(500, 0))
            .unwrap();

        let rows = engine.summaries();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].card, "00000000");
        assert_eq!(rows[0].kind, AccountKind::Savings);

        let row = rows
            .iter()
            .find(|r| r.card == "87654321" && r.kind == AccountKind::Current)
            .unwrap();
        assert_eq!(row.balance, Decimal::new(7500, 0));
        assert_eq!(row.daily_withdrawn, Decimal::new(500, 0));
        assert!(!row.locked);
    }
}
