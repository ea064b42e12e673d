//! Card identity: PIN authentication state machine and account ownership.
//!
//! A card is `Active` while it has fewer than three consecutive PIN
//! failures and `Locked` afterwards. Lockout is permanent until an admin
//! unlock; there is no expiry or retry schedule.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::account::{AccountKind, HistoryEvent, LedgerAccount};
use crate::errors::AuthErr;
use crate::CardNumber;

/// Consecutive PIN failures that lock the card
pub const MAX_PIN_ATTEMPTS: u8 = 3;

/// Free-text contact attributes attached to an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Phone number, `-` when unset
    pub phone: String,
    /// Email address, `-` when unset
    pub email: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            phone: "-".to_string(),
            email: "-".to_string(),
        }
    }
}

#[derive(Debug)]
struct AuthState {
    pin: String,
    locked: bool,
    failed_attempts: u8,
}

/// One physical card: PIN state, owned ledger accounts (each behind its
/// own lock) and profile metadata.
#[derive(Debug)]
pub struct CardIdentity {
    card_number: CardNumber,
    is_admin: bool,
    // identity-level audit entries (unlock, profile change) land here
    primary: AccountKind,
    auth: Mutex<AuthState>,
    accounts: BTreeMap<AccountKind, Mutex<LedgerAccount>>,
    profile: Mutex<Profile>,
}

/// PIN format rule: exactly four ASCII digits
pub fn valid_pin_format(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

// Comparison is isolated here; accumulating over all bytes rather than
// short-circuiting. Not cryptographic.
fn pin_matches(stored: &str, attempt: &str) -> bool {
    if stored.len() != attempt.len() {
        return false;
    }
    stored
        .bytes()
        .zip(attempt.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

impl CardIdentity {
    /// Provision a customer card with the default Savings and Current
    /// accounts (5000 opening balance each; Savings earns 0.5% monthly,
    /// Current carries a 5000 overdraft).
    pub fn provision(card_number: &str, pin: &str, now: NaiveDateTime) -> Self {
        Self::build(card_number, pin, false, now)
    }

    /// Provision an administrator card. Same default accounts; the admin
    /// flag widens the capability surface at the caller boundary.
    pub fn provision_admin(card_number: &str, pin: &str, now: NaiveDateTime) -> Self {
        Self::build(card_number, pin, true, now)
    }

    fn build(card_number: &str, pin: &str, is_admin: bool, now: NaiveDateTime) -> Self {
        debug_assert!(valid_pin_format(pin));
        let mut accounts = BTreeMap::new();
        accounts.insert(
            AccountKind::Savings,
            Mutex::new(LedgerAccount::open(
                AccountKind::Savings,
                Decimal::new(5000, 0),
                Decimal::ZERO,
                Decimal::new(5, 1),
                now,
            )),
        );
        accounts.insert(
            AccountKind::Current,
            Mutex::new(LedgerAccount::open(
                AccountKind::Current,
                Decimal::new(5000, 0),
                Decimal::new(5000, 0),
                Decimal::ZERO,
                now,
            )),
        );

        let identity = Self {
            card_number: card_number.to_string(),
            is_admin,
            primary: AccountKind::Savings,
            auth: Mutex::new(AuthState {
                pin: pin.to_string(),
                locked: false,
                failed_attempts: 0,
            }),
            accounts,
            profile: Mutex::new(Profile::default()),
        };
        identity.primary_account().lock().note(HistoryEvent::Provisioned, now);
        identity
    }

    /// Card number this identity is keyed by
    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    /// Whether this identity holds the admin capability
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Card number with all but the last four digits masked
    pub fn masked(&self) -> String {
        if self.card_number.len() >= 4 {
            let tail = &self.card_number[self.card_number.len() - 4..];
            format!("**** **** {tail}")
        } else {
            self.card_number.clone()
        }
    }

    /// Verify a PIN attempt.
    ///
    /// A locked card fails closed without consuming an attempt. A match
    /// resets the failure counter; the third consecutive mismatch locks
    /// the card permanently.
    pub fn check_pin(&self, attempt: &str) -> bool {
        let mut auth = self.auth.lock();
        if auth.locked {
            return false;
        }
        if pin_matches(&auth.pin, attempt) {
            auth.failed_attempts = 0;
            true
        } else {
            auth.failed_attempts += 1;
            if auth.failed_attempts >= MAX_PIN_ATTEMPTS {
                auth.locked = true;
                warn!(card = %self.masked(), "card locked after repeated PIN failures");
            }
            false
        }
    }

    /// Is the card locked out?
    pub fn is_locked(&self) -> bool {
        self.auth.lock().locked
    }

    /// Replace the PIN. The caller must have freshly verified the old PIN
    /// in the same logical flow; this only enforces the format rule.
    pub fn change_pin(&self, new_pin: &str) -> Result<(), AuthErr> {
        if !valid_pin_format(new_pin) {
            return Err(AuthErr::InvalidPinFormat);
        }
        self.auth.lock().pin = new_pin.to_string();
        Ok(())
    }

    /// Clear the lockout (admin capability, checked by the caller) and
    /// record an audit entry on the primary account.
    pub fn unlock(&self, now: NaiveDateTime) {
        let mut auth = self.auth.lock();
        auth.locked = false;
        auth.failed_attempts = 0;
        drop(auth);
        self.primary_account().lock().note(HistoryEvent::Unlocked, now);
    }

    /// Ledger account of the given kind, behind its per-account lock
    pub fn account(&self, kind: AccountKind) -> Option<&Mutex<LedgerAccount>> {
        self.accounts.get(&kind)
    }

    /// The designated primary account, target of identity-level audit
    /// entries. Always present.
    pub fn primary_account(&self) -> &Mutex<LedgerAccount> {
        self.accounts
            .get(&self.primary)
            .or_else(|| self.accounts.values().next())
            .unwrap()
    }

    /// Kinds of accounts this card owns, in a stable order
    pub fn account_kinds(&self) -> Vec<AccountKind> {
        self.accounts.keys().copied().collect()
    }

    /// Current profile attributes
    pub fn profile(&self) -> Profile {
        self.profile.lock().clone()
    }

    /// Replace the profile attributes, with an audit entry on the primary
    /// account
    pub fn set_profile(&self, phone: &str, email: &str, now: NaiveDateTime) {
        *self.profile.lock() = Profile {
            phone: phone.to_string(),
            email: email.to_string(),
        };
        self.primary_account()
            .lock()
            .note(HistoryEvent::ProfileUpdated, now);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 29)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn three_failures_lock_the_card() {
        let c = CardIdentity::provision("12345678", "1234", now());
        assert!(!c.check_pin("0000"));
        assert!(!c.check_pin("1111"));
        assert!(!c.is_locked());
        assert!(!c.check_pin("2222"));
        assert!(c.is_locked());

        // fourth attempt fails closed, even with the right PIN
        assert!(!c.check_pin("1234"));
        assert!(c.is_locked());
    }

    #[test]
    fn success_resets_the_failure_counter() {
        let c = CardIdentity::provision("12345678", "1234", now());
        assert!(!c.check_pin("0000"));
        assert!(!c.check_pin("1111"));
        assert!(c.check_pin("1234"));

        // counter restarted, two more misses do not lock
        assert!(!c.check_pin("0000"));
        assert!(!c.check_pin("1111"));
        assert!(!c.is_locked());
    }

    #[test]
    fn unlock_restores_active_state_and_audits() {
        let c = CardIdentity::provision("12345678", "1234", now());
        for _ in 0..3 {
            c.check_pin("0000");
        }
        assert!(c.is_locked());

        c.unlock(now());
        assert!(!c.is_locked());
        assert!(c.check_pin("1234"));

        let last = c.primary_account().lock().narratives().last().unwrap().clone();
        assert!(last.ends_with("Card unlocked by admin"));
    }

    #[test]
    fn pin_format_rule() {
        assert!(valid_pin_format("5566"));
        assert!(!valid_pin_format("12a4"));
        assert!(!valid_pin_format("123"));
        assert!(!valid_pin_format("12345"));
        assert!(!valid_pin_format("１２３４")); // non-ASCII digits
    }

    #[test]
    fn change_pin_keeps_old_pin_on_bad_format() {
        let c = CardIdentity::provision("12345678", "1234", now());
        assert_eq!(c.change_pin("12a4"), Err(AuthErr::InvalidPinFormat));
        assert!(c.check_pin("1234"));

        c.change_pin("5566").unwrap();
        assert!(c.check_pin("5566"));
        assert!(!c.check_pin("1234"));
    }

    #[test]
    fn masked_card_shows_last_four() {
        let c = CardIdentity::provision("12345678", "1234", now());
        assert_eq!(c.masked(), "**** **** 5678");
    }

    #[test]
    fn profile_update_audits_primary_account() {
        let c = CardIdentity::provision("12345678", "1234", now());
        c.set_profile("555-0101", "a@example.com", now());
        assert_eq!(
            c.profile(),
            Profile {
                phone: "555-0101".to_string(),
                email: "a@example.com".to_string(),
            }
        );
        let last = c.primary_account().lock().narratives().last().unwrap().clone();
        assert!(last.ends_with("Profile updated"));
    }
}
