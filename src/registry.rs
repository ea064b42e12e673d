//! Process-wide card registry.
//!
//! Explicitly constructed and seeded (no static bootstrap) so each test
//! builds its own isolated registry. Read-mostly after seeding: lookups
//! share `Arc`s, mutation happens inside the identities themselves.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::account::AccountKind;
use crate::amount::Amount;
use crate::card::CardIdentity;
use crate::CardNumber;

/// Mapping from card number to its identity, authoritative for the
/// process lifetime
#[derive(Debug, Default)]
pub struct AccountRegistry {
    cards: BTreeMap<CardNumber, Arc<CardIdentity>>,
}

impl AccountRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity. Replaces any previous identity under the same
    /// card number.
    pub fn insert(&mut self, identity: CardIdentity) {
        self.cards
            .insert(identity.card_number().to_string(), Arc::new(identity));
    }

    /// Resolve a card number to its identity
    pub fn lookup(&self, card_number: &str) -> Option<Arc<CardIdentity>> {
        self.cards.get(card_number).cloned()
    }

    /// All identities in card-number order (admin listing)
    pub fn identities(&self) -> impl Iterator<Item = &Arc<CardIdentity>> {
        self.cards.values()
    }

    /// Number of registered cards
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Is the registry unseeded?
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Branch seed data: two customer cards with boosted balances and one
    /// admin card.
    ///
    /// | card | PIN | Savings | Current |
    /// |---|---|---|---|
    /// | 12345678 | 1234 | 10000 | 7000 |
    /// | 87654321 | 4321 | 13000 | 8000 |
    /// | 00000000 | 0000 (admin) | 5000 | 5000 |
    pub fn sample(now: NaiveDateTime) -> Self {
        let mut registry = Self::new();

        let a1 = CardIdentity::provision("12345678", "1234", now);
        a1.account(AccountKind::Savings)
            .unwrap()
            .lock()
            .deposit(&Amount::new(5000, 0), now);
        a1.account(AccountKind::Current)
            .unwrap()
            .lock()
            .deposit(&Amount::new(2000, 0), now);
        registry.insert(a1);

        let a2 = CardIdentity::provision("87654321", "4321", now);
        a2.account(AccountKind::Savings)
            .unwrap()
            .lock()
            .deposit(&Amount::new(8000, 0), now);
        a2.account(AccountKind::Current)
            .unwrap()
            .lock()
            .deposit(&Amount::new(3000, 0), now);
        registry.insert(a2);

        registry.insert(CardIdentity::provision_admin("00000000", "0000", now));

        registry
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 29)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn sample_seed_balances() {
        let registry = AccountRegistry::sample(now());
        assert_eq!(registry.len(), 3);

        let a1 = registry.lookup("12345678").unwrap();
        assert_eq!(
            a1.account(AccountKind::Savings).unwrap().lock().balance(),
            Decimal::new(10_000, 0)
        );
        assert_eq!(
            a1.account(AccountKind::Current).unwrap().lock().balance(),
            Decimal::new(7000, 0)
        );

        let admin = registry.lookup("00000000").unwrap();
        assert!(admin.is_admin());
        assert!(!a1.is_admin());
    }

    #[test]
    fn lookup_misses_unknown_cards() {
        let registry = AccountRegistry::sample(now());
        assert!(registry.lookup("99999999").is_none());
    }
}
