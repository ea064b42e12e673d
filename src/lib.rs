//! Account and transaction engine for a single-branch ATM.
//!
//! The crate models per-card accounts with balances, daily limits,
//! overdraft, simple monthly interest, PIN authentication with lockout,
//! inter-account transfers and a simulated loan facility. Presentation,
//! localization and receipt persistence are the embedding application's
//! concern; the engine returns structured results and error kinds only.

#![deny(missing_docs)]

pub mod account;
pub mod amount;
pub mod card;
pub mod clock;
pub mod csv;
pub mod engine;
pub mod errors;
pub mod receipt;
pub mod registry;

/// Card identifier. Opaque unique key (8-digit string in practice).
pub type CardNumber = String;
