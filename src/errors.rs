//! Possible errors
//!
//! Every engine operation returns one of these kinds; the presentation
//! layer maps them to user-facing text. No operation mutates state before
//! its checks pass.

use crate::amount::InvalidAmountErr;
use crate::CardNumber;
use rust_decimal::Decimal;
use thiserror::Error;

/// Group errors raised by a single ledger account
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountErr {
    /// Requested amount was zero or negative
    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmountErr),
    /// Balance would drop below the overdraft limit
    #[error("insufficient funds for this operation")]
    InsufficientFunds,
    /// Cumulative daily withdrawal or transfer cap would be exceeded
    #[error("daily limit reached for this operation")]
    DailyLimitExceeded,
}

/// Group errors raised by the PIN authentication state machine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthErr {
    /// Unknown card number or wrong PIN
    #[error("invalid card number or PIN")]
    InvalidCredentials,
    /// Card is locked after repeated PIN failures; only an admin unlock clears this
    #[error("card is locked")]
    CardLocked,
    /// PIN change was attempted with a wrong current PIN
    #[error("incorrect old PIN")]
    IncorrectOldPin,
    /// New PIN is not exactly 4 ASCII digits
    #[error("invalid PIN format, use 4 digits")]
    InvalidPinFormat,
}

/// Group all errors that an engine operation can return
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineErr {
    /// No card or sub-account on file for the requested operation
    #[error("no account on file for card {card}")]
    AccountNotFound {
        /// Card number the caller asked for
        card: CardNumber,
    },
    /// Transfer counterparty does not exist in the registry
    #[error("transfer destination {card} not found")]
    DestinationNotFound {
        /// Card number the transfer was addressed to
        card: CardNumber,
    },
    /// Transfers to the originating card are rejected
    #[error("cannot transfer to the originating card")]
    SelfTransferNotAllowed,
    /// Loan request exceeded the configured ceiling
    #[error("loan denied: requested {requested} exceeds limit {limit}")]
    LoanDenied {
        /// Amount the customer asked for
        requested: Decimal,
        /// Maximum the branch will extend
        limit: Decimal,
    },
    /// Ledger account rejected the operation
    #[error("account operation failed")]
    Account(#[from] AccountErr),
    /// Authentication state machine rejected the operation
    #[error("authentication failed")]
    Auth(#[from] AuthErr),
}

impl From<InvalidAmountErr> for EngineErr {
    fn from(err: InvalidAmountErr) -> Self {
        EngineErr::Account(AccountErr::from(err))
    }
}
