use rust_decimal::Decimal;
use thiserror::Error;

use crate::balance::AccountId;

/// Admission-time errors the ledger can raise. These never leave partial
/// effects: every operation validates before it mutates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: account {account_id} asset {asset} required {required} available {available}")]
    InsufficientBalance {
        account_id: AccountId,
        asset: String,
        required: Decimal,
        available: Decimal,
    },
    #[error("insufficient locked balance: account {account_id} asset {asset} required {required} locked {locked}")]
    InsufficientLocked {
        account_id: AccountId,
        asset: String,
        required: Decimal,
        locked: Decimal,
    },
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
}
