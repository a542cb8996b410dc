use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type AccountId = u64;

/// Per-(account, asset) balance. `available + locked` is the account's net
/// position in that asset; only the ledger mutates either field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub account_id: AccountId,
    pub available: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn zero(account_id: AccountId) -> Self {
        Self {
            account_id,
            available: Decimal::ZERO,
            locked: Decimal::ZERO,
        }
    }
}
