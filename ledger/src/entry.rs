use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

use crate::balance::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
pub enum EntryType {
    Deposit,
    Withdrawal,
    Trade,
    Fee,
    Lock,
    Unlock,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::Deposit => write!(f, "deposit"),
            EntryType::Withdrawal => write!(f, "withdrawal"),
            EntryType::Trade => write!(f, "trade"),
            EntryType::Fee => write!(f, "fee"),
            EntryType::Lock => write!(f, "lock"),
            EntryType::Unlock => write!(f, "unlock"),
        }
    }
}

/// Append-only audit row. `amount` is the signed delta applied to `available`
/// (locks/unlocks move between available and locked but are still recorded
/// here as the `available`-side delta); `balance_after` is the resulting
/// available balance at the moment the entry was appended.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: u64,
    pub account_id: AccountId,
    pub asset: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub entry_type: String,
    pub reference_id: Option<u64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
