use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::OrderId;

/// Recoverable, no-state-change errors raised at order admission. These are
/// returned values, never panics; the caller (AccountService) maps them to
/// a 4xx-style structured result.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionError {
    #[error("account {0} not found")]
    AccountNotFound(u64),
    #[error("account is not active")]
    AccountNotActive,
    #[error("invalid order: {0}")]
    InvalidOrder(String),
    #[error("unknown market")]
    MarketUnknown,
    #[error("fill-or-kill order cannot be fully filled")]
    FokUnfillable,
    #[error("order size outside configured bounds")]
    SizeBounds,
    #[error("price or size off the configured tick grid")]
    TickViolation,
    #[error("insufficient balance: account {account_id} asset {asset} required {required} available {available}")]
    InsufficientBalance {
        account_id: u64,
        asset: String,
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },
}

/// Fatal, bug-indicating conditions encountered while processing a command.
/// The engine does not attempt to self-repair: it halts and surfaces a
/// `system.alert` event, leaving persisted state for operator inspection.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineFault {
    #[error("ledger rejected a settlement that admission already validated: {0}")]
    LedgerInconsistency(String),
    #[error("order book index is out of sync with its price levels: {0}")]
    BookIndexCorruption(String),
    #[error("stop trigger recursion exceeded its safety bound starting at order {0}")]
    StopTriggerLoop(OrderId),
}
