use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("the same admin cannot satisfy both approval slots")]
    AdminSameApprover,
    #[error("admin lacks the role required for this action")]
    AdminInsufficientRole,
    #[error("withdrawal request {0} not found")]
    WithdrawalNotFound(u64),
    #[error("account {0} not found")]
    AccountNotFound(u64),
    #[error("withdrawal request {0} is not awaiting approval (state: {1:?})")]
    NotPendingApproval(u64, crate::domain::WithdrawalState),
    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),
}

/// Surfaced to the caller of `AccountService`; wraps the matching engine's
/// own admission taxonomy (§7) so pre-trade checks and in-engine checks
/// share one error vocabulary.
#[derive(Debug, Error)]
pub enum AccountServiceError {
    #[error(transparent)]
    Admission(#[from] matching_engine::error::AdmissionError),
    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),
    #[error("engine fault: {0}")]
    EngineFault(#[from] matching_engine::error::EngineFault),
    #[error("persistence error: {0}")]
    Persistence(String),
}
