use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ledger::{Ledger, Repository};

use crate::audit::AuditLog;
use crate::config::Config;
use crate::domain::{Account, AccountId, AccountStatus, AdminIdentity, AdminRole, AuditLogEntry, WithdrawalRequest, WithdrawalState};
use crate::error::{AccountServiceError, AdminError};

fn require_role(admin: AdminIdentity, minimum: AdminRole) -> Result<(), AdminError> {
    if admin.role < minimum {
        return Err(AdminError::AdminInsufficientRole);
    }
    Ok(())
}

/// Withdrawal two-eyes approval and account freeze/unfreeze actions (§4.5).
/// Every withdrawal locks `amount + network_fee` up front and only debits
/// the locked funds once a second, distinct admin has approved it; a
/// rejection at any stage unlocks the reservation instead.
pub struct AdminService<RW, RA, RL> {
    ledger: Arc<Ledger>,
    config: Config,
    withdrawals: RW,
    accounts: RA,
    audit: AuditLog<RL>,
    next_id: AtomicU64,
}

impl<RW, RA, RL> AdminService<RW, RA, RL>
where
    RW: Repository<WithdrawalRequest, u64>,
    RA: Repository<Account, u64>,
    RL: Repository<AuditLogEntry, u64>,
{
    pub fn new(ledger: Arc<Ledger>, config: Config, withdrawals: RW, accounts: RA, audit: AuditLog<RL>) -> Self {
        Self { ledger, config, withdrawals, accounts, audit, next_id: AtomicU64::new(1) }
    }

    /// Opens a withdrawal request: locks `amount + network_fee` and parks it
    /// `Pending` until two distinct admins approve it.
    pub async fn request_withdrawal(&self, account_id: AccountId, asset: &str, amount: rust_decimal::Decimal) -> Result<WithdrawalRequest, AccountServiceError> {
        let network_fee = self.config.withdrawal_network_fee.get(asset).copied().unwrap_or(rust_decimal::Decimal::ZERO);
        self.ledger.lock(account_id, asset, amount + network_fee)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = WithdrawalRequest {
            id,
            transaction_id: id,
            account_id,
            asset: asset.to_string(),
            amount,
            network_fee,
            state: WithdrawalState::Pending,
            approvals: Vec::new(),
            last_error: None,
        };
        self.withdrawals.insert(&request).await.map_err(|e| AccountServiceError::Persistence(e.to_string()))?;
        Ok(request)
    }

    /// Records one admin's approval. The second approval (from a different
    /// admin than the first) moves the request to `Approved` and leaves the
    /// broadcast-pending window open; approving twice as the same admin is
    /// rejected (§4.5). The locked funds are not debited here — that only
    /// happens once the broadcaster confirms, via `confirm_broadcast`.
    pub async fn approve_withdrawal(&self, withdrawal_id: u64, admin: AdminIdentity) -> Result<WithdrawalRequest, AdminError> {
        require_role(admin, AdminRole::Approver)?;
        let mut request = self
            .withdrawals
            .get(withdrawal_id)
            .await
            .map_err(|_| AdminError::WithdrawalNotFound(withdrawal_id))?
            .ok_or(AdminError::WithdrawalNotFound(withdrawal_id))?;

        match request.state {
            WithdrawalState::Pending => {
                request.approvals.push(admin.id);
                request.state = WithdrawalState::ApprovedPendingSecond;
            }
            WithdrawalState::ApprovedPendingSecond => {
                if request.approvals.contains(&admin.id) {
                    return Err(AdminError::AdminSameApprover);
                }
                request.approvals.push(admin.id);
                request.state = WithdrawalState::Approved;
                self.audit
                    .record(&admin.id.to_string(), "withdrawal.approved", &withdrawal_id.to_string(), format!("amount={} asset={}", request.amount, request.asset))
                    .await
                    .ok();
            }
            other => return Err(AdminError::NotPendingApproval(withdrawal_id, other)),
        }

        self.withdrawals.update(withdrawal_id, &request).await.map_err(|_| AdminError::WithdrawalNotFound(withdrawal_id))?;
        Ok(request)
    }

    /// Called once the broadcaster reports the withdrawal transaction was
    /// sent successfully (§4.5 step 4): debits the locked funds and moves
    /// the request to `Confirmed`.
    pub async fn confirm_broadcast(&self, withdrawal_id: u64) -> Result<WithdrawalRequest, AdminError> {
        let mut request = self.withdrawals.get(withdrawal_id).await.ok().flatten().ok_or(AdminError::WithdrawalNotFound(withdrawal_id))?;
        if request.state != WithdrawalState::Approved {
            return Err(AdminError::NotPendingApproval(withdrawal_id, request.state));
        }

        self.ledger.debit_locked(request.account_id, &request.asset, request.amount + request.network_fee)?;
        request.state = WithdrawalState::Confirmed;
        self.withdrawals.update(withdrawal_id, &request).await.map_err(|_| AdminError::WithdrawalNotFound(withdrawal_id))?;
        self.audit
            .record("broadcaster", "withdrawal.confirmed", &withdrawal_id.to_string(), format!("amount={} asset={}", request.amount, request.asset))
            .await
            .ok();
        Ok(request)
    }

    /// Called when the broadcaster reports the transaction failed to send:
    /// parks the request back at `Pending` with the failure recorded and
    /// clears prior approvals, so it must be re-approved from scratch
    /// rather than silently retried with the same two admins.
    pub async fn fail_broadcast(&self, withdrawal_id: u64, reason: &str) -> Result<WithdrawalRequest, AdminError> {
        let mut request = self.withdrawals.get(withdrawal_id).await.ok().flatten().ok_or(AdminError::WithdrawalNotFound(withdrawal_id))?;
        if request.state != WithdrawalState::Approved {
            return Err(AdminError::NotPendingApproval(withdrawal_id, request.state));
        }

        request.state = WithdrawalState::Pending;
        request.approvals.clear();
        request.last_error = Some(reason.to_string());
        self.withdrawals.update(withdrawal_id, &request).await.map_err(|_| AdminError::WithdrawalNotFound(withdrawal_id))?;
        self.audit.record("broadcaster", "withdrawal.broadcast_failed", &withdrawal_id.to_string(), reason).await.ok();
        Ok(request)
    }

    /// Rejects a pending withdrawal at any stage before confirmation,
    /// unlocking the reserved funds.
    pub async fn reject_withdrawal(&self, withdrawal_id: u64, admin: AdminIdentity, reason: &str) -> Result<WithdrawalRequest, AdminError> {
        require_role(admin, AdminRole::Approver)?;
        let mut request = self.withdrawals.get(withdrawal_id).await.ok().flatten().ok_or(AdminError::WithdrawalNotFound(withdrawal_id))?;
        if matches!(request.state, WithdrawalState::Confirmed | WithdrawalState::Rejected) {
            return Err(AdminError::NotPendingApproval(withdrawal_id, request.state));
        }

        self.ledger.unlock(request.account_id, &request.asset, request.amount + request.network_fee)?;
        request.state = WithdrawalState::Rejected;
        request.last_error = Some(reason.to_string());
        self.withdrawals.update(withdrawal_id, &request).await.ok();
        self.audit.record(&admin.id.to_string(), "withdrawal.rejected", &withdrawal_id.to_string(), reason).await.ok();
        Ok(request)
    }

    /// Freezes an account, blocking new order admission (§4.4, §4.5). Only
    /// a `SuperAdmin` may freeze or unfreeze — a plain `Approver` gets
    /// `AdminInsufficientRole`.
    pub async fn freeze_account(&self, account_id: AccountId, admin: AdminIdentity, reason: &str) -> Result<(), AdminError> {
        require_role(admin, AdminRole::SuperAdmin)?;
        self.set_account_status(account_id, AccountStatus::Frozen).await?;
        self.audit.record(&admin.id.to_string(), "account.frozen", &account_id.to_string(), reason).await.ok();
        Ok(())
    }

    pub async fn unfreeze_account(&self, account_id: AccountId, admin: AdminIdentity) -> Result<(), AdminError> {
        require_role(admin, AdminRole::SuperAdmin)?;
        self.set_account_status(account_id, AccountStatus::Active).await?;
        self.audit.record(&admin.id.to_string(), "account.unfrozen", &account_id.to_string(), "").await.ok();
        Ok(())
    }

    async fn set_account_status(&self, account_id: AccountId, status: AccountStatus) -> Result<(), AdminError> {
        let mut account = self.accounts.get(account_id).await.ok().flatten().ok_or(AdminError::AccountNotFound(account_id))?;
        account.status = status;
        self.accounts.update(account_id, &account).await.ok();
        Ok(())
    }

    pub async fn audit_trail(&self) -> Vec<AuditLogEntry> {
        self.audit.entries().await.unwrap_or_default()
    }
}
