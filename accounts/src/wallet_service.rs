use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use ledger::{Ledger, Repository};

use crate::config::Config;
use crate::domain::{AccountId, Transaction, TransactionKind, TransactionStatus, UserId};
use crate::error::AccountServiceError;

/// Deposit/withdrawal bookkeeping and the deposit confirmation lifecycle
/// (§4.5). A deposit starts `Pending` the moment a chain observer reports
/// it and only reaches the ledger once its network has accumulated the
/// configured confirmation threshold; re-delivery of the same `tx_hash`
/// after that point is a no-op.
pub struct WalletService<R> {
    ledger: Arc<Ledger>,
    config: Config,
    transactions: R,
    next_id: AtomicU64,
}

impl<R> WalletService<R>
where
    R: Repository<Transaction, u64>,
{
    pub fn new(ledger: Arc<Ledger>, config: Config, transactions: R) -> Self {
        Self { ledger, config, transactions, next_id: AtomicU64::new(1) }
    }

    /// Records or advances a deposit observation. Idempotent on `tx_hash`:
    /// once a deposit is `Confirmed`, later calls with the same hash return
    /// the existing record without crediting the ledger again.
    pub async fn observe_deposit(
        &self,
        user_id: UserId,
        account_id: AccountId,
        asset: &str,
        amount: rust_decimal::Decimal,
        tx_hash: &str,
        confirmations: u32,
    ) -> Result<Transaction, AccountServiceError> {
        let matches = self
            .transactions
            .query(&|t: &Transaction| t.tx_hash.as_deref() == Some(tx_hash))
            .await
            .map_err(|e| AccountServiceError::Persistence(e.to_string()))?;
        if let Some(existing) = matches.into_iter().next() {
            if existing.status == TransactionStatus::Confirmed {
                return Ok(existing);
            }
            return self.advance_deposit(existing, confirmations).await;
        }

        let threshold = self.config.deposit_confirmation_threshold.get(asset).copied().unwrap_or(u32::MAX);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut tx = Transaction {
            id,
            user_id,
            account_id,
            asset: asset.to_string(),
            kind: TransactionKind::Deposit,
            status: TransactionStatus::Pending,
            amount,
            address: None,
            tx_hash: Some(tx_hash.to_string()),
            confirmations,
            created_at: Utc::now(),
        };

        if confirmations >= threshold {
            self.ledger.credit(account_id, asset, amount)?;
            tx.status = TransactionStatus::Confirmed;
            tracing::info!(user_id, account_id, asset, %amount, tx_hash, "deposit confirmed");
        }

        self.transactions.insert(&tx).await.map_err(|e| AccountServiceError::Persistence(e.to_string()))?;
        Ok(tx)
    }

    async fn advance_deposit(&self, mut tx: Transaction, confirmations: u32) -> Result<Transaction, AccountServiceError> {
        tx.confirmations = confirmations;
        let threshold = self.config.deposit_confirmation_threshold.get(&tx.asset).copied().unwrap_or(u32::MAX);
        if tx.status == TransactionStatus::Pending && confirmations >= threshold {
            self.ledger.credit(tx.account_id, &tx.asset, tx.amount)?;
            tx.status = TransactionStatus::Confirmed;
            tracing::info!(account_id = tx.account_id, asset = %tx.asset, amount = %tx.amount, tx_hash = ?tx.tx_hash, "deposit confirmed");
        }
        self.transactions
            .update(tx.id, &tx)
            .await
            .map_err(|e| AccountServiceError::Persistence(e.to_string()))?;
        Ok(tx)
    }
}
