use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use crate::balance::AccountId;
use crate::entry::{EntryType, LedgerEntry};

/// Postgres has no unsigned integer type, so rows are fetched as `i64` and
/// converted to the `u64` ids `LedgerEntry` uses everywhere else.
#[derive(sqlx::FromRow)]
struct PgEntryRow {
    id: i64,
    account_id: i64,
    asset: String,
    amount: Decimal,
    balance_after: Decimal,
    entry_type: String,
    reference_id: Option<i64>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PgEntryRow> for LedgerEntry {
    fn from(row: PgEntryRow) -> Self {
        LedgerEntry {
            id: row.id as u64,
            account_id: row.account_id as AccountId,
            asset: row.asset,
            amount: row.amount,
            balance_after: row.balance_after,
            entry_type: row.entry_type,
            reference_id: row.reference_id.map(|id| id as u64),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// Errors from the Postgres-backed entry store. Kept separate from
/// `LedgerError` (which derives `PartialEq` for test convenience) since
/// `sqlx::Error` doesn't implement it.
#[derive(Debug, Error)]
pub enum PgStoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Durable archive of `LedgerEntry` rows, mirroring the in-memory `Ledger`'s
/// append-only log but backed by Postgres so history survives a restart.
/// The in-memory `Ledger` remains the authoritative, low-latency balance
/// store (§5: a single mutex already serializes postings); this store is
/// written to alongside it for audit/replay, the way the teacher's
/// `accounts/src/models/ledger.rs::append` persists every entry under an
/// advisory lock keyed on (account, asset) to serialize concurrent appends
/// to the same row without a table-wide lock.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one entry inside a transaction holding an advisory lock on
    /// `(account_id, asset)`, the same pattern the teacher uses to prevent
    /// two concurrent appends for the same row from interleaving.
    pub async fn append(
        &self,
        account_id: AccountId,
        asset: &str,
        amount: Decimal,
        balance_after: Decimal,
        entry_type: EntryType,
        reference_id: Option<u64>,
        description: Option<&str>,
    ) -> Result<LedgerEntry, PgStoreError> {
        let mut tx = self.pool.begin().await?;

        let lock_key = advisory_lock_key(account_id, asset);
        sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_key).execute(&mut *tx).await?;

        let row = sqlx::query_as::<_, PgEntryRow>(
            "INSERT INTO ledger_entries
                (account_id, asset, amount, balance_after, entry_type, reference_id, description, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, account_id, asset, amount, balance_after, entry_type, reference_id, description, created_at",
        )
        .bind(account_id as i64)
        .bind(asset)
        .bind(amount)
        .bind(balance_after)
        .bind(entry_type.to_string())
        .bind(reference_id.map(|id| id as i64))
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    pub async fn history(&self, account_id: AccountId, asset: &str, limit: i64) -> Result<Vec<LedgerEntry>, PgStoreError> {
        let rows = sqlx::query_as::<_, PgEntryRow>(
            "SELECT id, account_id, asset, amount, balance_after, entry_type, reference_id, description, created_at
             FROM ledger_entries
             WHERE account_id = $1 AND asset = $2
             ORDER BY id DESC
             LIMIT $3",
        )
        .bind(account_id as i64)
        .bind(asset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// First 8 bytes of a simple hash over `(account_id, asset)`, used as the
/// advisory lock key — same idea as the teacher's XOR of user id and asset
/// hash, adapted for an integer account id instead of a `Uuid`.
fn advisory_lock_key(account_id: AccountId, asset: &str) -> i64 {
    let mut hash: u64 = account_id;
    for byte in asset.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(byte as u64);
    }
    hash as i64
}
