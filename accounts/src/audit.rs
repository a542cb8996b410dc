use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use ledger::Repository;

use crate::domain::AuditLogEntry;

/// Append-only audit trail (§3 AuditLog, §4.5). Every admin action
/// (`AdminService`) and every engine `SystemAlert` event forwarded by
/// `AccountService::record_alerts` is recorded here with the acting
/// identity, so both are traceable after the fact.
pub struct AuditLog<R> {
    repo: R,
    next_id: AtomicU64,
}

impl<R> AuditLog<R>
where
    R: Repository<AuditLogEntry, u64>,
{
    pub fn new(repo: R) -> Self {
        Self { repo, next_id: AtomicU64::new(1) }
    }

    pub async fn record(&self, actor: &str, action: &str, entity_ref: &str, metadata: impl Into<String>) -> Result<u64, R::Error> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = AuditLogEntry {
            id,
            actor: actor.to_string(),
            action: action.to_string(),
            entity_ref: entity_ref.to_string(),
            metadata: metadata.into(),
            created_at: Utc::now(),
        };
        tracing::info!(actor, action, entity_ref, "audit entry recorded");
        self.repo.insert(&entry).await?;
        Ok(id)
    }

    pub async fn entries(&self) -> Result<Vec<AuditLogEntry>, R::Error> {
        self.repo.query(&|_| true).await
    }
}
