use chrono::{DateTime, Utc};
use ledger::Identifiable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type AccountId = ledger::AccountId;
pub type TransactionId = u64;
pub type AuditLogId = u64;

/// An admin's clearance level (§7 `admin_insufficient_role`). `Approver` may
/// act on withdrawals; account freeze/unfreeze needs `SuperAdmin`. Ordered so
/// a higher role satisfies a lower role's requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdminRole {
    Approver,
    SuperAdmin,
}

/// The admin identity `AdminService` is called with. There is no
/// authentication layer in this crate (§1 scopes it out as an external
/// boundary concern); callers assert the role along with the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: UserId,
    pub role: AdminRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for User {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

/// Mirrors a User one-to-one at creation (§3); the account, not the user, is
/// what AccountService checks before admitting an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub status: AccountStatus,
    pub kyc_level: u8,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

impl Identifiable for Account {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Fee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A deposit or withdrawal moving funds across the ledger boundary (§3,
/// §4.5). Withdrawals additionally carry two-eyes approval state in
/// `WithdrawalState`, tracked separately because it is richer than the
/// coarse pending/confirmed/failed status every transaction shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub asset: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Decimal,
    pub address: Option<String>,
    pub tx_hash: Option<String>,
    pub confirmations: u32,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for Transaction {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalState {
    Pending,
    ApprovedPendingSecond,
    Approved,
    Confirmed,
    Rejected,
}

/// The two-eyes approval workflow layered over a withdrawal `Transaction`
/// (§4.5). Kept as its own entity rather than folded into `Transaction` so
/// the approver identities and network fee stay out of the generic
/// deposit/withdrawal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: TransactionId,
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub asset: String,
    pub amount: Decimal,
    pub network_fee: Decimal,
    pub state: WithdrawalState,
    pub approvals: Vec<UserId>,
    pub last_error: Option<String>,
}

impl Identifiable for WithdrawalRequest {
    fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub actor: String,
    pub action: String,
    pub entity_ref: String,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for AuditLogEntry {
    fn id(&self) -> u64 {
        self.id
    }
}
