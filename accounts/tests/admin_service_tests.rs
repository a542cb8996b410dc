use std::sync::Arc;

use accounts::audit::AuditLog;
use accounts::config::Config;
use accounts::domain::{Account, AccountStatus, AdminIdentity, AdminRole, AuditLogEntry, WithdrawalRequest, WithdrawalState};
use accounts::error::AdminError;
use accounts::AdminService;
use ledger::{InMemoryRepository, Ledger, Repository};
use rust_decimal_macros::dec;

fn approver(id: u64) -> AdminIdentity {
    AdminIdentity { id, role: AdminRole::Approver }
}

fn super_admin(id: u64) -> AdminIdentity {
    AdminIdentity { id, role: AdminRole::SuperAdmin }
}

async fn setup() -> (AdminService<InMemoryRepository<WithdrawalRequest>, InMemoryRepository<Account>, InMemoryRepository<AuditLogEntry>>, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let withdrawals = InMemoryRepository::<WithdrawalRequest>::new();
    let accounts = InMemoryRepository::<Account>::new();
    accounts.insert(&Account { id: 1, user_id: 1, status: AccountStatus::Active, kyc_level: 2 }).await.unwrap();
    let audit = AuditLog::new(InMemoryRepository::<AuditLogEntry>::new());
    (AdminService::new(ledger.clone(), config, withdrawals, accounts, audit), ledger)
}

#[tokio::test]
async fn withdrawal_needs_two_distinct_admin_approvals() {
    let (admin, ledger) = setup().await;
    ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let request = admin.request_withdrawal(1, "USDT", dec!(100)).await.unwrap();
    assert_eq!(request.state, WithdrawalState::Pending);
    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(101));

    let request = admin.approve_withdrawal(request.id, approver(10)).await.unwrap();
    assert_eq!(request.state, WithdrawalState::ApprovedPendingSecond);

    let request = admin.approve_withdrawal(request.id, approver(20)).await.unwrap();
    assert_eq!(request.state, WithdrawalState::Approved);
    // Second approval only enqueues the broadcast; funds stay locked.
    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(101));

    let request = admin.confirm_broadcast(request.id).await.unwrap();
    assert_eq!(request.state, WithdrawalState::Confirmed);
    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(0));
    assert_eq!(ledger.get_balance(1, "USDT").available, dec!(899));
}

#[tokio::test]
async fn failed_broadcast_reopens_the_request_for_reapproval() {
    let (admin, ledger) = setup().await;
    ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let request = admin.request_withdrawal(1, "USDT", dec!(100)).await.unwrap();
    admin.approve_withdrawal(request.id, approver(10)).await.unwrap();
    let request = admin.approve_withdrawal(request.id, approver(20)).await.unwrap();
    assert_eq!(request.state, WithdrawalState::Approved);

    let request = admin.fail_broadcast(request.id, "node unreachable").await.unwrap();
    assert_eq!(request.state, WithdrawalState::Pending);
    assert_eq!(request.last_error.as_deref(), Some("node unreachable"));
    // Funds are still locked, not lost, and the prior approvals don't count.
    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(101));

    admin.approve_withdrawal(request.id, approver(10)).await.unwrap();
    let request = admin.approve_withdrawal(request.id, approver(20)).await.unwrap();
    assert_eq!(request.state, WithdrawalState::Approved);
}

#[tokio::test]
async fn same_admin_cannot_supply_both_approvals() {
    let (admin, ledger) = setup().await;
    ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let request = admin.request_withdrawal(1, "USDT", dec!(100)).await.unwrap();
    admin.approve_withdrawal(request.id, approver(10)).await.unwrap();
    let result = admin.approve_withdrawal(request.id, approver(10)).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn rejecting_a_withdrawal_unlocks_the_reservation() {
    let (admin, ledger) = setup().await;
    ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let request = admin.request_withdrawal(1, "USDT", dec!(100)).await.unwrap();
    admin.reject_withdrawal(request.id, approver(10), "fraud review").await.unwrap();

    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(0));
    assert_eq!(ledger.get_balance(1, "USDT").available, dec!(1000));
}

#[tokio::test]
async fn freezing_an_account_is_recorded_in_the_audit_trail() {
    let (admin, _ledger) = setup().await;
    admin.freeze_account(1, super_admin(99), "compliance hold").await.unwrap();

    let trail = admin.audit_trail().await;
    assert!(trail.iter().any(|e| e.action == "account.frozen"));
}

#[tokio::test]
async fn plain_approver_cannot_freeze_an_account() {
    let (admin, _ledger) = setup().await;
    let result = admin.freeze_account(1, approver(99), "compliance hold").await;

    assert!(matches!(result, Err(AdminError::AdminInsufficientRole)));
}
