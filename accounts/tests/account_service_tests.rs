use std::sync::Arc;

use accounts::account_service::OrderRequest;
use accounts::audit::AuditLog;
use accounts::config::Config;
use accounts::domain::{Account, AccountStatus, AuditLogEntry};
use accounts::AccountService;
use ledger::{InMemoryRepository, Ledger, Repository};
use matching_engine::events::EngineEvent;
use matching_engine::types::{OrderKind, Side, Tif};
use rust_decimal_macros::dec;

async fn service_with_account(account_id: u64, status: AccountStatus) -> (AccountService<InMemoryRepository<Account>, InMemoryRepository<AuditLogEntry>>, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let accounts = InMemoryRepository::<Account>::new();
    accounts
        .insert(&Account { id: account_id, user_id: account_id, status, kyc_level: 1 })
        .await
        .unwrap();
    let audit = AuditLog::new(InMemoryRepository::<AuditLogEntry>::new());
    let service = AccountService::new(ledger.clone(), config, accounts, audit);
    (service, ledger)
}

#[tokio::test]
async fn buy_limit_locks_quote_and_rests_on_empty_book() {
    let (service, ledger) = service_with_account(1, AccountStatus::Active).await;
    ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let (order_id, events) = service
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".to_string(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(5),
            quote_budget: None,
        })
        .await
        .unwrap();

    assert!(order_id > 0);
    assert!(events.is_empty());
    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(500));
    assert_eq!(ledger.get_balance(1, "USDT").available, dec!(500));
}

#[tokio::test]
async fn frozen_account_is_rejected_before_any_lock() {
    let (service, ledger) = service_with_account(1, AccountStatus::Frozen).await;
    ledger.credit(1, "USDT", dec!(1000)).unwrap();

    let result = service
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".to_string(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(5),
            quote_budget: None,
        })
        .await;

    assert!(result.is_err());
    assert_eq!(ledger.get_balance(1, "USDT").locked, dec!(0));
}

#[tokio::test]
async fn insufficient_balance_fails_admission() {
    let (service, _ledger) = service_with_account(1, AccountStatus::Active).await;

    let result = service
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".to_string(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(5),
            quote_budget: None,
        })
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn crossing_orders_trade_and_cancel_unlocks_residue() {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let accounts = InMemoryRepository::<Account>::new();
    accounts.insert(&Account { id: 1, user_id: 1, status: AccountStatus::Active, kyc_level: 1 }).await.unwrap();
    accounts.insert(&Account { id: 2, user_id: 2, status: AccountStatus::Active, kyc_level: 1 }).await.unwrap();
    let audit = AuditLog::new(InMemoryRepository::<AuditLogEntry>::new());
    let service = AccountService::new(ledger.clone(), config, accounts, audit);

    ledger.credit(2, "ALT", dec!(10)).unwrap();
    let (sell_id, _) = service
        .submit_order(OrderRequest {
            account_id: 2,
            market: "ALT/USDT".to_string(),
            side: Side::Sell,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(10),
            quote_budget: None,
        })
        .await
        .unwrap();

    ledger.credit(1, "USDT", dec!(1000)).unwrap();
    let (_buy_id, events) = service
        .submit_order(OrderRequest {
            account_id: 1,
            market: "ALT/USDT".to_string(),
            side: Side::Buy,
            kind: OrderKind::Limit,
            tif: Tif::Gtc,
            price: Some(dec!(100)),
            stop_price: None,
            amount: dec!(4),
            quote_budget: None,
        })
        .await
        .unwrap();

    assert!(events.iter().any(|e| matches!(e, EngineEvent::TradeExecuted(_))));
    // 4 ALT at 100 USDT notional, less the configured 20bps taker fee.
    assert_eq!(ledger.get_balance(1, "ALT").available, dec!(3.20));

    // Remaining resting sell order still locks 6 ALT; canceling releases it.
    let cancel_events = service.cancel_order("ALT/USDT", sell_id).await.unwrap();
    assert!(!cancel_events.is_empty());
    assert_eq!(ledger.get_balance(2, "ALT").locked, dec!(0));
}
