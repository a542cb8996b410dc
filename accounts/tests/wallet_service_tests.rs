use std::sync::Arc;

use accounts::config::Config;
use accounts::domain::{Transaction, TransactionStatus};
use accounts::WalletService;
use ledger::{InMemoryRepository, Ledger};
use rust_decimal_macros::dec;

#[tokio::test]
async fn deposit_stays_pending_below_confirmation_threshold() {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let transactions = InMemoryRepository::<Transaction>::new();
    let wallet = WalletService::new(ledger.clone(), config, transactions);

    let tx = wallet.observe_deposit(1, 1, "USDT", dec!(100), "0xabc", 2).await.unwrap();

    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(ledger.get_balance(1, "USDT").available, dec!(0));
}

#[tokio::test]
async fn deposit_credits_ledger_once_threshold_reached() {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let transactions = InMemoryRepository::<Transaction>::new();
    let wallet = WalletService::new(ledger.clone(), config, transactions);

    let tx = wallet.observe_deposit(1, 1, "USDT", dec!(100), "0xabc", 12).await.unwrap();

    assert_eq!(tx.status, TransactionStatus::Confirmed);
    assert_eq!(ledger.get_balance(1, "USDT").available, dec!(100));
}

#[tokio::test]
async fn redelivered_tx_hash_after_confirmation_is_a_no_op() {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let transactions = InMemoryRepository::<Transaction>::new();
    let wallet = WalletService::new(ledger.clone(), config, transactions);

    wallet.observe_deposit(1, 1, "USDT", dec!(100), "0xabc", 12).await.unwrap();
    wallet.observe_deposit(1, 1, "USDT", dec!(100), "0xabc", 20).await.unwrap();

    assert_eq!(ledger.get_balance(1, "USDT").available, dec!(100));
}

#[tokio::test]
async fn repeated_observation_advances_confirmations_until_threshold() {
    let ledger = Arc::new(Ledger::new());
    let config = Config::load().unwrap();
    let transactions = InMemoryRepository::<Transaction>::new();
    let wallet = WalletService::new(ledger.clone(), config, transactions);

    let tx1 = wallet.observe_deposit(1, 1, "ALT", dec!(5), "0xdef", 3).await.unwrap();
    assert_eq!(tx1.status, TransactionStatus::Pending);
    assert_eq!(ledger.get_balance(1, "ALT").available, dec!(0));

    let tx2 = wallet.observe_deposit(1, 1, "ALT", dec!(5), "0xdef", 20).await.unwrap();
    assert_eq!(tx2.status, TransactionStatus::Confirmed);
    assert_eq!(ledger.get_balance(1, "ALT").available, dec!(5));
}
