use std::sync::Arc;

use ledger::Ledger;
use matching_engine::fees::NoFees;
use matching_engine::types::{OrderKind, Side, Tif};
use matching_engine::{new_order, MatchingEngine};
use rust_decimal::Decimal;

fn main() {
    // The engine assumes the caller (AccountService) already locked each
    // order's collateral before submission; fund per-order here to mirror
    // that. Order 1 needs 100*50 = 5000 USDT, order 2 needs 99*75 = 7425.
    let ledger = Arc::new(Ledger::new());
    ledger.credit(1, "USDT", Decimal::from(12_425)).unwrap();
    ledger.lock(1, "USDT", Decimal::from(5_000)).unwrap();
    ledger.lock(1, "USDT", Decimal::from(7_425)).unwrap();
    ledger.credit(2, "ALT", Decimal::from(60)).unwrap();
    ledger.lock(2, "ALT", Decimal::from(60)).unwrap();

    let mut eng = MatchingEngine::new("ALT/USDT", "ALT", "USDT", ledger.clone(), Arc::new(NoFees));

    eng.submit_limit(new_order(1, 1, "ALT/USDT", Side::Buy, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(100)), None, Decimal::from(50), None)).unwrap();
    eng.submit_limit(new_order(2, 1, "ALT/USDT", Side::Buy, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(99)), None, Decimal::from(75), None)).unwrap();
    eng.submit_limit(new_order(3, 2, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(101)), None, Decimal::from(60), None)).unwrap();

    let book = eng.snapshot(5);
    println!("Best bid: {:?}", book.bids.first());
    println!("Best ask: {:?}", book.asks.first());

    let events = eng.cancel(1).unwrap();
    println!("Canceled order 1: {:?}", events);

    let book = eng.snapshot(5);
    println!("Best bid after cancellation: {:?}", book.bids.first());

    assert_eq!(book.bids.first().map(|l| l.0), Some(Decimal::from(99)));
    assert_eq!(ledger.get_balance(1, "USDT").locked, Decimal::from(99) * Decimal::from(75));

    let no_op = eng.cancel(999).unwrap();
    println!("Cancel of unknown order 999 produced {} events", no_op.len());
    assert!(no_op.is_empty());
}
