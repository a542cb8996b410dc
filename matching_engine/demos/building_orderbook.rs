use std::sync::Arc;

use ledger::Ledger;
use matching_engine::fees::NoFees;
use matching_engine::types::{OrderKind, Side, Tif};
use matching_engine::{new_order, MatchingEngine};
use rust_decimal::Decimal;

fn main() {
    let ledger = Arc::new(Ledger::new());
    ledger.credit(1, "USDT", Decimal::from(100_000)).unwrap();
    ledger.lock(1, "USDT", Decimal::from(100_000)).unwrap();
    ledger.credit(2, "ALT", Decimal::from(1000)).unwrap();
    ledger.lock(2, "ALT", Decimal::from(1000)).unwrap();

    let mut eng = MatchingEngine::new("ALT/USDT", "ALT", "USDT", ledger, Arc::new(NoFees));

    for (id, price, amount) in [(1u64, 99, 100), (2, 98, 150), (3, 97, 200)] {
        let order = new_order(id, 1, "ALT/USDT", Side::Buy, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(price)), None, Decimal::from(amount), None);
        eng.submit_limit(order).unwrap();
    }
    for (id, price, amount) in [(4u64, 101, 100), (5, 102, 150), (6, 103, 200)] {
        let order = new_order(id, 2, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(price)), None, Decimal::from(amount), None);
        eng.submit_limit(order).unwrap();
    }

    let book = eng.snapshot(5);
    println!("Best bid: {:?}", book.bids.first());
    println!("Best ask: {:?}", book.asks.first());
    let spread = match (book.bids.first(), book.asks.first()) {
        (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
        _ => None,
    };
    println!("Spread: {:?}", spread);

    assert_eq!(book.bids.first().map(|l| l.0), Some(Decimal::from(99)));
    assert_eq!(book.asks.first().map(|l| l.0), Some(Decimal::from(101)));
    assert_eq!(spread, Some(Decimal::from(2)));
}
