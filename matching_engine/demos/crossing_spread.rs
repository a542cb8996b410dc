use std::sync::Arc;

use ledger::Ledger;
use matching_engine::fees::NoFees;
use matching_engine::types::{OrderKind, Side, Tif};
use matching_engine::events::EngineEvent;
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

    // Resting bids top out at 99; a sell willing to go as low as 98 crosses
    // two price levels and trades each at the maker's own price (price
    // improvement flows to the taker, never the other way).
    let sell = new_order(4, 2, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(98)), None, Decimal::from(250), None);
    let events = eng.submit_limit(sell).unwrap();

    let trades: Vec<_> = events.iter().filter_map(|e| match e { EngineEvent::TradeExecuted(t) => Some(t), _ => None }).collect();
    let total_filled: Decimal = trades.iter().map(|t| t.amount).sum();
    println!("Order 4 filled {} units across {} levels", total_filled, trades.len());
    for t in &trades {
        println!("{} units @ {}", t.amount, t.price);
    }

    let book = eng.snapshot(5);
    println!("Best bid: {:?}", book.bids.first());

    assert_eq!(trades.len(), 2);
    assert_eq!(total_filled, Decimal::from(250));
    assert_eq!(book.bids.first().map(|l| l.0), Some(Decimal::from(97)));
}
