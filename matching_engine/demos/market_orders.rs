use std::sync::Arc;

use ledger::Ledger;
use matching_engine::events::EngineEvent;
use matching_engine::fees::NoFees;
use matching_engine::types::{OrderKind, Side, Tif};
use matching_engine::{new_order, MatchingEngine};
use rust_decimal::Decimal;

fn main() {
    let ledger = Arc::new(Ledger::new());
    ledger.credit(2, "ALT", Decimal::from(1000)).unwrap();
    ledger.lock(2, "ALT", Decimal::from(1000)).unwrap();
    ledger.credit(1, "USDT", Decimal::from(100_000)).unwrap();
    ledger.lock(1, "USDT", Decimal::from(100_000)).unwrap();

    let mut eng = MatchingEngine::new("ALT/USDT", "ALT", "USDT", ledger, Arc::new(NoFees));

    for (id, price, amount) in [(1u64, 101, 100), (2, 102, 150), (3, 103, 200)] {
        let order = new_order(id, 2, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(price)), None, Decimal::from(amount), None);
        eng.submit_limit(order).unwrap();
    }

    let buy = new_order(4, 1, "ALT/USDT", Side::Buy, OrderKind::Market, Tif::Ioc, None, None, Decimal::from(120), Some(Decimal::from(100_000)));
    let events = eng.submit_market(buy).unwrap();

    let trades: Vec<_> = events.iter().filter_map(|e| match e { EngineEvent::TradeExecuted(t) => Some(t), _ => None }).collect();
    for t in &trades {
        println!("{} units @ {}", t.amount, t.price);
    }

    let total_filled: Decimal = trades.iter().map(|t| t.amount).sum();
    println!("Total filled: {}", total_filled);

    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].price, Decimal::from(101));
    assert_eq!(trades[0].amount, Decimal::from(100));
    assert_eq!(trades[1].price, Decimal::from(102));
    assert_eq!(trades[1].amount, Decimal::from(20));
}
