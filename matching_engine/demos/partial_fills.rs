use std::sync::Arc;

use ledger::Ledger;
use matching_engine::events::EngineEvent;
use matching_engine::fees::NoFees;
use matching_engine::types::{OrderKind, Side, Tif};
use matching_engine::{new_order, MatchingEngine};
use rust_decimal::Decimal;

fn main() {
    let ledger = Arc::new(Ledger::new());
    ledger.credit(2, "ALT", Decimal::from(50)).unwrap();
    ledger.lock(2, "ALT", Decimal::from(50)).unwrap();
    ledger.credit(1, "USDT", Decimal::from(10_000)).unwrap();
    ledger.lock(1, "USDT", Decimal::from(10_000)).unwrap();

    let mut eng = MatchingEngine::new("ALT/USDT", "ALT", "USDT", ledger, Arc::new(NoFees));
    eng.submit_limit(new_order(1, 2, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(100)), None, Decimal::from(50), None)).unwrap();

    let buy = new_order(2, 1, "ALT/USDT", Side::Buy, OrderKind::Market, Tif::Ioc, None, None, Decimal::from(100), Some(Decimal::from(10_000)));
    let events = eng.submit_market(buy).unwrap();
    let filled: Decimal = events.iter().filter_map(|e| match e { EngineEvent::TradeExecuted(t) => Some(t.amount), _ => None }).sum();

    println!("Requested: 100 units");
    println!("Filled: {} units", filled);
    println!("Unfilled: {} units", Decimal::from(100) - filled);

    assert_eq!(filled, Decimal::from(50));
    assert_eq!(eng.snapshot(5).asks.first(), None);

    let ledger2 = Arc::new(Ledger::new());
    ledger2.credit(2, "ALT", Decimal::from(90)).unwrap();
    ledger2.lock(2, "ALT", Decimal::from(90)).unwrap();
    ledger2.credit(1, "USDT", Decimal::from(10_000)).unwrap();
    ledger2.lock(1, "USDT", Decimal::from(10_000)).unwrap();

    let mut eng2 = MatchingEngine::new("ALT/USDT", "ALT", "USDT", ledger2, Arc::new(NoFees));
    for (id, price, amount) in [(1u64, 100, 30), (2, 101, 30), (3, 102, 30)] {
        eng2.submit_limit(new_order(id, 2, "ALT/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(price)), None, Decimal::from(amount), None)).unwrap();
    }

    let buy2 = new_order(4, 1, "ALT/USDT", Side::Buy, OrderKind::Market, Tif::Ioc, None, None, Decimal::from(50), Some(Decimal::from(10_000)));
    let events2 = eng2.submit_market(buy2).unwrap();

    println!("Multi-level fill:");
    for e in &events2 {
        if let EngineEvent::TradeExecuted(t) = e {
            println!("{} units @ {}", t.amount, t.price);
        }
    }
}
