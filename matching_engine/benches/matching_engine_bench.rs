use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ledger::Ledger;
use matching_engine::fees::NoFees;
use matching_engine::types::{OrderKind, Side, Tif};
use matching_engine::{new_order, MatchingEngine};
use rust_decimal::Decimal;
use std::time::Duration;

fn engine() -> (MatchingEngine, Arc<Ledger>) {
    let ledger = Arc::new(Ledger::new());
    let eng = MatchingEngine::new("BTC/USDT", "BTC", "USDT", ledger.clone(), Arc::new(NoFees));
    (eng, ledger)
}

fn fund(ledger: &Ledger, account: u64, asset: &str, amount: Decimal) {
    ledger.credit(account, asset, amount).unwrap();
    ledger.lock(account, asset, amount).unwrap();
}

// Simulates realistic exchange behavior with mixed order types
fn simulate_exchange_orders(eng: &mut MatchingEngine, ledger: &Ledger, order_count: usize) {
    let base_price = 50000;
    let mut order_ids = Vec::new();

    fund(ledger, 1, "USDT", Decimal::from(base_price) * Decimal::from(order_count as i64) * Decimal::from(10));
    fund(ledger, 2, "BTC", Decimal::from(order_count as i64) * Decimal::from(10));

    for i in 0..order_count {
        let id = (i + 1) as u64;
        // 70% limit orders, 30% market orders (realistic exchange ratio)
        if i % 10 < 7 {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let price_offset = (i % 10) as i64 - 5;
            let price = Decimal::from(base_price + price_offset);
            let quantity = Decimal::from(((i % 5) + 1) as i64);
            let account = if side == Side::Buy { 1 } else { 2 };

            let order = new_order(id, account, "BTC/USDT", side, OrderKind::Limit, Tif::Gtc, Some(price), None, quantity, None);
            let _ = eng.submit_limit(order);
            order_ids.push(id);

            // Cancel 10% of limit orders to simulate real behavior
            if i % 10 == 0 && !order_ids.is_empty() {
                let cancel_idx = i % order_ids.len();
                let _ = eng.cancel(order_ids[cancel_idx]);
            }
        } else {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let quantity = Decimal::from(((i % 3) + 1) as i64);
            let account = if side == Side::Buy { 1 } else { 2 };
            let max_quote = if side == Side::Buy { Some(Decimal::from(base_price) * quantity * Decimal::from(2)) } else { None };
            let order = new_order(id, account, "BTC/USDT", side, OrderKind::Market, Tif::Ioc, None, None, quantity, max_quote);
            let _ = eng.submit_market(order);
        }
    }
}

fn bench_mixed_order_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_simulation");

    for order_count in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*order_count as u64));

        group.bench_with_input(format!("{}_orders", order_count), order_count, |b, &count| {
            b.iter(|| {
                let (mut eng, ledger) = engine();
                simulate_exchange_orders(black_box(&mut eng), &ledger, black_box(count));
            });
        });
    }

    group.finish();
}

fn bench_limit_order_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("limit_orders");

    group.bench_function("place_limit_order", |b| {
        let price = Decimal::from(50000);
        let quantity = Decimal::ONE;

        b.iter_batched(
            || {
                let (eng, ledger) = engine();
                fund(&ledger, 1, "USDT", Decimal::from(50_000_000));
                eng
            },
            |mut eng| {
                let order = new_order(1, 1, "BTC/USDT", Side::Buy, OrderKind::Limit, Tif::Gtc, Some(black_box(price)), None, black_box(quantity), None);
                let _ = eng.submit_limit(order);
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_market_order_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_orders");

    group.bench_function("execute_market_order", |b| {
        let quantity = Decimal::from(5);

        b.iter_batched(
            || {
                let (mut eng, ledger) = engine();
                fund(&ledger, 2, "BTC", Decimal::from(1000));
                fund(&ledger, 1, "USDT", Decimal::from(10_000_000));
                for i in 0..10u64 {
                    let order = new_order(i + 1, 2, "BTC/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(50000 + i as i64)), None, Decimal::from(10), None);
                    eng.submit_limit(order).unwrap();
                }
                eng
            },
            |mut eng| {
                let order = new_order(1000, 1, "BTC/USDT", Side::Buy, OrderKind::Market, Tif::Ioc, None, None, black_box(quantity), Some(Decimal::from(10_000_000)));
                let _ = eng.submit_market(black_box(order));
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_deep_book_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_book");

    group.bench_function("match_across_levels", |b| {
        b.iter_batched(
            || {
                let (mut eng, ledger) = engine();
                fund(&ledger, 2, "BTC", Decimal::from(100_000));
                fund(&ledger, 1, "USDT", Decimal::from(1_000_000_000));
                for i in 0..100u64 {
                    let order = new_order(i + 1, 2, "BTC/USDT", Side::Sell, OrderKind::Limit, Tif::Gtc, Some(Decimal::from(50000 + i as i64)), None, Decimal::from(100), None);
                    eng.submit_limit(order).unwrap();
                }
                eng
            },
            |mut eng| {
                let order = new_order(1000, 1, "BTC/USDT", Side::Buy, OrderKind::Market, Tif::Ioc, None, None, black_box(Decimal::from(5000)), Some(Decimal::from(1_000_000_000)));
                let _ = eng.submit_market(black_box(order));
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_high_frequency_trading(c: &mut Criterion) {
    let mut group = c.benchmark_group("high_frequency");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("hft_simulation", |b| {
        b.iter(|| {
            let (mut eng, ledger) = engine();
            fund(&ledger, 1, "USDT", Decimal::from(1_000_000_000));
            let base_price = Decimal::from(50000);

            // Simulate HFT: rapid order placement and cancellation
            for i in 0..1000u64 {
                let price_offset = ((i % 10) as i64 - 5) / 10;
                let price = base_price + Decimal::from(price_offset);
                let quantity = Decimal::ONE;

                let order = new_order(i + 1, 1, "BTC/USDT", Side::Buy, OrderKind::Limit, Tif::Gtc, Some(price), None, quantity, None);
                eng.submit_limit(order).unwrap();

                // Cancel immediately (HFT behavior)
                if i % 3 == 0 {
                    let _ = eng.cancel(i + 1);
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mixed_order_throughput,
    bench_limit_order_placement,
    bench_market_order_execution,
    bench_deep_book_matching,
    bench_high_frequency_trading
);

criterion_main!(benches);
