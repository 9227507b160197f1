//! Multi-producer stress tests for the async submission path.
//!
//! Concurrent submissions may be processed in any order, so these tests
//! assert invariants (counts, conservation, book consistency) rather than
//! any particular interleaving.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use matchbook::{MatchingEngine, OrderKind, Side};

const PRODUCERS: usize = 4;
const ORDERS_PER_PRODUCER: usize = 250;

#[test]
fn no_orders_lost_or_duplicated_under_concurrent_submission() {
    let engine = Arc::new(MatchingEngine::new(3));
    engine.start();

    crossbeam::thread::scope(|scope| {
        for p in 0..PRODUCERS {
            let engine = Arc::clone(&engine);
            scope.spawn(move |_| {
                for i in 0..ORDERS_PER_PRODUCER {
                    // Spread prices so some orders match and some rest
                    let side = if (p + i) % 2 == 0 { Side::Buy } else { Side::Sell };
                    let price = dec!(100.0) + Decimal::from((i % 5) as u64);
                    let order = engine
                        .new_order(side, OrderKind::Limit, price, 10)
                        .expect("positive quantity");
                    engine.submit_async(order).expect("engine is running");
                }
            });
        }
    })
    .expect("producer threads panicked");

    // stop() drains the queue and joins workers before returning
    engine.stop();

    let stats = engine.stats();
    let expected = (PRODUCERS * ORDERS_PER_PRODUCER) as u64;
    assert_eq!(stats.orders_processed, expected);
    assert_eq!(engine.pending_orders(), 0);
}

#[test]
fn book_is_never_crossed_after_concurrent_load() {
    let engine = Arc::new(MatchingEngine::new(4));
    engine.start();

    crossbeam::thread::scope(|scope| {
        for p in 0..PRODUCERS {
            let engine = Arc::clone(&engine);
            scope.spawn(move |_| {
                for i in 0..ORDERS_PER_PRODUCER {
                    let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                    let price = dec!(95.0) + Decimal::from(((p * 7 + i) % 11) as u64);
                    let order = engine
                        .new_order(side, OrderKind::Limit, price, 1 + (i % 9) as u64)
                        .expect("positive quantity");
                    engine.submit_async(order).expect("engine is running");
                }
            });
        }
    })
    .expect("producer threads panicked");

    engine.stop();

    if let (Some(bid), Some(ask)) = (engine.book().best_bid(), engine.book().best_ask()) {
        assert!(bid < ask, "crossed book: bid {} >= ask {}", bid, ask);
    }
}

#[test]
fn traded_quantity_is_conserved() {
    let engine = Arc::new(MatchingEngine::new(2));

    // Each trade fills one unit count on each side: the quantity reported
    // by the callback must equal the quantity aggregated in the stats.
    let callback_quantity = Arc::new(AtomicU64::new(0));
    let callback_trades = Arc::new(AtomicU64::new(0));
    {
        let quantity = Arc::clone(&callback_quantity);
        let trades = Arc::clone(&callback_trades);
        engine.register_trade_callback(move |t| {
            quantity.fetch_add(t.quantity, Ordering::Relaxed);
            trades.fetch_add(1, Ordering::Relaxed);
        });
    }

    engine.start();

    crossbeam::thread::scope(|scope| {
        for _ in 0..PRODUCERS {
            let engine = Arc::clone(&engine);
            scope.spawn(move |_| {
                for i in 0..ORDERS_PER_PRODUCER {
                    let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                    let order = engine
                        .new_order(side, OrderKind::Limit, dec!(100.0), 5)
                        .expect("positive quantity");
                    engine.submit_async(order).expect("engine is running");
                }
            });
        }
    })
    .expect("producer threads panicked");

    engine.stop();

    let stats = engine.stats();
    assert_eq!(stats.quantity_traded, callback_quantity.load(Ordering::Relaxed));
    assert_eq!(stats.trades_executed, callback_trades.load(Ordering::Relaxed));

    // Whatever did not trade must still rest in the book, on both sides
    // combined: total submitted = 2 * traded units + resting remainder.
    let bids = engine.book().bid_depth(usize::MAX);
    let asks = engine.book().ask_depth(usize::MAX);
    let resting: u64 = bids.iter().chain(asks.iter()).map(|(_, q)| *q).sum();
    let submitted = (PRODUCERS * ORDERS_PER_PRODUCER * 5) as u64;
    assert_eq!(submitted, 2 * stats.quantity_traded + resting);
}
