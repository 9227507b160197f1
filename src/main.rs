use std::sync::Arc;
use std::thread;

use anyhow::Result;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use matchbook::{load_config, MatchingEngine, Order, OrderKind, Side};

/// Demo driver for the order matching engine
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Worker threads for the async phase (overrides ENGINE_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Producer threads in the randomized load phase
    #[arg(long, default_value_t = 4)]
    producers: usize,

    /// Random orders submitted per producer
    #[arg(long, default_value_t = 1000)]
    orders_per_producer: usize,

    /// Seed for the random order stream
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    matchbook::utils::logging::init_logger();

    let cli = Cli::parse();
    let mut config = load_config();
    if let Some(workers) = cli.workers {
        config.num_workers = workers.max(1);
    }

    let engine = Arc::new(MatchingEngine::with_config(&config));

    scripted_demo(&engine)?;
    randomized_load(&engine, cli.producers, cli.orders_per_producer, cli.seed)?;

    let stats = engine.stats();
    info!(
        "totals: {} orders processed, {} trades, {} units traded",
        stats.orders_processed, stats.trades_executed, stats.quantity_traded
    );

    Ok(())
}

/// The scripted scenario: seed the book, then demonstrate a single match
/// and a multi-level sweep, printing the book after each step.
fn scripted_demo(engine: &MatchingEngine) -> Result<()> {
    info!("--- scripted demo ---");

    engine.register_trade_callback(|trade| info!("TRADE EXECUTED: {}", trade));

    let seed = [
        (Side::Buy, "100.0", 10),
        (Side::Buy, "99.0", 20),
        (Side::Buy, "98.0", 30),
        (Side::Sell, "102.0", 15),
        (Side::Sell, "103.0", 25),
        (Side::Sell, "104.0", 35),
    ];
    for (side, price, qty) in seed {
        let order = engine.new_order(side, OrderKind::Limit, price.parse::<Decimal>()?, qty)?;
        engine.submit_sync(order);
    }
    info!("initial book:\n{}", engine.book().render());

    let buy = engine.new_order(Side::Buy, OrderKind::Limit, "102.0".parse()?, 5)?;
    let trades = engine.submit_sync(buy);
    info!("aggressive buy produced {} trade(s)", trades.len());
    info!("book after buy:\n{}", engine.book().render());

    let sell = engine.new_order(Side::Sell, OrderKind::Limit, "98.0".parse()?, 50)?;
    let trades = engine.submit_sync(sell);
    info!("aggressive sell produced {} trade(s)", trades.len());
    info!("final book:\n{}", engine.book().render());

    Ok(())
}

/// Concurrent producers feeding random orders through the async path.
fn randomized_load(
    engine: &Arc<MatchingEngine>,
    producers: usize,
    orders_per_producer: usize,
    seed: u64,
) -> Result<()> {
    info!(
        "--- randomized load: {} producers x {} orders ---",
        producers, orders_per_producer
    );

    // The scripted callback would flood the log here
    engine.register_trade_callback(|_| {});
    engine.start();

    let mut handles = Vec::new();
    for p in 0..producers {
        let engine = Arc::clone(engine);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(p as u64));
        handles.push(thread::spawn(move || {
            for _ in 0..orders_per_producer {
                let order = random_order(&engine, &mut rng);
                if engine.submit_async(order).is_err() {
                    break;
                }
            }
        }));
    }
    for handle in handles {
        let _ = handle.join();
    }

    engine.stop();
    info!("book after load:\n{}", engine.book().render());

    Ok(())
}

/// A random limit order: price uniform in [90.00, 110.00] at two decimal
/// places, quantity uniform in [1, 100], 50/50 buy or sell.
fn random_order(engine: &MatchingEngine, rng: &mut StdRng) -> Order {
    let side = if rng.gen_bool(0.5) {
        Side::Buy
    } else {
        Side::Sell
    };
    let cents: i64 = rng.gen_range(9_000..=11_000);
    let price = Decimal::new(cents, 2);
    let quantity = rng.gen_range(1..=100);

    engine
        .new_order(side, OrderKind::Limit, price, quantity)
        .expect("quantity is always positive")
}
