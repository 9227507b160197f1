use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::engine::order_book::OrderBook;
use crate::engine::order_queue::OrderQueue;
use crate::error::EngineError;
use crate::models::{Order, OrderKind, Price, Quantity, Side, Trade};
use crate::utils::IdAllocator;

/// Aggregate counters, updated atomically by whichever thread processes an
/// order.
#[derive(Debug, Default)]
struct EngineStats {
    orders_processed: AtomicU64,
    trades_executed: AtomicU64,
    quantity_traded: AtomicU64,
}

/// Point-in-time copy of the engine statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub orders_processed: u64,
    pub trades_executed: u64,
    pub quantity_traded: u64,
}

impl EngineStats {
    fn record(&self, trades: &[Trade]) {
        self.orders_processed.fetch_add(1, Ordering::Relaxed);
        self.trades_executed
            .fetch_add(trades.len() as u64, Ordering::Relaxed);
        let quantity: u64 = trades.iter().map(|t| t.quantity).sum();
        self.quantity_traded.fetch_add(quantity, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            orders_processed: self.orders_processed.load(Ordering::Relaxed),
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
            quantity_traded: self.quantity_traded.load(Ordering::Relaxed),
        }
    }
}

/// Hook invoked once per trade on the thread that processed the order.
pub type TradeCallback = Box<dyn Fn(&Trade) + Send + Sync>;

/// The matching engine for a single instrument
///
/// Owns one order book, one pending-order queue and a pool of worker
/// threads. Orders can be processed synchronously on the caller's thread
/// or handed to the workers via [`submit_async`](Self::submit_async).
pub struct MatchingEngine {
    book: Arc<OrderBook>,
    queue: Arc<OrderQueue>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    num_workers: usize,
    stats: Arc<EngineStats>,
    trade_callback: Arc<RwLock<Option<TradeCallback>>>,
    ids: Arc<IdAllocator>,
}

impl MatchingEngine {
    /// Create an idle engine with the given worker pool size. At least one
    /// worker is always configured.
    pub fn new(num_workers: usize) -> Self {
        MatchingEngine {
            book: Arc::new(OrderBook::new()),
            queue: Arc::new(OrderQueue::new()),
            workers: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            num_workers: num_workers.max(1),
            stats: Arc::new(EngineStats::default()),
            trade_callback: Arc::new(RwLock::new(None)),
            ids: Arc::new(IdAllocator::new()),
        }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::new(config.num_workers)
    }

    /// Create a new order with an engine-assigned id.
    ///
    /// The id allocator is owned by the engine, so ids are unique and
    /// strictly increasing across all callers. Zero quantities are
    /// rejected here, at admission, rather than deep inside matching.
    pub fn new_order(
        &self,
        side: Side,
        kind: OrderKind,
        price: Price,
        quantity: Quantity,
    ) -> Result<Order, EngineError> {
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity);
        }
        Ok(Order::new(self.ids.next(), side, kind, price, quantity))
    }

    /// Spawn the worker pool. A no-op when already running.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("start ignored: engine already running");
            return;
        }

        self.queue.reopen();
        let mut workers = self.workers.lock();
        for _ in 0..self.num_workers {
            let queue = Arc::clone(&self.queue);
            let book = Arc::clone(&self.book);
            let stats = Arc::clone(&self.stats);
            let callback = Arc::clone(&self.trade_callback);
            workers.push(thread::spawn(move || {
                while let Some(order) = queue.pop() {
                    process_order(&book, &stats, &callback, order);
                }
                debug!("worker exiting");
            }));
        }
        info!("matching engine started with {} workers", self.num_workers);
    }

    /// Signal shutdown, drain the queue and join every worker. A no-op
    /// when already stopped. Blocks until all workers have exited.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("stop ignored: engine not running");
            return;
        }

        self.queue.shutdown();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked during shutdown");
            }
        }
        info!("matching engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Enqueue an order for asynchronous processing by the worker pool.
    ///
    /// Returns immediately; fails with [`EngineError::NotRunning`] when
    /// the engine has not been started (or lost the race with `stop`).
    pub fn submit_async(&self, order: Order) -> Result<(), EngineError> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        if !self.queue.push(order) {
            return Err(EngineError::NotRunning);
        }
        Ok(())
    }

    /// Process an order immediately on the calling thread, bypassing the
    /// queue. Works whether or not the engine is started; the worker
    /// threads funnel into this same path.
    pub fn submit_sync(&self, order: Order) -> Vec<Trade> {
        process_order(&self.book, &self.stats, &self.trade_callback, order)
    }

    /// Register the trade notification hook, replacing any previous one.
    /// The hook runs once per trade, synchronously, on the processing
    /// thread and after the book lock has been released.
    pub fn register_trade_callback<F>(&self, hook: F)
    where
        F: Fn(&Trade) + Send + Sync + 'static,
    {
        *self.trade_callback.write() = Some(Box::new(hook));
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of orders waiting in the queue.
    pub fn pending_orders(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for MatchingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The synchronous processing path shared by `submit_sync` and the worker
/// threads: match, account, notify.
fn process_order(
    book: &OrderBook,
    stats: &EngineStats,
    callback: &RwLock<Option<TradeCallback>>,
    order: Order,
) -> Vec<Trade> {
    debug!("processing {}", order);
    let trades = book.add(order, None);
    stats.record(&trades);

    if !trades.is_empty() {
        let hook = callback.read();
        if let Some(hook) = hook.as_ref() {
            for trade in &trades {
                hook(trade);
            }
        }
    }

    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    fn engine() -> MatchingEngine {
        MatchingEngine::new(2)
    }

    fn limit(engine: &MatchingEngine, side: Side, price: Price, qty: Quantity) -> Order {
        engine.new_order(side, OrderKind::Limit, price, qty).unwrap()
    }

    #[test]
    fn test_new_order_assigns_increasing_ids() {
        let engine = engine();
        let a = limit(&engine, Side::Buy, dec!(100.0), 1);
        let b = limit(&engine, Side::Buy, dec!(100.0), 1);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_new_order_rejects_zero_quantity() {
        let engine = engine();
        let err = engine
            .new_order(Side::Buy, OrderKind::Limit, dec!(100.0), 0)
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidQuantity);
    }

    #[test]
    fn test_submit_sync_without_start() {
        let engine = engine();
        let sell = limit(&engine, Side::Sell, dec!(100.0), 10);
        let buy = limit(&engine, Side::Buy, dec!(100.0), 4);

        assert!(engine.submit_sync(sell).is_empty());
        let trades = engine.submit_sync(buy);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 4);

        let stats = engine.stats();
        assert_eq!(stats.orders_processed, 2);
        assert_eq!(stats.trades_executed, 1);
        assert_eq!(stats.quantity_traded, 4);
    }

    #[test]
    fn test_submit_async_requires_running_engine() {
        let engine = engine();
        let order = limit(&engine, Side::Buy, dec!(100.0), 1);
        assert_eq!(engine.submit_async(order), Err(EngineError::NotRunning));
    }

    #[test]
    fn test_async_orders_are_processed_by_workers() {
        let engine = engine();
        engine.start();

        for _ in 0..10 {
            let order = limit(&engine, Side::Buy, dec!(100.0), 5);
            engine.submit_async(order).unwrap();
        }
        engine.stop();

        let stats = engine.stats();
        assert_eq!(stats.orders_processed, 10);
        assert_eq!(engine.book().bid_count(), 10);
    }

    #[test]
    fn test_stop_drains_pending_orders() {
        let engine = engine();
        engine.start();

        for i in 0..100 {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let order = limit(&engine, side, dec!(100.0), 1);
            engine.submit_async(order).unwrap();
        }
        // stop() joins workers only after the queue has been drained
        engine.stop();

        assert_eq!(engine.stats().orders_processed, 100);
        assert_eq!(engine.pending_orders(), 0);
    }

    #[test]
    fn test_lifecycle_is_idempotent() {
        let engine = engine();

        engine.stop(); // stop before start is a benign no-op
        engine.start();
        engine.start();
        assert!(engine.is_running());

        let order = limit(&engine, Side::Buy, dec!(100.0), 1);
        engine.submit_async(order).unwrap();

        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.stats().orders_processed, 1);
    }

    #[test]
    fn test_restart_after_stop() {
        let engine = engine();
        engine.start();
        engine.stop();

        engine.start();
        let order = limit(&engine, Side::Sell, dec!(101.0), 2);
        engine.submit_async(order).unwrap();
        engine.stop();

        assert_eq!(engine.book().ask_count(), 1);
    }

    #[test]
    fn test_trade_callback_receives_all_trades() {
        let engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            engine.register_trade_callback(move |t| seen.lock().push(t.clone()));
        }

        engine.submit_sync(limit(&engine, Side::Sell, dec!(100.0), 10));
        engine.submit_sync(limit(&engine, Side::Sell, dec!(101.0), 10));
        let trades = engine.submit_sync(limit(&engine, Side::Buy, dec!(101.0), 15));

        assert_eq!(trades.len(), 2);
        assert_eq!(*seen.lock(), trades);
    }

    #[test]
    fn test_callback_can_query_engine_state() {
        // Regression guard: the callback runs outside the book lock
        let engine = Arc::new(engine());
        let observed = Arc::new(Mutex::new(Vec::new()));
        {
            let engine_in_cb = Arc::clone(&engine);
            let observed = Arc::clone(&observed);
            engine.register_trade_callback(move |_| {
                observed.lock().push(engine_in_cb.book().best_ask());
            });
        }

        engine.submit_sync(limit(&engine, Side::Sell, dec!(100.0), 5));
        engine.submit_sync(limit(&engine, Side::Buy, dec!(100.0), 5));

        assert_eq!(observed.lock().len(), 1);
    }

    #[test]
    fn test_drop_stops_running_engine() {
        let engine = engine();
        engine.start();
        let order = limit(&engine, Side::Buy, dec!(100.0), 1);
        engine.submit_async(order).unwrap();
        drop(engine);
        // Reaching here without hanging means workers were joined
    }

    #[test]
    fn test_worker_pool_size_is_at_least_one() {
        let engine = MatchingEngine::new(0);
        engine.start();
        let order = engine
            .new_order(Side::Buy, OrderKind::Limit, dec!(100.0), 1)
            .unwrap();
        engine.submit_async(order).unwrap();
        engine.stop();
        assert_eq!(engine.stats().orders_processed, 1);
    }
}
