use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;

use log::debug;
use parking_lot::RwLock;

use crate::models::{Order, OrderId, OrderKind, OrderStatus, Price, Quantity, Side, Trade};

/// Callback invoked once per trade, after the book lock is released.
pub type TradeHook<'a> = &'a (dyn Fn(&Trade) + Sync);

/// A price level in the order book
///
/// Orders at a level queue strictly FIFO: inserts append at the back and
/// matching consumes from the front, which is exactly time priority.
#[derive(Debug)]
struct PriceLevel {
    orders: VecDeque<OrderId>,
    total_quantity: Quantity,
}

impl PriceLevel {
    fn new() -> Self {
        PriceLevel {
            orders: VecDeque::new(),
            total_quantity: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// Book state guarded by the readers-writer lock: two sides of price
/// levels plus the arena that owns every resting order. Levels store ids
/// only; the arena is the single owner.
#[derive(Debug, Default)]
struct BookInner {
    /// Bid levels keyed ascending; best bid is the last key.
    bids: BTreeMap<Price, PriceLevel>,
    /// Ask levels keyed ascending; best ask is the first key.
    asks: BTreeMap<Price, PriceLevel>,
    /// Arena of resting orders, indexed by id.
    orders: HashMap<OrderId, Order>,
}

/// The limit order book for one instrument
///
/// Maintains separate bid and ask sides and implements price-time priority
/// matching. All reads take the shared lock; `add` is the sole mutating
/// entry point and takes the exclusive lock for the whole matching pass,
/// so the book is never observable in a crossed or half-indexed state.
#[derive(Debug, Default)]
pub struct OrderBook {
    inner: RwLock<BookInner>,
}

impl OrderBook {
    pub fn new() -> Self {
        OrderBook {
            inner: RwLock::new(BookInner::default()),
        }
    }

    /// Add an order and run the matching pass.
    ///
    /// Returns every trade produced, in execution order. Any unmatched
    /// remainder of a limit order rests in the book; the remainder of a
    /// market order is canceled and never rests. When `on_trade` is given
    /// it is invoked once per trade before this call returns, after the
    /// write lock has been released, so the hook may read the book again.
    pub fn add(&self, order: Order, on_trade: Option<TradeHook<'_>>) -> Vec<Trade> {
        let trades = {
            let mut inner = self.inner.write();
            inner.match_and_insert(order)
        };

        if let Some(hook) = on_trade {
            for trade in &trades {
                hook(trade);
            }
        }

        trades
    }

    /// Best bid price (highest resting buy), or `None` when the bid side
    /// is empty.
    pub fn best_bid(&self) -> Option<Price> {
        self.inner.read().bids.keys().next_back().copied()
    }

    /// Best ask price (lowest resting sell), or `None` when the ask side
    /// is empty.
    pub fn best_ask(&self) -> Option<Price> {
        self.inner.read().asks.keys().next().copied()
    }

    /// Number of resting buy orders.
    pub fn bid_count(&self) -> usize {
        self.inner.read().bids.values().map(|l| l.orders.len()).sum()
    }

    /// Number of resting sell orders.
    pub fn ask_count(&self) -> usize {
        self.inner.read().asks.values().map(|l| l.orders.len()).sum()
    }

    /// Whether an order with this id currently rests in the book.
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.inner.read().orders.contains_key(&order_id)
    }

    /// Aggregated bid depth, best first, at most `levels` entries.
    pub fn bid_depth(&self, levels: usize) -> Vec<(Price, Quantity)> {
        self.inner
            .read()
            .bids
            .iter()
            .rev()
            .take(levels)
            .map(|(price, level)| (*price, level.total_quantity))
            .collect()
    }

    /// Aggregated ask depth, best first, at most `levels` entries.
    pub fn ask_depth(&self, levels: usize) -> Vec<(Price, Quantity)> {
        self.inner
            .read()
            .asks
            .iter()
            .take(levels)
            .map(|(price, level)| (*price, level.total_quantity))
            .collect()
    }

    /// Human-readable snapshot of the top of the book (up to 5 levels per
    /// side).
    pub fn render(&self) -> String {
        let bids = self.bid_depth(5);
        let asks = self.ask_depth(5);

        let mut out = String::new();
        out.push_str("ORDER BOOK\n");
        out.push_str("-------------------------------------------\n");
        out.push_str(&format!("{:>16} | {:>16}\n", "BUY", "SELL"));
        out.push_str("-------------------------------------------\n");

        for i in 0..bids.len().max(asks.len()) {
            let bid = bids
                .get(i)
                .map(|(p, q)| format!("{:.2}x{}", p, q))
                .unwrap_or_else(|| "-".to_string());
            let ask = asks
                .get(i)
                .map(|(p, q)| format!("{:.2}x{}", p, q))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "{:>16} | {:>16}", bid, ask);
        }

        out
    }
}

impl BookInner {
    /// One full matching pass followed by insertion of any remainder.
    /// Runs entirely under the write lock.
    fn match_and_insert(&mut self, mut order: Order) -> Vec<Trade> {
        let trades = match order.side {
            Side::Buy => self.match_against_asks(&mut order),
            Side::Sell => self.match_against_bids(&mut order),
        };

        if order.remaining_quantity() > 0 {
            match order.kind {
                OrderKind::Market => {
                    // Market remainders never rest
                    order.cancel();
                    debug!(
                        "market order {} canceled with {} unmatched",
                        order.id,
                        order.remaining_quantity()
                    );
                }
                OrderKind::Limit => {
                    if order.status() != OrderStatus::Canceled {
                        self.insert_resting(order);
                    }
                }
            }
        }

        trades
    }

    /// Match an incoming buy against the ask side (lowest price first,
    /// oldest first within a level).
    fn match_against_asks(&mut self, taker: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();

        while taker.remaining_quantity() > 0 {
            let best_price = match self.asks.keys().next() {
                Some(price) => *price,
                None => break,
            };
            // Price condition: a limit buy must meet the best ask. The
            // sides are price-ordered, so the first failure ends the pass.
            if taker.kind == OrderKind::Limit && taker.price < best_price {
                break;
            }

            let (trade, level_drained) =
                match execute_at_level(&mut self.asks, &mut self.orders, best_price, taker) {
                    Some(result) => result,
                    None => break,
                };
            trades.push(trade);
            if level_drained {
                self.asks.remove(&best_price);
            }
        }

        trades
    }

    /// Match an incoming sell against the bid side (highest price first,
    /// oldest first within a level).
    fn match_against_bids(&mut self, taker: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();

        while taker.remaining_quantity() > 0 {
            let best_price = match self.bids.keys().next_back() {
                Some(price) => *price,
                None => break,
            };
            if taker.kind == OrderKind::Limit && taker.price > best_price {
                break;
            }

            let (trade, level_drained) =
                match execute_at_level(&mut self.bids, &mut self.orders, best_price, taker) {
                    Some(result) => result,
                    None => break,
                };
            trades.push(trade);
            if level_drained {
                self.bids.remove(&best_price);
            }
        }

        trades
    }

    /// Insert the (remainder of a) limit order as a new resting entry,
    /// indexed both in its side's level queue and in the arena.
    fn insert_resting(&mut self, order: Order) {
        let side = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = side.entry(order.price).or_default();
        level.orders.push_back(order.id);
        level.total_quantity += order.remaining_quantity();
        self.orders.insert(order.id, order);
    }
}

/// Execute one trade between the taker and the oldest order at `price`.
///
/// Fills both sides, emits the trade at the resting order's price
/// (price-maker convention), and removes the maker from the level and the
/// arena once fully filled. Returns the trade plus whether the level is
/// now empty; `None` when the level has no live maker.
fn execute_at_level(
    side: &mut BTreeMap<Price, PriceLevel>,
    orders: &mut HashMap<OrderId, Order>,
    price: Price,
    taker: &mut Order,
) -> Option<(Trade, bool)> {
    let level = side.get_mut(&price)?;
    let maker_id = *level.orders.front()?;
    let maker = match orders.get_mut(&maker_id) {
        Some(maker) => maker,
        None => {
            // Levels and arena are updated together under the write lock,
            // so a missing maker cannot happen; stop the pass if it does.
            debug_assert!(false, "order {} in level but not in arena", maker_id);
            return None;
        }
    };

    let trade_qty = taker.remaining_quantity().min(maker.remaining_quantity());
    let maker_filled = maker.fill(trade_qty).unwrap_or(false);
    let _ = taker.fill(trade_qty);

    let (buy_id, sell_id) = match taker.side {
        Side::Buy => (taker.id, maker_id),
        Side::Sell => (maker_id, taker.id),
    };
    let trade = Trade::new(buy_id, sell_id, price, trade_qty);
    debug!("executed {}", trade);

    level.total_quantity -= trade_qty;
    if maker_filled {
        level.orders.pop_front();
        orders.remove(&maker_id);
    }

    Some((trade, level.is_empty()))
}
