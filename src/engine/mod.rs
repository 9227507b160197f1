pub mod matching_engine;
pub mod order_book;
pub mod order_queue;

pub use matching_engine::{MatchingEngine, StatsSnapshot, TradeCallback};
pub use order_book::OrderBook;
pub use order_queue::OrderQueue;
