// Re-export modules
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod utils;

// Re-export the public surface
pub use config::{load_config, EngineConfig};
pub use engine::{MatchingEngine, OrderBook, OrderQueue, StatsSnapshot};
pub use error::EngineError;
pub use models::{Order, OrderId, OrderKind, OrderStatus, Price, Quantity, Side, Timestamp, Trade};
pub use utils::IdAllocator;
