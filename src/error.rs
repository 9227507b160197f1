use thiserror::Error;

use crate::models::{OrderId, Quantity};

/// Errors surfaced by the matching engine and its data types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A fill was requested for zero quantity, more than the remaining
    /// quantity, or against an order in a terminal state.
    #[error("invalid fill on order {order_id}: requested {requested}, remaining {remaining}")]
    InvalidFill {
        order_id: OrderId,
        requested: Quantity,
        remaining: Quantity,
    },

    /// An order was submitted asynchronously while the engine is stopped.
    #[error("matching engine is not running")]
    NotRunning,

    /// Order construction was attempted with a non-positive quantity.
    #[error("order quantity must be positive")]
    InvalidQuantity,
}
