use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;

use crate::error::EngineError;

// Define core types
pub type OrderId = u64;
pub type Price = Decimal;
pub type Quantity = u64;
pub type Timestamp = u64;

/// Side of the order (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Type of order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Limit,
    Market,
}

/// Status of an order
///
/// `Filled`, `Canceled` and `Rejected` are terminal: no transition leaves
/// them. `Rejected` is only reachable at admission, never from matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

/// Nanoseconds since the Unix epoch.
pub(crate) fn now_nanos() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Representation of an order in the system
///
/// Ids are allocated from a monotonic counter, so within one engine the id
/// also serves as the insertion sequence number. Fill and cancel are the
/// only mutators; everything else is fixed at construction.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price; ignored for market orders.
    pub price: Price,
    /// Original quantity, always positive.
    pub quantity: Quantity,
    pub created_at: Timestamp,
    filled_quantity: Quantity,
    status: OrderStatus,
}

impl Order {
    /// Create a new order. Callers normally go through
    /// [`MatchingEngine::new_order`](crate::MatchingEngine::new_order),
    /// which assigns the id and validates the quantity.
    pub fn new(id: OrderId, side: Side, kind: OrderKind, price: Price, quantity: Quantity) -> Self {
        Order {
            id,
            side,
            kind,
            price,
            quantity,
            created_at: now_nanos(),
            filled_quantity: 0,
            status: OrderStatus::New,
        }
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.filled_quantity
    }

    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }

    /// Record a fill against this order.
    ///
    /// Returns whether the order is now completely filled. Fails without
    /// any state change when `quantity` is zero, exceeds the remaining
    /// quantity, or the order is already in a terminal state.
    pub fn fill(&mut self, quantity: Quantity) -> Result<bool, EngineError> {
        if self.status.is_terminal() || quantity == 0 || quantity > self.remaining_quantity() {
            return Err(EngineError::InvalidFill {
                order_id: self.id,
                requested: quantity,
                remaining: self.remaining_quantity(),
            });
        }

        self.filled_quantity += quantity;
        if self.filled_quantity == self.quantity {
            self.status = OrderStatus::Filled;
            Ok(true)
        } else {
            self.status = OrderStatus::PartiallyFilled;
            Ok(false)
        }
    }

    /// Cancel the order. A no-op once the order is filled; any other state
    /// (including an earlier cancel) ends up `Canceled`.
    pub fn cancel(&mut self) {
        if self.status != OrderStatus::Filled {
            self.status = OrderStatus::Canceled;
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order{{id={}, side={}, kind=", self.id, self.side)?;
        match self.kind {
            OrderKind::Limit => write!(f, "LIMIT, price={:.2}", self.price)?,
            OrderKind::Market => write!(f, "MARKET")?,
        }
        write!(
            f,
            ", qty={}, filled={}, status={}}}",
            self.quantity, self.filled_quantity, self.status
        )
    }
}

/// Immutable record of one match event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_at: Timestamp,
}

impl Trade {
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Trade {
            buy_order_id,
            sell_order_id,
            price,
            quantity,
            executed_at: now_nanos(),
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade{{buy={}, sell={}, price={:.2}, qty={}}}",
            self.buy_order_id, self.sell_order_id, self.price, self.quantity
        )
    }
}
