//! Order input and execution output types.
//!
//! An order is ephemeral: it is validated, walked against the book, and either
//! fully consumed, rested (limit remainder), reported as unfilled (air pocket),
//! or cut short by a halt. The report always carries every individual fill.

use crate::types::{weighted_average, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Walks the book until filled or the opposite side is empty.
    Market,
    /// Walks the book up to the limit price, the remainder rests.
    Limit,
}

/// Why an order was refused before touching the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidOrderReason {
    NonPositiveSize,
    NonPositivePrice,
    BookHalted,
    /// Resting the size would push a level past `u64::MAX` shares.
    SizeOverflow,
}

impl std::fmt::Display for InvalidOrderReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidOrderReason::NonPositiveSize => write!(f, "size must be positive"),
            InvalidOrderReason::NonPositivePrice => write!(f, "limit price must be positive"),
            InvalidOrderReason::BookHalted => write!(f, "book is halted"),
            InvalidOrderReason::SizeOverflow => write!(f, "level size would overflow"),
        }
    }
}

/// An inbound order. `price` is None for market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub size: u64,
    pub price: Option<Decimal>,
}

impl Order {
    pub fn market(side: Side, size: u64) -> Self {
        Self { side, size, price: None }
    }

    pub fn limit(side: Side, price: Decimal, size: u64) -> Self {
        Self { side, size, price: Some(price) }
    }

    pub fn order_type(&self) -> OrderType {
        if self.price.is_some() {
            OrderType::Limit
        } else {
            OrderType::Market
        }
    }

    /// Check size and limit price. Returns the validated limit price, if any.
    pub fn validate(&self) -> Result<Option<Price>, InvalidOrderReason> {
        if self.size == 0 {
            return Err(InvalidOrderReason::NonPositiveSize);
        }
        match self.price {
            Some(p) => Price::new(p).map(Some).ok_or(InvalidOrderReason::NonPositivePrice),
            None => Ok(None),
        }
    }
}

/// Quantity taken at one price level. Sequence is the position in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Price,
    pub size: u64,
}

impl Fill {
    pub fn new(price: Price, size: u64) -> Self {
        Self { price, size }
    }

    pub fn notional(&self) -> Decimal {
        self.price.value() * Decimal::from(self.size)
    }
}

/// How a single matching call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Requested size fully executed.
    Filled,
    /// Liquidity ran out after some fills. Air pocket.
    PartiallyFilled { unfilled: u64 },
    /// Nothing at all on the opposite side. Air pocket.
    Unfilled { unfilled: u64 },
    /// Limit remainder now resting on the requester's side.
    Rested { price: Price, size: u64 },
    /// A fill breached the circuit breaker band; the walk stopped there.
    Halted,
}

/// Everything one matching call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub side: Side,
    pub order_type: OrderType,
    pub requested: u64,
    pub fills: Vec<Fill>,
    pub status: ExecutionStatus,
    pub timestamp: Timestamp,
}

impl ExecutionReport {
    pub fn filled_size(&self) -> u64 {
        self.fills.iter().map(|f| f.size).sum()
    }

    /// Size-weighted mean fill price, None with no fills.
    pub fn average_price(&self) -> Option<Decimal> {
        weighted_average(self.fills.iter().map(|f| (f.price.value(), f.size)))
    }

    pub fn notional(&self) -> Decimal {
        self.fills.iter().map(Fill::notional).sum()
    }

    pub fn is_fully_filled(&self) -> bool {
        matches!(self.status, ExecutionStatus::Filled)
    }

    /// Liquidity exhausted before the order could complete.
    pub fn is_air_pocket(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::PartiallyFilled { .. } | ExecutionStatus::Unfilled { .. }
        )
    }

    pub fn is_halted(&self) -> bool {
        matches!(self.status, ExecutionStatus::Halted)
    }

    /// Size reported as not executed because liquidity ran out.
    pub fn unfilled_size(&self) -> u64 {
        match self.status {
            ExecutionStatus::PartiallyFilled { unfilled } | ExecutionStatus::Unfilled { unfilled } => {
                unfilled
            }
            _ => 0,
        }
    }

    pub fn worst_price(&self) -> Option<Price> {
        self.fills.last().map(|f| f.price)
    }
}

/// One fill as kept in the engine's trade history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub price: Price,
    pub size: u64,
    /// Taker side.
    pub side: Side,
    pub timestamp: Timestamp,
}
