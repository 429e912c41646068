//! Order execution: the matching walk.

use super::core::MatchingEngine;
use super::results::EngineError;
use crate::events::{AirPocketEvent, EventPayload, FillEvent, LimitRestedEvent};
use crate::order::{ExecutionReport, ExecutionStatus, Fill, InvalidOrderReason, Order, TradeRecord};
use crate::types::{Price, Side};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

impl MatchingEngine {
    /// Market order: walk the opposite side until filled or empty.
    pub fn execute_market(&mut self, side: Side, size: u64) -> Result<ExecutionReport, EngineError> {
        self.submit(Order::market(side, size))
    }

    /// Limit order: walk up to `price_limit`, rest any remainder at `price_limit`
    /// on the requester's side.
    pub fn execute_limit(
        &mut self,
        side: Side,
        price_limit: Decimal,
        size: u64,
    ) -> Result<ExecutionReport, EngineError> {
        self.submit(Order::limit(side, price_limit, size))
    }

    /// Execute one order. Rejected up front if the book is halted or the order
    /// is malformed; nothing is mutated in that case.
    pub fn submit(&mut self, order: Order) -> Result<ExecutionReport, EngineError> {
        if self.state.is_halted() {
            return Err(EngineError::InvalidOrder(InvalidOrderReason::BookHalted));
        }
        let limit = order.validate()?;
        // the walk never touches the requester's side, so a remainder that could
        // not rest is caught here before any fill happens
        if let Some(price) = limit {
            if self.book.size_at(order.side, price).checked_add(order.size).is_none() {
                return Err(EngineError::InvalidOrder(InvalidOrderReason::SizeOverflow));
            }
        }

        let (fills, halted) = self.walk(order.side, order.size, limit)?;
        let filled: u64 = fills.iter().map(|f| f.size).sum();
        let remaining = order.size - filled;

        let status = if halted {
            ExecutionStatus::Halted
        } else if remaining == 0 {
            ExecutionStatus::Filled
        } else if let Some(price) = limit {
            self.rest(order.side, price, remaining)?
        } else {
            self.air_pocket(order.side, order.size, &fills, remaining)
        };

        Ok(ExecutionReport {
            side: order.side,
            order_type: order.order_type(),
            requested: order.size,
            fills,
            status,
            timestamp: self.current_time,
        })
    }

    // take liquidity best price first; a breach stops the walk right after the fill
    fn walk(
        &mut self,
        side: Side,
        size: u64,
        limit: Option<Price>,
    ) -> Result<(Vec<Fill>, bool), EngineError> {
        let book_side = side.opposite();
        let mut remaining = size;
        let mut fills = Vec::new();

        while remaining > 0 {
            let Some(price) = self.book.best(book_side) else {
                break;
            };
            if let Some(limit) = limit {
                let crosses = match side {
                    Side::Buy => price <= limit,
                    Side::Sell => price >= limit,
                };
                if !crosses {
                    break;
                }
            }

            let traded = remaining.min(self.book.size_at(book_side, price));
            self.book.remove_or_decrement(book_side, price, traded)?;
            remaining -= traded;
            fills.push(Fill::new(price, traded));
            self.record_fill(side, price, traded);

            if self.breaker.is_breach(price) {
                self.halt(price);
                return Ok((fills, true));
            }
        }

        Ok((fills, false))
    }

    fn record_fill(&mut self, taker_side: Side, price: Price, size: u64) {
        debug!(symbol = %self.symbol, side = %taker_side, price = %price, size, "fill");
        self.trades.push(TradeRecord {
            price,
            size,
            side: taker_side,
            timestamp: self.current_time,
        });
        if self.trades.len() > self.config.max_trades {
            let drain_count = self.trades.len() - self.config.max_trades;
            self.trades.drain(0..drain_count);
        }
        self.emit_event(EventPayload::FillExecuted(FillEvent {
            taker_side,
            price,
            size,
        }));
    }

    fn rest(&mut self, side: Side, price: Price, size: u64) -> Result<ExecutionStatus, EngineError> {
        self.book.add_level(side, price.value(), size)?;
        info!(symbol = %self.symbol, side = %side, price = %price, size, "limit remainder rested");
        self.emit_event(EventPayload::LimitRested(LimitRestedEvent { side, price, size }));
        Ok(ExecutionStatus::Rested { price, size })
    }

    fn air_pocket(&mut self, taker_side: Side, requested: u64, fills: &[Fill], unfilled: u64) -> ExecutionStatus {
        let last_price = fills.last().map(|f| f.price);
        warn!(
            symbol = %self.symbol,
            side = %taker_side,
            requested,
            unfilled,
            "air pocket: opposite side exhausted"
        );
        self.emit_event(EventPayload::AirPocket(AirPocketEvent {
            taker_side,
            requested,
            filled: requested - unfilled,
            unfilled,
            last_price,
        }));

        if fills.is_empty() {
            ExecutionStatus::Unfilled { unfilled }
        } else {
            ExecutionStatus::PartiallyFilled { unfilled }
        }
    }
}
