//! Point-in-time copies of book state for downstream analysis.

use crate::book::depth_around;
use crate::types::{weighted_average, Bps, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Frozen view of one book. Detached from the engine, so analyses can run on it
/// while the simulation carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub timestamp: Timestamp,
    pub bids: BTreeMap<Price, u64>,
    pub asks: BTreeMap<Price, u64>,
    pub last_trade: Option<Price>,
    pub fair_value: Price,
    pub halted: bool,
}

impl BookSnapshot {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    pub fn midpoint(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.value() + ask.value()) / Decimal::TWO),
            _ => None,
        }
    }

    /// Spread in bps of the midpoint. None without a two-sided market, so a halted
    /// or withdrawn book never reports a tight spread.
    pub fn spread_bps(&self) -> Option<Bps> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        let mid = self.midpoint()?;
        if mid <= Decimal::ZERO {
            return None;
        }
        Some(Bps::from_fraction((ask.value() - bid.value()) / mid))
    }

    /// Cumulative (bid, ask) shares within `distance_pct` of the midpoint.
    pub fn depth_at_distance(&self, distance_pct: Decimal) -> (u64, u64) {
        match self.midpoint() {
            Some(mid) => depth_around(&self.bids, &self.asks, mid, distance_pct),
            None => (0, 0),
        }
    }

    /// Average price a market order of `quantity` would have received against this
    /// snapshot. None if the side cannot absorb it.
    pub fn price_impact(&self, quantity: u64, side: Side) -> Option<Decimal> {
        if quantity == 0 {
            return None;
        }
        let levels: Vec<(&Price, &u64)> = match side {
            Side::Buy => self.asks.iter().collect(),
            Side::Sell => self.bids.iter().rev().collect(),
        };

        let mut remaining = quantity;
        let mut taken = Vec::new();
        for (price, size) in levels {
            let traded = remaining.min(*size);
            taken.push((price.value(), traded));
            remaining -= traded;
            if remaining == 0 {
                break;
            }
        }

        if remaining > 0 {
            return None;
        }
        weighted_average(taken)
    }
}
