//! Price-level order book.
//!
//! Resting liquidity is aggregated per price: each level is a single share count,
//! not a queue of orders. Both sides live in ordered maps so the best price and
//! any single level are a logarithmic lookup away.

use crate::types::{Bps, Price, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookError {
    #[error("price must be positive, got {0}")]
    InvalidPrice(Decimal),

    #[error("size must be positive")]
    InvalidSize,

    #[error("no {side} level at {price}")]
    LevelNotFound { side: Side, price: Price },

    #[error("{side} level at {price} would exceed u64::MAX shares")]
    SizeOverflow { side: Side, price: Price },
}

/// One aggregated level, as seen from outside the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub price: Price,
    pub size: u64,
}

/// Shape of the power-law ladder used to seed a calm book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Levels per side beyond the touch.
    pub levels: u32,
    /// Shares quoted at the touch on each side.
    pub touch_size: u64,
    /// Size at level i is touch_size / i^decay_exponent.
    pub decay_exponent: Decimal,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            levels: 49,
            touch_size: 10_000,
            decay_exponent: dec!(1.5),
        }
    }
}

/// Bid and ask liquidity keyed by price. No level ever holds zero shares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevelBook {
    bids: BTreeMap<Price, u64>,
    asks: BTreeMap<Price, u64>,
}

impl PriceLevelBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a calm book around `fair_value`: touch quotes half a spread either side,
    /// then levels one spread apart whose size decays with a power law.
    pub fn with_power_law_ladder(fair_value: Price, spread: Bps, ladder: &LadderConfig) -> Self {
        let mut book = Self::new();
        let fair = fair_value.value();
        let spread_abs = fair * spread.as_fraction();
        let half = spread_abs / Decimal::TWO;

        book.seed(Side::Buy, fair - half, ladder.touch_size);
        book.seed(Side::Sell, fair + half, ladder.touch_size);

        for i in 1..=ladder.levels {
            let step = Decimal::from(i);
            // powd goes through exp/ln, so trim the noise before flooring.
            // A decay too large for Decimal would leave zero shares anyway.
            let Some(decay) = step.checked_powd(ladder.decay_exponent) else {
                continue;
            };
            let decay = decay.round_dp(8);
            if decay.is_zero() {
                continue;
            }
            let size = (Decimal::from(ladder.touch_size) / decay)
                .floor()
                .to_u64()
                .unwrap_or(0);
            let distance = spread_abs * step;
            book.seed(Side::Buy, fair - half - distance, size);
            book.seed(Side::Sell, fair + half + distance, size);
        }

        book
    }

    // ladder levels that fall through zero or round to no shares are just skipped
    fn seed(&mut self, side: Side, price: Decimal, size: u64) {
        if let Some(price) = Price::new(price) {
            if size > 0 {
                let level = self.side_mut(side).entry(price).or_insert(0);
                *level = level.saturating_add(size);
            }
        }
    }

    fn side_ref(&self, side: Side) -> &BTreeMap<Price, u64> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, u64> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Insert a level or add to an existing one. The book is untouched on error.
    pub fn add_level(&mut self, side: Side, price: Decimal, size: u64) -> Result<(), BookError> {
        let price = Price::new(price).ok_or(BookError::InvalidPrice(price))?;
        if size == 0 {
            return Err(BookError::InvalidSize);
        }
        let total = self
            .size_at(side, price)
            .checked_add(size)
            .ok_or(BookError::SizeOverflow { side, price })?;
        self.side_mut(side).insert(price, total);
        Ok(())
    }

    /// Highest bid for `Side::Buy`, lowest ask for `Side::Sell`.
    pub fn best(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.bids.keys().next_back().copied(),
            Side::Sell => self.asks.keys().next().copied(),
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.best(Side::Buy)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.best(Side::Sell)
    }

    /// Resting size at an exact price, zero if there is no level.
    pub fn size_at(&self, side: Side, price: Price) -> u64 {
        self.side_ref(side).get(&price).copied().unwrap_or(0)
    }

    /// Decrement a level, removing it when it reaches zero. The matching loop only
    /// calls this for levels it just observed, so a missing level is a bug.
    pub(crate) fn remove_or_decrement(
        &mut self,
        side: Side,
        price: Price,
        size: u64,
    ) -> Result<(), BookError> {
        let levels = self.side_mut(side);
        let Some(resting) = levels.get_mut(&price) else {
            debug_assert!(false, "decrement of missing {side} level {price}");
            return Err(BookError::LevelNotFound { side, price });
        };
        debug_assert!(size <= *resting, "cannot take more than rests at a level");
        *resting = resting.saturating_sub(size);
        if *resting == 0 {
            levels.remove(&price);
        }
        Ok(())
    }

    /// Remove every level on `side` for which `pred(price)` holds.
    pub(crate) fn remove_levels_where<F>(&mut self, side: Side, mut pred: F) -> usize
    where
        F: FnMut(Price) -> bool,
    {
        let levels = self.side_mut(side);
        let before = levels.len();
        levels.retain(|price, _| !pred(*price));
        before - levels.len()
    }

    /// Scale every level's size by `factor`, flooring to whole shares.
    /// Levels that floor to zero are dropped.
    pub(crate) fn scale_sizes(&mut self, factor: Decimal) {
        for side in [Side::Buy, Side::Sell] {
            let levels = self.side_mut(side);
            for size in levels.values_mut() {
                *size = (Decimal::from(*size) * factor).floor().to_u64().unwrap_or(0);
            }
            levels.retain(|_, size| *size > 0);
        }
    }

    /// Levels on one side in price-improving order for a taker on the other side:
    /// bids high to low, asks low to high.
    pub fn levels(&self, side: Side) -> Vec<Level> {
        let to_level = |(price, size): (&Price, &u64)| Level { price: *price, size: *size };
        match side {
            Side::Buy => self.bids.iter().rev().map(to_level).collect(),
            Side::Sell => self.asks.iter().map(to_level).collect(),
        }
    }

    pub fn bids(&self) -> &BTreeMap<Price, u64> {
        &self.bids
    }

    pub fn asks(&self) -> &BTreeMap<Price, u64> {
        &self.asks
    }

    pub fn level_count(&self, side: Side) -> usize {
        self.side_ref(side).len()
    }

    pub fn total_depth(&self, side: Side) -> u64 {
        self.side_ref(side).values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Midpoint of best bid and ask. Undefined on a one-sided book.
    pub fn midpoint(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid.value() + ask.value()) / Decimal::TWO),
            _ => None,
        }
    }

    /// Dollar spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.value() - bid.value()),
            _ => None,
        }
    }

    /// Spread in basis points of the midpoint.
    pub fn spread_bps(&self) -> Option<Bps> {
        let mid = self.midpoint()?;
        self.spread_bps_against(mid)
    }

    /// Spread in basis points of an external reference such as iNAV.
    pub fn spread_bps_against(&self, reference: Decimal) -> Option<Bps> {
        if reference <= Decimal::ZERO {
            return None;
        }
        let spread = self.spread()?;
        Some(Bps::from_fraction(spread / reference))
    }

    /// Cumulative (bid, ask) size within `distance_pct` of the midpoint.
    /// (0, 0) when either side is empty.
    pub fn depth_within(&self, distance_pct: Decimal) -> (u64, u64) {
        let Some(mid) = self.midpoint() else {
            return (0, 0);
        };
        depth_around(&self.bids, &self.asks, mid, distance_pct)
    }

    /// Plain-text ladder of the top `depth` levels per side.
    pub fn render(&self, depth: usize) -> String {
        let bids = self.levels(Side::Buy);
        let asks = self.levels(Side::Sell);
        let rule = "-".repeat(43);
        let mut out = String::new();

        let _ = writeln!(out, "{:>10} {:>10} | {:>10} {:>10}", "BID", "SIZE", "ASK", "SIZE");
        let _ = writeln!(out, "{rule}");
        for i in 0..depth {
            let cell = |levels: &[Level]| match levels.get(i) {
                Some(l) => (format!("{:.2}", l.price.value()), l.size.to_string()),
                None => (String::new(), String::new()),
            };
            let (bp, bs) = cell(&bids);
            let (ap, asz) = cell(&asks);
            let _ = writeln!(out, "{bp:>10} {bs:>10} | {ap:>10} {asz:>10}");
        }
        if let Some(spread) = self.spread() {
            let _ = writeln!(out, "{rule}");
            let _ = writeln!(out, "spread: ${spread:.2}");
        }
        out
    }
}

pub(crate) fn depth_around(
    bids: &BTreeMap<Price, u64>,
    asks: &BTreeMap<Price, u64>,
    mid: Decimal,
    distance_pct: Decimal,
) -> (u64, u64) {
    let threshold = mid * distance_pct;
    let bid_depth = bids
        .iter()
        .filter(|(p, _)| p.value() >= mid - threshold)
        .map(|(_, s)| *s)
        .sum();
    let ask_depth = asks
        .iter()
        .filter(|(p, _)| p.value() <= mid + threshold)
        .map(|(_, s)| *s)
        .sum();
    (bid_depth, ask_depth)
}
