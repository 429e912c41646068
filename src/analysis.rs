// 6.1 analysis.rs: read-only liquidity measures over snapshots and trade history.
// nothing here touches the engine.

use crate::order::TradeRecord;
use crate::snapshot::BookSnapshot;
use crate::types::{Price, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const KYLE_MIN_TRADES: usize = 10;
const KYLE_MIN_POINTS: usize = 5;

/// Empty stretch between two adjacent bid levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityGap {
    pub lower: Price,
    pub upper: Price,
    /// Gap as a percentage of the upper price.
    pub gap_pct: Decimal,
}

/// Adjacent bid levels further apart than `threshold_pct` percent (2.0 = 2%),
/// from the touch downwards.
pub fn identify_liquidity_gaps(snapshot: &BookSnapshot, threshold_pct: Decimal) -> Vec<LiquidityGap> {
    let prices: Vec<Price> = snapshot.bids.keys().rev().copied().collect();
    prices
        .windows(2)
        .filter_map(|pair| {
            let (upper, lower) = (pair[0], pair[1]);
            let gap_pct = (upper.value() - lower.value()) / upper.value() * dec!(100);
            (gap_pct > threshold_pct).then_some(LiquidityGap { lower, upper, gap_pct })
        })
        .collect()
}

/// Kyle's lambda: OLS slope of trade-to-trade price change on signed volume
/// (buys positive). None with fewer than 10 trades, too few usable points, zero
/// volume variance, or arithmetic overflow.
pub fn kyle_lambda(trades: &[TradeRecord]) -> Option<Decimal> {
    if trades.len() < KYLE_MIN_TRADES {
        return None;
    }

    let points: Vec<(Decimal, Decimal)> = trades
        .windows(2)
        .map(|w| {
            let signed = Decimal::from(w[1].size) * w[1].side.sign();
            (signed, w[1].price.value() - w[0].price.value())
        })
        .collect();
    if points.len() < KYLE_MIN_POINTS {
        return None;
    }

    let n = Decimal::from(points.len());
    let mean_x = checked_sum(points.iter().map(|p| p.0))? / n;
    let mean_y = checked_sum(points.iter().map(|p| p.1))? / n;

    let mut sxy = Decimal::ZERO;
    let mut sxx = Decimal::ZERO;
    for (x, y) in &points {
        let dx = *x - mean_x;
        sxy = sxy.checked_add(dx.checked_mul(*y - mean_y)?)?;
        sxx = sxx.checked_add(dx.checked_mul(dx)?)?;
    }

    if sxx.is_zero() {
        return None;
    }
    sxy.checked_div(sxx)
}

/// Amihud illiquidity: mean of |return| / dollar volume over periods with
/// positive dollar volume. The first period has no return and never counts.
/// None on mismatched inputs or when no period qualifies.
pub fn amihud_illiquidity(prices: &[Decimal], volumes: &[u64]) -> Option<Decimal> {
    if prices.len() != volumes.len() {
        return None;
    }

    let ratios: Vec<Decimal> = (1..prices.len())
        .filter_map(|i| {
            let (prev, price) = (prices[i - 1], prices[i]);
            let dollar_volume = price.checked_mul(Decimal::from(volumes[i]))?;
            if dollar_volume <= Decimal::ZERO || prev.is_zero() {
                return None;
            }
            let ret = (price / prev - Decimal::ONE).abs();
            ret.checked_div(dollar_volume)
        })
        .collect();

    if ratios.is_empty() {
        return None;
    }
    Some(checked_sum(ratios.iter().copied())? / Decimal::from(ratios.len()))
}

/// Average price a market order of `quantity` would get, per side, across a
/// series of snapshots. Useful for charting how impact grows into a crash.
pub fn price_impact_series(snapshots: &[BookSnapshot], quantity: u64, side: Side) -> Vec<Option<Decimal>> {
    snapshots.iter().map(|s| s.price_impact(quantity, side)).collect()
}

fn checked_sum<I: Iterator<Item = Decimal>>(mut values: I) -> Option<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}
