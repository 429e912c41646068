//! Limit-Up/Limit-Down circuit breaker.
//!
//! A static percentage band around a fair-value reference. Any execution outside
//! the band halts the book. This is deliberately only the band check: there is no
//! 15-second limit state, no quote-only period and no rolling reference price.
//! Callers needing full regulatory LULD behavior must layer it on top.

use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BandError {
    #[error("band fraction must be in (0, 1), got {0}")]
    OutOfRange(Decimal),
}

/// Static band check. The band fraction comes precomputed from an external LULD
/// calculator (tier, time of day and leverage already resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    reference_price: Price,
    band_pct: Decimal,
}

impl CircuitBreaker {
    pub fn new(reference_price: Price, band_pct: Decimal) -> Result<Self, BandError> {
        if band_pct <= Decimal::ZERO || band_pct >= Decimal::ONE {
            return Err(BandError::OutOfRange(band_pct));
        }
        Ok(Self {
            reference_price,
            band_pct,
        })
    }

    pub fn reference_price(&self) -> Price {
        self.reference_price
    }

    pub fn band_pct(&self) -> Decimal {
        self.band_pct
    }

    pub fn lower_band(&self) -> Decimal {
        self.reference_price.value() * (Decimal::ONE - self.band_pct)
    }

    pub fn upper_band(&self) -> Decimal {
        self.reference_price.value() * (Decimal::ONE + self.band_pct)
    }

    /// Strictly outside the band. A print exactly on a band edge is allowed.
    pub fn is_breach(&self, price: Price) -> bool {
        let p = price.value();
        p < self.lower_band() || p > self.upper_band()
    }

    pub(crate) fn set_reference(&mut self, reference_price: Price) {
        self.reference_price = reference_price;
    }
}

/// Details captured when a breach halts the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltInfo {
    pub trigger_price: Price,
    pub lower_band: Decimal,
    pub upper_band: Decimal,
    pub halted_at: Timestamp,
}

/// Per-book trading state. Only the matching engine moves Active → Halted, and
/// only an explicit external reopen moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TradingState {
    #[default]
    Active,
    Halted(HaltInfo),
}

impl TradingState {
    pub fn is_halted(&self) -> bool {
        matches!(self, TradingState::Halted(_))
    }

    pub fn halt_info(&self) -> Option<&HaltInfo> {
        match self {
            TradingState::Halted(info) => Some(info),
            TradingState::Active => None,
        }
    }
}
