//! Market-maker stress response.
//!
//! A scalar stress level in [0, 1] maps to one of three regimes:
//!
//! - calm (s < 0.3): quoted spread widens by 1 + 10s, book untouched
//! - thinned (0.3 <= s < 0.7): spread widens by 10 + 50s, quotes within 2% of
//!   fair value are pulled and the remaining sizes are cut to 10%
//! - withdrawn (s >= 0.7): market maker stops quoting, everything within 10% of
//!   fair value is pulled, only stale far-out orders remain
//!
//! Applying the same level twice must leave the book and spread exactly as one
//! application did. The spread is always recomputed from the configured normal
//! spread, and the size haircut is applied once per entry into thinned
//! conditions rather than once per call.

use crate::book::PriceLevelBook;
use crate::types::{Bps, Price, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const THINNED_THRESHOLD: Decimal = dec!(0.3);
pub const WITHDRAWN_THRESHOLD: Decimal = dec!(0.7);

// distance from fair value inside which quotes are pulled
const THINNED_PULL_BAND: Decimal = dec!(0.02);
const WITHDRAWN_PULL_BAND: Decimal = dec!(0.10);

// fraction of size left after the thinned haircut
const THINNED_SIZE_FACTOR: Decimal = dec!(0.1);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StressError {
    #[error("stress level must be in [0, 1], got {0}")]
    OutOfRange(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressRegime {
    #[default]
    Calm,
    Thinned,
    Withdrawn,
}

impl StressRegime {
    pub fn for_level(stress: Decimal) -> Self {
        if stress < THINNED_THRESHOLD {
            StressRegime::Calm
        } else if stress < WITHDRAWN_THRESHOLD {
            StressRegime::Thinned
        } else {
            StressRegime::Withdrawn
        }
    }
}

/// Result of one stress application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressOutcome {
    pub stress_level: Decimal,
    pub regime: StressRegime,
    pub previous_regime: StressRegime,
    /// Market maker's quoted spread. None once it has withdrawn.
    pub quoted_spread: Option<Bps>,
    pub market_maker_active: bool,
    pub levels_removed: usize,
    pub haircut_applied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressModel {
    normal_spread: Bps,
    regime: StressRegime,
    market_maker_active: bool,
    quoted_spread: Option<Bps>,
    // set once sizes have been cut for the current stretch of stress
    haircut_applied: bool,
}

impl StressModel {
    pub fn new(normal_spread: Bps) -> Self {
        Self {
            normal_spread,
            regime: StressRegime::Calm,
            market_maker_active: true,
            quoted_spread: Some(normal_spread),
            haircut_applied: false,
        }
    }

    pub fn normal_spread(&self) -> Bps {
        self.normal_spread
    }

    pub fn regime(&self) -> StressRegime {
        self.regime
    }

    pub fn market_maker_active(&self) -> bool {
        self.market_maker_active
    }

    pub fn quoted_spread(&self) -> Option<Bps> {
        self.quoted_spread
    }

    /// Spread multiplier for a level, relative to the normal spread.
    pub fn spread_multiplier(stress: Decimal) -> Decimal {
        match StressRegime::for_level(stress) {
            StressRegime::Calm => Decimal::ONE + stress * dec!(10),
            StressRegime::Thinned | StressRegime::Withdrawn => dec!(10) + stress * dec!(50),
        }
    }

    /// Apply `stress` to `book` around `fair_value`. Stress may go up or down
    /// between calls; a lower level brings the market maker back.
    pub fn apply(
        &mut self,
        book: &mut PriceLevelBook,
        fair_value: Price,
        stress: Decimal,
    ) -> Result<StressOutcome, StressError> {
        if stress < Decimal::ZERO || stress > Decimal::ONE {
            return Err(StressError::OutOfRange(stress));
        }

        let previous_regime = self.regime;
        let regime = StressRegime::for_level(stress);
        let fair = fair_value.value();
        let mut levels_removed = 0;
        let mut haircut_applied = false;

        match regime {
            StressRegime::Calm => {
                self.market_maker_active = true;
                self.haircut_applied = false;
                self.quoted_spread = Some(self.widened(stress));
            }
            StressRegime::Thinned => {
                self.market_maker_active = true;
                self.quoted_spread = Some(self.widened(stress));
                levels_removed = pull_within(book, fair, THINNED_PULL_BAND);
                if !self.haircut_applied {
                    book.scale_sizes(THINNED_SIZE_FACTOR);
                    self.haircut_applied = true;
                    haircut_applied = true;
                }
            }
            StressRegime::Withdrawn => {
                self.market_maker_active = false;
                self.quoted_spread = None;
                levels_removed = pull_within(book, fair, WITHDRAWN_PULL_BAND);
            }
        }

        self.regime = regime;

        Ok(StressOutcome {
            stress_level: stress,
            regime,
            previous_regime,
            quoted_spread: self.quoted_spread,
            market_maker_active: self.market_maker_active,
            levels_removed,
            haircut_applied,
        })
    }

    fn widened(&self, stress: Decimal) -> Bps {
        Bps::new(self.normal_spread.value() * Self::spread_multiplier(stress))
    }
}

// bids at or above fair*(1-band) and asks at or below fair*(1+band) go
fn pull_within(book: &mut PriceLevelBook, fair: Decimal, band: Decimal) -> usize {
    let floor = fair * (Decimal::ONE - band);
    let ceiling = fair * (Decimal::ONE + band);
    book.remove_levels_where(Side::Buy, |p| p.value() >= floor)
        + book.remove_levels_where(Side::Sell, |p| p.value() <= ceiling)
}
