// 9.0 config.rs: everything needed to stand up one simulated symbol.
// fair value, normal spread, LULD band, ladder shape, engine limits.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::book::LadderConfig;
use crate::engine::EngineConfig;

// Complete configuration for one simulated symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    // Ticker (e.g. "SPY", "IUSV")
    pub symbol: String,
    // Fair value (NAV/iNAV) supplied by the pricing side
    pub fair_value: Decimal,
    // Calm-market spread in basis points
    pub normal_spread_bps: Decimal,
    // LULD band as a fraction (0.05 = 5%), resolved by the external band calculator
    pub luld_band_pct: Decimal,
    // Shape of the seeded liquidity ladder
    pub ladder: LadderConfig,
    pub engine: EngineConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            fair_value: dec!(200),
            normal_spread_bps: dec!(2),
            luld_band_pct: SessionPhase::Regular.band_pct(),
            ladder: LadderConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn for_symbol(symbol: &str, fair_value: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            fair_value,
            ..Self::default()
        }
    }

    // IUSV on the morning of August 24, 2015: opening print window, so wide bands,
    // and a spread already several times normal
    pub fn august_24_2015() -> Self {
        Self {
            symbol: "IUSV".to_string(),
            fair_value: dec!(108.69),
            normal_spread_bps: dec!(5),
            luld_band_pct: SessionPhase::OpenClose.band_pct(),
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase: SessionPhase) -> Self {
        self.luld_band_pct = phase.band_pct();
        self
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fair_value <= Decimal::ZERO {
            return Err(ConfigError::InvalidFairValue(self.fair_value));
        }

        if self.normal_spread_bps <= Decimal::ZERO {
            return Err(ConfigError::InvalidSpread(self.normal_spread_bps));
        }

        if self.luld_band_pct <= Decimal::ZERO || self.luld_band_pct >= Decimal::ONE {
            return Err(ConfigError::InvalidBand(self.luld_band_pct));
        }

        if self.ladder.touch_size == 0 {
            return Err(ConfigError::InvalidLadder {
                reason: "touch size must be positive".to_string(),
            });
        }

        if self.ladder.decay_exponent < Decimal::ZERO {
            return Err(ConfigError::InvalidLadder {
                reason: "decay exponent cannot be negative".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("fair value must be positive, got {0}")]
    InvalidFairValue(Decimal),
    #[error("normal spread must be positive, got {0} bps")]
    InvalidSpread(Decimal),
    #[error("LULD band must be a fraction in (0, 1), got {0}")]
    InvalidBand(Decimal),
    #[error("invalid ladder: {reason}")]
    InvalidLadder { reason: String },
}

// Trading session phase. LULD bands double around the open and close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Regular,
    OpenClose,
}

impl SessionPhase {
    pub fn band_pct(&self) -> Decimal {
        match self {
            SessionPhase::Regular => dec!(0.05),
            SessionPhase::OpenClose => dec!(0.10),
        }
    }
}
