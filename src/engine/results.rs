// 7.2 engine/results.rs: errors for engine operations. liquidity exhaustion and halts are not here;
// they come back as ExecutionStatus values because the simulation expects them.

use crate::book::BookError;
use crate::circuit_breaker::BandError;
use crate::config::ConfigError;
use crate::order::InvalidOrderReason;
use crate::stress::StressError;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid order: {0}")]
    InvalidOrder(InvalidOrderReason),

    #[error("Invalid stress level: {0}")]
    InvalidStress(#[from] StressError),

    #[error("Fair value must be positive, got {0}")]
    InvalidFairValue(Decimal),

    #[error("Circuit breaker: {0}")]
    Band(#[from] BandError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Book error: {0}")]
    Book(BookError),
}

impl From<InvalidOrderReason> for EngineError {
    fn from(reason: InvalidOrderReason) -> Self {
        EngineError::InvalidOrder(reason)
    }
}

// bad caller input maps onto the order taxonomy, anything else is internal
impl From<BookError> for EngineError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::InvalidPrice(_) => EngineError::InvalidOrder(InvalidOrderReason::NonPositivePrice),
            BookError::InvalidSize => EngineError::InvalidOrder(InvalidOrderReason::NonPositiveSize),
            BookError::SizeOverflow { .. } => EngineError::InvalidOrder(InvalidOrderReason::SizeOverflow),
            other => EngineError::Book(other),
        }
    }
}
