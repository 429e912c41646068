//! Stop-loss cascade simulation.
//!
//! Stops are converted into market sells against a borrowed engine, either one
//! at a time as price falls through them (sequential) or all at once as a
//! single aggregate order (avalanche).

use crate::engine::{EngineError, MatchingEngine};
use crate::events::{EventPayload, StopTriggeredEvent};
use crate::order::{ExecutionReport, InvalidOrderReason};
use crate::types::{Price, Side, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    #[error("{triggers} trigger prices but {sizes} sizes")]
    LengthMismatch { triggers: usize, sizes: usize },

    #[error("cascade has no stops")]
    Empty,

    #[error("stop {index}: {reason}")]
    InvalidStop { index: usize, reason: InvalidOrderReason },

    #[error("aggregate stop size overflows")]
    TotalSizeOverflow,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopOrder {
    pub trigger_price: Price,
    pub size: u64,
}

/// Validated stop-loss set, held highest trigger first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeSpec {
    stops: Vec<StopOrder>,
}

impl CascadeSpec {
    /// Pair `trigger_prices[i]` with `sizes[i]`. Order of input is irrelevant;
    /// stops are sorted by trigger descending (stable on ties).
    pub fn new(trigger_prices: Vec<Decimal>, sizes: Vec<u64>) -> Result<Self, CascadeError> {
        if trigger_prices.len() != sizes.len() {
            return Err(CascadeError::LengthMismatch {
                triggers: trigger_prices.len(),
                sizes: sizes.len(),
            });
        }
        if trigger_prices.is_empty() {
            return Err(CascadeError::Empty);
        }

        let mut stops = Vec::with_capacity(sizes.len());
        for (index, (trigger, size)) in trigger_prices.into_iter().zip(sizes).enumerate() {
            let trigger_price = Price::new(trigger).ok_or(CascadeError::InvalidStop {
                index,
                reason: InvalidOrderReason::NonPositivePrice,
            })?;
            if size == 0 {
                return Err(CascadeError::InvalidStop {
                    index,
                    reason: InvalidOrderReason::NonPositiveSize,
                });
            }
            stops.push(StopOrder { trigger_price, size });
        }
        stops.sort_by(|a, b| b.trigger_price.cmp(&a.trigger_price));

        Ok(Self { stops })
    }

    pub fn stops(&self) -> &[StopOrder] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Sum of all stop sizes, None on overflow.
    pub fn total_size(&self) -> Option<u64> {
        self.stops.iter().try_fold(0u64, |acc, s| acc.checked_add(s.size))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    /// Stops fire one by one, highest trigger first.
    Sequential,
    /// Every stop arrives at once as one aggregate market sell.
    Avalanche,
}

/// One row of the execution table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopExecution {
    /// None in avalanche mode, where fills are not attributable to a stop.
    pub trigger_price: Option<Price>,
    /// Average execution price. None if nothing filled.
    pub execution_price: Option<Decimal>,
    pub size: u64,
    pub filled: u64,
    /// trigger - execution. Positive is a cost to the seller.
    pub slippage: Option<Decimal>,
    /// Percent move from the reference (trigger, or fair value in avalanche mode).
    pub slippage_pct: Option<Decimal>,
    pub timestamp: Timestamp,
}

impl StopExecution {
    fn for_stop(stop: &StopOrder, report: &ExecutionReport) -> Self {
        let execution_price = report.average_price();
        let trigger = stop.trigger_price.value();
        Self {
            trigger_price: Some(stop.trigger_price),
            execution_price,
            size: stop.size,
            filled: report.filled_size(),
            slippage: execution_price.map(|exec| trigger - exec),
            slippage_pct: execution_price.map(|exec| pct_from(exec, trigger)),
            timestamp: report.timestamp,
        }
    }
}

fn pct_from(price: Decimal, reference: Decimal) -> Decimal {
    (price / reference - Decimal::ONE) * dec!(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeTermination {
    /// Every stop was considered.
    Completed,
    /// A triggered stop found no bids at all.
    AirPocket,
    /// The circuit breaker halted the book.
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
    pub policy: CascadePolicy,
    pub executions: Vec<StopExecution>,
    pub cascade_started: bool,
    pub termination: CascadeTermination,
    /// Stops whose trigger was never reached.
    pub untriggered: Vec<StopOrder>,
    /// Stops never processed because the cascade stopped early.
    pub abandoned: Vec<StopOrder>,
}

impl CascadeReport {
    pub fn triggered_count(&self) -> usize {
        self.executions.iter().filter(|e| e.trigger_price.is_some()).count()
    }

    pub fn total_filled(&self) -> u64 {
        self.executions.iter().map(|e| e.filled).sum()
    }

    /// Size-weighted average execution price across the whole cascade.
    pub fn average_execution_price(&self) -> Option<Decimal> {
        crate::types::weighted_average(
            self.executions
                .iter()
                .filter_map(|e| e.execution_price.map(|p| (p, e.filled))),
        )
    }

    /// Largest percentage drop from reference over all executions.
    pub fn worst_slippage_pct(&self) -> Option<Decimal> {
        self.executions.iter().filter_map(|e| e.slippage_pct).min()
    }
}

/// Drives stop-loss orders through an engine it borrows for one run.
pub struct CascadeSimulator<'a> {
    engine: &'a mut MatchingEngine,
}

impl<'a> CascadeSimulator<'a> {
    pub fn new(engine: &'a mut MatchingEngine) -> Self {
        Self { engine }
    }

    pub fn run(&mut self, spec: &CascadeSpec, policy: CascadePolicy) -> Result<CascadeReport, CascadeError> {
        if self.engine.is_halted() {
            return Err(EngineError::InvalidOrder(InvalidOrderReason::BookHalted).into());
        }
        match policy {
            CascadePolicy::Sequential => self.run_sequential(spec),
            CascadePolicy::Avalanche => self.run_avalanche(spec),
        }
    }

    fn run_sequential(&mut self, spec: &CascadeSpec) -> Result<CascadeReport, CascadeError> {
        let stops = spec.stops();
        let mut report = CascadeReport {
            policy: CascadePolicy::Sequential,
            executions: Vec::new(),
            cascade_started: false,
            termination: CascadeTermination::Completed,
            untriggered: Vec::new(),
            abandoned: Vec::new(),
        };

        for (i, stop) in stops.iter().enumerate() {
            // an empty bid side means price has fallen through everything
            let best_bid = self.engine.book().best_bid();
            let triggered = report.cascade_started || best_bid.map_or(true, |bid| bid <= stop.trigger_price);
            if !triggered {
                report.untriggered.push(*stop);
                continue;
            }

            report.cascade_started = true;
            self.engine.emit_event(EventPayload::StopTriggered(StopTriggeredEvent {
                trigger_price: Some(stop.trigger_price),
                size: stop.size,
                best_bid,
                cascade_started: true,
            }));

            let execution = self.engine.execute_market(Side::Sell, stop.size)?;
            report.executions.push(StopExecution::for_stop(stop, &execution));

            let termination = if execution.fills.is_empty() {
                Some(CascadeTermination::AirPocket)
            } else if execution.is_halted() {
                Some(CascadeTermination::Halted)
            } else {
                None
            };
            if let Some(termination) = termination {
                warn!(trigger = %stop.trigger_price, ?termination, "cascade cut short");
                report.termination = termination;
                report.abandoned = stops[i + 1..].to_vec();
                break;
            }
        }

        info!(
            triggered = report.triggered_count(),
            filled = report.total_filled(),
            termination = ?report.termination,
            "sequential cascade done"
        );
        Ok(report)
    }

    fn run_avalanche(&mut self, spec: &CascadeSpec) -> Result<CascadeReport, CascadeError> {
        let total = spec.total_size().ok_or(CascadeError::TotalSizeOverflow)?;
        let fair = self.engine.fair_value().value();

        self.engine.emit_event(EventPayload::StopTriggered(StopTriggeredEvent {
            trigger_price: None,
            size: total,
            best_bid: self.engine.book().best_bid(),
            cascade_started: true,
        }));
        let execution = self.engine.execute_market(Side::Sell, total)?;

        let mut executions: Vec<StopExecution> = execution
            .fills
            .iter()
            .map(|fill| StopExecution {
                trigger_price: None,
                execution_price: Some(fill.price.value()),
                size: fill.size,
                filled: fill.size,
                slippage: None,
                slippage_pct: Some(pct_from(fill.price.value(), fair)),
                timestamp: execution.timestamp,
            })
            .collect();

        let unfilled = execution.unfilled_size();
        if unfilled > 0 {
            executions.push(StopExecution {
                trigger_price: None,
                execution_price: None,
                size: unfilled,
                filled: 0,
                slippage: None,
                slippage_pct: None,
                timestamp: execution.timestamp,
            });
        }

        let termination = if execution.is_halted() {
            CascadeTermination::Halted
        } else if execution.is_air_pocket() {
            CascadeTermination::AirPocket
        } else {
            CascadeTermination::Completed
        };

        info!(total, filled = execution.filled_size(), ?termination, "avalanche done");
        Ok(CascadeReport {
            policy: CascadePolicy::Avalanche,
            executions,
            cascade_started: true,
            termination,
            untriggered: Vec::new(),
            abandoned: Vec::new(),
        })
    }
}

impl MatchingEngine {
    pub fn simulate_cascade(
        &mut self,
        spec: &CascadeSpec,
        policy: CascadePolicy,
    ) -> Result<CascadeReport, CascadeError> {
        CascadeSimulator::new(self).run(spec, policy)
    }
}
