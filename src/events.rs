// 8.0: every state change in the engine produces an event. used as an audit trail
// for post-run analysis and to feed external consumers such as a market-maker P&L
// model. the EventPayload enum lists all event types.

use crate::stress::StressRegime;
use crate::types::{Bps, Price, Side, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Execution events
    FillExecuted(FillEvent),
    LimitRested(LimitRestedEvent),
    AirPocket(AirPocketEvent),

    // Halt state
    TradingHalted(TradingHaltedEvent),
    TradingResumed,

    // Market conditions
    StressApplied(StressAppliedEvent),
    FairValueUpdated(FairValueUpdatedEvent),

    // Cascade events
    StopTriggered(StopTriggeredEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub taker_side: Side,
    pub price: Price,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitRestedEvent {
    pub side: Side,
    pub price: Price,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirPocketEvent {
    pub taker_side: Side,
    pub requested: u64,
    pub filled: u64,
    pub unfilled: u64,
    pub last_price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingHaltedEvent {
    pub trigger_price: Price,
    pub reference_price: Price,
    pub band_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressAppliedEvent {
    pub stress_level: Decimal,
    pub regime: StressRegime,
    pub quoted_spread: Option<Bps>,
    pub levels_removed: usize,
    pub market_maker_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairValueUpdatedEvent {
    pub previous: Price,
    pub current: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTriggeredEvent {
    pub trigger_price: Option<Price>,
    pub size: u64,
    pub best_bid: Option<Price>,
    pub cascade_started: bool,
}
