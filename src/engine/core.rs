// 7.1 engine/core.rs: engine state. one book, its breaker, the stress model,
// trade history, snapshots and the audit log.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::book::{LadderConfig, PriceLevelBook};
use crate::circuit_breaker::{CircuitBreaker, HaltInfo, TradingState};
use crate::config::SimulationConfig;
use crate::events::{
    Event, EventId, EventPayload, FairValueUpdatedEvent, StressAppliedEvent, TradingHaltedEvent,
};
use crate::order::TradeRecord;
use crate::snapshot::BookSnapshot;
use crate::stress::{StressModel, StressOutcome};
use crate::types::{Bps, Price, Side, Timestamp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

/** 7.1.1: matching engine for one simulated symbol. all state lives here */
#[derive(Debug)]
pub struct MatchingEngine {
    pub(super) config: EngineConfig,
    pub(super) symbol: String,
    pub(super) book: PriceLevelBook,
    pub(super) breaker: CircuitBreaker,
    pub(super) state: TradingState,
    pub(super) stress: StressModel,
    pub(super) trades: Vec<TradeRecord>,
    pub(super) snapshots: Vec<BookSnapshot>,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl MatchingEngine {
    /// Empty book around `fair_value` with a LULD band of `band_pct` (0.05 = 5%).
    pub fn new(fair_value: Decimal, band_pct: Decimal) -> Result<Self, EngineError> {
        let fair = Price::new(fair_value).ok_or(EngineError::InvalidFairValue(fair_value))?;
        let breaker = CircuitBreaker::new(fair, band_pct)?;
        Ok(Self {
            config: EngineConfig::default(),
            symbol: "SIM".to_string(),
            book: PriceLevelBook::new(),
            breaker,
            state: TradingState::Active,
            stress: StressModel::new(Bps::new(dec!(2))),
            trades: Vec::new(),
            snapshots: Vec::new(),
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        })
    }

    /// Engine with a power-law ladder seeded around the configured fair value.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let mut engine = Self::new(config.fair_value, config.luld_band_pct)?
            .with_symbol(&config.symbol)
            .with_normal_spread(Bps::new(config.normal_spread_bps))
            .with_engine_config(config.engine.clone());
        engine.seed_ladder(&config.ladder);
        Ok(engine)
    }

    pub fn with_book(mut self, book: PriceLevelBook) -> Self {
        self.book = book;
        self
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn with_normal_spread(mut self, spread: Bps) -> Self {
        self.stress = StressModel::new(spread);
        self
    }

    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the book with a calm power-law ladder at the normal spread.
    pub fn seed_ladder(&mut self, ladder: &LadderConfig) {
        self.book = PriceLevelBook::with_power_law_ladder(
            self.fair_value(),
            self.stress.normal_spread(),
            ladder,
        );
        debug!(
            symbol = %self.symbol,
            bid_levels = self.book.level_count(Side::Buy),
            ask_levels = self.book.level_count(Side::Sell),
            "seeded ladder"
        );
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = self.current_time.plus_millis(millis);
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn book(&self) -> &PriceLevelBook {
        &self.book
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn state(&self) -> TradingState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    pub fn fair_value(&self) -> Price {
        self.breaker.reference_price()
    }

    pub fn stress_model(&self) -> &StressModel {
        &self.stress
    }

    /// Seed liquidity by hand. Bad input is reported as an invalid order and the
    /// book is left untouched.
    pub fn add_level(&mut self, side: Side, price: Decimal, size: u64) -> Result<(), EngineError> {
        self.book.add_level(side, price, size)?;
        Ok(())
    }

    /// Apply a stress level around the current fair value. Allowed while halted:
    /// market makers keep pulling quotes during a halt.
    pub fn apply_stress(&mut self, stress: Decimal) -> Result<StressOutcome, EngineError> {
        let fair = self.fair_value();
        let outcome = self.stress.apply(&mut self.book, fair, stress)?;

        if outcome.regime != outcome.previous_regime {
            info!(
                symbol = %self.symbol,
                stress = %stress,
                from = ?outcome.previous_regime,
                to = ?outcome.regime,
                "stress regime change"
            );
        }

        self.emit_event(EventPayload::StressApplied(StressAppliedEvent {
            stress_level: stress,
            regime: outcome.regime,
            quoted_spread: outcome.quoted_spread,
            levels_removed: outcome.levels_removed,
            market_maker_active: outcome.market_maker_active,
        }));

        Ok(outcome)
    }

    /// Move the fair-value reference used by the band check and stress thresholds.
    pub fn update_fair_value(&mut self, fair_value: Decimal) -> Result<(), EngineError> {
        let current = Price::new(fair_value).ok_or(EngineError::InvalidFairValue(fair_value))?;
        let previous = self.fair_value();
        self.breaker.set_reference(current);
        self.emit_event(EventPayload::FairValueUpdated(FairValueUpdatedEvent { previous, current }));
        Ok(())
    }

    /// External reopen after a halt. The engine itself never calls this.
    /// Returns false if the book was not halted.
    pub fn resume_trading(&mut self) -> bool {
        if !self.state.is_halted() {
            return false;
        }
        self.state = TradingState::Active;
        info!(symbol = %self.symbol, "trading resumed");
        self.emit_event(EventPayload::TradingResumed);
        true
    }

    /// Capture the current book and keep a copy in the snapshot history.
    pub fn take_snapshot(&mut self) -> BookSnapshot {
        let snapshot = BookSnapshot {
            timestamp: self.current_time,
            bids: self.book.bids().clone(),
            asks: self.book.asks().clone(),
            last_trade: self.last_trade().map(|t| t.price),
            fair_value: self.fair_value(),
            halted: self.is_halted(),
        };

        self.snapshots.push(snapshot.clone());
        if self.snapshots.len() > self.config.max_snapshots {
            let drain_count = self.snapshots.len() - self.config.max_snapshots;
            self.snapshots.drain(0..drain_count);
        }

        snapshot
    }

    pub fn snapshots(&self) -> &[BookSnapshot] {
        &self.snapshots
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn last_trade(&self) -> Option<&TradeRecord> {
        self.trades.last()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // Active -> Halted. only the matching walk gets here
    pub(super) fn halt(&mut self, trigger_price: Price) {
        let info = HaltInfo {
            trigger_price,
            lower_band: self.breaker.lower_band(),
            upper_band: self.breaker.upper_band(),
            halted_at: self.current_time,
        };
        self.state = TradingState::Halted(info);

        warn!(
            symbol = %self.symbol,
            price = %trigger_price,
            lower = %info.lower_band,
            upper = %info.upper_band,
            "LULD band breached, trading halted"
        );

        self.emit_event(EventPayload::TradingHalted(TradingHaltedEvent {
            trigger_price,
            reference_price: self.breaker.reference_price(),
            band_pct: self.breaker.band_pct(),
        }));
    }

    pub(crate) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            debug!(id = event.id.0, payload = ?event.payload, "event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::InvalidOrderReason;
    use crate::stress::StressRegime;

    fn engine() -> MatchingEngine {
        MatchingEngine::new(dec!(100), dec!(0.05)).unwrap()
    }

    #[test]
    fn new_rejects_bad_reference() {
        assert_eq!(
            MatchingEngine::new(dec!(0), dec!(0.05)).unwrap_err(),
            EngineError::InvalidFairValue(dec!(0))
        );
        assert!(matches!(
            MatchingEngine::new(dec!(100), dec!(1.5)),
            Err(EngineError::Band(_))
        ));
    }

    #[test]
    fn from_config_seeds_ladder() {
        let config = SimulationConfig::for_symbol("RSP", dec!(76));
        let engine = MatchingEngine::from_config(&config).unwrap();

        assert_eq!(engine.symbol(), "RSP");
        assert_eq!(engine.fair_value().value(), dec!(76));
        assert_eq!(engine.book().level_count(Side::Buy), 50);
        assert!(!engine.is_halted());
    }

    #[test]
    fn from_config_survives_steep_ladder_decay() {
        let mut config = SimulationConfig::default();
        config.ladder.decay_exponent = dec!(30);
        assert!(config.validate().is_ok());

        let engine = MatchingEngine::from_config(&config).unwrap();
        // only the touch and the first level keep whole shares
        assert_eq!(engine.book().level_count(Side::Buy), 2);
        assert_eq!(engine.book().level_count(Side::Sell), 2);
    }

    #[test]
    fn from_config_validates() {
        let mut config = SimulationConfig::default();
        config.luld_band_pct = dec!(0);
        assert!(matches!(
            MatchingEngine::from_config(&config),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn add_level_maps_to_invalid_order() {
        let mut e = engine();
        assert_eq!(
            e.add_level(Side::Buy, dec!(-1), 100),
            Err(EngineError::InvalidOrder(InvalidOrderReason::NonPositivePrice))
        );
        assert_eq!(
            e.add_level(Side::Buy, dec!(99), 0),
            Err(EngineError::InvalidOrder(InvalidOrderReason::NonPositiveSize))
        );
        assert!(e.book().is_empty());

        e.add_level(Side::Buy, dec!(99), u64::MAX).unwrap();
        assert_eq!(
            e.add_level(Side::Buy, dec!(99), 1),
            Err(EngineError::InvalidOrder(InvalidOrderReason::SizeOverflow))
        );
        assert_eq!(e.book().size_at(Side::Buy, Price::new_unchecked(dec!(99))), u64::MAX);
    }

    #[test]
    fn stress_emits_event_and_rejects_out_of_range() {
        let mut e = engine();
        e.seed_ladder(&LadderConfig::default());

        let out = e.apply_stress(dec!(0.8)).unwrap();
        assert_eq!(out.regime, StressRegime::Withdrawn);
        assert!(!e.stress_model().market_maker_active());
        assert!(matches!(
            e.events().last().unwrap().payload,
            EventPayload::StressApplied(_)
        ));

        assert!(matches!(e.apply_stress(dec!(1.2)), Err(EngineError::InvalidStress(_))));
    }

    #[test]
    fn fair_value_update_moves_band() {
        let mut e = engine();
        e.update_fair_value(dec!(90)).unwrap();
        assert_eq!(e.breaker().lower_band(), dec!(85.50));
        assert!(e.update_fair_value(dec!(-5)).is_err());
        assert_eq!(e.fair_value().value(), dec!(90));
    }

    #[test]
    fn snapshot_history_and_clock() {
        let mut e = engine();
        e.add_level(Side::Buy, dec!(99), 100).unwrap();
        e.add_level(Side::Sell, dec!(101), 100).unwrap();

        e.advance_time(1_500);
        let snap = e.take_snapshot();
        assert_eq!(snap.timestamp.as_millis(), 1_500);
        assert_eq!(snap.best_bid().unwrap().value(), dec!(99));
        assert!(snap.last_trade.is_none());
        assert!(!snap.halted);

        e.take_snapshot();
        assert_eq!(e.snapshots().len(), 2);
    }

    #[test]
    fn snapshot_history_is_capped() {
        let mut e = engine().with_engine_config(EngineConfig {
            max_snapshots: 3,
            ..EngineConfig::default()
        });
        for i in 0..5 {
            e.set_time(Timestamp::from_millis(i));
            e.take_snapshot();
        }
        assert_eq!(e.snapshots().len(), 3);
        assert_eq!(e.snapshots()[0].timestamp.as_millis(), 2);
    }

    #[test]
    fn trade_history_is_capped() {
        let mut e = engine().with_engine_config(EngineConfig {
            max_trades: 3,
            ..EngineConfig::default()
        });
        for i in 0..5 {
            e.add_level(Side::Sell, dec!(100) + Decimal::from(i), 10).unwrap();
        }
        e.execute_market(Side::Buy, 50).unwrap();

        assert_eq!(e.trades().len(), 3);
        assert_eq!(e.trades()[0].price.value(), dec!(102));
        assert_eq!(e.last_trade().unwrap().price.value(), dec!(104));
    }

    #[test]
    fn event_log_is_capped() {
        let mut e = engine().with_engine_config(EngineConfig {
            max_events: 2,
            ..EngineConfig::default()
        });
        for _ in 0..4 {
            e.apply_stress(dec!(0.1)).unwrap();
        }
        assert_eq!(e.events().len(), 2);
        assert_eq!(e.events()[0].id, EventId(3));
        assert_eq!(e.recent_events(1)[0].id, EventId(4));
    }

    #[test]
    fn resume_only_when_halted() {
        let mut e = engine();
        assert!(!e.resume_trading());
        e.halt(Price::new_unchecked(dec!(90)));
        assert!(e.is_halted());
        assert_eq!(e.state().halt_info().unwrap().lower_band, dec!(95.00));
        assert!(e.resume_trading());
        assert!(!e.is_halted());
    }
}
