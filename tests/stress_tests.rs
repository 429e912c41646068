//! Stress tests
//!
//! These tests push a seeded ladder through market-maker withdrawal and
//! stop-loss cascades to verify the book thins, air pockets open and the
//! LULD band halts trading the way it did on August 24, 2015.

use flash_crash_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// 40 bps ladder around $100: touch at 99.8/100.2, levels every $0.40 down to 80.2
fn config(band: Decimal) -> SimulationConfig {
    SimulationConfig {
        symbol: "IUSV".to_string(),
        fair_value: dec!(100),
        normal_spread_bps: dec!(40),
        luld_band_pct: band,
        ..SimulationConfig::default()
    }
}

fn engine(band: Decimal) -> MatchingEngine {
    MatchingEngine::from_config(&config(band)).unwrap()
}

/// Market-maker withdrawal under rising stress.
mod withdrawal_tests {
    use super::*;

    #[test]
    fn repeated_stress_does_not_compound() {
        for stress in [dec!(0.1), dec!(0.45), dec!(0.9)] {
            let mut once = engine(dec!(0.05));
            let mut twice = engine(dec!(0.05));

            let a = once.apply_stress(stress).unwrap();
            twice.apply_stress(stress).unwrap();
            let b = twice.apply_stress(stress).unwrap();

            assert_eq!(once.book(), twice.book(), "book compounded at stress {}", stress);
            assert_eq!(a.quoted_spread, b.quoted_spread);
            assert_eq!(b.levels_removed, 0);
        }
    }

    #[test]
    fn spread_widens_with_stress() {
        let mut e = engine(dec!(0.05));
        let calm = e.apply_stress(dec!(0.0)).unwrap().quoted_spread.unwrap();
        let nervous = e.apply_stress(dec!(0.2)).unwrap().quoted_spread.unwrap();
        let thinned = e.apply_stress(dec!(0.5)).unwrap().quoted_spread.unwrap();

        assert_eq!(calm.value(), dec!(40));
        assert_eq!(nervous.value(), dec!(120.0));
        assert_eq!(thinned.value(), dec!(1400.0));
        assert!(calm < nervous && nervous < thinned);
    }

    #[test]
    fn withdrawal_leaves_only_stale_far_orders() {
        let mut e = engine(dec!(0.05));
        let outcome = e.apply_stress(dec!(0.8)).unwrap();

        assert_eq!(outcome.regime, StressRegime::Withdrawn);
        assert!(!outcome.market_maker_active);
        assert!(outcome.quoted_spread.is_none());
        assert!(e.book().bids().keys().all(|p| p.value() < dec!(90)));
        assert!(e.book().asks().keys().all(|p| p.value() > dec!(110)));
        assert!(!e.book().bids().is_empty());
        assert_eq!(e.book().depth_within(dec!(0.05)), (0, 0));
    }

    #[test]
    fn lower_stress_reactivates_but_does_not_refill() {
        let mut e = engine(dec!(0.05));
        e.apply_stress(dec!(0.9)).unwrap();
        let thin = e.book().clone();

        let outcome = e.apply_stress(dec!(0.1)).unwrap();
        assert!(outcome.market_maker_active);
        assert_eq!(outcome.regime, StressRegime::Calm);
        assert_eq!(outcome.quoted_spread.unwrap().value(), dec!(80.0));
        assert_eq!(e.book(), &thin);
    }

    #[test]
    fn stress_still_applies_while_halted() {
        let mut e = engine(dec!(0.05));
        e.apply_stress(dec!(0.8)).unwrap();
        e.execute_market(Side::Sell, 10).unwrap();
        assert!(e.is_halted());

        assert!(e.apply_stress(dec!(0.5)).is_ok());
    }
}

/// Market orders and stops against a stressed book.
mod cascade_tests {
    use super::*;

    #[test]
    fn withdrawn_book_is_an_air_pocket() {
        let mut e = engine(dec!(0.5));
        e.apply_stress(dec!(0.8)).unwrap();

        let report = e.execute_market(Side::Sell, 10).unwrap();
        let first = report.fills[0].price.value();
        // the nearest surviving bid is more than 10% under fair value
        assert!(first < dec!(90));
        assert!(report.is_fully_filled());
    }

    #[test]
    fn withdrawn_book_halts_on_first_fill_with_tight_band() {
        let mut e = engine(dec!(0.05));
        e.apply_stress(dec!(0.8)).unwrap();

        let report = e.execute_market(Side::Sell, 10_000).unwrap();
        assert_eq!(report.fills.len(), 1);
        assert!(report.is_halted());
    }

    #[test]
    fn sequential_cascade_on_thinned_book_ends_in_halt() {
        let mut e = engine(dec!(0.05));
        e.apply_stress(dec!(0.5)).unwrap();
        assert_eq!(e.book().best_bid().unwrap().value(), dec!(97.8));

        let spec = CascadeSpec::new(vec![dec!(97.9), dec!(97.5), dec!(97)], vec![500, 500, 500]).unwrap();
        let report = e.simulate_cascade(&spec, CascadePolicy::Sequential).unwrap();

        assert!(report.cascade_started);
        assert_eq!(report.termination, CascadeTermination::Halted);
        assert_eq!(report.executions.len(), 1);
        assert!(report.executions[0].filled < 500);
        assert_eq!(report.abandoned.len(), 2);

        let halt = e.state().halt_info().copied().unwrap();
        assert!(halt.trigger_price.value() < dec!(95));
    }

    #[test]
    fn avalanche_executes_below_fair_value() {
        let mut e = engine(dec!(0.5));
        e.apply_stress(dec!(0.5)).unwrap();

        let spec = CascadeSpec::new(vec![dec!(99), dec!(98), dec!(97)], vec![150, 150, 150]).unwrap();
        let report = e.simulate_cascade(&spec, CascadePolicy::Avalanche).unwrap();

        assert_eq!(report.termination, CascadeTermination::Completed);
        assert_eq!(report.total_filled(), 450);
        assert!(report.average_execution_price().unwrap() < dec!(98));
        assert!(report.worst_slippage_pct().unwrap() < dec!(-2));
        assert!(report.executions.iter().all(|x| x.trigger_price.is_none()));
    }

    #[test]
    fn cascade_event_trail() {
        let mut e = engine(dec!(0.5));
        e.apply_stress(dec!(0.5)).unwrap();

        let spec = CascadeSpec::new(vec![dec!(98), dec!(90)], vec![50, 50]).unwrap();
        e.simulate_cascade(&spec, CascadePolicy::Sequential).unwrap();

        let triggered = e
            .events()
            .iter()
            .filter(|ev| matches!(ev.payload, EventPayload::StopTriggered(_)))
            .count();
        assert_eq!(triggered, 2);
        assert!(e
            .events()
            .iter()
            .any(|ev| matches!(ev.payload, EventPayload::FillExecuted(_))));
    }
}

/// Snapshots taken through the crash.
mod snapshot_tests {
    use super::*;

    #[test]
    fn liquidity_measures_deteriorate() {
        let mut e = engine(dec!(0.5));
        let calm = e.take_snapshot();
        e.advance_time(60_000);
        e.apply_stress(dec!(0.8)).unwrap();
        let crashed = e.take_snapshot();

        assert_eq!(calm.spread_bps().unwrap().value(), dec!(40));
        assert!(crashed.spread_bps().unwrap() > calm.spread_bps().unwrap());

        let calm_impact = calm.price_impact(500, Side::Sell).unwrap();
        let crashed_impact = crashed.price_impact(500, Side::Sell).unwrap();
        assert!(crashed_impact < calm_impact);

        assert_eq!(e.snapshots().len(), 2);
        assert_eq!(e.snapshots()[1].timestamp.as_millis(), 60_000);
    }

    #[test]
    fn stale_bid_above_withdrawn_book_shows_gap() {
        let mut e = engine(dec!(0.5));
        e.apply_stress(dec!(0.8)).unwrap();
        e.add_level(Side::Buy, dec!(99), 100).unwrap();

        let gaps = identify_liquidity_gaps(&e.take_snapshot(), dec!(2));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].upper.value(), dec!(99));
        assert!(gaps[0].lower.value() < dec!(90));
    }

    #[test]
    fn kyle_lambda_from_engine_trades() {
        let mut e = engine(dec!(0.5));
        for i in 0..12u64 {
            let side = if i % 3 == 0 { Side::Buy } else { Side::Sell };
            e.execute_market(side, 100 + i * 50).unwrap();
        }
        assert!(e.trades().len() >= 10);
        assert!(kyle_lambda(e.trades()).is_some());
    }
}
