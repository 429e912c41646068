//! Property-based tests for the matching walk, stress model and cascades.
//!
//! These tests verify invariants hold under random books and orders.

use flash_crash_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

// Strategies for generating test data
fn level_strategy() -> impl Strategy<Value = (Decimal, u64)> {
    (5_000i64..15_000i64, 1u64..2_000u64).prop_map(|(cents, size)| (Decimal::new(cents, 2), size)) // $50 to $150
}

fn levels_strategy() -> impl Strategy<Value = Vec<(Decimal, u64)>> {
    prop::collection::vec(level_strategy(), 1..25)
}

fn stress_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100i64).prop_map(|x| Decimal::new(x, 2)) // 0.00 to 1.00
}

// band wide enough that nothing in $50-$150 halts
fn engine_with(side: Side, levels: &[(Decimal, u64)]) -> MatchingEngine {
    let mut e = MatchingEngine::new(dec!(100), dec!(0.9)).unwrap();
    for (price, size) in levels {
        e.add_level(side, *price, *size).unwrap();
    }
    e
}

proptest! {
    /// Market buy fills min(requested, ask depth) at non-decreasing prices
    #[test]
    fn market_buy_fills_available_depth(
        levels in levels_strategy(),
        requested in 1u64..30_000u64,
    ) {
        let mut e = engine_with(Side::Sell, &levels);
        let depth = e.book().total_depth(Side::Sell);

        let report = e.execute_market(Side::Buy, requested).unwrap();

        prop_assert_eq!(report.filled_size(), requested.min(depth));
        prop_assert!(report.fills.windows(2).all(|w| w[0].price < w[1].price));
        prop_assert_eq!(report.filled_size() + report.unfilled_size(), requested);
        if requested > depth {
            prop_assert!(report.is_air_pocket());
        } else {
            prop_assert!(report.is_fully_filled());
        }
    }

    /// Market sell fills at non-increasing prices and each level drops by exactly its fill
    #[test]
    fn market_sell_decrements_exactly(
        levels in levels_strategy(),
        requested in 1u64..30_000u64,
    ) {
        let mut e = engine_with(Side::Buy, &levels);
        let before: BTreeMap<Price, u64> = e.book().bids().clone();

        let report = e.execute_market(Side::Sell, requested).unwrap();
        let after = e.book().bids();

        prop_assert!(report.fills.windows(2).all(|w| w[0].price > w[1].price));
        for fill in &report.fills {
            let was = before[&fill.price];
            let now = after.get(&fill.price).copied().unwrap_or(0);
            prop_assert_eq!(was - fill.size, now);
        }
        prop_assert!(after.values().all(|s| *s > 0));
        // untouched levels are untouched
        for (price, size) in after {
            if !report.fills.iter().any(|f| f.price == *price) {
                prop_assert_eq!(before[price], *size);
            }
        }
    }

    /// Limit orders never trade through their limit and always account for every share
    #[test]
    fn limit_respects_price(
        levels in levels_strategy(),
        limit_cents in 5_000i64..15_000i64,
        requested in 1u64..10_000u64,
    ) {
        let limit = Decimal::new(limit_cents, 2);
        let mut e = engine_with(Side::Sell, &levels);

        let report = e.execute_limit(Side::Buy, limit, requested).unwrap();

        prop_assert!(report.fills.iter().all(|f| f.price.value() <= limit));
        match report.status {
            ExecutionStatus::Filled => prop_assert_eq!(report.filled_size(), requested),
            ExecutionStatus::Rested { price, size } => {
                prop_assert_eq!(price.value(), limit);
                prop_assert_eq!(report.filled_size() + size, requested);
                prop_assert!(e.book().size_at(Side::Buy, price) >= size);
            }
            other => prop_assert!(false, "unexpected status {:?}", other),
        }
    }

    /// Applying the same stress twice equals applying it once
    #[test]
    fn stress_is_idempotent(
        bids in levels_strategy(),
        asks in levels_strategy(),
        stress in stress_strategy(),
    ) {
        let build = || {
            let mut e = engine_with(Side::Buy, &bids);
            for (price, size) in &asks {
                e.add_level(Side::Sell, *price, *size).unwrap();
            }
            e
        };
        let mut once = build();
        let mut twice = build();

        let a = once.apply_stress(stress).unwrap();
        twice.apply_stress(stress).unwrap();
        let b = twice.apply_stress(stress).unwrap();

        prop_assert_eq!(once.book(), twice.book());
        prop_assert_eq!(a.quoted_spread, b.quoted_spread);
        prop_assert_eq!(a.market_maker_active, b.market_maker_active);
    }

    /// Once a stop fires every later stop fires too; untriggered stops form a prefix
    #[test]
    fn cascade_is_monotone(
        bids in levels_strategy(),
        triggers in prop::collection::vec(5_000i64..15_000i64, 1..10),
    ) {
        let mut e = engine_with(Side::Buy, &bids);
        let sizes = vec![10u64; triggers.len()];
        let triggers: Vec<Decimal> = triggers.into_iter().map(|c| Decimal::new(c, 2)).collect();
        let spec = CascadeSpec::new(triggers, sizes).unwrap();

        let report = e.simulate_cascade(&spec, CascadePolicy::Sequential).unwrap();
        let stops = spec.stops();

        prop_assert_eq!(&report.untriggered[..], &stops[..report.untriggered.len()]);
        let considered = report.untriggered.len() + report.executions.len() + report.abandoned.len();
        prop_assert_eq!(considered, stops.len());
        prop_assert_eq!(report.cascade_started, !report.executions.is_empty());

        let fired: Vec<Price> = report.executions.iter().filter_map(|x| x.trigger_price).collect();
        let expected: Vec<Price> = stops[report.untriggered.len()..report.untriggered.len() + fired.len()]
            .iter()
            .map(|s| s.trigger_price)
            .collect();
        prop_assert_eq!(fired, expected);
    }
}
