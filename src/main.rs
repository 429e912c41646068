//! ETF flash-crash simulation.
//!
//! Walks through the order-book mechanics of August 24, 2015: a calm book,
//! market makers pulling quotes, market sells falling through air pockets,
//! stop-loss cascades, and the LULD halt that finally stops them.
//!
//! Set RUST_LOG=debug to see every fill.

use flash_crash_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::error::Error;

type SimResult = Result<(), Box<dyn Error>>;

fn main() -> SimResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    println!("ETF Flash Crash Simulation");
    println!("Order book dynamics on August 24, 2015\n");

    scenario_1_calm_book()?;
    scenario_2_stress_withdrawal()?;
    scenario_3_air_pocket()?;
    scenario_4_sequential_cascade()?;
    scenario_5_avalanche()?;
    scenario_6_luld_halt()?;

    println!("\nAll simulations completed.");
    Ok(())
}

/// Seeded ladder before the open.
fn scenario_1_calm_book() -> SimResult {
    println!("Scenario 1: Calm Book\n");

    let config = SimulationConfig::for_symbol("SPY", dec!(197.50));
    let mut engine = MatchingEngine::from_config(&config)?;

    print!("{}", indent(&engine.book().render(5)));
    let (bid_depth, ask_depth) = engine.book().depth_within(dec!(0.01));
    println!("  Depth within 1%: {} bid, {} ask", bid_depth, ask_depth);

    let report = engine.execute_market(Side::Sell, 25_000)?;
    println!(
        "  Sell 25,000: {} fills, avg ${:.4}, status {:?}\n",
        report.fills.len(),
        report.average_price().unwrap_or(Decimal::ZERO),
        report.status
    );
    Ok(())
}

/// Quoted spread and resting depth as stress rises.
fn scenario_2_stress_withdrawal() -> SimResult {
    println!("Scenario 2: Market Maker Withdrawal\n");

    let config = SimulationConfig::august_24_2015();
    let mut engine = MatchingEngine::from_config(&config)?;

    for stress in [dec!(0), dec!(0.2), dec!(0.5), dec!(0.8)] {
        let outcome = engine.apply_stress(stress)?;
        let spread = outcome
            .quoted_spread
            .map(|s| format!("{:.1} bps", s.value()))
            .unwrap_or_else(|| "no quote".to_string());
        let (bids, asks) = engine.book().depth_within(dec!(0.05));
        println!(
            "  stress {:.1}: {:?}, spread {}, {} levels pulled, depth within 5%: {}/{}",
            stress, outcome.regime, spread, outcome.levels_removed, bids, asks
        );
    }
    println!();
    Ok(())
}

/// Market sell through a withdrawn book.
fn scenario_3_air_pocket() -> SimResult {
    println!("Scenario 3: Air Pocket\n");

    // wide band so the walk runs to the end of the book
    let mut engine = MatchingEngine::new(dec!(108.69), dec!(0.5))?;
    engine.add_level(Side::Buy, dec!(108.60), 500)?;
    engine.add_level(Side::Buy, dec!(108.50), 300)?;
    engine.add_level(Side::Buy, dec!(87.32), 200)?;
    engine.add_level(Side::Buy, dec!(65.00), 100)?;

    let snapshot = engine.take_snapshot();
    for gap in identify_liquidity_gaps(&snapshot, dec!(2)) {
        println!("  Gap ${} -> ${} ({:.1}%)", gap.upper, gap.lower, gap.gap_pct);
    }

    let report = engine.execute_market(Side::Sell, 1_500)?;
    for fill in &report.fills {
        println!("    {} @ ${}", fill.size, fill.price);
    }
    println!(
        "  Filled {} of {}, unfilled {}, air pocket: {}\n",
        report.filled_size(),
        report.requested,
        report.unfilled_size(),
        report.is_air_pocket()
    );
    Ok(())
}

/// Stops firing one after another as price falls.
fn scenario_4_sequential_cascade() -> SimResult {
    println!("Scenario 4: Sequential Stop-Loss Cascade\n");

    let mut engine = MatchingEngine::new(dec!(100), dec!(0.10))?;
    for (price, size) in [(dec!(100), 200), (dec!(99), 300), (dec!(98), 200), (dec!(96), 400), (dec!(93), 1_000)] {
        engine.add_level(Side::Buy, price, size)?;
    }

    // an early seller knocks the touch out
    engine.execute_market(Side::Sell, 200)?;

    let spec = CascadeSpec::new(vec![dec!(97), dec!(99), dec!(98)], vec![300, 500, 400])?;
    let report = engine.simulate_cascade(&spec, CascadePolicy::Sequential)?;
    print_cascade(&report);
    Ok(())
}

/// Every stop hitting the book at once.
fn scenario_5_avalanche() -> SimResult {
    println!("Scenario 5: Avalanche\n");

    let mut engine = MatchingEngine::from_config(&SimulationConfig::august_24_2015())?;
    engine.apply_stress(dec!(0.5))?;

    let spec = CascadeSpec::new(vec![dec!(107), dec!(106), dec!(105)], vec![2_000, 3_000, 5_000])?;
    let report = engine.simulate_cascade(&spec, CascadePolicy::Avalanche)?;
    print_cascade(&report);
    Ok(())
}

/// A fill outside the band halts the book until someone reopens it.
fn scenario_6_luld_halt() -> SimResult {
    println!("Scenario 6: LULD Halt\n");

    let mut engine = MatchingEngine::new(dec!(100), SessionPhase::Regular.band_pct())?;
    engine.add_level(Side::Buy, dec!(99), 500)?;
    engine.add_level(Side::Buy, dec!(96), 500)?;
    engine.add_level(Side::Buy, dec!(90), 5_000)?;

    let report = engine.execute_market(Side::Sell, 3_000)?;
    println!("  Sold {} of {} before the halt", report.filled_size(), report.requested);
    if let Some(halt) = engine.state().halt_info() {
        println!(
            "  Halted at ${}, band ${:.2} - ${:.2}",
            halt.trigger_price, halt.lower_band, halt.upper_band
        );
    }

    match engine.execute_market(Side::Sell, 100) {
        Err(e) => println!("  Next order rejected: {}", e),
        Ok(_) => println!("  Next order unexpectedly accepted"),
    }

    engine.advance_time(5 * 60 * 1_000);
    engine.update_fair_value(dec!(90))?;
    engine.resume_trading();
    let report = engine.execute_market(Side::Sell, 100)?;
    println!(
        "  Reopened around $90, sold {} @ ${}",
        report.filled_size(),
        report.average_price().unwrap_or(Decimal::ZERO)
    );
    println!("  {} events recorded", engine.events().len());
    Ok(())
}

fn print_cascade(report: &CascadeReport) {
    for row in &report.executions {
        let trigger = row.trigger_price.map(|p| format!("${}", p)).unwrap_or_else(|| "-".to_string());
        let exec = row
            .execution_price
            .map(|p| format!("${:.2}", p))
            .unwrap_or_else(|| "no fill".to_string());
        let pct = row
            .slippage_pct
            .map(|p| format!("{:.2}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        println!("    trigger {:>8}  size {:>6}  exec {:>9}  slippage {}", trigger, row.size, exec, pct);
    }
    println!(
        "  {:?}: {} filled, ended {:?}, {} untriggered, {} abandoned\n",
        report.policy,
        report.total_filled(),
        report.termination,
        report.untriggered.len(),
        report.abandoned.len()
    );
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("  {}\n", l)).collect()
}
