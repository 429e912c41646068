// flash-crash-core: order-book microstructure simulator for ETF flash crashes.
// models book depletion, market-maker withdrawal, stop-loss cascades and LULD halts
// as seen on August 24, 2015.
// all computation is deterministic and single-threaded with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Side, Price, Bps, Timestamp
//   2.x  book.rs: price-level book, power-law ladder, depth and spread
//   2.1x order.rs: orders, fills, execution reports, trade records
//   3.x  circuit_breaker.rs: LULD band check, Active/Halted state
//   4.x  stress.rs: market-maker stress regimes, quote pulling
//   5.x  cascade.rs: sequential and avalanche stop-loss cascades
//   6.x  snapshot.rs: frozen book copies, price impact
//   6.1  analysis.rs: liquidity gaps, Kyle's lambda, Amihud
//   7.x  engine/: matching engine: state, matching walk, errors
//   8.x  events.rs: state transition events for audit
//   9.x  config.rs: simulation config, session presets

// core simulation modules
pub mod book;
pub mod circuit_breaker;
pub mod engine;
pub mod order;
pub mod stress;
pub mod types;

// cascade and analysis
pub mod analysis;
pub mod cascade;
pub mod snapshot;

// integration modules
pub mod config;
pub mod events;

// re exports for convenience
pub use analysis::*;
pub use book::*;
pub use cascade::*;
pub use circuit_breaker::*;
pub use config::{ConfigError, SessionPhase, SimulationConfig};
pub use engine::*;
pub use events::*;
pub use order::*;
pub use snapshot::*;
pub use stress::*;
pub use types::*;
