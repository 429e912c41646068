// 7.0: matching engine. owns one price-level book per simulated symbol and
// coordinates matching, halt checks, stress application and snapshots.
// deterministic and single-threaded with no external I/O.

mod config;
mod core;
mod orders;
mod results;

pub use config::EngineConfig;
pub use core::MatchingEngine;
pub use results::EngineError;
