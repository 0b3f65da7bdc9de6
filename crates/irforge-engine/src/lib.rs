//! Bounded exhaustive enumeration of small integer SSA functions.
//!
//! The engine turns a sequential, choice-driven generator into a parallel
//! forest of explorations. Every call to the choice oracle potentially
//! splits the current worker into one sibling per alternative; a bounded
//! pool of OS threads caps how many explore at once, and each leaf that
//! survives generation and CFG fix-up is verified, printed as LLVM-style
//! textual IR, and written to the output corpus.
//!
//! Entry points: [`run_exhaustive`] for the full forest, [`run_fuzz`] for a
//! single random or replayed leaf.

pub mod config;
mod emit;
pub mod error;
mod fixup;
mod run;
mod shared;
pub mod stats;
mod synth;
mod worker;

pub use config::Config;
pub use error::EngineError;
pub use run::{run_exhaustive, run_fuzz, FuzzLeaf};
pub use shared::MAX_DEPTH;
pub use stats::{RunStats, STATS_SCHEMA_VERSION};
