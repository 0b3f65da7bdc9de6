//! Machine-readable run statistics.

use serde::Serialize;

/// Version of the JSON stats record; bump on any field change.
pub const STATS_SCHEMA_VERSION: u32 = 1;

/// Summary of one exhaustive run, maintained in shared-state atomics and
/// serialized with `serde_json` when `--stats-out` is set.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub schema_version: u32,
    /// Leaves that reached the emitter and were written out.
    pub leaves_emitted: u64,
    /// Leaves discarded at a structural dead end.
    pub leaves_discarded: u64,
    /// Highest number of simultaneously running workers observed.
    pub peak_running: usize,
    pub wall_ms: u64,
}
