//! Run entry points: the exhaustive forest and the single-program fuzz mode.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Abort, EngineError};
use crate::shared::Shared;
use crate::stats::{RunStats, STATS_SCHEMA_VERSION};
use crate::worker::{OracleMode, Worker};

/// Result of a fuzz-mode run. `text` is `None` when the single explored leaf
/// hit a structural dead end, which is a silent success.
#[derive(Debug, Clone)]
pub struct FuzzLeaf {
    pub text: Option<String>,
    pub choices: Vec<u64>,
}

/// Enumerate the whole choice tree, writing every leaf to the output corpus.
/// Returns once every worker has exited.
pub fn run_exhaustive(cfg: Config) -> Result<RunStats, EngineError> {
    cfg.validate()?;
    let cfg = Arc::new(cfg);
    let shared = Arc::new(Shared::new(cfg.cores));
    let start = Instant::now();

    shared.worker_spawned();
    let root_id = shared.claim_id();
    let mut root = Worker::new(
        shared.clone(),
        cfg.clone(),
        OracleMode::Exhaustive,
        Vec::new(),
        root_id,
        1,
    );
    root.run_and_record();
    shared.decrease_runners();
    shared.worker_done();

    shared.wait_all();
    if let Some(err) = shared.take_error() {
        return Err(err);
    }
    let stats = RunStats {
        schema_version: STATS_SCHEMA_VERSION,
        leaves_emitted: shared.emitted.load(Ordering::SeqCst),
        leaves_discarded: shared.discarded.load(Ordering::SeqCst),
        peak_running: shared.peak_running(),
        wall_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        emitted = stats.leaves_emitted,
        discarded = stats.leaves_discarded,
        peak_running = stats.peak_running,
        wall_ms = stats.wall_ms,
        "exhaustive run complete"
    );
    if stats.leaves_emitted == 0 && stats.leaves_discarded > 0 {
        warn!(
            discarded = stats.leaves_discarded,
            "every explored leaf hit a structural dead end"
        );
    }
    Ok(stats)
}

/// Explore a single leaf: random when no forced sequence is given, forced
/// replay otherwise.
pub fn run_fuzz(cfg: Config) -> Result<FuzzLeaf, EngineError> {
    cfg.validate()?;
    let forced = cfg.forced_choices.clone();
    let cfg = Arc::new(cfg);
    let shared = Arc::new(Shared::new(cfg.cores));
    let id = shared.claim_id();
    let (mode, prefix) = match forced {
        Some(tokens) => (OracleMode::Forced, tokens),
        None => (OracleMode::Random, Vec::new()),
    };
    let mut w = Worker::new(shared.clone(), cfg, mode, prefix, id, 1);
    match w.run_leaf() {
        Ok(()) => Ok(FuzzLeaf {
            text: w.fuzz_text.take(),
            choices: w.choices.clone(),
        }),
        Err(Abort::DeadEnd) => Ok(FuzzLeaf {
            text: None,
            choices: w.choices.clone(),
        }),
        Err(Abort::Stopped) => Err(shared
            .take_error()
            .unwrap_or_else(|| EngineError::Pool("stopped without a recorded error".to_string()))),
    }
}
