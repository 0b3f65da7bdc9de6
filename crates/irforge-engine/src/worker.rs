//! Per-worker state and the choice oracle.
//!
//! A worker owns everything it mutates: its choice trace, its PRNG, and the
//! function under construction. In exhaustive mode `choose(n)` turns the
//! worker into a forest: for each non-final alternative it spawns a sibling
//! worker that replays this worker's trace plus one extra token, then
//! re-acquires a running slot before continuing; the final alternative is
//! taken in place, so a call with `n` alternatives costs `n - 1` spawns.
//!
//! A spawned worker rebuilds its state from scratch by replaying its prefix
//! through the oracle. Replay is sound because random constant *values* never
//! influence the shape of the choice tree, only recorded tokens do.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use indexmap::IndexSet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use irforge_ir::{
    Builder, CastKind, Function, Global, GlobalId, InstId, InstTy, IntTy, Value,
};

use crate::config::Config;
use crate::error::{Abort, EngineError, Gen};
use crate::shared::Shared;

/// Post-prefix behavior of the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OracleMode {
    /// Fork one sibling per alternative; the caller keeps the last one.
    Exhaustive,
    /// Draw uniformly from the worker PRNG.
    Random,
    /// Only the supplied tokens are legal; exhausting them is fatal.
    Forced,
}

pub(crate) struct Worker {
    pub(crate) shared: Arc<Shared>,
    pub(crate) cfg: Arc<Config>,
    pub(crate) id: u64,
    pub(crate) depth: usize,
    mode: OracleMode,
    prefix: Vec<u64>,
    prefix_pos: usize,
    pub(crate) choices: Vec<u64>,
    pub(crate) rng: SmallRng,

    pub(crate) builder: Builder,
    pub(crate) globals: Vec<Global>,
    pub(crate) ret_global: Option<GlobalId>,
    pub(crate) vals: Vec<Value>,
    pub(crate) arg_widths: Vec<u32>,
    pub(crate) arg_vals: Vec<Option<Value>>,
    pub(crate) used_args: IndexSet<usize>,
    pub(crate) branches: Vec<InstId>,
    pub(crate) budget: u64,
    pub(crate) initial_budget: u64,
    pub(crate) fuzz_text: Option<String>,
}

impl Worker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        cfg: Arc<Config>,
        mode: OracleMode,
        prefix: Vec<u64>,
        id: u64,
        depth: usize,
    ) -> Self {
        let arg_widths = cfg.arg_schedule();
        let mut globals = Vec::new();
        let func_args: Vec<IntTy> = if cfg.args_from_memory {
            for (i, w) in arg_widths.iter().enumerate() {
                globals.push(Global {
                    name: format!("g{i}"),
                    ty: IntTy::new(*w),
                });
            }
            Vec::new()
        } else {
            arg_widths
                .iter()
                .map(|w| IntTy::new(cfg.abi_width(*w)))
                .collect()
        };
        let ret_ty = if cfg.return_to_memory {
            InstTy::Void
        } else {
            InstTy::Int(IntTy::new(cfg.abi_width(cfg.ret_width())))
        };
        let ret_global = cfg.return_to_memory.then(|| {
            globals.push(Global {
                name: "ret".to_string(),
                ty: IntTy::new(cfg.ret_width()),
            });
            globals.len() - 1
        });

        let rng = match (mode, cfg.seed) {
            (OracleMode::Random | OracleMode::Forced, Some(s)) => SmallRng::seed_from_u64(s),
            (OracleMode::Random | OracleMode::Forced, None) => SmallRng::from_entropy(),
            // Exhaustive workers reseed from their claimed id, the thread
            // analog of reseeding a forked child from its pid.
            _ => SmallRng::seed_from_u64(id),
        };

        let func = Function::new(cfg.base_name.clone(), func_args, ret_ty);
        let n_args = arg_widths.len();
        let budget = cfg.num_insns;
        Worker {
            shared,
            cfg,
            id,
            depth,
            mode,
            prefix,
            prefix_pos: 0,
            choices: Vec::new(),
            rng,
            builder: Builder::new(func),
            globals,
            ret_global,
            vals: Vec::new(),
            arg_widths,
            arg_vals: vec![None; n_args],
            used_args: IndexSet::new(),
            branches: Vec::new(),
            budget,
            initial_budget: budget,
            fuzz_text: None,
        }
    }

    /// The choice oracle: an integer in `[0, n)`, by replay, by PRNG, or by
    /// forking one sibling per non-final alternative.
    pub(crate) fn choose(&mut self, n: u64) -> Gen<u64> {
        if n == 0 {
            debug_assert!(false, "choose(0) is a contract violation");
            return Err(self.shared.die(EngineError::EmptyChoice));
        }
        if self.prefix_pos < self.prefix.len() {
            let tok = self.prefix[self.prefix_pos];
            self.prefix_pos += 1;
            if tok >= n {
                return Err(self
                    .shared
                    .die(EngineError::ReplayOutOfRange { token: tok, n }));
            }
            self.choices.push(tok);
            return Ok(tok);
        }
        match self.mode {
            OracleMode::Forced => Err(self
                .shared
                .die(EngineError::ChoicesExhausted(self.prefix.len()))),
            OracleMode::Random => {
                let c = self.rng.gen_range(0..n);
                self.choices.push(c);
                Ok(c)
            }
            OracleMode::Exhaustive => {
                for i in 0..n - 1 {
                    if self.shared.stopped() {
                        return Err(Abort::Stopped);
                    }
                    let mut child_prefix = self.choices.clone();
                    child_prefix.push(i);
                    self.shared.worker_spawned();
                    let shared = self.shared.clone();
                    let cfg = self.cfg.clone();
                    let depth = self.depth + 1;
                    let spawned = thread::Builder::new()
                        .name(format!("irforge-d{depth}"))
                        .spawn(move || worker_main(shared, cfg, child_prefix, depth));
                    if let Err(e) = spawned {
                        self.shared.worker_done();
                        return Err(self.shared.die(EngineError::Io(e)));
                    }
                    // The child runs on this worker's slot; park until a
                    // fresh one frees up.
                    self.shared.increase_runners(self.depth)?;
                }
                self.choices.push(n - 1);
                Ok(n - 1)
            }
        }
    }

    /// `choose(2)` as an arm-gating coin.
    pub(crate) fn flip(&mut self) -> Gen<bool> {
        Ok(self.choose(2)? == 1)
    }

    pub(crate) fn run_and_record(&mut self) {
        match self.run_leaf() {
            Ok(()) => {
                self.shared.emitted.fetch_add(1, Ordering::SeqCst);
                debug!(id = self.id, "leaf emitted");
            }
            Err(Abort::DeadEnd) => {
                self.shared.discarded.fetch_add(1, Ordering::SeqCst);
                debug!(id = self.id, choices = ?self.choices, "leaf discarded");
            }
            Err(Abort::Stopped) => {
                debug!(id = self.id, "worker stopped");
            }
        }
    }

    /// Generate one function, fix up its CFG, and emit it.
    pub(crate) fn run_leaf(&mut self) -> Gen<()> {
        let v = self.gen_val(self.cfg.ret_width(), true, true)?;
        self.finish_ret(v);
        self.fixup()?;
        self.output()
    }

    /// Close the exit block: store-to-global or plain `ret`, with the
    /// ABI-promotion extension when the declared return type is wider.
    fn finish_ret(&mut self, v: Value) {
        if let Some(g) = self.ret_global {
            self.builder.create_store(g, v);
            self.builder.create_ret(None);
            return;
        }
        let natural = self.cfg.ret_width();
        let abi = self.cfg.abi_width(natural);
        let out = if abi != natural {
            self.builder.create_cast(CastKind::ZExt, v, IntTy::new(abi))
        } else {
            v
        };
        self.builder.create_ret(Some(out));
    }

    pub(crate) fn current_function(&self) -> &Function {
        self.builder.func()
    }
}

/// Body of a spawned exhaustive worker.
pub(crate) fn worker_main(shared: Arc<Shared>, cfg: Arc<Config>, prefix: Vec<u64>, depth: usize) {
    let id = shared.claim_id();
    let mut w = Worker::new(shared.clone(), cfg, OracleMode::Exhaustive, prefix, id, depth);
    w.run_and_record();
    // After a stop-flag unwind the slot may already be gone; the running
    // counter saturates rather than underflows.
    shared.decrease_runners();
    shared.worker_done();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn forced(tokens: Vec<u64>) -> Worker {
        let cfg = Arc::new(Config {
            fuzz: true,
            ..Config::default()
        });
        let shared = Arc::new(Shared::new(1));
        Worker::new(shared, cfg, OracleMode::Forced, tokens, 1, 1)
    }

    #[test]
    fn forced_tokens_are_returned_in_order_and_traced() {
        let mut w = forced(vec![0, 1, 3]);
        assert_eq!(w.choose(2), Ok(0));
        assert_eq!(w.choose(2), Ok(1));
        assert_eq!(w.choose(5), Ok(3));
        assert_eq!(w.choices, vec![0, 1, 3]);
    }

    #[test]
    fn forced_exhaustion_is_fatal() {
        let mut w = forced(vec![1]);
        assert_eq!(w.choose(2), Ok(1));
        assert_eq!(w.choose(2), Err(Abort::Stopped));
        assert!(matches!(
            w.shared.take_error(),
            Some(EngineError::ChoicesExhausted(1))
        ));
    }

    #[test]
    fn forced_token_out_of_range_is_fatal() {
        let mut w = forced(vec![7]);
        assert_eq!(w.choose(3), Err(Abort::Stopped));
        assert!(matches!(
            w.shared.take_error(),
            Some(EngineError::ReplayOutOfRange { token: 7, n: 3 })
        ));
    }

    #[test]
    fn random_choices_stay_in_range() {
        let cfg = Arc::new(Config {
            fuzz: true,
            seed: Some(11),
            ..Config::default()
        });
        let shared = Arc::new(Shared::new(1));
        let mut w = Worker::new(shared, cfg, OracleMode::Random, Vec::new(), 1, 1);
        for _ in 0..100 {
            let c = w.choose(7).unwrap();
            assert!(c < 7);
        }
        assert_eq!(w.choices.len(), 100);
    }
}
