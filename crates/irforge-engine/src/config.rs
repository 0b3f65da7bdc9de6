//! Run configuration.
//!
//! One plain-data struct carries every knob; the CLI builds it from argv and
//! the engine never touches the environment itself.

use std::path::PathBuf;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct Config {
    /// Cap of concurrently running workers.
    pub cores: usize,
    /// Base integer width in bits.
    pub width: u32,
    /// Instruction budget per function.
    pub num_insns: u64,
    /// Promote narrower arguments and the return value to this width at the
    /// ABI boundary.
    pub promote: Option<u32>,
    /// Include `undef` among the generated constants.
    pub generate_undef: bool,
    /// Include the freeze instruction.
    pub generate_freeze: bool,
    /// Prefix of generated function names.
    pub base_name: String,
    /// Pass function arguments through module globals instead of parameters.
    pub args_from_memory: bool,
    /// Return through a module global instead of the return value.
    pub return_to_memory: bool,
    /// Enable control-flow generation (branches and phis). Unstable.
    pub branches: bool,
    /// Enable bit/overflow/saturating intrinsics.
    pub use_intrinsics: bool,
    /// Bucket count for appended emission.
    pub num_files: u64,
    /// One output file per leaf instead of bucketed append.
    pub one_func_per_file: bool,
    /// Pin comparisons to `eq`.
    pub one_icmp: bool,
    /// Pin binary operators to `add`.
    pub one_binop: bool,
    /// Never decorate binops with `nsw`/`nuw`/`exact`.
    pub no_ub: bool,
    /// Return `i1` instead of the base width.
    pub gen_i1: bool,
    /// Use the small constant palette instead of all `2^W` literals.
    pub few_consts: bool,
    /// Run the verifier before emission.
    pub verify: bool,
    /// Single random program instead of exhaustive enumeration.
    pub fuzz: bool,
    /// PRNG seed for fuzz mode.
    pub seed: Option<u64>,
    /// Forced replay sequence for fuzz mode.
    pub forced_choices: Option<Vec<u64>>,
    /// Directory receiving emitted `.ll` files.
    pub output_dir: PathBuf,
    /// Optional path for the JSON run-statistics record.
    pub stats_out: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cores: 1,
            width: 2,
            num_insns: 1,
            promote: None,
            generate_undef: false,
            generate_freeze: false,
            base_name: "func".to_string(),
            args_from_memory: false,
            return_to_memory: false,
            branches: false,
            use_intrinsics: false,
            num_files: 1,
            one_func_per_file: false,
            one_icmp: false,
            one_binop: false,
            no_ub: false,
            gen_i1: false,
            few_consts: false,
            verify: true,
            fuzz: false,
            seed: None,
            forced_choices: None,
            output_dir: PathBuf::from("."),
            stats_out: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.width < 2 {
            return Err(EngineError::WidthTooSmall);
        }
        if self.width > 64 {
            return Err(EngineError::WidthTooLarge);
        }
        if self.cores == 0 {
            return Err(EngineError::CoresZero);
        }
        if self.num_files == 0 {
            return Err(EngineError::NumFilesZero);
        }
        if !self.fuzz && self.seed.is_some() {
            return Err(EngineError::SeedWithoutFuzz);
        }
        if !self.fuzz && self.forced_choices.is_some() {
            return Err(EngineError::ChoicesWithoutFuzz);
        }
        if let Some(p) = self.promote {
            if p < self.width {
                return Err(EngineError::PromoteTooNarrow);
            }
            if p > 128 {
                return Err(EngineError::PromoteTooWide);
            }
        }
        Ok(())
    }

    /// Width of the value the function body computes.
    pub fn ret_width(&self) -> u32 {
        if self.gen_i1 {
            1
        } else {
            self.width
        }
    }

    pub fn double_width(&self) -> u32 {
        self.width * 2
    }

    pub fn half_width(&self) -> u32 {
        (self.width / 2).max(1)
    }

    /// ABI width of a naturally `w`-bit argument or return value.
    pub fn abi_width(&self, w: u32) -> u32 {
        match self.promote {
            Some(p) if w < p => p,
            _ => w,
        }
    }

    /// The pre-declared argument width schedule: `{W, W, 1, W/2, 2W}` per
    /// budget step plus two spare rounds, since a signature cannot grow after
    /// the function is created.
    pub fn arg_schedule(&self) -> Vec<u32> {
        let rounds = (self.num_insns + 2) as usize;
        let mut widths = Vec::with_capacity(rounds * 5);
        for _ in 0..rounds {
            widths.push(self.width);
            widths.push(self.width);
            widths.push(1);
            widths.push(self.half_width());
            widths.push(self.double_width());
        }
        widths
    }
}
