//! CLI argument definitions: the flat `Cli` struct mirroring the engine's
//! `Config` field by field.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "irforge")]
#[command(about = "Bounded exhaustive generator of small integer SSA functions for stress-testing \
                   optimizers and code generators")]
#[command(version)]
pub(crate) struct Cli {
    /// Cap of concurrently running workers (defaults to the machine's
    /// available parallelism)
    #[arg(long)]
    pub(crate) cores: Option<usize>,

    /// Base integer width in bits (must be >= 2)
    #[arg(long, default_value_t = 2)]
    pub(crate) width: u32,

    /// Instruction budget per function
    #[arg(long, default_value_t = 1)]
    pub(crate) num_insns: u64,

    /// Promote narrower arguments and the return value to this width at the
    /// ABI boundary
    #[arg(long)]
    pub(crate) promote: Option<u32>,

    /// Include undef among the generated constants
    #[arg(long)]
    pub(crate) generate_undef: bool,

    /// Include the freeze instruction
    #[arg(long)]
    pub(crate) generate_freeze: bool,

    /// Prefix of generated function names
    #[arg(long, default_value = "func")]
    pub(crate) base: String,

    /// Pass function arguments through module globals instead of parameters
    #[arg(long)]
    pub(crate) args_from_memory: bool,

    /// Return through a module global instead of the return value
    #[arg(long)]
    pub(crate) return_to_memory: bool,

    /// Enable control-flow generation: branches and phis (unstable)
    #[arg(long)]
    pub(crate) branches: bool,

    /// Enable bit/overflow/saturating intrinsics
    #[arg(long)]
    pub(crate) use_intrinsics: bool,

    /// Bucket count for appended emission
    #[arg(long, default_value_t = 1)]
    pub(crate) num_files: u64,

    /// One output file per leaf instead of bucketed append
    #[arg(long)]
    pub(crate) one_func_per_file: bool,

    /// Pin comparisons to eq
    #[arg(long)]
    pub(crate) oneicmp: bool,

    /// Pin binary operators to add
    #[arg(long)]
    pub(crate) onebinop: bool,

    /// Never decorate binops with nsw/nuw/exact
    #[arg(long)]
    pub(crate) noub: bool,

    /// Return i1 instead of the base width
    #[arg(long)]
    pub(crate) geni1: bool,

    /// Use a handful of constants instead of all 2^W literals
    #[arg(long)]
    pub(crate) fewconsts: bool,

    /// Run the verifier before emission
    #[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true",
          action = clap::ArgAction::Set)]
    pub(crate) verify: bool,

    /// Generate a single random program on stdout instead of enumerating
    #[arg(long)]
    pub(crate) fuzz: bool,

    /// PRNG seed for fuzz mode (forbidden in exhaustive mode)
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Forced replay sequence for fuzz mode, e.g. "0 1 0 2 3"
    #[arg(long)]
    pub(crate) choices: Option<String>,

    /// Directory receiving emitted .ll files
    #[arg(long, default_value = ".")]
    pub(crate) output_dir: PathBuf,

    /// Write a JSON run-statistics record to this path after an exhaustive
    /// run
    #[arg(long)]
    pub(crate) stats_out: Option<PathBuf>,
}
