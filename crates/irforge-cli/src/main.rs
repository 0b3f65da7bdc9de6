//! `irforge` binary: parse flags, build the engine configuration, dispatch
//! to exhaustive or fuzz mode, and report results.
//!
//! Stdout carries only fuzz-mode modules; everything else (logs, errors)
//! goes to stderr. Every fatal path exits with -1.

use std::fs;
use std::thread;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use irforge_engine::{run_exhaustive, run_fuzz, Config, EngineError};

mod cli;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_logging();

    let cfg = match build_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => fail(err),
    };
    if let Err(err) = cfg.validate() {
        fail(err);
    }

    if cfg.fuzz {
        match run_fuzz(cfg) {
            Ok(leaf) => {
                if let Some(text) = leaf.text {
                    print!("{text}");
                }
            }
            Err(err) => fail(err),
        }
    } else {
        let stats_out = cfg.stats_out.clone();
        match run_exhaustive(cfg) {
            Ok(stats) => {
                if let Some(path) = stats_out {
                    let json = serde_json::to_string_pretty(&stats)
                        .expect("stats are always serializable");
                    if let Err(e) = fs::write(&path, json) {
                        fail(EngineError::Io(e));
                    }
                }
            }
            Err(err) => fail(err),
        }
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("irforge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<Config, EngineError> {
    let forced_choices = match &cli.choices {
        None => None,
        Some(raw) => {
            let tokens: Result<Vec<u64>, _> =
                raw.split_whitespace().map(str::parse::<u64>).collect();
            Some(tokens.map_err(|_| EngineError::MalformedChoices)?)
        }
    };
    let cores = cli.cores.unwrap_or_else(|| {
        thread::available_parallelism().map(usize::from).unwrap_or(1)
    });
    Ok(Config {
        cores,
        width: cli.width,
        num_insns: cli.num_insns,
        promote: cli.promote,
        generate_undef: cli.generate_undef,
        generate_freeze: cli.generate_freeze,
        base_name: cli.base.clone(),
        args_from_memory: cli.args_from_memory,
        return_to_memory: cli.return_to_memory,
        branches: cli.branches,
        use_intrinsics: cli.use_intrinsics,
        num_files: cli.num_files,
        one_func_per_file: cli.one_func_per_file,
        one_icmp: cli.oneicmp,
        one_binop: cli.onebinop,
        no_ub: cli.noub,
        gen_i1: cli.geni1,
        few_consts: cli.fewconsts,
        verify: cli.verify,
        fuzz: cli.fuzz,
        seed: cli.seed,
        forced_choices,
        output_dir: cli.output_dir.clone(),
        stats_out: cli.stats_out.clone(),
    })
}

fn fail(err: EngineError) -> ! {
    let report = Err::<(), EngineError>(err).into_diagnostic().unwrap_err();
    eprintln!("{report:?}");
    std::process::exit(-1);
}
