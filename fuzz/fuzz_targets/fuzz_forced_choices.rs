#![no_main]
use libfuzzer_sys::fuzz_target;

use irforge_engine::{run_fuzz, Config};

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a forced choice sequence. The engine must never
    // panic: it either completes a leaf, discards it, or reports an
    // out-of-range token / token exhaustion as an error.
    let tokens: Vec<u64> = data.iter().map(|b| u64::from(*b)).collect();
    let cfg = Config {
        fuzz: true,
        width: 4,
        num_insns: 2,
        use_intrinsics: true,
        forced_choices: Some(tokens),
        ..Config::default()
    };
    let _ = run_fuzz(cfg);
});
