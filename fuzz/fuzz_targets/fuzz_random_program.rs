#![no_main]
use libfuzzer_sys::fuzz_target;

use irforge_engine::{run_fuzz, Config};

fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }
    let seed = u64::from_le_bytes(data[..8].try_into().unwrap());
    let width = 2 + u32::from(data[8] % 15);
    let cfg = Config {
        fuzz: true,
        seed: Some(seed),
        width,
        num_insns: 3,
        use_intrinsics: true,
        branches: data.len() % 2 == 0,
        ..Config::default()
    };
    // Every surviving leaf has already passed the structural verifier.
    if let Ok(leaf) = run_fuzz(cfg) {
        if let Some(text) = leaf.text {
            assert!(text.contains("define "));
        }
    }
});
