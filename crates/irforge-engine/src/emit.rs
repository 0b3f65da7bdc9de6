//! Leaf emission: verify, print, write.
//!
//! Bucketed emission appends the whole module with a single `write` call and
//! relies on the platform's atomic-append guarantee for small payloads; a
//! short write aborts the run. One-file-per-leaf emission uses exclusive
//! creation instead, so no two leaves can ever collide.

use std::fs::OpenOptions;
use std::io::Write;

use rand::Rng;

use irforge_ir::{print_module, verify_module, Module};

use crate::error::{Abort, EngineError, Gen};
use crate::worker::Worker;

impl Worker {
    pub(crate) fn output(&mut self) -> Gen<()> {
        let symbol = format!("{}{}", self.cfg.base_name, self.id);
        self.builder.func_mut().set_name(&symbol);

        let mut module = Module::new();
        module.globals = self.globals.clone();
        module.functions.push(self.builder.func().clone());

        if self.cfg.verify {
            if let Err(e) = verify_module(&module) {
                // Retargeted edges can break dominance; that is the known
                // instability of branch generation and costs one leaf. In
                // straight-line mode the same rejection is a generator bug.
                if self.cfg.branches {
                    return Err(Abort::DeadEnd);
                }
                return Err(self.shared.die(EngineError::Verify(e)));
            }
        }

        let text = print_module(&module);
        if self.cfg.fuzz {
            self.fuzz_text = Some(text);
            return Ok(());
        }

        if self.cfg.one_func_per_file {
            let path = self.cfg.output_dir.join(format!("{symbol}.ll"));
            let res = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .and_then(|mut f| f.write_all(text.as_bytes()));
            if let Err(e) = res {
                return Err(self.shared.die(EngineError::Io(e)));
            }
        } else {
            let bucket = self.rng.gen_range(0..self.cfg.num_files);
            let path = self.cfg.output_dir.join(format!("{bucket}.ll"));
            let written = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .and_then(|mut f| f.write(text.as_bytes()));
            match written {
                Ok(n) if n == text.len() => {}
                Ok(n) => {
                    return Err(self.shared.die(EngineError::ShortWrite {
                        path: path.display().to_string(),
                        written: n,
                        len: text.len(),
                    }))
                }
                Err(e) => return Err(self.shared.die(EngineError::Io(e))),
            }
        }
        Ok(())
    }
}
