//! CFG fix-up: retarget speculative branches, normalize phi prefixes, wire
//! phi incoming edges, and drop skeletons with orphaned blocks.
//!
//! Branch targets are chosen through the same oracle as everything else, so
//! this pass multiplies the enumeration tree further.

use indexmap::IndexMap;

use irforge_ir::{BlockId, InstKind, Value};

use crate::error::{Abort, Gen};
use crate::worker::Worker;

impl Worker {
    pub(crate) fn fixup(&mut self) -> Gen<()> {
        self.retarget_branches()?;
        self.normalize_phis();
        self.wire_phis()?;
        self.reject_orphan_blocks()
    }

    /// Point every speculative branch at a real location, splitting blocks
    /// as needed so each target is a block head. Conditional branches get a
    /// second, independently chosen target.
    fn retarget_branches(&mut self) -> Gen<()> {
        let branches = std::mem::take(&mut self.branches);
        for br in branches {
            let first = self.choose_target()?;
            let conditional = {
                let f = self.builder.func();
                matches!(&f.inst(br).kind, InstKind::Br { cond: Some(_), .. })
            };
            let second = if conditional {
                Some(self.choose_target()?)
            } else {
                None
            };
            match &mut self.builder.func_mut().inst_mut(br).kind {
                InstKind::Br {
                    then_dest,
                    else_dest,
                    ..
                } => {
                    *then_dest = first;
                    if let Some(s) = second {
                        *else_dest = Some(s);
                    }
                }
                _ => unreachable!("branch list holds only branches"),
            }
        }
        Ok(())
    }

    /// One branch target: a non-terminator position anywhere in the function
    /// except the very first, split out into its own block head if it is not
    /// one already. Positions are re-collected per call since earlier splits
    /// shift them.
    fn choose_target(&mut self) -> Gen<BlockId> {
        let positions = self.builder.func().non_terminator_positions();
        if positions.len() <= 1 {
            return Err(Abort::DeadEnd);
        }
        let rest = &positions[1..];
        let i = self.choose(rest.len() as u64)? as usize;
        let (b, idx) = rest[i];
        if idx == 0 {
            Ok(b)
        } else {
            Ok(self.builder.func_mut().split_block(b, idx))
        }
    }

    /// Split until every block has all of its phis in front of all of its
    /// non-phis.
    pub(crate) fn normalize_phis(&mut self) {
        loop {
            let mut split_at = None;
            let f = self.builder.func();
            'scan: for b in 0..f.num_blocks() {
                let mut seen_non_phi = false;
                for (i, id) in f.block(b).insts.iter().enumerate() {
                    if f.inst(*id).kind.is_phi() {
                        if seen_non_phi {
                            split_at = Some((b, i));
                            break 'scan;
                        }
                    } else {
                        seen_non_phi = true;
                    }
                }
            }
            match split_at {
                Some((b, i)) => {
                    self.builder.func_mut().split_block(b, i);
                }
                None => break,
            }
        }
    }

    /// Give every phi exactly one incoming value per predecessor edge. The
    /// synthesizer runs with a zero budget, so incoming values are drawn
    /// only from constants, arguments, and the existing pool. Duplicate
    /// edges from one predecessor share a value.
    fn wire_phis(&mut self) -> Gen<()> {
        let mut phis: Vec<(usize, BlockId, u32)> = Vec::new();
        {
            let f = self.builder.func();
            for b in 0..f.num_blocks() {
                for id in f.block(b).insts.iter().copied() {
                    if f.inst(id).kind.is_phi() {
                        let w = f.inst(id).ty.int_width().expect("phis are integer-typed");
                        phis.push((id, b, w));
                    }
                }
            }
        }
        let saved = self.budget;
        self.budget = 0;
        for (id, b, width) in phis {
            let edges = self.builder.func().predecessors(b);
            let distinct = self.builder.func().predecessors_dedup(b);
            let mut per_pred: IndexMap<BlockId, Value> = IndexMap::new();
            for p in distinct {
                let v = self.gen_val(width, true, true)?;
                per_pred.insert(p, v);
            }
            let incoming: Vec<(Value, BlockId)> = edges
                .iter()
                .map(|p| (per_pred[p], *p))
                .collect();
            match &mut self.builder.func_mut().inst_mut(id).kind {
                InstKind::Phi { incoming: slot } => *slot = incoming,
                _ => unreachable!("collected only phis"),
            }
        }
        self.budget = saved;
        Ok(())
    }

    /// A non-entry block with no predecessors means the skeleton cannot be
    /// made into a legal graph; the leaf is discarded.
    fn reject_orphan_blocks(&self) -> Gen<()> {
        let f = self.builder.func();
        for b in 1..f.num_blocks() {
            if f.predecessors(b).is_empty() {
                return Err(Abort::DeadEnd);
            }
        }
        Ok(())
    }
}
