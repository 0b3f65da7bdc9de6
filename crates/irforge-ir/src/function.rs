//! Function and basic-block containers.

use indexmap::IndexSet;

use crate::inst::{InstData, InstKind, InstTy, IntTy, Value};

/// Index of an instruction in a function's instruction arena.
pub type InstId = usize;
/// Index of a basic block in a function's block arena.
pub type BlockId = usize;
/// Index of a function argument.
pub type ArgId = usize;

/// A basic block: an ordered list of instruction ids. The last instruction
/// of a complete block is its terminator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub insts: Vec<InstId>,
}

/// A function under construction or completed. Block 0 is the entry block.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    name: String,
    args: Vec<IntTy>,
    ret_ty: InstTy,
    insts: Vec<InstData>,
    blocks: Vec<Block>,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<IntTy>, ret_ty: InstTy) -> Self {
        Function {
            name: name.into(),
            args,
            ret_ty,
            insts: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrite the function symbol (used by the emitter's `<base><id>` rule).
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn args(&self) -> &[IntTy] {
        &self.args
    }

    pub fn ret_ty(&self) -> InstTy {
        self.ret_ty
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, b: BlockId) -> &Block {
        &self.blocks[b]
    }

    pub fn inst(&self, id: InstId) -> &InstData {
        &self.insts[id]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut InstData {
        &mut self.insts[id]
    }

    pub fn add_block(&mut self) -> BlockId {
        self.blocks.push(Block::default());
        self.blocks.len() - 1
    }

    /// Append an instruction to the end of `b`.
    pub fn push_inst(&mut self, b: BlockId, data: InstData) -> InstId {
        let id = self.alloc_inst(data);
        self.blocks[b].insts.push(id);
        id
    }

    /// Insert an instruction at position `at` within `b`.
    pub fn insert_inst(&mut self, b: BlockId, at: usize, data: InstData) -> InstId {
        let id = self.alloc_inst(data);
        self.blocks[b].insts.insert(at, id);
        id
    }

    fn alloc_inst(&mut self, data: InstData) -> InstId {
        self.insts.push(data);
        self.insts.len() - 1
    }

    /// Result width of a value, if it has plain integer type.
    pub fn width_of(&self, v: Value) -> Option<u32> {
        match v {
            Value::Arg(i) => self.args.get(i).map(|ty| ty.bits()),
            Value::Inst(id) => self.insts.get(id).and_then(|d| d.ty.int_width()),
            Value::Const(c) => Some(c.ty.bits()),
            Value::Undef(ty) => Some(ty.bits()),
        }
    }

    /// The terminator of `b`, if its last instruction is one.
    pub fn terminator(&self, b: BlockId) -> Option<InstId> {
        let id = *self.blocks[b].insts.last()?;
        self.insts[id].kind.is_terminator().then_some(id)
    }

    /// Predecessors of `b` in block-id order, counted once per incoming edge
    /// (a conditional branch with both edges into `b` contributes twice).
    pub fn predecessors(&self, b: BlockId) -> Vec<BlockId> {
        let mut preds = Vec::new();
        for p in 0..self.blocks.len() {
            if let Some(t) = self.terminator(p) {
                for succ in self.insts[t].kind.successors() {
                    if succ == b {
                        preds.push(p);
                    }
                }
            }
        }
        preds
    }

    /// Distinct predecessors of `b`, in first-edge order.
    pub fn predecessors_dedup(&self, b: BlockId) -> Vec<BlockId> {
        let set: IndexSet<BlockId> = self.predecessors(b).into_iter().collect();
        set.into_iter().collect()
    }

    /// Number of leading phi instructions in `b`.
    pub fn leading_phi_count(&self, b: BlockId) -> usize {
        self.blocks[b]
            .insts
            .iter()
            .take_while(|id| self.insts[**id].kind.is_phi())
            .count()
    }

    /// Every non-terminator instruction position in function order.
    pub fn non_terminator_positions(&self) -> Vec<(BlockId, usize)> {
        let mut out = Vec::new();
        for (b, block) in self.blocks.iter().enumerate() {
            for (i, id) in block.insts.iter().enumerate() {
                if !self.insts[*id].kind.is_terminator() {
                    out.push((b, i));
                }
            }
        }
        out
    }

    /// Split `b` just before instruction index `at`: the suffix (including the
    /// terminator) moves to a fresh block, `b` is re-terminated with an
    /// unconditional branch to it, and phi incoming entries in the moved
    /// terminator's successors are repointed from `b` to the new block.
    pub fn split_block(&mut self, b: BlockId, at: usize) -> BlockId {
        let moved = self.blocks[b].insts.split_off(at);
        let nb = self.add_block();
        self.blocks[nb].insts = moved;
        let br = self.alloc_inst(InstData {
            kind: InstKind::Br {
                cond: None,
                then_dest: nb,
                else_dest: None,
            },
            ty: InstTy::Void,
        });
        self.blocks[b].insts.push(br);

        let succs = match self.terminator(nb) {
            Some(t) => self.insts[t].kind.successors(),
            None => Vec::new(),
        };
        for succ in succs {
            for i in 0..self.blocks[succ].insts.len() {
                let id = self.blocks[succ].insts[i];
                if let InstKind::Phi { incoming } = &mut self.insts[id].kind {
                    for (_, pred) in incoming.iter_mut() {
                        if *pred == b {
                            *pred = nb;
                        }
                    }
                }
            }
        }
        nb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::{BinOpKind, ConstValue};

    fn i8ty() -> IntTy {
        IntTy::new(8)
    }

    fn add(f: &mut Function, b: BlockId, lhs: Value, rhs: Value) -> Value {
        let id = f.push_inst(
            b,
            InstData {
                kind: InstKind::Bin {
                    op: BinOpKind::Add,
                    lhs,
                    rhs,
                    nsw: false,
                    nuw: false,
                    exact: false,
                },
                ty: InstTy::Int(i8ty()),
            },
        );
        Value::Inst(id)
    }

    #[test]
    fn split_moves_suffix_and_reterminates() {
        let mut f = Function::new("f", vec![i8ty(), i8ty()], InstTy::Int(i8ty()));
        let entry = f.add_block();
        let a = add(&mut f, entry, Value::Arg(0), Value::Arg(1));
        let b = add(&mut f, entry, a, Value::Arg(0));
        f.push_inst(
            entry,
            InstData {
                kind: InstKind::Ret { value: Some(b) },
                ty: InstTy::Void,
            },
        );

        let nb = f.split_block(entry, 1);
        assert_eq!(f.num_blocks(), 2);
        assert_eq!(f.block(entry).insts.len(), 2); // first add + new br
        assert_eq!(f.block(nb).insts.len(), 2); // second add + ret
        let t = f.terminator(entry).unwrap();
        assert_eq!(f.inst(t).kind.successors(), vec![nb]);
        assert_eq!(f.predecessors(nb), vec![entry]);
    }

    #[test]
    fn split_repoints_phi_edges() {
        let mut f = Function::new("f", vec![i8ty()], InstTy::Int(i8ty()));
        let entry = f.add_block();
        let tail = f.add_block();
        let a = add(&mut f, entry, Value::Arg(0), Value::Arg(0));
        f.push_inst(
            entry,
            InstData {
                kind: InstKind::Br {
                    cond: None,
                    then_dest: tail,
                    else_dest: None,
                },
                ty: InstTy::Void,
            },
        );
        let phi = f.push_inst(
            tail,
            InstData {
                kind: InstKind::Phi {
                    incoming: vec![(a, entry)],
                },
                ty: InstTy::Int(i8ty()),
            },
        );
        f.push_inst(
            tail,
            InstData {
                kind: InstKind::Ret {
                    value: Some(Value::Inst(phi)),
                },
                ty: InstTy::Void,
            },
        );

        let nb = f.split_block(entry, 1);
        match &f.inst(phi).kind {
            InstKind::Phi { incoming } => assert_eq!(incoming[0].1, nb),
            _ => unreachable!(),
        }
    }

    #[test]
    fn conditional_branch_counts_both_edges() {
        let mut f = Function::new("f", vec![], InstTy::Void);
        let entry = f.add_block();
        let tail = f.add_block();
        f.push_inst(
            entry,
            InstData {
                kind: InstKind::Br {
                    cond: Some(Value::Const(ConstValue::new(IntTy::I1, 1))),
                    then_dest: tail,
                    else_dest: Some(tail),
                },
                ty: InstTy::Void,
            },
        );
        assert_eq!(f.predecessors(tail), vec![entry, entry]);
        assert_eq!(f.predecessors_dedup(tail), vec![entry]);
    }
}
