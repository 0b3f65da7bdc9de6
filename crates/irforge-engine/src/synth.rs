//! The recursive value synthesizer and the argument/constant policy.
//!
//! `gen_val` walks a fixed ladder of alternatives, each gated by a feature
//! or width guard and a `choose(2)` coin. Only instruction-producing arms
//! consume the budget; constants, argument references, and value reuse are
//! free. Two symmetry-breaking rules keep the enumeration tractable and must
//! not be weakened: the right operand of a two-operand arm may be a constant
//! only if the left operand is not, and of the unused argument slots of a
//! width only the first is ever offered.

use irforge_ir::{
    BinOpKind, CastKind, ConstValue, InstData, InstKind, InstTy, IntPredicate, IntTy, Intrinsic,
    Value,
};
use rand::Rng;

use crate::error::{Abort, EngineError, Gen};
use crate::worker::Worker;

const WITH_OVERFLOW: [Intrinsic; 6] = [
    Intrinsic::UAddWithOverflow,
    Intrinsic::SAddWithOverflow,
    Intrinsic::USubWithOverflow,
    Intrinsic::SSubWithOverflow,
    Intrinsic::UMulWithOverflow,
    Intrinsic::SMulWithOverflow,
];

const SAT_AND_MINMAX: [Intrinsic; 8] = [
    Intrinsic::UAddSat,
    Intrinsic::SAddSat,
    Intrinsic::USubSat,
    Intrinsic::SSubSat,
    Intrinsic::UMin,
    Intrinsic::UMax,
    Intrinsic::SMin,
    Intrinsic::SMax,
];

impl Worker {
    /// Produce a value of bit width `width`, consuming at most the remaining
    /// instruction budget.
    pub(crate) fn gen_val(&mut self, width: u32, const_ok: bool, arg_ok: bool) -> Gen<Value> {
        let base = self.cfg.width;

        // 1. Empty phi; its incoming edges are wired during CFG fix-up.
        if self.cfg.branches && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let (v, _) = self.builder.create_phi(IntTy::new(width));
            self.vals.push(v);
            return Ok(v);
        }

        // 2. Speculative branch to the sentinel block, then keep generating
        // in a fresh block. Not taken at the root, where the entry block has
        // nothing yet for the fix-up pass to retarget onto.
        if self.cfg.branches
            && self.budget > 0
            && self.budget != self.initial_budget
            && self.flip()?
        {
            self.budget -= 1;
            let sentinel = 0;
            let br = if self.flip()? {
                let cond = self.gen_val(1, false, true)?;
                self.builder.create_cond_br(cond, sentinel, sentinel)
            } else {
                self.builder.create_br(sentinel)
            };
            self.branches.push(br);
            let next = self.builder.add_block();
            self.builder.position_at_end(next);
            return self.gen_val(width, const_ok, arg_ok);
        }

        // 3. Single-operand bit intrinsics, base width only. bswap is legal
        // only on whole-16-bit widths, so the menu size depends on W.
        if self.cfg.use_intrinsics
            && width == base
            && base.is_power_of_two()
            && self.budget > 0
            && self.flip()?
        {
            self.budget -= 1;
            let mut menu: Vec<Intrinsic> = vec![Intrinsic::Ctpop, Intrinsic::Bitreverse];
            if base % 16 == 0 {
                menu.push(Intrinsic::Bswap);
            }
            menu.extend([Intrinsic::Ctlz, Intrinsic::Cttz, Intrinsic::Abs]);
            let intr = menu[self.choose(menu.len() as u64)? as usize];
            let src = self.gen_val(base, false, true)?;
            let mut args = vec![src];
            if intr.has_bool_immediate() {
                let flag = self.flip()?;
                args.push(Value::Const(ConstValue::new(IntTy::I1, u128::from(flag))));
            }
            let v = self
                .builder
                .create_call(intr, args, InstTy::Int(IntTy::new(base)));
            self.vals.push(v);
            return Ok(v);
        }

        // 4. Select.
        if width == base && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let on_true = self.gen_val(base, true, true)?;
            let on_false = self.gen_val(base, !on_true.is_const(), true)?;
            let cond = self.gen_val(1, false, true)?;
            let v = self.builder.create_select(cond, on_true, on_false);
            self.vals.push(v);
            return Ok(v);
        }

        // 5. Comparison of two base-width operands.
        if width == 1 && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let lhs = self.gen_val(base, true, true)?;
            let rhs = self.gen_val(base, !lhs.is_const(), true)?;
            let pred = if self.cfg.one_icmp {
                IntPredicate::Eq
            } else {
                IntPredicate::ALL[self.choose(IntPredicate::ALL.len() as u64)? as usize]
            };
            let v = self.builder.create_icmp(pred, lhs, rhs);
            self.vals.push(v);
            return Ok(v);
        }

        // 6. Truncation: 2W -> W, or W -> 1.
        if (width == base || width == 1) && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let src_w = if width == base {
                self.cfg.double_width()
            } else {
                base
            };
            let src = self.gen_val(src_w, false, true)?;
            let v = self.builder.create_cast(CastKind::Trunc, src, IntTy::new(width));
            self.vals.push(v);
            return Ok(v);
        }

        // 7. Extension from the half width or from i1 up to W.
        if width == base && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let kind = if self.choose(2)? == 1 {
                CastKind::SExt
            } else {
                CastKind::ZExt
            };
            let half = self.cfg.half_width();
            let src_w = if half > 1 && self.choose(2)? == 1 {
                half
            } else {
                1
            };
            let src = self.gen_val(src_w, false, true)?;
            let v = self.builder.create_cast(kind, src, IntTy::new(base));
            self.vals.push(v);
            return Ok(v);
        }

        // 8. Binary operator, with independent poison-flag coins unless
        // --noub suppresses them.
        if width == base && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let lhs = self.gen_val(base, true, true)?;
            let rhs = self.gen_val(base, !lhs.is_const(), true)?;
            let op = if self.cfg.one_binop {
                BinOpKind::Add
            } else {
                BinOpKind::ALL[self.choose(BinOpKind::ALL.len() as u64)? as usize]
            };
            let (mut nsw, mut nuw, mut exact) = (false, false, false);
            if !self.cfg.no_ub {
                if op.supports_wrap_flags() {
                    nsw = self.flip()?;
                    nuw = self.flip()?;
                }
                if op.supports_exact() {
                    exact = self.flip()?;
                }
            }
            let v = self.builder.create_bin(op, lhs, rhs, nsw, nuw, exact);
            self.vals.push(v);
            return Ok(v);
        }

        // 9. Funnel shift.
        if self.cfg.use_intrinsics && width == base && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let intr = if self.choose(2)? == 1 {
                Intrinsic::Fshr
            } else {
                Intrinsic::Fshl
            };
            let a = self.gen_val(base, true, true)?;
            let b = self.gen_val(base, !a.is_const(), true)?;
            let amount = self.gen_val(base, true, true)?;
            let v = self
                .builder
                .create_call(intr, vec![a, b, amount], InstTy::Int(IntTy::new(base)));
            self.vals.push(v);
            return Ok(v);
        }

        // 10. With-overflow pair: both components land in the value pool and
        // the requested width picks which one is returned.
        if self.cfg.use_intrinsics
            && (width == base || width == 1)
            && self.budget > 0
            && self.flip()?
        {
            self.budget -= 1;
            let intr = WITH_OVERFLOW[self.choose(WITH_OVERFLOW.len() as u64)? as usize];
            let lhs = self.gen_val(base, true, true)?;
            let rhs = self.gen_val(base, !lhs.is_const(), true)?;
            let base_ty = IntTy::new(base);
            let pair = self
                .builder
                .create_call(intr, vec![lhs, rhs], InstTy::Pair(base_ty));
            let num = self.builder.create_extract(pair, 0, base_ty);
            let bit = self.builder.create_extract(pair, 1, IntTy::I1);
            self.vals.push(num);
            self.vals.push(bit);
            return Ok(if width == base { num } else { bit });
        }

        // 11. Saturating arithmetic and min/max.
        if self.cfg.use_intrinsics && width == base && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let intr = SAT_AND_MINMAX[self.choose(SAT_AND_MINMAX.len() as u64)? as usize];
            let lhs = self.gen_val(base, true, true)?;
            let rhs = self.gen_val(base, !lhs.is_const(), true)?;
            let v = self
                .builder
                .create_call(intr, vec![lhs, rhs], InstTy::Int(IntTy::new(base)));
            self.vals.push(v);
            return Ok(v);
        }

        // 12. Freeze. Constants are allowed through: freeze undef is the
        // interesting case.
        if self.cfg.generate_freeze && width == base && self.budget > 0 && self.flip()? {
            self.budget -= 1;
            let src = self.gen_val(base, true, true)?;
            let v = self.builder.create_freeze(src);
            self.vals.push(v);
            return Ok(v);
        }

        // 13. Constant.
        if const_ok && self.flip()? {
            return self.gen_const(width);
        }

        // 14. Function argument.
        if arg_ok && self.flip()? {
            return self.pick_arg(width);
        }

        // 15. Reuse an existing value; an empty pool means this subtree
        // cannot close.
        let cands: Vec<Value> = self
            .vals
            .iter()
            .copied()
            .filter(|v| self.current_function().width_of(*v) == Some(width))
            .collect();
        if cands.is_empty() {
            return Err(Abort::DeadEnd);
        }
        let i = self.choose(cands.len() as u64)? as usize;
        Ok(cands[i])
    }

    /// Either the full `2^W` literal enumeration or the small fixed palette,
    /// optionally extended with `undef`.
    fn gen_const(&mut self, width: u32) -> Gen<Value> {
        let ty = IntTy::new(width);
        let undef = u64::from(self.cfg.generate_undef);
        if !self.cfg.few_consts && width < 64 {
            let span = 1u64 << width;
            let c = self.choose(span + undef)?;
            if c == span {
                return Ok(Value::Undef(ty));
            }
            return Ok(Value::Const(ConstValue::new(ty, u128::from(c))));
        }
        let smin = 1u128 << (width - 1);
        let palette = [
            0,
            1,
            ty.mask(), // -1
            2,
            smin - 1, // SMAX
            smin + 1, // -SMAX
            smin,     // SMIN
        ];
        let n = palette.len() as u64 + 1 + undef;
        let c = self.choose(n)?;
        if c < palette.len() as u64 {
            return Ok(Value::Const(ConstValue::new(ty, palette[c as usize])));
        }
        if c == palette.len() as u64 {
            let bits: u128 = self.rng.gen::<u128>();
            return Ok(Value::Const(ConstValue::new(ty, bits)));
        }
        Ok(Value::Undef(ty))
    }

    /// Arguments of the requested width that are already in use, plus at
    /// most the first unused slot. Materialization happens on first use so
    /// untouched slots leave no trace in the body.
    fn pick_arg(&mut self, width: u32) -> Gen<Value> {
        let mut cands: Vec<usize> = self
            .used_args
            .iter()
            .copied()
            .filter(|i| self.arg_widths[*i] == width)
            .collect();
        if let Some(next) = (0..self.arg_widths.len())
            .find(|i| self.arg_widths[*i] == width && !self.used_args.contains(i))
        {
            cands.push(next);
        }
        if cands.is_empty() {
            return Err(self.shared.die(EngineError::NoArgSlot(width)));
        }
        let idx = cands[self.choose(cands.len() as u64)? as usize];
        if !self.used_args.contains(&idx) {
            self.materialize_arg(idx);
        }
        Ok(self.arg_vals[idx].expect("materialized on first use"))
    }

    /// First use of an argument slot: record it and, where the ABI form
    /// differs from the natural width, plant the load/trunc preamble at the
    /// top of the entry block so it dominates every later use.
    fn materialize_arg(&mut self, idx: usize) {
        self.used_args.insert(idx);
        let natural = IntTy::new(self.arg_widths[idx]);
        let value = if self.cfg.args_from_memory {
            let at = self.builder.func().leading_phi_count(0);
            let id = self.builder.func_mut().insert_inst(
                0,
                at,
                InstData {
                    kind: InstKind::Load { global: idx },
                    ty: InstTy::Int(natural),
                },
            );
            Value::Inst(id)
        } else {
            let abi = self.cfg.abi_width(natural.bits());
            if abi != natural.bits() {
                let at = self.builder.func().leading_phi_count(0);
                let id = self.builder.func_mut().insert_inst(
                    0,
                    at,
                    InstData {
                        kind: InstKind::Cast {
                            kind: CastKind::Trunc,
                            src: Value::Arg(idx),
                        },
                        ty: InstTy::Int(natural),
                    },
                );
                Value::Inst(id)
            } else {
                Value::Arg(idx)
            }
        };
        self.arg_vals[idx] = Some(value);
    }
}
