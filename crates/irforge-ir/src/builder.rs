//! Cursor-positioned instruction builder.
//!
//! The builder owns the function being built and appends instructions at the
//! end of the current block. No folding is performed: `add i8 1, 2` stays an
//! instruction, which is what an enumerator wants.

use crate::function::{BlockId, Function, InstId};
use crate::inst::{
    BinOpKind, CastKind, InstData, InstKind, InstTy, IntPredicate, IntTy, Intrinsic, Value,
};
use crate::module::GlobalId;

#[derive(Debug, Clone)]
pub struct Builder {
    func: Function,
    cursor: BlockId,
}

impl Builder {
    /// Wrap a function, creating its entry block if it has none, and position
    /// the cursor at the end of the entry block.
    pub fn new(mut func: Function) -> Self {
        if func.num_blocks() == 0 {
            func.add_block();
        }
        Builder { func, cursor: 0 }
    }

    pub fn func(&self) -> &Function {
        &self.func
    }

    pub fn func_mut(&mut self) -> &mut Function {
        &mut self.func
    }

    pub fn into_function(self) -> Function {
        self.func
    }

    pub fn current_block(&self) -> BlockId {
        self.cursor
    }

    pub fn position_at_end(&mut self, b: BlockId) {
        debug_assert!(b < self.func.num_blocks());
        self.cursor = b;
    }

    pub fn add_block(&mut self) -> BlockId {
        self.func.add_block()
    }

    fn push(&mut self, kind: InstKind, ty: InstTy) -> InstId {
        self.func.push_inst(self.cursor, InstData { kind, ty })
    }

    fn int_ty_of(&self, v: Value) -> IntTy {
        let bits = self
            .func
            .width_of(v)
            .expect("operand must have integer type");
        IntTy::new(bits)
    }

    pub fn create_bin(
        &mut self,
        op: BinOpKind,
        lhs: Value,
        rhs: Value,
        nsw: bool,
        nuw: bool,
        exact: bool,
    ) -> Value {
        let ty = self.int_ty_of(lhs);
        let id = self.push(
            InstKind::Bin {
                op,
                lhs,
                rhs,
                nsw,
                nuw,
                exact,
            },
            InstTy::Int(ty),
        );
        Value::Inst(id)
    }

    pub fn create_icmp(&mut self, pred: IntPredicate, lhs: Value, rhs: Value) -> Value {
        let id = self.push(InstKind::ICmp { pred, lhs, rhs }, InstTy::Int(IntTy::I1));
        Value::Inst(id)
    }

    pub fn create_cast(&mut self, kind: CastKind, src: Value, to: IntTy) -> Value {
        let id = self.push(InstKind::Cast { kind, src }, InstTy::Int(to));
        Value::Inst(id)
    }

    pub fn create_select(&mut self, cond: Value, on_true: Value, on_false: Value) -> Value {
        let ty = self.int_ty_of(on_true);
        let id = self.push(
            InstKind::Select {
                cond,
                on_true,
                on_false,
            },
            InstTy::Int(ty),
        );
        Value::Inst(id)
    }

    /// Create a phi with no incoming edges; they are attached during CFG
    /// fix-up once predecessors are known.
    pub fn create_phi(&mut self, ty: IntTy) -> (Value, InstId) {
        let id = self.push(InstKind::Phi { incoming: Vec::new() }, InstTy::Int(ty));
        (Value::Inst(id), id)
    }

    pub fn create_freeze(&mut self, src: Value) -> Value {
        let ty = self.int_ty_of(src);
        let id = self.push(InstKind::Freeze { src }, InstTy::Int(ty));
        Value::Inst(id)
    }

    pub fn create_call(&mut self, intrinsic: Intrinsic, args: Vec<Value>, ty: InstTy) -> Value {
        let id = self.push(InstKind::Call { intrinsic, args }, ty);
        Value::Inst(id)
    }

    pub fn create_extract(&mut self, agg: Value, index: u32, ty: IntTy) -> Value {
        let id = self.push(InstKind::ExtractValue { agg, index }, InstTy::Int(ty));
        Value::Inst(id)
    }

    pub fn create_load(&mut self, global: GlobalId, ty: IntTy) -> Value {
        let id = self.push(InstKind::Load { global }, InstTy::Int(ty));
        Value::Inst(id)
    }

    pub fn create_store(&mut self, global: GlobalId, value: Value) -> InstId {
        self.push(InstKind::Store { global, value }, InstTy::Void)
    }

    pub fn create_ret(&mut self, value: Option<Value>) -> InstId {
        self.push(InstKind::Ret { value }, InstTy::Void)
    }

    pub fn create_br(&mut self, dest: BlockId) -> InstId {
        self.push(
            InstKind::Br {
                cond: None,
                then_dest: dest,
                else_dest: None,
            },
            InstTy::Void,
        )
    }

    pub fn create_cond_br(&mut self, cond: Value, then_dest: BlockId, else_dest: BlockId) -> InstId {
        self.push(
            InstKind::Br {
                cond: Some(cond),
                then_dest,
                else_dest: Some(else_dest),
            },
            InstTy::Void,
        )
    }
}
