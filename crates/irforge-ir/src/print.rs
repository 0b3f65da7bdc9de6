//! LLVM-compatible textual printer.
//!
//! Output parses with `llvm-as`: globals first, then function definitions,
//! then one `declare` per intrinsic overload used anywhere in the module.
//! Arguments print as `%a0..`, instruction results as `%t0..` in function
//! order, blocks as `b0..` with block 0 the entry.

use std::fmt::Write;

use indexmap::IndexSet;

use crate::function::{Function, InstId};
use crate::inst::{InstKind, InstTy, IntTy, Intrinsic, Value};
use crate::module::Module;

pub fn print_module(m: &Module) -> String {
    let mut out = String::new();
    let mut declares: IndexSet<(Intrinsic, u32)> = IndexSet::new();

    for g in &m.globals {
        let _ = writeln!(out, "@{} = external global {}", g.name, g.ty);
    }
    if !m.globals.is_empty() {
        out.push('\n');
    }

    for f in &m.functions {
        print_function(&mut out, m, f, &mut declares);
        out.push('\n');
    }

    for (intr, w) in &declares {
        let _ = writeln!(out, "{}", render_declare(*intr, *w));
    }
    out
}

fn print_function(
    out: &mut String,
    m: &Module,
    f: &Function,
    declares: &mut IndexSet<(Intrinsic, u32)>,
) {
    let names = assign_names(f);

    let ret = match f.ret_ty() {
        InstTy::Int(ty) => ty.to_string(),
        InstTy::Void => "void".to_string(),
        InstTy::Pair(ty) => format!("{{ {ty}, i1 }}"),
    };
    let params: Vec<String> = f
        .args()
        .iter()
        .enumerate()
        .map(|(i, ty)| format!("{ty} %a{i}"))
        .collect();
    let _ = writeln!(out, "define {ret} @{}({}) {{", f.name(), params.join(", "));

    for b in 0..f.num_blocks() {
        let _ = writeln!(out, "b{b}:");
        for id in f.block(b).insts.iter().copied() {
            let _ = writeln!(out, "  {}", render_inst(m, f, id, &names, declares));
        }
    }
    out.push_str("}\n");
}

/// `%tN` names for value-producing instructions, in function order.
fn assign_names(f: &Function) -> Vec<Option<String>> {
    let mut names = vec![None; max_inst_id(f)];
    let mut n = 0usize;
    for b in 0..f.num_blocks() {
        for id in f.block(b).insts.iter().copied() {
            if !matches!(f.inst(id).ty, InstTy::Void) {
                names[id] = Some(format!("%t{n}"));
                n += 1;
            }
        }
    }
    names
}

fn max_inst_id(f: &Function) -> usize {
    let mut max = 0;
    for b in 0..f.num_blocks() {
        for id in &f.block(b).insts {
            max = max.max(*id + 1);
        }
    }
    max
}

fn value_ref(names: &[Option<String>], v: Value) -> String {
    match v {
        Value::Arg(i) => format!("%a{i}"),
        Value::Inst(id) => names[id].clone().unwrap_or_else(|| format!("%t?{id}")),
        Value::Const(c) => c.bits.to_string(),
        Value::Undef(_) => "undef".to_string(),
    }
}

/// `iN %x`, a type-prefixed operand reference.
fn typed_ref(f: &Function, names: &[Option<String>], v: Value) -> String {
    let w = f.width_of(v).unwrap_or(0);
    format!("i{w} {}", value_ref(names, v))
}

fn render_inst(
    m: &Module,
    f: &Function,
    id: InstId,
    names: &[Option<String>],
    declares: &mut IndexSet<(Intrinsic, u32)>,
) -> String {
    let data = f.inst(id);
    let lhs_name = names[id].clone();
    let assign = |body: String| match &lhs_name {
        Some(n) => format!("{n} = {body}"),
        None => body,
    };
    match &data.kind {
        InstKind::Bin {
            op,
            lhs,
            rhs,
            nsw,
            nuw,
            exact,
        } => {
            let mut mnem = op.mnemonic().to_string();
            if *nuw {
                mnem.push_str(" nuw");
            }
            if *nsw {
                mnem.push_str(" nsw");
            }
            if *exact {
                mnem.push_str(" exact");
            }
            let ty = ty_str(data.ty);
            assign(format!(
                "{mnem} {ty} {}, {}",
                value_ref(names, *lhs),
                value_ref(names, *rhs)
            ))
        }
        InstKind::ICmp { pred, lhs, rhs } => {
            let w = f.width_of(*lhs).unwrap_or(0);
            assign(format!(
                "icmp {} i{w} {}, {}",
                pred.mnemonic(),
                value_ref(names, *lhs),
                value_ref(names, *rhs)
            ))
        }
        InstKind::Cast { kind, src } => assign(format!(
            "{} {} to {}",
            kind.mnemonic(),
            typed_ref(f, names, *src),
            ty_str(data.ty)
        )),
        InstKind::Select {
            cond,
            on_true,
            on_false,
        } => assign(format!(
            "select {}, {}, {}",
            typed_ref(f, names, *cond),
            typed_ref(f, names, *on_true),
            typed_ref(f, names, *on_false)
        )),
        InstKind::Phi { incoming } => {
            let edges: Vec<String> = incoming
                .iter()
                .map(|(v, b)| format!("[ {}, %b{b} ]", value_ref(names, *v)))
                .collect();
            assign(format!("phi {} {}", ty_str(data.ty), edges.join(", ")))
        }
        InstKind::Freeze { src } => assign(format!("freeze {}", typed_ref(f, names, *src))),
        InstKind::Call { intrinsic, args } => {
            let w = call_width(data.ty);
            declares.insert((*intrinsic, w));
            let rendered: Vec<String> = args.iter().map(|a| typed_ref(f, names, *a)).collect();
            assign(format!(
                "call {} @{}.i{w}({})",
                ty_str(data.ty),
                intrinsic.symbol_stem(),
                rendered.join(", ")
            ))
        }
        InstKind::ExtractValue { agg, index } => {
            let pair_ty = match *agg {
                Value::Inst(a) => f.inst(a).ty,
                _ => InstTy::Void,
            };
            assign(format!(
                "extractvalue {} {}, {index}",
                ty_str(pair_ty),
                value_ref(names, *agg)
            ))
        }
        InstKind::Load { global } => assign(format!(
            "load {}, ptr @{}",
            ty_str(data.ty),
            m.globals[*global].name
        )),
        InstKind::Store { global, value } => format!(
            "store {}, ptr @{}",
            typed_ref(f, names, *value),
            m.globals[*global].name
        ),
        InstKind::Ret { value } => match value {
            Some(v) => format!("ret {}", typed_ref(f, names, *v)),
            None => "ret void".to_string(),
        },
        InstKind::Br {
            cond,
            then_dest,
            else_dest,
        } => match cond {
            Some(c) => format!(
                "br {}, label %b{then_dest}, label %b{}",
                typed_ref(f, names, *c),
                else_dest.expect("conditional branch has two targets")
            ),
            None => format!("br label %b{then_dest}"),
        },
    }
}

fn ty_str(ty: InstTy) -> String {
    match ty {
        InstTy::Int(t) => t.to_string(),
        InstTy::Pair(t) => format!("{{ {t}, i1 }}"),
        InstTy::Void => "void".to_string(),
    }
}

fn call_width(ty: InstTy) -> u32 {
    match ty {
        InstTy::Int(t) | InstTy::Pair(t) => t.bits(),
        InstTy::Void => 0,
    }
}

fn render_declare(intr: Intrinsic, w: u32) -> String {
    let ity = IntTy::new(w);
    let ret = if intr.returns_pair() {
        format!("{{ {ity}, i1 }}")
    } else {
        ity.to_string()
    };
    let mut params: Vec<String> = std::iter::repeat(ity.to_string())
        .take(intr.int_arity())
        .collect();
    if intr.has_bool_immediate() {
        params.push("i1".to_string());
    }
    format!("declare {ret} @{}.i{w}({})", intr.symbol_stem(), params.join(", "))
}
