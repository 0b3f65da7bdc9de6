//! Integer-only SSA intermediate representation.
//!
//! This crate defines the typed IR consumed by the enumeration engine: the
//! instruction set (arithmetic, bitwise, comparisons, casts, select, phi,
//! branches, bit-manipulation intrinsics), a cursor-positioned builder, block
//! splitting and predecessor queries, a structural verifier, and an
//! LLVM-compatible textual printer.
//!
//! Everything is plain owned data indexed by `usize` ids; functions are small
//! by construction, so arenas are simple `Vec`s and queries walk them.

pub mod builder;
pub mod function;
pub mod inst;
pub mod module;
pub mod print;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod verify;

pub use builder::Builder;
pub use function::{ArgId, BlockId, Function, InstId};
pub use inst::{
    BinOpKind, CastKind, ConstValue, InstData, InstKind, InstTy, IntPredicate, IntTy, Intrinsic,
    Value,
};
pub use module::{Global, GlobalId, Module};
pub use print::print_module;
pub use verify::{verify_function, verify_module, VerifyError};
