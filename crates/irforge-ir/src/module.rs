//! Module container: functions plus the globals used by the memory-ABI
//! argument and return modes.

use crate::function::Function;
use crate::inst::IntTy;

/// Index of a global in a module.
pub type GlobalId = usize;

/// An integer global, printed as `@<name> = external global iN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub ty: IntTy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    pub fn add_global(&mut self, name: impl Into<String>, ty: IntTy) -> GlobalId {
        self.globals.push(Global {
            name: name.into(),
            ty,
        });
        self.globals.len() - 1
    }
}
