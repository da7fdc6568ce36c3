use strum_macros::{
    IntoStaticStr,
    VariantArray,
};

use crate::codegen::machine::{
    isa::PhysicalRegister as MachPhysicalRegister,
    TargetMachine,
};

mod asm;

pub use asm::Assembler;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Target;

impl TargetMachine for Target {
    type Reg = PhysicalRegister;
    type Assembler = Assembler;
}

/// General purpose registers handed out by the allocator. `rsp` and `rbp` are never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, VariantArray)]
#[strum(serialize_all = "lowercase")]
pub enum PhysicalRegister {
    RAX,
    RBX,
    RCX,
    RDX,
    RSI,
    RDI,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl MachPhysicalRegister for PhysicalRegister {
    fn name(&self) -> &'static str {
        self.into()
    }

    fn all() -> &'static [Self] {
        <Self as strum::VariantArray>::VARIANTS
    }
}
