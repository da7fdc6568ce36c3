use std::fmt::Debug;

pub use asm::Assembler;
pub use function::{
    Function,
    FunctionBuilder,
};
pub use instr::{
    ArithOp,
    Instr,
};
pub use isa::PhysicalRegister;
pub use module::Module;
pub use reg::{
    Color,
    RegisterSet,
};

pub mod asm;
pub mod function;
pub mod instr;
pub mod isa;
pub mod module;
pub mod reg;

pub trait TargetMachine: Debug + Default + Copy + Clone + PartialEq + Eq {
    type Reg: PhysicalRegister;

    type Assembler: Assembler<TM = Self>;

    /// The registers available to the allocator, in assignment order.
    fn register_set() -> RegisterSet<Self::Reg> {
        RegisterSet::all()
    }
}
