use std::fmt::{
    Display,
    Formatter,
};

pub use builder::FunctionBuilder;

use crate::codegen::{
    machine::{
        asm::Assembler,
        instr::Instr,
        TargetMachine,
    },
    register_allocator::Allocation,
};

mod builder;

#[derive(Debug, Clone)]
pub struct Function<TM: TargetMachine> {
    pub name: String,
    pub instructions: Vec<Instr<TM::Reg>>,
    pub allocation: Allocation<TM::Reg>,
}

impl<TM: TargetMachine> Function<TM> {
    pub fn assemble(&self, asm: &mut TM::Assembler) {
        asm.begin_function(&self.name);
        for instr in &self.instructions {
            asm.assemble(instr);
        }
    }
}

impl<TM: TargetMachine> Display for Function<TM> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}:", self.name)?;
        for instr in &self.instructions {
            writeln!(f, "    {instr}")?;
        }
        Ok(())
    }
}
