use crate::codegen::machine::{
    instr::Instr,
    TargetMachine,
};

/// Renders machine functions as assembly text for one target.
pub trait Assembler {
    type TM: TargetMachine;

    fn new() -> Self;

    /// Section directives and, if requested, the process entry point that calls `_main`.
    fn begin_module(&mut self, entry_stub: bool);

    fn begin_function(&mut self, name: &str);

    fn assemble(&mut self, instr: &Instr<<Self::TM as TargetMachine>::Reg>);

    fn finish(self) -> String;
}
