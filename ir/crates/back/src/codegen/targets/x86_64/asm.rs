use crate::codegen::{
    machine,
    machine::{
        instr::{
            ArithOp,
            Instr,
        },
        isa::PhysicalRegister as _,
    },
    targets::x86_64::{
        PhysicalRegister,
        Target,
    },
};

/// AT&T syntax text assembler.
#[derive(Debug, Default)]
pub struct Assembler {
    out: String,
}

impl Assembler {
    fn line(&mut self, line: std::fmt::Arguments<'_>) {
        self.out.push_str(&format!("  {line}\n"));
    }

    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn binary(&mut self, op: ArithOp, dest: PhysicalRegister, lhs: PhysicalRegister, rhs: PhysicalRegister) {
        if op == ArithOp::Div {
            self.divide(dest, lhs, rhs);
            return;
        }
        let mnemonic = match op {
            ArithOp::Add => "addq",
            ArithOp::Sub => "subq",
            ArithOp::Mul => "imulq",
            ArithOp::Div => unreachable!(),
        };
        if dest == lhs {
            self.line(format_args!("{mnemonic} {}, {}", reg(rhs), reg(dest)));
        } else if dest == rhs {
            if op.is_commutative() {
                self.line(format_args!("{mnemonic} {}, {}", reg(lhs), reg(dest)));
            } else {
                // dest = lhs - dest
                self.line(format_args!("negq {}", reg(dest)));
                self.line(format_args!("addq {}, {}", reg(lhs), reg(dest)));
            }
        } else {
            self.line(format_args!("movq {}, {}", reg(lhs), reg(dest)));
            self.line(format_args!("{mnemonic} {}, {}", reg(rhs), reg(dest)));
        }
    }

    /// `idivq` works on `rdx:rax`; both are saved around the division so the values the
    /// allocator placed there survive it.
    fn divide(&mut self, dest: PhysicalRegister, lhs: PhysicalRegister, rhs: PhysicalRegister) {
        let rax = PhysicalRegister::RAX;
        let rdx = PhysicalRegister::RDX;
        self.line(format_args!("pushq {}", reg(rdx)));
        self.line(format_args!("pushq {}", reg(rax)));
        self.line(format_args!("pushq {}", reg(rhs)));
        self.line(format_args!("movq {}, {}", reg(lhs), reg(rax)));
        self.line(format_args!("cqto"));
        self.line(format_args!("idivq (%rsp)"));
        self.line(format_args!("movq {}, (%rsp)", reg(rax)));
        self.line(format_args!("popq {}", reg(dest)));
        for saved in [rax, rdx] {
            if dest == saved {
                self.line(format_args!("addq $8, %rsp"));
            } else {
                self.line(format_args!("popq {}", reg(saved)));
            }
        }
    }
}

fn reg(reg: PhysicalRegister) -> String {
    format!("%{}", reg.name())
}

impl machine::asm::Assembler for Assembler {
    type TM = Target;

    fn new() -> Self {
        Self::default()
    }

    fn begin_module(&mut self, entry_stub: bool) {
        if entry_stub {
            self.raw(".global main");
        }
        self.raw(".text");
        if entry_stub {
            self.raw("");
            self.raw("main:");
            self.line(format_args!("call _main"));
            // exit(_main())
            self.line(format_args!("movq %rax, %rdi"));
            self.line(format_args!("movq $0x3C, %rax"));
            self.line(format_args!("syscall"));
        }
    }

    fn begin_function(&mut self, name: &str) {
        self.raw("");
        self.raw(&format!(".global _{name}"));
        self.raw(&format!("_{name}:"));
    }

    fn assemble(&mut self, instr: &Instr<PhysicalRegister>) {
        match *instr {
            Instr::MovImm { dest, imm } => {
                self.line(format_args!("movq ${imm}, {}", reg(dest)));
            }
            Instr::Binary { op, dest, lhs, rhs } => self.binary(op, dest, lhs, rhs),
            Instr::Ret { value } => {
                if value != PhysicalRegister::RAX {
                    self.line(format_args!("movq {}, %rax", reg(value)));
                }
                self.line(format_args!("ret"));
            }
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::machine::asm::Assembler as _;

    fn assemble(instr: Instr<PhysicalRegister>) -> String {
        let mut asm = Assembler::new();
        asm.assemble(&instr);
        asm.finish()
    }

    #[test]
    fn entry_stub_exits_with_main_result() {
        let mut asm = Assembler::new();
        asm.begin_module(true);
        asm.begin_function("main");
        let text = asm.finish();
        assert_eq!(
            text,
            ".global main\n.text\n\nmain:\n  call _main\n  movq %rax, %rdi\n  movq $0x3C, %rax\n  syscall\n\n.global _main\n_main:\n"
        );
    }

    #[test]
    fn move_immediate() {
        let text = assemble(Instr::MovImm {
            dest: PhysicalRegister::R9,
            imm: -3,
        });
        assert_eq!(text, "  movq $-3, %r9\n");
    }

    #[test]
    fn binary_result_lands_in_dest() {
        use PhysicalRegister::{
            RAX,
            RBX,
            RCX,
        };
        let cases = [
            (ArithOp::Add, RAX, RAX, RBX, "  addq %rbx, %rax\n"),
            (ArithOp::Add, RBX, RAX, RBX, "  addq %rax, %rbx\n"),
            (ArithOp::Sub, RBX, RAX, RBX, "  negq %rbx\n  addq %rax, %rbx\n"),
            (
                ArithOp::Mul,
                RCX,
                RAX,
                RBX,
                "  movq %rax, %rcx\n  imulq %rbx, %rcx\n",
            ),
        ];
        for (op, dest, lhs, rhs, expected) in cases {
            assert_eq!(
                assemble(Instr::Binary { op, dest, lhs, rhs }),
                expected,
                "{op:?} {dest:?} = {lhs:?}, {rhs:?}"
            );
        }
    }

    #[test]
    fn division_preserves_rax_and_rdx() {
        let text = assemble(Instr::Binary {
            op: ArithOp::Div,
            dest: PhysicalRegister::RAX,
            lhs: PhysicalRegister::RBX,
            rhs: PhysicalRegister::RDX,
        });
        assert_eq!(
            text,
            "  pushq %rdx\n  pushq %rax\n  pushq %rdx\n  movq %rbx, %rax\n  cqto\n  idivq (%rsp)\n  movq %rax, (%rsp)\n  popq %rax\n  addq $8, %rsp\n  popq %rdx\n"
        );
    }

    #[test]
    fn return_moves_value_into_rax() {
        assert_eq!(
            assemble(Instr::Ret {
                value: PhysicalRegister::RCX
            }),
            "  movq %rcx, %rax\n  ret\n"
        );
        assert_eq!(
            assemble(Instr::Ret {
                value: PhysicalRegister::RAX
            }),
            "  ret\n"
        );
    }
}
