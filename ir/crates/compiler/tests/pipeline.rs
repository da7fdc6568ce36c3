use std::{
    path::PathBuf,
    process::Command,
};

use nodal_back::CodegenConfig;
use nodal_compiler::{
    compile,
    Emit,
    Options,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture(name)).unwrap()
}

fn nodalc(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_nodalc"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn add_scenario_compiles_to_assembly() {
    let asm = compile(&read_fixture("add.nir"), &Options::default()).unwrap();
    assert_eq!(
        asm,
        ".global main
.text

main:
  call _main
  movq %rax, %rdi
  movq $0x3C, %rax
  syscall

.global _main
_main:
  movq $3, %rbx
  movq $4, %rax
  addq %rbx, %rax
  ret
"
    );
}

#[test]
fn every_function_is_emitted() {
    let asm = compile(&read_fixture("arith.nir"), &Options::default()).unwrap();
    assert!(asm.contains("\n_main:\n"));
    assert!(asm.contains("\n_square:\n"));
    assert_eq!(asm.matches("idivq (%rsp)").count(), 1);
    assert_eq!(asm.matches("  ret\n").count(), 2);
}

#[test]
fn tiny_register_budget_still_compiles() {
    let options = Options {
        emit: Emit::Alloc,
        codegen: CodegenConfig {
            max_registers: Some(1),
            entry_stub: true,
        },
    };
    let alloc = compile(&read_fixture("arith.nir"), &options).unwrap();
    for line in alloc.lines().filter(|line| !line.starts_with('@')) {
        assert!(line.contains(": rax"), "{line}");
    }
    assert!(alloc.contains("(spilled)"));
}

#[test]
fn binary_writes_assembly_to_stdout() {
    let output = nodalc(&[fixture("add.nir").to_str().unwrap(), "--no-entry-stub"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with(".text\n"));
    assert!(stdout.contains("_main:\n"));
    assert!(!stdout.contains("syscall"));
}

#[test]
fn help_warns_about_callee_saved_registers_without_the_stub() {
    let output = nodalc(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--no-entry-stub"));
    assert!(stdout.contains("callee-saved registers"), "{stdout}");
}

#[test]
fn binary_rejects_unknown_extensions() {
    let output = nodalc(&["program.txt"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("expected .nir"), "{stderr}");
}

#[test]
fn binary_rejects_a_zero_register_budget() {
    let output = nodalc(&[fixture("add.nir").to_str().unwrap(), "--registers", "0"]);
    assert!(!output.status.success());
}

#[test]
fn unused_division_keeps_its_operand_intact() {
    let source = "
        fun main {
            %0 = const 7;
            %2 = div %0, %0;
            %3 = add %0, %0;
            ret %3;
        }
    ";
    let alloc = compile(
        source,
        &Options {
            emit: Emit::Alloc,
            ..Options::default()
        },
    )
    .unwrap();
    let registers = alloc
        .lines()
        .skip(1)
        .map(|line| line.split_once(": ").unwrap().1)
        .collect::<Vec<_>>();
    // %0 and the quotient are both live while the division runs
    assert_eq!(registers.len(), 3);
    assert_ne!(registers[0], registers[1], "{alloc}");
    assert!(!alloc.contains("(spilled)"));
}

#[test]
fn binary_reports_phi_as_unsupported() {
    let path = std::env::temp_dir().join(format!("nodalc-phi-{}.nir", std::process::id()));
    std::fs::write(&path, "fun main { %0 = phi 1, 2; ret %0; }").unwrap();
    let output = nodalc(&[path.to_str().unwrap()]);
    std::fs::remove_file(&path).unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("cannot generate code for"), "{stderr}");
}
