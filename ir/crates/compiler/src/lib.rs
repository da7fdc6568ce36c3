use std::fmt::Write;

use anyhow::{
    anyhow,
    bail,
    Result,
};
use clap::ValueEnum;
use nodal_back::{
    codegen::{
        machine::Module,
        register_allocator::{
            AllocationRun,
            RegisterAllocator,
        },
        targets::x86_64::{
            PhysicalRegister,
            Target,
        },
    },
    CodegenConfig,
};
use nodal_middle::{
    FrontBridge,
    IrGraph,
    Verifier,
};
use tracing::{
    debug,
    info,
};

/// What `nodalc` writes out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// AT&T x86-64 assembly
    #[default]
    Asm,
    /// The IR graphs after lowering
    Ir,
    /// Live-in and live-out sets of every value
    Liveness,
    /// The interference graph of every function
    Interference,
    /// The node to register mapping of every function
    Alloc,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Options {
    pub emit: Emit,
    pub codegen: CodegenConfig,
}

/// Parses, lowers and verifies `source`, then produces the output selected by `options`.
pub fn compile(source: &str, options: &Options) -> Result<String> {
    let start = std::time::Instant::now();
    let module = nodal_front::parse(source).map_err(|e| anyhow!("Failed to parse module: {e}"))?;
    debug!("Took {:?} to parse module", start.elapsed());

    let graphs = FrontBridge::new().bridge(module)?;
    verify(&graphs)?;
    info!("Lowered {} function(s)", graphs.len());

    let start = std::time::Instant::now();
    let output = match options.emit {
        Emit::Asm => Module::<Target>::compile(&graphs, &options.codegen)?.assemble(),
        Emit::Ir => graphs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
        Emit::Liveness => inspect(&graphs, options, |run| run.liveness.to_string())?,
        Emit::Interference => inspect(&graphs, options, |run| run.interference.to_string())?,
        Emit::Alloc => inspect(&graphs, options, |run| run.allocation.to_string())?,
    };
    debug!("Took {:?} to generate output", start.elapsed());
    Ok(output)
}

fn verify(graphs: &[IrGraph]) -> Result<()> {
    let errors = graphs
        .iter()
        .flat_map(|graph| {
            Verifier::new(graph)
                .verify()
                .into_iter()
                .map(move |error| format!("@{}: {error}", graph.name()))
        })
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        bail!("Invalid IR:\n{}", errors.join("\n"));
    }
    Ok(())
}

/// Runs the allocator on every graph and renders one section per function.
fn inspect(
    graphs: &[IrGraph],
    options: &Options,
    render: impl Fn(&AllocationRun<PhysicalRegister>) -> String,
) -> Result<String> {
    let registers = Module::<Target>::register_set(&options.codegen);
    let mut out = String::new();
    for graph in graphs {
        let run = RegisterAllocator::new(graph, registers.clone()).run();
        writeln!(out, "@{}:", graph.name())?;
        write!(out, "{}", render(&run))?;
    }
    Ok(out)
}
