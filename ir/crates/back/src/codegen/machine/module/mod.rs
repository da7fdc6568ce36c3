use std::fmt::{
    Display,
    Formatter,
};

use nodal_middle::IrGraph;
use tracing::{
    debug,
    info,
};

use crate::codegen::{
    machine::{
        asm::Assembler,
        function::{
            Function,
            FunctionBuilder,
        },
        RegisterSet,
        TargetMachine,
    },
    register_allocator::RegisterAllocator,
    CodegenConfig,
    CodegenError,
};

#[derive(Debug, Clone)]
pub struct Module<TM: TargetMachine> {
    functions: Vec<Function<TM>>,
    entry_stub: bool,
}

impl<TM: TargetMachine> Module<TM> {
    /// Allocates registers for and lowers every graph, one independent run per function.
    pub fn compile(graphs: &[IrGraph], config: &CodegenConfig) -> Result<Self, CodegenError> {
        let registers = Self::register_set(config);
        info!(
            "Compiling {} function(s) with {} registers",
            graphs.len(),
            registers.k()
        );
        let functions = graphs
            .iter()
            .map(|graph| Self::compile_function(graph, &registers))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            functions,
            entry_stub: config.entry_stub,
        })
    }

    pub fn compile_function(
        graph: &IrGraph,
        registers: &RegisterSet<TM::Reg>,
    ) -> Result<Function<TM>, CodegenError> {
        debug!("Running register allocator for @{}", graph.name());
        let allocation = RegisterAllocator::new(graph, registers.clone()).allocate_registers();
        FunctionBuilder::<TM>::new(graph, allocation).build()
    }

    pub fn register_set(config: &CodegenConfig) -> RegisterSet<TM::Reg> {
        let registers = TM::register_set();
        match config.max_registers {
            Some(n) => registers.limit(n),
            None => registers,
        }
    }

    pub fn functions(&self) -> impl ExactSizeIterator<Item = &Function<TM>> {
        self.functions.iter()
    }

    pub fn assemble(&self) -> String {
        let mut asm = TM::Assembler::new();
        let has_main = self.functions.iter().any(|function| function.name == "main");
        asm.begin_module(self.entry_stub && has_main);
        for function in &self.functions {
            function.assemble(&mut asm);
        }
        asm.finish()
    }
}

impl<TM: TargetMachine> Display for Module<TM> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for function in self.functions() {
            writeln!(f, "{function}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nodal_middle::test::create_graphs_from_source;

    use crate::codegen::{
        machine::Module,
        targets::x86_64::Target,
        CodegenConfig,
        CodegenError,
    };

    const SOURCE: &str = "
        fun main {
            %0 = const 3;
            %1 = const 4;
            %2 = add %0, %1;
            ret %2;
        }
        fun helper {
            %0 = const 5;
            ret %0;
        }
    ";

    #[test]
    fn compiles_every_function() {
        let graphs = create_graphs_from_source(SOURCE);
        let module = Module::<Target>::compile(&graphs, &CodegenConfig::default()).unwrap();
        assert_eq!(module.functions().len(), 2);
        let asm = module.assemble();
        assert!(asm.contains("main:\n"));
        assert!(asm.contains("call _main"));
        assert!(asm.contains("_main:\n"));
        assert!(asm.contains("_helper:\n"));
        assert_eq!(asm.matches("  ret\n").count(), 2);
    }

    #[test]
    fn entry_stub_can_be_disabled() {
        let graphs = create_graphs_from_source(SOURCE);
        let config = CodegenConfig {
            entry_stub: false,
            ..CodegenConfig::default()
        };
        let asm = Module::<Target>::compile(&graphs, &config).unwrap().assemble();
        assert!(!asm.contains("call _main"));
        assert!(!asm.contains("syscall"));
    }

    #[test]
    fn register_budget_is_respected() {
        let graphs = create_graphs_from_source(SOURCE);
        let config = CodegenConfig {
            max_registers: Some(2),
            ..CodegenConfig::default()
        };
        let module = Module::<Target>::compile(&graphs, &config).unwrap();
        let registers = Module::<Target>::register_set(&config);
        for function in module.functions() {
            for (_, reg) in function.allocation.iter() {
                assert!(registers.contains(reg));
            }
        }
    }

    #[test]
    fn unsupported_node_fails_the_module() {
        let graphs = create_graphs_from_source("fun main { %0 = phi 1, 2; ret %0; }");
        let error = Module::<Target>::compile(&graphs, &CodegenConfig::default()).unwrap_err();
        assert!(matches!(error, CodegenError::Unsupported { .. }));
    }
}
