use std::fmt::{
    Display,
    Formatter,
};

use nodal_middle::{
    NodeId,
    NodeKind,
};

pub mod machine;
pub mod register_allocator;
pub mod targets;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenConfig {
    /// Restricts allocation to the first `n` registers of the target's register set.
    pub max_registers: Option<usize>,
    /// Emit the `main` stub that calls `_main` and exits with its result.
    ///
    /// Generated functions do not save the callee-saved registers they are allocated
    /// (`rbx`, `r12`-`r15` on x86-64). Without the stub, `_main` is only safe to call from
    /// code that does not rely on them.
    pub entry_stub: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            max_registers: None,
            entry_stub: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// The node is valid IR, but the emission layer cannot lower it yet.
    Unsupported {
        function: String,
        node: NodeId,
        kind: NodeKind,
    },
}

impl Display for CodegenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported {
                function,
                node,
                kind,
            } => write!(f, "@{function}: cannot generate code for {node} ({kind}) yet"),
        }
    }
}

impl std::error::Error for CodegenError {}
