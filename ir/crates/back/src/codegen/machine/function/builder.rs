use nodal_middle::{
    IrGraph,
    Node,
    NodeId,
    NodeKind,
};
use tracing::debug;

use crate::codegen::{
    machine::{
        function::Function,
        instr::{
            ArithOp,
            Instr,
        },
        TargetMachine,
    },
    register_allocator::Allocation,
    CodegenError,
};

/// Linearizes an allocated graph into machine instructions.
///
/// Nodes are visited in depth-first post-order from the end block, so every operand is
/// emitted before the node that reads it.
#[derive(Debug)]
pub struct FunctionBuilder<'graph, TM: TargetMachine> {
    graph: &'graph IrGraph,
    allocation: Allocation<TM::Reg>,
    instructions: Vec<Instr<TM::Reg>>,
}

impl<'graph, TM: TargetMachine> FunctionBuilder<'graph, TM> {
    pub fn new(graph: &'graph IrGraph, allocation: Allocation<TM::Reg>) -> Self {
        Self {
            graph,
            allocation,
            instructions: Vec::new(),
        }
    }

    pub fn build(mut self) -> Result<Function<TM>, CodegenError> {
        debug!("Generating code for @{}", self.graph.name());
        for node in self.graph.post_order() {
            self.lower(node)?;
        }
        Ok(Function {
            name: self.graph.name().to_string(),
            instructions: self.instructions,
            allocation: self.allocation,
        })
    }

    fn lower(&mut self, node: NodeId) -> Result<(), CodegenError> {
        let instr = match self.graph.kind(node) {
            NodeKind::ConstInt(imm) => Instr::MovImm {
                dest: self.reg(node),
                imm,
            },
            NodeKind::Binary(op) => {
                let op = ArithOp::try_from(op).map_err(|_| self.unsupported(node))?;
                Instr::Binary {
                    op,
                    dest: self.reg(node),
                    lhs: self.reg(self.graph.predecessor_skip_proj(node, Node::LEFT)),
                    rhs: self.reg(self.graph.predecessor_skip_proj(node, Node::RIGHT)),
                }
            }
            NodeKind::Return => Instr::Ret {
                value: self.reg(self.graph.predecessor_skip_proj(node, Node::RETURN_RESULT)),
            },
            NodeKind::Phi => return Err(self.unsupported(node)),
            NodeKind::Start | NodeKind::Block | NodeKind::Proj(_) => return Ok(()),
        };
        debug!("{node} => {instr}");
        self.instructions.push(instr);
        Ok(())
    }

    fn reg(&self, node: NodeId) -> TM::Reg {
        self.allocation
            .get(node)
            .unwrap_or_else(|| panic!("{node} was not allocated a register"))
    }

    fn unsupported(&self, node: NodeId) -> CodegenError {
        CodegenError::Unsupported {
            function: self.graph.name().to_string(),
            node,
            kind: self.graph.kind(node),
        }
    }
}
