use std::fmt::{
    Display,
    Formatter,
};

use nodal_front::module::{
    Identifier,
    Instruction,
    Operand,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    node::{
        BinaryOp,
        NodeId,
    },
    GraphBuilder,
    IrGraph,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BridgeError {
    UnknownValue { function: String, value: Identifier },
    DuplicateDefinition { function: String, value: Identifier },
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownValue { function, value } => {
                write!(f, "Use of undefined value %{value} in @{function}")
            }
            Self::DuplicateDefinition { function, value } => {
                write!(f, "%{value} is defined more than once in @{function}")
            }
        }
    }
}

impl std::error::Error for BridgeError {}

/// Lowers the textual IR into one graph per function.
#[derive(Debug, Default)]
pub struct FrontBridge {
    value_symbol_table: FxHashMap<Identifier, NodeId>,
}

impl FrontBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bridge(mut self, front_module: nodal_front::Module) -> Result<Vec<IrGraph>, BridgeError> {
        front_module
            .functions
            .into_iter()
            .map(|function| self.bridge_function(function))
            .collect()
    }

    fn bridge_function(
        &mut self,
        front_f: nodal_front::module::Function,
    ) -> Result<IrGraph, BridgeError> {
        debug!("Bridging function @{}", front_f.name);
        self.value_symbol_table.clear();
        let mut builder = GraphBuilder::new(front_f.name.clone());
        for instruction in front_f.instructions {
            let defined = instruction.defines().cloned();
            let node = match instruction {
                Instruction::Const(_, value) => Some(builder.const_int(value)),
                Instruction::Add(_, lhs, rhs) => {
                    Some(self.binary(&mut builder, &front_f.name, BinaryOp::Add, lhs, rhs)?)
                }
                Instruction::Sub(_, lhs, rhs) => {
                    Some(self.binary(&mut builder, &front_f.name, BinaryOp::Sub, lhs, rhs)?)
                }
                Instruction::Mul(_, lhs, rhs) => {
                    Some(self.binary(&mut builder, &front_f.name, BinaryOp::Mul, lhs, rhs)?)
                }
                Instruction::Div(_, lhs, rhs) => {
                    Some(self.binary(&mut builder, &front_f.name, BinaryOp::Div, lhs, rhs)?)
                }
                Instruction::Mod(_, lhs, rhs) => {
                    Some(self.binary(&mut builder, &front_f.name, BinaryOp::Mod, lhs, rhs)?)
                }
                Instruction::Phi(_, operands) => {
                    let operands = operands
                        .into_iter()
                        .map(|operand| self.operand(&mut builder, &front_f.name, operand))
                        .collect::<Result<Vec<_>, _>>()?;
                    Some(builder.phi(operands))
                }
                Instruction::Ret(value) => {
                    let value = self.operand(&mut builder, &front_f.name, value)?;
                    builder.ret(value);
                    None
                }
            };
            if let (Some(name), Some(node)) = (defined, node) {
                if self.value_symbol_table.insert(name.clone(), node).is_some() {
                    return Err(BridgeError::DuplicateDefinition {
                        function: front_f.name,
                        value: name,
                    });
                }
            }
        }
        Ok(builder.finish())
    }

    fn binary(
        &self,
        builder: &mut GraphBuilder,
        function: &str,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Result<NodeId, BridgeError> {
        let lhs = self.operand(builder, function, lhs)?;
        let rhs = self.operand(builder, function, rhs)?;
        Ok(builder.binary(op, lhs, rhs))
    }

    fn operand(
        &self,
        builder: &mut GraphBuilder,
        function: &str,
        operand: Operand,
    ) -> Result<NodeId, BridgeError> {
        match operand {
            Operand::Literal(value) => Ok(builder.const_int(value)),
            Operand::Value(name) => self.value_symbol_table.get(&name).copied().ok_or_else(|| {
                BridgeError::UnknownValue {
                    function: function.to_string(),
                    value: name,
                }
            }),
        }
    }
}
