use std::fmt::{
    Display,
    Formatter,
};

use petgraph::{
    algo::toposort,
    graphmap::DiGraphMap,
};

use crate::{
    node::{
        Node,
        NodeId,
        NodeKind,
    },
    IrGraph,
};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VerifyError {
    WrongArity {
        node: NodeId,
        kind: NodeKind,
        expected: usize,
        actual: usize,
    },
    NotAValue {
        node: NodeId,
        slot: usize,
        operand: NodeId,
    },
    DataCycle(NodeId),
    NotAReturn(NodeId),
    MissingReturn,
}

impl Display for VerifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongArity {
                node,
                kind,
                expected,
                actual,
            } => write!(
                f,
                "{node} ({kind}) expects {expected} operands, but has {actual}"
            ),
            Self::NotAValue {
                node,
                slot,
                operand,
            } => write!(f, "Operand {slot} of {node} is {operand}, which is not a value"),
            Self::DataCycle(node) => write!(f, "{node} depends on itself"),
            Self::NotAReturn(node) => write!(f, "End block is reached from {node}, which is not a return"),
            Self::MissingReturn => write!(f, "Function never returns"),
        }
    }
}

impl std::error::Error for VerifyError {}

/// Checks that a graph satisfies what the backend expects of its input.
#[derive(Debug, Clone)]
pub struct Verifier<'graph> {
    graph: &'graph IrGraph,
}

impl<'graph> Verifier<'graph> {
    pub fn new(graph: &'graph IrGraph) -> Self {
        Self { graph }
    }

    pub fn verify(self) -> Vec<VerifyError> {
        let mut errors = vec![];
        let mut dependencies = DiGraphMap::<NodeId, ()>::new();
        for (id, node) in self.graph.nodes() {
            dependencies.add_node(id);
            for pred in node.predecessors() {
                dependencies.add_edge(*pred, id, ());
            }
            if let Some(expected) = Self::expected_arity(node) {
                let actual = node.predecessors().len();
                if expected != actual {
                    errors.push(VerifyError::WrongArity {
                        node: id,
                        kind: node.kind,
                        expected,
                        actual,
                    });
                    continue;
                }
            }
            for slot in Self::value_slots(node) {
                let operand = self.graph.predecessor_skip_proj(id, slot);
                if !self.graph[operand].needs_register() {
                    errors.push(VerifyError::NotAValue {
                        node: id,
                        slot,
                        operand,
                    });
                }
            }
        }
        if let Err(cycle) = toposort(&dependencies, None) {
            errors.push(VerifyError::DataCycle(cycle.node_id()));
        }
        let returns = self.graph.predecessors(self.graph.end_block());
        if returns.is_empty() {
            errors.push(VerifyError::MissingReturn);
        }
        for ret in returns {
            if self.graph.kind(*ret) != NodeKind::Return {
                errors.push(VerifyError::NotAReturn(*ret));
            }
        }
        errors
    }

    /// `None` for nodes that accept any number of operands.
    fn expected_arity(node: &Node) -> Option<usize> {
        match node.kind {
            NodeKind::Start | NodeKind::ConstInt(_) => Some(0),
            NodeKind::Block => None,
            NodeKind::Binary(op) => Some(op.arity()),
            NodeKind::Return => Some(2),
            NodeKind::Proj(_) => Some(1),
            NodeKind::Phi => (node.predecessors().is_empty()).then_some(1),
        }
    }

    fn value_slots(node: &Node) -> std::ops::Range<usize> {
        match node.kind {
            NodeKind::Binary(_) => Node::LEFT..Node::RIGHT + 1,
            NodeKind::Return => Node::RETURN_RESULT..Node::RETURN_RESULT + 1,
            NodeKind::Phi => 0..node.predecessors().len(),
            _ => 0..0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::BinaryOp,
        GraphBuilder,
    };

    #[test]
    fn accepts_well_formed_graph() {
        let mut builder = GraphBuilder::new("test");
        let c1 = builder.const_int(3);
        let c2 = builder.const_int(4);
        let a = builder.div(c1, c2);
        builder.ret(a);
        let graph = builder.finish();
        assert_eq!(Verifier::new(&graph).verify(), vec![]);
    }

    #[test]
    fn reports_missing_return() {
        let mut builder = GraphBuilder::new("test");
        builder.const_int(3);
        let graph = builder.finish();
        assert_eq!(
            Verifier::new(&graph).verify(),
            vec![VerifyError::MissingReturn]
        );
    }

    #[test]
    fn reports_wrong_arity() {
        let mut graph = IrGraph::new("test");
        let c = graph.add_node(Node::new(NodeKind::ConstInt(1), Some(graph.start_block()), []));
        let add = graph.add_node(Node::new(
            NodeKind::Binary(BinaryOp::Add),
            Some(graph.start_block()),
            [c],
        ));
        let errors = Verifier::new(&graph).verify();
        assert!(errors.contains(&VerifyError::WrongArity {
            node: add,
            kind: NodeKind::Binary(BinaryOp::Add),
            expected: 2,
            actual: 1,
        }));
    }

    #[test]
    fn reports_structural_operand() {
        // every graph starts out with the same fixed nodes
        let start = IrGraph::new("test").start();
        let mut builder = GraphBuilder::new("test");
        let c = builder.const_int(1);
        let bad = builder.add(start, c);
        builder.ret(bad);
        let graph = builder.finish();
        assert_eq!(graph.start(), start);
        let errors = Verifier::new(&graph).verify();
        assert_eq!(
            errors,
            vec![VerifyError::NotAValue {
                node: bad,
                slot: Node::LEFT,
                operand: start,
            }]
        );
        assert_eq!(
            errors[0].to_string(),
            format!("Operand 0 of {bad} is {start}, which is not a value")
        );
    }

    #[test]
    fn reports_cycles() {
        let mut graph = IrGraph::new("test");
        let block = Some(graph.start_block());
        let c = graph.add_node(Node::new(NodeKind::ConstInt(1), block, []));
        let phi = graph.add_node(Node::new(NodeKind::Phi, block, [c]));
        graph.add_predecessor(phi, phi);
        let errors = Verifier::new(&graph).verify();
        assert!(errors
            .iter()
            .any(|error| matches!(error, VerifyError::DataCycle(_))));
    }
}
