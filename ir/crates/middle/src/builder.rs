use tracing::debug;

use crate::{
    graph::IrGraph,
    node::{
        BinaryOp,
        Node,
        NodeId,
        NodeKind,
        ProjKind,
    },
};

/// Builds a single-block [`IrGraph`] and threads the side-effect chain through
/// the nodes that need one.
#[derive(Debug)]
pub struct GraphBuilder {
    graph: IrGraph,
    side_effect: NodeId,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = IrGraph::new(name);
        let side_effect = graph.add_node(Node::new(
            NodeKind::Proj(ProjKind::SideEffect),
            Some(graph.start_block()),
            [graph.start()],
        ));
        Self { graph, side_effect }
    }

    fn push(&mut self, kind: NodeKind, predecessors: impl IntoIterator<Item = NodeId>) -> NodeId {
        let block = Some(self.graph.start_block());
        let id = self.graph.add_node(Node::new(kind, block, predecessors));
        debug!("Created {id} = {kind}");
        id
    }

    pub fn const_int(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::ConstInt(value), [])
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Div, lhs, rhs)
    }

    pub fn modulo(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Mod, lhs, rhs)
    }

    /// Adds a binary operation and returns the node that carries its value.
    ///
    /// For `div` and `mod` that is a result projection; the operation itself is
    /// appended to the side-effect chain.
    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        if !op.has_side_effect() {
            return self.push(NodeKind::Binary(op), [lhs, rhs]);
        }
        let node = self.push(NodeKind::Binary(op), [lhs, rhs, self.side_effect]);
        self.side_effect = self.push(NodeKind::Proj(ProjKind::SideEffect), [node]);
        self.push(NodeKind::Proj(ProjKind::Result), [node])
    }

    pub fn phi(&mut self, operands: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.push(NodeKind::Phi, operands)
    }

    pub fn ret(&mut self, result: NodeId) -> NodeId {
        let ret = self.push(NodeKind::Return, [self.side_effect, result]);
        let end_block = self.graph.end_block();
        self.graph.add_predecessor(end_block, ret);
        ret
    }

    pub fn finish(self) -> IrGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn side_effect_chain_orders_divisions_before_return() {
        let mut builder = GraphBuilder::new("test");
        let c1 = builder.const_int(10);
        let c2 = builder.const_int(3);
        let q = builder.div(c1, c2);
        let r = builder.modulo(q, c2);
        let ret = builder.ret(r);
        let graph = builder.finish();

        let div = graph.skip_proj(q);
        let rem = graph.skip_proj(r);
        let div_effect = graph.predecessor(div, Node::BINARY_SIDE_EFFECT);
        assert_eq!(graph.skip_proj(div_effect), graph.start());
        let rem_effect = graph.predecessor(rem, Node::BINARY_SIDE_EFFECT);
        assert_eq!(graph.skip_proj(rem_effect), div);
        let ret_effect = graph.predecessor(ret, Node::RETURN_SIDE_EFFECT);
        assert_eq!(graph.skip_proj(ret_effect), rem);
        assert_eq!(graph.predecessors(graph.end_block()), &[ret]);
        assert!(logs_contain(&format!("Created {div} = div")));
    }

    #[test]
    fn nodes_are_scheduled_in_the_start_block() {
        let mut builder = GraphBuilder::new("test");
        let c = builder.const_int(1);
        let p = builder.phi([c, c]);
        let graph = builder.finish();
        assert_eq!(graph[c].block, Some(graph.start_block()));
        assert_eq!(graph[p].block, Some(graph.start_block()));
        assert_eq!(graph.predecessors(p), &[c, c]);
    }
}
