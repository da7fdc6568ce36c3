use std::{
    collections::BTreeSet,
    fmt::{
        Display,
        Formatter,
    },
};

use itertools::Itertools;
use nodal_middle::{
    IrGraph,
    Node,
    NodeId,
    NodeKind,
};
use rustc_hash::FxHashMap;
use smallvec::{
    smallvec,
    SmallVec,
};
use tracing::debug;

use crate::codegen::register_allocator::FxIndexSet;

pub type LiveSet = BTreeSet<NodeId>;

/// Live-in and live-out sets of every register-needing node.
///
/// At the fixed point, for every analysed node `n`:
/// - `live_out(n)` is the union of `live_in(s)` over the users `s` of `n`, plus whatever is
///   live into the instruction emitted right after `n` (see [`Liveness::schedule`])
/// - `live_in(n) = use(n) ∪ (live_out(n) \ def(n))`
///
/// Users outside the analysed set (returns, for instance) contribute nothing through the
/// first term. The second term keeps a value live across every instruction emitted between
/// its definition and its last use, including side-effecting nodes whose result is unused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Liveness {
    live_in: FxHashMap<NodeId, LiveSet>,
    live_out: FxHashMap<NodeId, LiveSet>,
}

impl Liveness {
    pub fn analyze(graph: &IrGraph, nodes: &FxIndexSet<NodeId>) -> Self {
        let mut liveness = Self {
            live_in: nodes.iter().map(|node| (*node, LiveSet::new())).collect(),
            live_out: nodes.iter().map(|node| (*node, LiveSet::new())).collect(),
        };
        liveness.solve(graph, nodes);
        liveness
    }

    /// Iterates the dataflow equations until a full pass changes nothing.
    ///
    /// Returns the number of passes, including the final one that confirmed the fixed point.
    pub fn solve(&mut self, graph: &IrGraph, nodes: &FxIndexSet<NodeId>) -> usize {
        let schedule = Self::schedule(graph, nodes);
        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;
            // Backward problem: visiting users before their operands converges faster.
            for node in nodes.iter().rev().copied() {
                let mut out = LiveSet::new();
                for succ in graph.successors_skip_proj(node) {
                    if let Some(live_in) = self.live_in.get(&succ) {
                        out.extend(live_in.iter().copied());
                    }
                }
                let defs = Self::defs(graph, node);
                if let Some(next) = schedule.get(&node) {
                    match self.live_in.get(next) {
                        Some(live_in) => out.extend(live_in.iter().copied()),
                        // a return reads its operand and nothing is live after it
                        None => out.extend(
                            Self::uses(graph, *next)
                                .into_iter()
                                .filter(|value| !defs.contains(value)),
                        ),
                    }
                }
                let mut live_in: LiveSet = Self::uses(graph, node).into_iter().collect();
                live_in.extend(out.iter().copied().filter(|value| !defs.contains(value)));

                let old_out = self.live_out_mut(node);
                if *old_out != out {
                    *old_out = out;
                    changed = true;
                }
                let old_in = self.live_in_mut(node);
                if *old_in != live_in {
                    *old_in = live_in;
                    changed = true;
                }
            }
            debug!("Liveness pass {passes} changed: {changed}");
            if !changed {
                return passes;
            }
        }
    }

    /// Maps every analysed node to the node emitted right after it.
    ///
    /// Code is emitted in [`IrGraph::post_order`], so this is the next analysed node or
    /// return in that order. The last node before a return maps to the return.
    pub fn schedule(graph: &IrGraph, nodes: &FxIndexSet<NodeId>) -> FxHashMap<NodeId, NodeId> {
        graph
            .post_order()
            .into_iter()
            .filter(|node| nodes.contains(node) || graph.kind(*node) == NodeKind::Return)
            .tuple_windows()
            .filter(|(node, _)| nodes.contains(node))
            .collect()
    }

    /// `{n}` for nodes that produce a value of their own, empty otherwise.
    pub fn defs(graph: &IrGraph, node: NodeId) -> SmallVec<[NodeId; 1]> {
        if graph[node].defines_value() {
            smallvec![node]
        } else {
            smallvec![]
        }
    }

    /// The values `node` reads, looking through projections.
    pub fn uses(graph: &IrGraph, node: NodeId) -> SmallVec<[NodeId; 3]> {
        let operands: SmallVec<[NodeId; 3]> = match graph.kind(node) {
            NodeKind::Binary(_) => smallvec![
                graph.predecessor_skip_proj(node, Node::LEFT),
                graph.predecessor_skip_proj(node, Node::RIGHT),
            ],
            NodeKind::Return => smallvec![graph.predecessor_skip_proj(node, Node::RETURN_RESULT)],
            NodeKind::Phi => graph
                .predecessors(node)
                .iter()
                .map(|pred| graph.skip_proj(*pred))
                .collect(),
            NodeKind::Start | NodeKind::Block | NodeKind::ConstInt(_) | NodeKind::Proj(_) => {
                smallvec![]
            }
        };
        operands
            .into_iter()
            .filter(|operand| graph[*operand].needs_register())
            .unique()
            .collect()
    }

    pub fn live_in(&self, node: NodeId) -> &LiveSet {
        self.live_in
            .get(&node)
            .unwrap_or_else(|| panic!("No liveness information for {node}"))
    }

    pub fn live_out(&self, node: NodeId) -> &LiveSet {
        self.live_out
            .get(&node)
            .unwrap_or_else(|| panic!("No liveness information for {node}"))
    }

    fn live_in_mut(&mut self, node: NodeId) -> &mut LiveSet {
        self.live_in
            .get_mut(&node)
            .unwrap_or_else(|| panic!("No liveness information for {node}"))
    }

    fn live_out_mut(&mut self, node: NodeId) -> &mut LiveSet {
        self.live_out
            .get_mut(&node)
            .unwrap_or_else(|| panic!("No liveness information for {node}"))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.live_out.keys().copied().sorted()
    }
}

impl Display for Liveness {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for node in self.nodes() {
            writeln!(
                f,
                "{node}: in {{{}}} out {{{}}}",
                self.live_in(node).iter().join(", "),
                self.live_out(node).iter().join(", ")
            )?;
        }
        Ok(())
    }
}
