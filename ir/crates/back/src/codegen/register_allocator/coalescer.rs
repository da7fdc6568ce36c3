use std::collections::BTreeSet;

use nodal_middle::{
    IrGraph,
    NodeId,
    NodeKind,
};
use rustc_hash::FxHashMap;
use tracing::{
    debug,
    info,
};

use crate::codegen::register_allocator::{
    interference::InterferenceGraph,
    FxIndexSet,
};

/// Conservative coalescing of copy-related values.
///
/// Two values may share a register if they never interfere and their merged node has fewer
/// than `K` neighbours, so merging cannot turn a colorable graph into an uncolorable one.
/// The allocator does not run this.
#[derive(Debug, Clone)]
pub struct Coalescer {
    k: usize,
    adjacency: FxHashMap<NodeId, BTreeSet<NodeId>>,
    coalesced: FxHashMap<NodeId, NodeId>,
}

impl Coalescer {
    pub fn new(interference: &InterferenceGraph, k: usize) -> Self {
        Self {
            k,
            adjacency: interference
                .nodes()
                .map(|node| (node, interference.adjacent(node).clone()))
                .collect(),
            coalesced: FxHashMap::default(),
        }
    }

    /// The node `node` has been merged into, or `node` itself.
    pub fn alias(&self, mut node: NodeId) -> NodeId {
        while let Some(target) = self.coalesced.get(&node) {
            node = *target;
        }
        node
    }

    fn neighbours(&self, node: NodeId) -> &BTreeSet<NodeId> {
        self.adjacency
            .get(&node)
            .unwrap_or_else(|| panic!("{node} is not part of the interference graph"))
    }

    pub fn can_coalesce(&self, u: NodeId, v: NodeId) -> bool {
        let (u, v) = (self.alias(u), self.alias(v));
        if u == v {
            return true;
        }
        let (u_neighbours, v_neighbours) = (self.neighbours(u), self.neighbours(v));
        if u_neighbours.contains(&v) {
            return false;
        }
        u_neighbours.union(v_neighbours).count() < self.k
    }

    /// Merges every pair that passes [`Self::can_coalesce`], in order, and returns the
    /// resulting relation from merged node to the node it was merged into.
    pub fn coalesce(
        &mut self,
        pairs: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> &FxHashMap<NodeId, NodeId> {
        info!("Running register coalescer");
        for (u, v) in pairs {
            if !self.can_coalesce(u, v) {
                debug!("Cannot coalesce {u} and {v}");
                continue;
            }
            let (u, v) = (self.alias(u), self.alias(v));
            if u == v {
                continue;
            }
            debug!("Coalescing {v} into {u}");
            let v_neighbours = self.adjacency.remove(&v).unwrap_or_default();
            for neighbour in &v_neighbours {
                if let Some(adjacent) = self.adjacency.get_mut(neighbour) {
                    adjacent.remove(&v);
                    adjacent.insert(u);
                }
            }
            if let Some(adjacent) = self.adjacency.get_mut(&u) {
                adjacent.extend(v_neighbours);
            }
            self.coalesced.insert(v, u);
        }
        &self.coalesced
    }

    pub fn coalesced(&self) -> &FxHashMap<NodeId, NodeId> {
        &self.coalesced
    }

    /// `(phi, operand)` pairs: sharing a register would make the merge a no-op.
    pub fn phi_candidates(graph: &IrGraph, nodes: &FxIndexSet<NodeId>) -> Vec<(NodeId, NodeId)> {
        nodes
            .iter()
            .copied()
            .filter(|node| graph.kind(*node) == NodeKind::Phi)
            .flat_map(|phi| {
                graph
                    .predecessors(phi)
                    .iter()
                    .map(move |operand| (phi, graph.skip_proj(*operand)))
            })
            .filter(|(_, operand)| nodes.contains(operand))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use nodal_middle::test::create_graph_from_source;
    use tracing_test::traced_test;

    use super::*;
    use crate::codegen::register_allocator::{
        liveness::Liveness,
        ordered_nodes,
    };

    fn n(index: u32) -> NodeId {
        NodeId::from_u32(index)
    }

    /// n0 - n1 - n2, plus an isolated n3
    fn path() -> InterferenceGraph {
        let mut graph = InterferenceGraph::new();
        graph.add_edge(n(0), n(1));
        graph.add_edge(n(1), n(2));
        graph.add_node(n(3));
        graph
    }

    #[test]
    fn interfering_nodes_never_coalesce() {
        let coalescer = Coalescer::new(&path(), 14);
        assert!(!coalescer.can_coalesce(n(0), n(1)));
        assert!(coalescer.can_coalesce(n(0), n(2)));
        assert!(coalescer.can_coalesce(n(3), n(3)));
    }

    #[test]
    fn combined_neighbours_must_stay_below_k() {
        let mut graph = path();
        graph.add_edge(n(2), n(3));
        // n0 and n2 share n1, so together they only see {n1, n3}
        assert!(Coalescer::new(&graph, 3).can_coalesce(n(0), n(2)));
        assert!(!Coalescer::new(&graph, 2).can_coalesce(n(0), n(2)));
    }

    #[test]
    #[traced_test]
    fn coalesce_merges_neighbourhoods() {
        let mut coalescer = Coalescer::new(&path(), 14);
        let coalesced = coalescer.coalesce([(n(0), n(2)), (n(1), n(0)), (n(3), n(2))]).clone();
        assert_eq!(coalesced.len(), 2);
        assert_eq!(coalesced[&n(2)], n(0));
        // n0 itself was merged into n3 by the last pair
        assert_eq!(coalescer.alias(n(2)), n(3));
        assert_eq!(coalescer.alias(n(0)), n(3));
        // n1 interferes with the merged node, whichever member is asked about
        assert!(!coalescer.can_coalesce(n(1), n(3)));
        assert!(logs_contain("Cannot coalesce n1 and n0"));
    }

    #[test]
    fn phi_operands_are_candidates() {
        let graph = create_graph_from_source(
            "
            fun main {
                %0 = const 1;
                %1 = const 2;
                %2 = div %0, %1;
                %3 = phi %0, %2;
                ret %3;
            }
        ",
        );
        let nodes = ordered_nodes(&graph);
        let phi = nodes
            .iter()
            .copied()
            .find(|node| graph.kind(*node) == NodeKind::Phi)
            .unwrap();
        let candidates = Coalescer::phi_candidates(&graph, &nodes);
        assert_eq!(candidates.len(), 2);
        for (target, operand) in &candidates {
            assert_eq!(*target, phi);
            assert!(graph[*operand].defines_value());
        }

        let liveness = Liveness::analyze(&graph, &nodes);
        let interference = InterferenceGraph::build(&nodes, &liveness);
        let mut coalescer = Coalescer::new(&interference, 14);
        coalescer.coalesce(candidates.iter().copied());
        // %0 is live across the division, so it interferes with %2 and only one of them
        // can join the phi
        assert_eq!(coalescer.coalesced().len(), 1);
    }
}
