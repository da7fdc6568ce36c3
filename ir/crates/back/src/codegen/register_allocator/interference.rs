use std::{
    collections::BTreeSet,
    fmt::{
        Display,
        Formatter,
    },
};

use itertools::Itertools;
use nodal_middle::NodeId;

use crate::codegen::register_allocator::{
    liveness::Liveness,
    FxIndexMap,
    FxIndexSet,
};

/// Undirected graph over register-needing nodes. An edge means the two values are live at
/// the same time and must not share a register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterferenceGraph {
    adjacency: FxIndexMap<NodeId, BTreeSet<NodeId>>,
}

impl InterferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A definition interferes with everything still live after it, and values that are
    /// live out of the same node interfere with each other.
    pub fn build(nodes: &FxIndexSet<NodeId>, liveness: &Liveness) -> Self {
        let mut graph = Self::new();
        for u in nodes.iter().copied() {
            graph.add_node(u);
            let live = liveness.live_out(u);
            for (v, w) in live.iter().copied().tuple_combinations() {
                graph.add_edge(v, w);
            }
            for v in live.iter().copied() {
                graph.add_edge(u, v);
            }
        }
        graph
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    /// Self-edges are ignored.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) {
        if u == v {
            return;
        }
        self.adjacency.entry(u).or_default().insert(v);
        self.adjacency.entry(v).or_default().insert(u);
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn adjacent(&self, node: NodeId) -> &BTreeSet<NodeId> {
        self.adjacency
            .get(&node)
            .unwrap_or_else(|| panic!("{node} is not part of the interference graph"))
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacent(node).len()
    }

    pub fn interferes(&self, u: NodeId, v: NodeId) -> bool {
        self.adjacency
            .get(&u)
            .is_some_and(|adjacent| adjacent.contains(&v))
    }

    /// Every edge once, as `(u, v)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adjacency.iter().flat_map(|(u, adjacent)| {
            adjacent
                .iter()
                .filter(move |v| u < *v)
                .map(move |v| (*u, *v))
        })
    }
}

impl Display for InterferenceGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (node, adjacent) in self.adjacency.iter().sorted_by_key(|(node, _)| **node) {
            writeln!(f, "{node}: {}", adjacent.iter().join(", "))?;
        }
        Ok(())
    }
}
