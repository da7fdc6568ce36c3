use std::{
    fmt::{
        Display,
        Formatter,
    },
    ops::Index,
};

use cranelift_entity::{
    PrimaryMap,
    SecondaryMap,
};
use itertools::Itertools;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::node::{
    Node,
    NodeId,
    NodeKind,
};

/// The data-dependency graph of one function.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Edges point from a node to the
/// nodes it reads (its predecessors); the reverse relation is kept in `successors`, so a
/// value's successors are its users.
#[derive(Debug, Clone)]
pub struct IrGraph {
    name: String,
    nodes: PrimaryMap<NodeId, Node>,
    successors: SecondaryMap<NodeId, SmallVec<[NodeId; 4]>>,
    start: NodeId,
    start_block: NodeId,
    end_block: NodeId,
}

impl IrGraph {
    pub fn new(name: impl Into<String>) -> Self {
        let mut nodes = PrimaryMap::new();
        let start_block = nodes.push(Node::new(NodeKind::Block, None, []));
        let start = nodes.push(Node::new(NodeKind::Start, Some(start_block), []));
        let end_block = nodes.push(Node::new(NodeKind::Block, None, []));
        Self {
            name: name.into(),
            nodes,
            successors: SecondaryMap::new(),
            start,
            start_block,
            end_block,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn start(&self) -> NodeId {
        self.start
    }

    pub const fn start_block(&self) -> NodeId {
        self.start_block
    }

    pub const fn end_block(&self) -> NodeId {
        self.end_block
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn add_node(&mut self, node: Node) -> NodeId {
        let preds = node.predecessors.clone();
        let id = self.nodes.push(node);
        for pred in preds {
            self.successors[pred].push(id);
        }
        id
    }

    pub(crate) fn add_predecessor(&mut self, node: NodeId, pred: NodeId) {
        self.nodes[node].predecessors.push(pred);
        self.successors[pred].push(node);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.nodes[id].predecessors()
    }

    pub fn predecessor(&self, id: NodeId, slot: usize) -> NodeId {
        self.predecessors(id).get(slot).copied().unwrap_or_else(|| {
            panic!(
                "{id} ({}) has no predecessor in slot {slot}",
                self.nodes[id].kind
            )
        })
    }

    /// The users of `id`.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id]
    }

    /// Follows projections back to the node that produced the value.
    pub fn skip_proj(&self, mut id: NodeId) -> NodeId {
        while self.nodes[id].is_proj() {
            id = self.predecessor(id, 0);
        }
        id
    }

    pub fn predecessor_skip_proj(&self, id: NodeId, slot: usize) -> NodeId {
        self.skip_proj(self.predecessor(id, slot))
    }

    /// The users of `id`, looking through any projection that sits in between.
    pub fn successors_skip_proj(&self, id: NodeId) -> SmallVec<[NodeId; 4]> {
        let mut result = SmallVec::new();
        let mut worklist: SmallVec<[NodeId; 4]> = self.successors(id).iter().copied().collect();
        let mut seen = FxHashSet::default();
        while let Some(succ) = worklist.pop() {
            if !seen.insert(succ) {
                continue;
            }
            if self.nodes[succ].is_proj() {
                worklist.extend(self.successors(succ).iter().copied());
            } else {
                result.push(succ);
            }
        }
        result.sort_unstable();
        result
    }

    /// Depth-first post-order over the predecessor relation, rooted at the end block.
    ///
    /// Every reachable node appears exactly once and after all of its predecessors.
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = FxHashSet::default();
        // (node, index of the next predecessor to visit)
        let mut stack = vec![(self.end_block, 0usize)];
        visited.insert(self.end_block);
        while let Some((node, next_pred)) = stack.last_mut() {
            let node = *node;
            match self.predecessors(node).get(*next_pred) {
                Some(&pred) => {
                    *next_pred += 1;
                    if visited.insert(pred) {
                        stack.push((pred, 0));
                    }
                }
                None => {
                    stack.pop();
                    order.push(node);
                }
            }
        }
        order
    }
}

impl Index<NodeId> for IrGraph {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

impl Display for IrGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "graph {} {{", self.name)?;
        for id in self.post_order() {
            let node = &self.nodes[id];
            write!(f, "    {id} = {}", node.kind)?;
            if !node.predecessors.is_empty() {
                write!(f, " {}", node.predecessors.iter().join(", "))?;
            }
            if let Some(block) = node.block {
                write!(f, " @{block}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "}}")
    }
}
