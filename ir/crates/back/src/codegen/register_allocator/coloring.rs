use std::{
    collections::{
        BTreeMap,
        BTreeSet,
    },
    fmt::{
        Display,
        Formatter,
    },
};

use itertools::Itertools;
use nodal_middle::NodeId;
use rustc_hash::FxHashSet;
use tracing::{
    debug,
    warn,
};

use crate::codegen::{
    machine::Color,
    register_allocator::interference::InterferenceGraph,
};

/// Transient state of one simplify/spill run.
///
/// `simplify` and `spill` are disjoint. Ties are broken by picking the lowest [`NodeId`],
/// which keeps runs reproducible.
#[derive(Debug)]
pub struct Worklists<'interference> {
    graph: &'interference InterferenceGraph,
    k: usize,
    simplify: BTreeSet<NodeId>,
    spill: BTreeSet<NodeId>,
    select_stack: Vec<NodeId>,
    on_stack: FxHashSet<NodeId>,
    spill_candidates: BTreeSet<NodeId>,
}

impl<'interference> Worklists<'interference> {
    pub fn new(graph: &'interference InterferenceGraph, k: usize) -> Self {
        assert!(k > 0, "Cannot color a graph with zero registers");
        let (simplify, spill) = graph
            .nodes()
            .partition::<BTreeSet<_>, _>(|node| graph.degree(*node) < k);
        debug!("Initial simplify worklist: {{{}}}", simplify.iter().join(", "));
        debug!("Initial spill worklist: {{{}}}", spill.iter().join(", "));
        Self {
            graph,
            k,
            simplify,
            spill,
            select_stack: Vec::with_capacity(graph.len()),
            on_stack: FxHashSet::default(),
            spill_candidates: BTreeSet::new(),
        }
    }

    pub fn simplify_worklist(&self) -> &BTreeSet<NodeId> {
        &self.simplify
    }

    pub fn spill_worklist(&self) -> &BTreeSet<NodeId> {
        &self.spill
    }

    pub fn select_stack(&self) -> &[NodeId] {
        &self.select_stack
    }

    pub fn is_done(&self) -> bool {
        self.simplify.is_empty() && self.spill.is_empty()
    }

    /// Degree counting only neighbours that have not been pushed on the select stack yet.
    pub fn current_degree(&self, node: NodeId) -> usize {
        self.graph
            .adjacent(node)
            .iter()
            .filter(|neighbour| !self.on_stack.contains(*neighbour))
            .count()
    }

    /// Moves one node from the simplify worklist onto the select stack.
    pub fn simplify(&mut self) -> NodeId {
        let node = self
            .simplify
            .pop_first()
            .unwrap_or_else(|| panic!("Simplify worklist is empty"));
        debug!("Simplify {node}");
        self.select_stack.push(node);
        self.on_stack.insert(node);
        for neighbour in self.graph.adjacent(node).iter().copied() {
            if self.spill.contains(&neighbour) && self.current_degree(neighbour) < self.k {
                debug!("{neighbour} dropped below {} neighbours", self.k);
                self.spill.remove(&neighbour);
                self.simplify.insert(neighbour);
            }
        }
        node
    }

    /// Optimistically moves a high-degree node to the simplify worklist. Whether it really
    /// lacks a color is only known once the select stack is popped.
    pub fn select_spill(&mut self) -> NodeId {
        let node = self
            .spill
            .pop_first()
            .unwrap_or_else(|| panic!("Spill worklist is empty"));
        debug!("Spill candidate {node}");
        self.spill_candidates.insert(node);
        self.simplify.insert(node);
        node
    }

    pub fn run(mut self) -> Coloring {
        while !self.is_done() {
            if self.simplify.is_empty() {
                self.select_spill();
            } else {
                self.simplify();
            }
        }
        debug_assert_eq!(self.select_stack.len(), self.graph.len());
        self.assign_colors()
    }

    fn assign_colors(mut self) -> Coloring {
        let mut colors: BTreeMap<NodeId, Color> = BTreeMap::new();
        let select_order = self.select_stack.clone();
        while let Some(node) = self.select_stack.pop() {
            let taken = self
                .graph
                .adjacent(node)
                .iter()
                .filter_map(|neighbour| colors.get(neighbour).copied())
                .collect::<FxHashSet<Color>>();
            match (0..self.k).find(|color| !taken.contains(color)) {
                Some(color) => {
                    debug!("Colored {node} with {color}");
                    colors.insert(node, color);
                }
                None => {
                    debug!("No color left for {node}");
                    // never reprocessed, it ends up on the fallback path below
                    self.spill.insert(node);
                }
            }
        }
        let colors_used = colors.values().unique().count();
        let mut spilled = BTreeSet::new();
        for node in std::mem::take(&mut self.spill) {
            let color = colors.len() % self.k;
            warn!(
                "Could not color {node} with {} registers; falling back to color {color}",
                self.k
            );
            colors.insert(node, color);
            spilled.insert(node);
        }
        Coloring {
            k: self.k,
            colors,
            select_order,
            spill_candidates: self.spill_candidates,
            spilled,
            colors_used,
        }
    }
}

/// Runs simplify/spill to completion and colors `graph` with at most `k` colors.
pub fn color(graph: &InterferenceGraph, k: usize) -> Coloring {
    Worklists::new(graph, k).run()
}

/// Node → color mapping produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coloring {
    k: usize,
    colors: BTreeMap<NodeId, Color>,
    select_order: Vec<NodeId>,
    spill_candidates: BTreeSet<NodeId>,
    spilled: BTreeSet<NodeId>,
    colors_used: usize,
}

impl Coloring {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn color(&self, node: NodeId) -> Option<Color> {
        self.colors.get(&node).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (NodeId, Color)> + '_ {
        self.colors.iter().map(|(node, color)| (*node, *color))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Nodes pushed on the select stack, bottom first.
    pub fn select_order(&self) -> &[NodeId] {
        &self.select_order
    }

    /// Nodes that were moved off the spill worklist optimistically.
    pub fn spill_candidates(&self) -> &BTreeSet<NodeId> {
        &self.spill_candidates
    }

    /// Nodes that found no free color and received the round-robin fallback instead.
    /// Their colors may clash with neighbours.
    pub fn spilled(&self) -> &BTreeSet<NodeId> {
        &self.spilled
    }

    pub fn is_spilled(&self, node: NodeId) -> bool {
        self.spilled.contains(&node)
    }

    /// Distinct colors handed out while popping the select stack, excluding fallbacks.
    pub fn colors_used(&self) -> usize {
        self.colors_used
    }
}

impl Display for Coloring {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (node, color) in self.iter() {
            write!(f, "{node}: {color}")?;
            if self.is_spilled(node) {
                write!(f, " (spilled)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
