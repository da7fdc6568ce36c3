use std::{
    collections::{
        BTreeMap,
        BTreeSet,
    },
    fmt::{
        Display,
        Formatter,
    },
    hash::BuildHasherDefault,
};

pub use coalescer::Coalescer;
use itertools::Itertools;
use nodal_middle::{
    IrGraph,
    NodeId,
};
use rustc_hash::FxHasher;
use tracing::{
    debug,
    info,
};

use crate::codegen::{
    machine::{
        isa::PhysicalRegister,
        RegisterSet,
    },
    register_allocator::{
        coloring::Coloring,
        interference::InterferenceGraph,
        liveness::Liveness,
    },
};

mod coalescer;
pub mod coloring;
pub mod interference;
pub mod liveness;

pub type FxIndexSet<T> = indexmap::IndexSet<T, BuildHasherDefault<FxHasher>>;
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Every register-needing node reachable from the end block, operands before their users.
pub fn ordered_nodes(graph: &IrGraph) -> FxIndexSet<NodeId> {
    graph
        .post_order()
        .into_iter()
        .filter(|node| graph[*node].needs_register())
        .collect()
}

/// The final node → register mapping of one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation<R: PhysicalRegister> {
    registers: BTreeMap<NodeId, R>,
    spilled: BTreeSet<NodeId>,
}

impl<R: PhysicalRegister> Allocation<R> {
    /// Maps color `i` to the `i`-th register of `registers`.
    pub fn from_coloring(coloring: &Coloring, registers: &RegisterSet<R>) -> Self {
        Self {
            registers: coloring
                .iter()
                .map(|(node, color)| (node, registers.get(color)))
                .collect(),
            spilled: coloring.spilled().clone(),
        }
    }

    pub fn get(&self, node: NodeId) -> Option<R> {
        self.registers.get(&node).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (NodeId, R)> + '_ {
        self.registers.iter().map(|(node, reg)| (*node, *reg))
    }

    /// Nodes whose register came from the fallback path and may be shared with a value
    /// that is live at the same time.
    pub fn spilled(&self) -> &BTreeSet<NodeId> {
        &self.spilled
    }

    pub fn is_spilled(&self, node: NodeId) -> bool {
        self.spilled.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn colors_used(&self) -> usize {
        self.registers.values().unique().count()
    }
}

impl<R: PhysicalRegister> Display for Allocation<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (node, reg) in self.iter() {
            write!(f, "{node}: {}", reg.name())?;
            if self.is_spilled(node) {
                write!(f, " (spilled)")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Everything one allocation run computed, kept around for inspection.
#[derive(Debug, Clone)]
pub struct AllocationRun<R: PhysicalRegister> {
    pub nodes: FxIndexSet<NodeId>,
    pub liveness: Liveness,
    pub interference: InterferenceGraph,
    pub coloring: Coloring,
    pub allocation: Allocation<R>,
}

/// Graph-coloring register allocator for a single function.
///
/// Every run owns its liveness tables, interference graph and worklists; the graph itself
/// is only read.
#[derive(Debug)]
pub struct RegisterAllocator<'graph, R: PhysicalRegister> {
    graph: &'graph IrGraph,
    registers: RegisterSet<R>,
}

impl<'graph, R: PhysicalRegister> RegisterAllocator<'graph, R> {
    pub fn new(graph: &'graph IrGraph, registers: RegisterSet<R>) -> Self {
        Self { graph, registers }
    }

    pub fn allocate_registers(&self) -> Allocation<R> {
        self.run().allocation
    }

    pub fn run(&self) -> AllocationRun<R> {
        let k = self.registers.k();
        info!(
            "Allocating registers for @{} with {k} registers {}",
            self.graph.name(),
            self.registers
        );
        let nodes = ordered_nodes(self.graph);
        debug!("Register-needing nodes: {}", nodes.iter().join(", "));

        let liveness = Liveness::analyze(self.graph, &nodes);
        debug!("Liveness:\n{liveness}");

        let interference = InterferenceGraph::build(&nodes, &liveness);
        debug!("Interference graph:\n{interference}");

        let coloring = coloring::color(&interference, k);
        let allocation = Allocation::from_coloring(&coloring, &self.registers);
        for node in &nodes {
            assert!(
                allocation.get(*node).is_some(),
                "{node} needs a register but was not allocated one"
            );
        }
        info!(
            "Allocated {} values to {} registers, {} on the fallback path",
            allocation.len(),
            allocation.colors_used(),
            allocation.spilled().len()
        );
        AllocationRun {
            nodes,
            liveness,
            interference,
            coloring,
            allocation,
        }
    }
}
