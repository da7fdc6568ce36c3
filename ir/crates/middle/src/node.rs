use std::fmt::{
    Display,
    Formatter,
};

use cranelift_entity::entity_impl;
use smallvec::SmallVec;
use strum_macros::{
    Display,
    EnumIter,
};

/// Stable index of a node inside its [`IrGraph`](crate::IrGraph).
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct NodeId(u32);

entity_impl!(NodeId, "n");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Division and modulo can trap, so they are ordered on the side-effect chain
    /// and their value is read through a [`ProjKind::Result`] projection.
    pub const fn has_side_effect(self) -> bool {
        matches!(self, Self::Div | Self::Mod)
    }

    pub const fn is_commutative(self) -> bool {
        matches!(self, Self::Add | Self::Mul)
    }

    pub const fn arity(self) -> usize {
        if self.has_side_effect() {
            3
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProjKind {
    SideEffect,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Start,
    Block,
    ConstInt(i64),
    Binary(BinaryOp),
    Return,
    Proj(ProjKind),
    Phi,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Block => write!(f, "block"),
            Self::ConstInt(value) => write!(f, "const {value}"),
            Self::Binary(op) => write!(f, "{op}"),
            Self::Return => write!(f, "ret"),
            Self::Proj(kind) => write!(f, "proj {kind}"),
            Self::Phi => write!(f, "phi"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// The block this node is scheduled in. `None` for blocks themselves.
    pub block: Option<NodeId>,
    pub(crate) predecessors: SmallVec<[NodeId; 3]>,
}

impl Node {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    /// Side-effect input of `div` and `mod`.
    pub const BINARY_SIDE_EFFECT: usize = 2;
    pub const RETURN_SIDE_EFFECT: usize = 0;
    pub const RETURN_RESULT: usize = 1;

    pub fn new(
        kind: NodeKind,
        block: Option<NodeId>,
        predecessors: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        Self {
            kind,
            block,
            predecessors: predecessors.into_iter().collect(),
        }
    }

    pub fn predecessors(&self) -> &[NodeId] {
        &self.predecessors
    }

    /// Returns true if the node produces a value of its own, i.e. it defines itself.
    pub const fn defines_value(&self) -> bool {
        matches!(self.kind, NodeKind::ConstInt(_) | NodeKind::Binary(_))
    }

    /// Returns true if the node's result has to be held in a register.
    ///
    /// Structural nodes (`start`, blocks, projections) and returns never need one.
    pub const fn needs_register(&self) -> bool {
        !matches!(
            self.kind,
            NodeKind::Proj(_) | NodeKind::Start | NodeKind::Block | NodeKind::Return
        )
    }

    pub const fn is_proj(&self) -> bool {
        matches!(self.kind, NodeKind::Proj(_))
    }
}
