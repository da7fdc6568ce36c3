use std::fmt::{
    Display,
    Formatter,
};

use nodal_middle::BinaryOp;
use smallvec::{
    smallvec,
    SmallVec,
};
use strum_macros::IntoStaticStr;

use crate::codegen::machine::isa::PhysicalRegister;

/// Arithmetic the emission layer knows how to lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub const fn is_commutative(self) -> bool {
        matches!(self, Self::Add | Self::Mul)
    }
}

impl TryFrom<BinaryOp> for ArithOp {
    type Error = BinaryOp;

    fn try_from(op: BinaryOp) -> Result<Self, Self::Error> {
        match op {
            BinaryOp::Add => Ok(Self::Add),
            BinaryOp::Sub => Ok(Self::Sub),
            BinaryOp::Mul => Ok(Self::Mul),
            BinaryOp::Div => Ok(Self::Div),
            BinaryOp::Mod => Err(op),
        }
    }
}

/// One emitted instruction per lowered IR node, already in physical registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr<R: PhysicalRegister> {
    MovImm { dest: R, imm: i64 },
    Binary { op: ArithOp, dest: R, lhs: R, rhs: R },
    Ret { value: R },
}

impl<R: PhysicalRegister> Instr<R> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MovImm { .. } => "mov",
            Self::Binary { op, .. } => op.into(),
            Self::Ret { .. } => "ret",
        }
    }

    pub fn writes(&self) -> Option<R> {
        match self {
            Self::MovImm { dest, .. } | Self::Binary { dest, .. } => Some(*dest),
            Self::Ret { .. } => None,
        }
    }

    pub fn reads(&self) -> SmallVec<[R; 2]> {
        match self {
            Self::MovImm { .. } => smallvec![],
            Self::Binary { lhs, rhs, .. } => smallvec![*lhs, *rhs],
            Self::Ret { value } => smallvec![*value],
        }
    }
}

impl<R: PhysicalRegister> Display for Instr<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MovImm { dest, imm } => write!(f, "mov {}, {imm}", dest.name()),
            Self::Binary { dest, lhs, rhs, .. } => write!(
                f,
                "{} {}, {}, {}",
                self.name(),
                dest.name(),
                lhs.name(),
                rhs.name()
            ),
            Self::Ret { value } => write!(f, "ret {}", value.name()),
        }
    }
}
