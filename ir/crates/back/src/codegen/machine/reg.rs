use std::fmt::{
    Display,
    Formatter,
};

use itertools::Itertools;
use smallvec::SmallVec;

use crate::codegen::machine::isa::PhysicalRegister;

/// A graph color, i.e. an index into a [`RegisterSet`].
pub type Color = usize;

/// The fixed, ordered collection of `K` registers available for allocation.
///
/// Color `i` is always mapped to the `i`-th register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterSet<R: PhysicalRegister> {
    regs: SmallVec<[R; 16]>,
}

impl<R: PhysicalRegister> RegisterSet<R> {
    pub fn new(regs: impl IntoIterator<Item = R>) -> Self {
        let regs: SmallVec<[R; 16]> = regs.into_iter().collect();
        assert!(!regs.is_empty(), "A register set needs at least one register");
        assert!(
            regs.iter().all_unique(),
            "Register set contains duplicates: {regs:?}"
        );
        Self { regs }
    }

    pub fn all() -> Self {
        Self::new(R::all().iter().copied())
    }

    /// Keeps only the first `n` registers. Budgets larger than the set are clamped.
    pub fn limit(&self, n: usize) -> Self {
        Self::new(self.regs.iter().copied().take(n))
    }

    /// The number of registers, i.e. the chromatic bound of the allocator.
    pub fn k(&self) -> usize {
        self.regs.len()
    }

    pub fn get(&self, color: Color) -> R {
        *self.regs.get(color).unwrap_or_else(|| {
            panic!(
                "Color {color} is out of range for a set of {} registers",
                self.k()
            )
        })
    }

    pub fn contains(&self, reg: R) -> bool {
        self.regs.contains(&reg)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = R> + '_ {
        self.regs.iter().copied()
    }
}

impl<R: PhysicalRegister> Display for RegisterSet<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.regs.iter().map(PhysicalRegister::name).join(", "))
    }
}
