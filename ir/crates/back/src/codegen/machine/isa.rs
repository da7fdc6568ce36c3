use std::{
    fmt::Debug,
    hash::Hash,
};

pub trait PhysicalRegister: Debug + Clone + Copy + PartialEq + Eq + Hash + Sized + 'static {
    fn name(&self) -> &'static str;

    /// Every allocatable register, in the order colors are mapped onto them.
    fn all() -> &'static [Self];
}
