use lalrpop_util::lalrpop_mod;

pub use module::{
    parse,
    Module,
};

pub mod module;

lalrpop_mod!(
    #[allow(clippy::all)]
    grammar
);
