#![deny(clippy::enum_glob_use)]
#![warn(clippy::pedantic, clippy::nursery)]
#![forbid(unsafe_code)]
#![allow(clippy::too_many_lines, clippy::module_name_repetitions)]

pub mod codegen;

pub use codegen::{
    CodegenConfig,
    CodegenError,
};
