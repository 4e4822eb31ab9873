pub mod cli;
pub mod compiler;

pub use cli::*;
