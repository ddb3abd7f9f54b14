//! Subcommands of the `savanna` binary

pub mod hunt;
pub mod knowledge;
pub mod train;
