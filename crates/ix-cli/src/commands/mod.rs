//! CLI subcommand implementations.

pub mod control;
pub mod export;
pub mod simulate;
pub mod status;
