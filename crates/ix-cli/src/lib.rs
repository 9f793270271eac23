//! ix CLI library.
//!
//! This crate provides the command-line control client for ix.

mod app;
mod cli;
pub mod commands;
mod config;
mod host;

pub use app::App;
pub use cli::{Cli, Commands};
pub use config::{Config, WritePolicyName};
pub use host::HostHints;
