//! Subcommand implementations.

pub mod dump;
pub mod monitor;
pub mod schemas;
pub mod value;
