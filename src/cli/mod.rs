//! CLI layer for rgather.
//!
//! Provides the command-line interface using clap, with commands for
//! running search sessions and scaffolding prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
