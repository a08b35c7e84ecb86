//! CLI module for the Office365 license manager.
//!
//! This module provides the command-line interface for managing
//! user license assignments declaratively.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
