//! Tooling & Integration Layer
//!
//! Command-line parsing, static dispatch to the workspace command service, and terminal
//! prompts for interactive merges.

pub mod cli;
pub mod prompt;

pub use cli::{Cli, CliContext, Commands, ConfigCommands};
pub use prompt::PromptResolver;
