//! Workspace domain: repository operations on a working tree and their text output.

mod checkout;
mod commands;
mod format;
mod report;
mod tracking;
mod types;

pub use commands::WorkspaceCommandService;
pub use format::*;
pub use types::*;
