//! sos: Subversion Offline Solution
//!
//! Offline branches and commits stored next to a working tree in a `.sos` folder, for
//! use while the regular version control system is out of reach.

pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod merge;
pub mod repository;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod workspace;
