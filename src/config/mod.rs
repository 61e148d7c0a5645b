//! Configuration
//!
//! Layered settings: built-in defaults, the global TOML file, the repository-local overlay
//! stored in the repository metadata, then `SOS__*` environment variables.

pub mod editor;
pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Effective settings for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SosConfig {
    /// Compare files by content hash instead of size and mtime
    #[serde(default)]
    pub strict: bool,

    /// Track mode: only paths matching the branch's tracking patterns are versioned
    #[serde(default)]
    pub track: bool,

    /// Picky mode: like track mode, patterns are cleared after every commit
    #[serde(default)]
    pub picky: bool,

    /// Compress blobs of newly created repositories
    #[serde(default)]
    pub compress: bool,

    /// Name of the first branch created by `offline`
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// File name globs never versioned
    #[serde(default = "default_ignores")]
    pub ignores: Vec<String>,

    #[serde(default)]
    pub ignores_whitelist: Vec<String>,

    /// Directory name globs never descended into
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,

    #[serde(default)]
    pub ignore_dirs_whitelist: Vec<String>,

    /// File name globs always merged as text
    #[serde(default = "default_texttype")]
    pub texttype: Vec<String>,

    /// File name globs always treated as binary
    #[serde(default)]
    pub bintype: Vec<String>,

    /// Use the incoming side's line endings when merging (default keeps local)
    #[serde(default)]
    pub eol: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_branch() -> String {
    "trunk".to_string()
}

fn default_ignores() -> Vec<String> {
    ["*.bak", "*.py[cdo]", "*.class", ".fslckout", "_FOSSIL_", "*.sos.zip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_dirs() -> Vec<String> {
    [".*", "__pycache__", ".mypy_cache"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_texttype() -> Vec<String> {
    ["*.md", "*.txt", "*.rs", "*.py", "*.toml", "*.json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SosConfig {
    fn default() -> Self {
        Self {
            strict: false,
            track: false,
            picky: false,
            compress: false,
            default_branch: default_branch(),
            ignores: default_ignores(),
            ignores_whitelist: Vec::new(),
            ignore_dirs: default_ignore_dirs(),
            ignore_dirs_whitelist: Vec::new(),
            texttype: default_texttype(),
            bintype: Vec::new(),
            eol: false,
            logging: LoggingConfig::default(),
        }
    }
}
