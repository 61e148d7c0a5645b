//! Shared types for workspace commands: per-call requests and their results.

use crate::config::SosConfig;
use crate::error::ApiError;
use crate::merge::{MergeBlock, MergeOperation};
use crate::store::ChangeSet;
use crate::tree::filter::PathFilters;
use crate::types::Millis;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Working tree root plus the effective configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: SosConfig,
    filters: PathFilters,
}

impl Workspace {
    pub fn new(root: &Path, config: SosConfig) -> Result<Self, ApiError> {
        let filters = PathFilters::from_config(&config)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            filters,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SosConfig {
        &self.config
    }

    pub fn filters(&self) -> &PathFilters {
        &self.filters
    }
}

/// Parameters for `offline`. Mode flags are OR-ed with the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct OfflineRequest {
    pub name: Option<String>,
    pub message: Option<String>,
    pub track: bool,
    pub picky: bool,
    pub strict: bool,
    pub compress: bool,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OfflineResult {
    pub branch: u32,
    pub name: String,
    pub files: usize,
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnlineResult {
    pub removed: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    pub message: Option<String>,
    /// Record the message as a unique tag
    pub tag: bool,
    /// Commit even without changes
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitResult {
    pub branch: u32,
    pub revision: u32,
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub tagged: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BranchCreateRequest {
    pub name: Option<String>,
    pub message: Option<String>,
    /// Clone the current branch's latest revision instead of the working tree
    pub last: bool,
    /// Keep the current branch selected
    pub stay: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchCreateResult {
    pub branch: u32,
    pub name: Option<String>,
    pub files: usize,
    pub switched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SwitchRequest {
    pub target: Option<String>,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchResult {
    pub branch: u32,
    pub revision: u32,
    /// Files written or removed in the working tree
    pub files_touched: usize,
}

#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub target: Option<String>,
    /// File and line level policy
    pub merge: MergeOperation,
    pub char_merge: MergeOperation,
    /// Use incoming line endings
    pub eol: bool,
    pub force: bool,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        Self {
            target: None,
            merge: MergeOperation::Both,
            char_merge: MergeOperation::Both,
            eol: false,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateResult {
    pub branch: u32,
    pub revision: u32,
    pub restored: usize,
    pub removed: usize,
    pub merged: usize,
    pub kept: usize,
    pub patterns_added: usize,
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub branch: String,
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub branch: u32,
    pub current: u32,
}

/// Changes of the working tree against one revision.
#[derive(Debug, Clone, Serialize)]
pub struct ChangesResult {
    pub branch: u32,
    pub revision: u32,
    pub changes: ChangeSet,
}

/// How one path differs in `diff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDiffKind {
    Added,
    Deleted,
    Binary,
    LineEndingsOnly,
    TimestampOnly,
    Changed(Vec<MergeBlock>),
}

#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: String,
    pub kind: FileDiffKind,
}

#[derive(Debug, Clone)]
pub struct DiffResult {
    pub branch: u32,
    pub revision: u32,
    pub files: Vec<FileDiff>,
}

/// One row of the branch table.
#[derive(Debug, Clone, Serialize)]
pub struct BranchRow {
    pub number: u32,
    pub name: Option<String>,
    pub revisions: usize,
    pub in_sync: bool,
    pub current: bool,
    pub ctime: Millis,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub root: PathBuf,
    pub track: bool,
    pub picky: bool,
    pub strict: bool,
    pub compress: bool,
    pub branch: u32,
    pub revision: u32,
    pub pending_additions: usize,
    pub pending_deletions: usize,
    pub pending_modifications: usize,
    pub branches: Vec<BranchRow>,
    pub tracked: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub revision: u32,
    pub ctime: Millis,
    pub message: Option<String>,
    pub tagged: bool,
    pub additions: usize,
    pub deletions: usize,
    pub modifications: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogResult {
    pub branch: u32,
    pub name: Option<String>,
    pub entries: Vec<LogEntry>,
}

/// Status marker of a listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LsMarker {
    Unchanged,
    Added,
    Modified,
    Deleted,
    Ignored,
    Tracked,
}

impl LsMarker {
    pub fn symbol(&self) -> &'static str {
        match self {
            LsMarker::Unchanged => " ",
            LsMarker::Added => "A",
            LsMarker::Modified => "M",
            LsMarker::Deleted => "D",
            LsMarker::Ignored => "I",
            LsMarker::Tracked => "T",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LsEntry {
    pub path: String,
    pub marker: LsMarker,
}

#[derive(Debug, Clone, Serialize)]
pub struct LsResult {
    pub entries: Vec<LsEntry>,
}

/// Outcome of a tracking pattern edit.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingResult {
    pub branch: u32,
    pub patterns: Vec<String>,
    /// Files renamed by `mv`
    pub moved: usize,
}
