//! Read-only reports: changes, diff, status, log and ls.

use crate::error::ApiError;
use crate::history::RevisionReplay;
use crate::merge::{diff_text, is_binary, TextDiff};
use crate::store::persistence::META_FOLDER;
use crate::tree::filter::{compile_all, GlobPattern};
use crate::tree::path::{absolute_path, file_name, relative_key};
use crate::workspace::commands::WorkspaceCommandService;
use crate::workspace::types::{
    BranchRow, ChangesResult, DiffResult, FileDiff, FileDiffKind, LogEntry, LogResult, LsEntry,
    LsMarker, LsResult, StatusResult, Workspace,
};
use std::collections::BTreeMap;
use tracing::warn;
use walkdir::WalkDir;

impl WorkspaceCommandService {
    /// Working tree changes against a revision (default: current branch head).
    pub fn changes(
        workspace: &Workspace,
        target: Option<&str>,
    ) -> Result<ChangesResult, ApiError> {
        let repository = Self::open(workspace)?;
        let (branch, revision) = repository.parse_revision_string(target)?;
        let remembered = repository.path_set(branch, revision)?;
        let scope = repository.scope_for(&[repository.current_branch(), branch])?;
        let changes = Self::local_changes(workspace, &repository, &remembered, &scope)?;
        Ok(ChangesResult {
            branch,
            revision,
            changes,
        })
    }

    /// Like `changes`, with line blocks for modified text files.
    pub fn diff(workspace: &Workspace, target: Option<&str>) -> Result<DiffResult, ApiError> {
        let repository = Self::open(workspace)?;
        let (branch, revision) = repository.parse_revision_string(target)?;
        let remembered = repository.path_set(branch, revision)?;
        let scope = repository.scope_for(&[repository.current_branch(), branch])?;
        let changes = Self::local_changes(workspace, &repository, &remembered, &scope)?;
        let blobs = repository.blobs();
        let config = workspace.config();
        let texttype = compile_all(&config.texttype)?;
        let bintype = compile_all(&config.bintype)?;

        let mut files: BTreeMap<String, FileDiffKind> = BTreeMap::new();
        for key in changes.additions.keys() {
            files.insert(key.clone(), FileDiffKind::Added);
        }
        for key in changes.deletions.keys() {
            files.insert(key.clone(), FileDiffKind::Deleted);
        }
        for key in changes.modifications.keys() {
            let Some(info) = remembered.get(key) else {
                continue;
            };
            let committed = blobs.read_blob(branch, revision, info)?;
            let local = std::fs::read(absolute_path(workspace.root(), key))?;
            let name = file_name(key);
            let kind = if is_binary(name, &committed, &texttype, &bintype)
                || is_binary(name, &local, &texttype, &bintype)
            {
                FileDiffKind::Binary
            } else {
                match diff_text(&committed, &local)? {
                    TextDiff::Identical => FileDiffKind::TimestampOnly,
                    TextDiff::LineEndingsOnly => FileDiffKind::LineEndingsOnly,
                    TextDiff::Changed(blocks) => FileDiffKind::Changed(blocks),
                }
            };
            files.insert(key.clone(), kind);
        }
        Ok(DiffResult {
            branch,
            revision,
            files: files
                .into_iter()
                .map(|(path, kind)| FileDiff { path, kind })
                .collect(),
        })
    }

    /// Repository modes, branch table and pending change counts.
    pub fn status(workspace: &Workspace) -> Result<StatusResult, ApiError> {
        let repository = Self::open(workspace)?;
        let current = repository.current_branch();
        let revision = repository.latest_revision(current)?;
        let remembered = repository.path_set(current, revision)?;
        let scope = repository.scope_for(&[current])?;
        let pending = Self::local_changes(workspace, &repository, &remembered, &scope)?;
        let record = repository.record();
        let branches = repository
            .branches()
            .iter()
            .map(|b| BranchRow {
                number: b.number,
                name: b.name.clone(),
                revisions: repository.commits(b.number).len(),
                in_sync: b.in_sync,
                current: b.number == current,
                ctime: b.ctime,
            })
            .collect();
        Ok(StatusResult {
            root: workspace.root().to_path_buf(),
            track: record.track,
            picky: record.picky,
            strict: record.strict,
            compress: record.compress,
            branch: current,
            revision,
            pending_additions: pending.additions.len(),
            pending_deletions: pending.deletions.len(),
            pending_modifications: pending.modifications.len(),
            branches,
            tracked: repository.tracking_patterns(current),
        })
    }

    /// Revision history of a branch with per-revision change counts.
    pub fn log(workspace: &Workspace, branch: Option<&str>) -> Result<LogResult, ApiError> {
        let repository = Self::open(workspace)?;
        let number = match branch {
            Some(name) => repository.get_branch_by_name(name)?,
            None => repository.current_branch(),
        };
        let latest = repository.latest_revision(number)?;
        let commits = repository.commits(number);
        let mut entries = Vec::with_capacity(commits.len());
        for (step, commit) in RevisionReplay::new(repository.layout(), number, latest).zip(commits) {
            let step = step?;
            entries.push(LogEntry {
                revision: commit.number,
                ctime: commit.ctime,
                message: commit.message.clone(),
                tagged: commit
                    .message
                    .as_deref()
                    .map(|m| repository.is_tag(m))
                    .unwrap_or(false),
                additions: step.changes.additions.len(),
                deletions: step.changes.deletions.len(),
                modifications: step.changes.modifications.len(),
            });
        }
        Ok(LogResult {
            branch: number,
            name: repository.branch(number)?.name.clone(),
            entries,
        })
    }

    /// Working tree files (optionally filtered by a glob) with their status markers.
    pub fn ls(workspace: &Workspace, pattern: Option<&str>) -> Result<LsResult, ApiError> {
        let repository = Self::open(workspace)?;
        let current = repository.current_branch();
        let remembered = repository.head_path_set()?;
        let scope = repository.scope_for(&[current])?;
        let changes = Self::local_changes(workspace, &repository, &remembered, &scope)?;
        let filter = pattern.map(GlobPattern::new).transpose()?;
        let tracking = repository.is_tracking();

        let mut entries: BTreeMap<String, LsMarker> = BTreeMap::new();
        let walker = WalkDir::new(workspace.root())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != META_FOLDER);
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(key) = relative_key(workspace.root(), entry.path()) else {
                continue;
            };
            let marker = if workspace.filters().is_ignored_key(&key) {
                LsMarker::Ignored
            } else if changes.additions.contains_key(&key) {
                LsMarker::Added
            } else if changes.modifications.contains_key(&key) {
                LsMarker::Modified
            } else if tracking && scope.includes(&key) {
                LsMarker::Tracked
            } else {
                LsMarker::Unchanged
            };
            entries.insert(key, marker);
        }
        for key in changes.deletions.keys() {
            entries.insert(key.clone(), LsMarker::Deleted);
        }
        Ok(LsResult {
            entries: entries
                .into_iter()
                .filter(|(path, _)| filter.as_ref().map_or(true, |f| f.matches(path)))
                .map(|(path, marker)| LsEntry { path, marker })
                .collect(),
        })
    }
}
