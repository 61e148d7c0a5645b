//! Moving the working tree between revisions: `switch` overwrites, `update` merges.

use crate::error::ApiError;
use crate::merge::{
    is_binary, merge, ConflictChoice, ConflictResolver, MergeOperation, MergeOptions,
};
use crate::repository::Repository;
use crate::store::blob::set_mtime;
use crate::store::PathInfo;
use crate::tree::filter::compile_all;
use crate::tree::path::{absolute_path, file_name};
use crate::tree::walker::{find_changes, ChangeDetectionRequest};
use crate::types::system_time_millis;
use crate::workspace::commands::WorkspaceCommandService;
use crate::workspace::types::{
    SwitchRequest, SwitchResult, UpdateRequest, UpdateResult, Workspace,
};
use std::path::Path;
use tracing::{debug, info};

fn remove_file(path: &Path) -> Result<(), ApiError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl WorkspaceCommandService {
    /// Make the working tree match `branch`/`revision` within the union tracking scope.
    ///
    /// Files whose content already matches the target keep their bytes and only take over
    /// the recorded modification time. Returns the number of files written or removed.
    pub(crate) fn checkout(
        workspace: &Workspace,
        repository: &Repository,
        branch: u32,
        revision: u32,
    ) -> Result<usize, ApiError> {
        let target = repository.path_set(branch, revision)?;
        let scope = repository.scope_for(&[repository.current_branch(), branch])?;
        let request =
            ChangeDetectionRequest::new(workspace.root(), &target, workspace.filters(), &scope)
                .check_content(true);
        let changes = find_changes(&request)?;
        let blobs = repository.blobs();
        let mut touched = 0;

        for key in changes.additions.keys() {
            debug!(path = %key, "removing file absent from target");
            remove_file(&absolute_path(workspace.root(), key))?;
            touched += 1;
        }
        for key in changes.deletions.keys().chain(changes.modifications.keys()) {
            let Some(info) = target.get(key) else {
                continue;
            };
            debug!(path = %key, "restoring file from revision {}", revision);
            blobs.restore_to(&absolute_path(workspace.root(), key), branch, revision, info)?;
            touched += 1;
        }

        let mut aligned = 0;
        for (key, info) in &target {
            if info.is_tombstone()
                || changes.deletions.contains_key(key)
                || changes.modifications.contains_key(key)
                || !scope.includes(key)
                || workspace.filters().is_ignored_key(key)
            {
                continue;
            }
            let path = absolute_path(workspace.root(), key);
            let Ok(metadata) = std::fs::metadata(&path) else {
                continue;
            };
            if system_time_millis(metadata.modified()?) != info.mtime {
                set_mtime(&path, info.mtime)?;
                aligned += 1;
            }
        }
        if aligned > 0 {
            debug!(aligned, "modification times taken over from revision {}", revision);
        }
        Ok(touched)
    }

    /// Overwrite the working tree with a revision and make its branch current.
    pub fn switch(
        workspace: &Workspace,
        request: &SwitchRequest,
    ) -> Result<SwitchResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        let (branch, revision) = repository.parse_revision_string(request.target.as_deref())?;
        if !request.force {
            Self::require_clean(workspace, &repository, "switch")?;
        }
        let files_touched = Self::checkout(workspace, &repository, branch, revision)?;
        if branch != repository.current_branch() {
            repository.set_current_branch(branch)?;
            repository.save()?;
        }
        info!(branch, revision, files_touched, "switched");
        Ok(SwitchResult {
            branch,
            revision,
            files_touched,
        })
    }

    /// Merge a revision into the working tree; the current branch stays selected and
    /// gains the target's tracking patterns.
    pub fn update(
        workspace: &Workspace,
        request: &UpdateRequest,
        resolver: &mut dyn ConflictResolver,
    ) -> Result<UpdateResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        let (branch, revision) = repository.parse_revision_string(request.target.as_deref())?;
        if !request.force {
            Self::require_clean(workspace, &repository, "update")?;
        }
        let current = repository.current_branch();
        let target = repository.path_set(branch, revision)?;
        let scope = repository.scope_for(&[current, branch])?;
        let detection =
            ChangeDetectionRequest::new(workspace.root(), &target, workspace.filters(), &scope)
                .check_content(true);
        let changes = find_changes(&detection)?;
        let blobs = repository.blobs();
        let config = workspace.config();
        let texttype = compile_all(&config.texttype)?;
        let bintype = compile_all(&config.bintype)?;
        let options = MergeOptions {
            line: request.merge,
            char: request.char_merge,
            eol: request.eol || config.eol,
        };
        let mut result = UpdateResult {
            branch,
            revision,
            ..UpdateResult::default()
        };

        // Local-only files
        for key in changes.additions.keys() {
            match request.merge {
                MergeOperation::Insert => result.kept += 1,
                _ => {
                    remove_file(&absolute_path(workspace.root(), key))?;
                    result.removed += 1;
                }
            }
        }
        // Target-only files
        for key in changes.deletions.keys() {
            if request.merge == MergeOperation::Remove {
                result.kept += 1;
                continue;
            }
            if let Some(info) = target.get(key) {
                blobs.restore_to(&absolute_path(workspace.root(), key), branch, revision, info)?;
                result.restored += 1;
            }
        }
        // Files on both sides with different content
        for key in changes.modifications.keys() {
            let Some(info) = target.get(key) else {
                continue;
            };
            let path = absolute_path(workspace.root(), key);
            let mine = std::fs::read(&path)?;
            let theirs = blobs.read_blob(branch, revision, info)?;
            let binary = is_binary(file_name(key), &mine, &texttype, &bintype)
                || is_binary(file_name(key), &theirs, &texttype, &bintype);
            if binary {
                let take_theirs = match request.merge {
                    MergeOperation::Insert | MergeOperation::Both => true,
                    MergeOperation::Remove => false,
                    MergeOperation::Ask => resolver.resolve_binary(key)? != ConflictChoice::Mine,
                };
                if take_theirs {
                    write_merged(&path, &theirs, info)?;
                    result.merged += 1;
                } else {
                    result.kept += 1;
                }
                continue;
            }
            let merged = merge(&theirs, &mine, &options, resolver)?;
            if merged == mine {
                result.kept += 1;
            } else {
                std::fs::write(&path, &merged)?;
                result.merged += 1;
            }
        }

        if repository.is_tracking() {
            let incoming = repository.tracking_patterns(branch);
            let tracked = &mut repository.branch_mut(current)?.tracked;
            for pattern in incoming {
                if !tracked.contains(&pattern) {
                    tracked.push(pattern);
                    result.patterns_added += 1;
                }
            }
            repository.save()?;
        }
        info!(
            branch,
            revision,
            restored = result.restored,
            removed = result.removed,
            merged = result.merged,
            "updated"
        );
        Ok(result)
    }
}

// Whole-file replacement keeps the incoming modification time.
fn write_merged(path: &Path, content: &[u8], info: &PathInfo) -> Result<(), ApiError> {
    std::fs::write(path, content)?;
    set_mtime(path, info.mtime)?;
    Ok(())
}
