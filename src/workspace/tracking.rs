//! Tracking pattern edits for track and picky mode.

use crate::error::ApiError;
use crate::repository::Repository;
use crate::store::persistence::META_FOLDER;
use crate::tree::filter::GlobPattern;
use crate::tree::path::{absolute_path, relative_key};
use crate::workspace::commands::WorkspaceCommandService;
use crate::workspace::types::{TrackingResult, Workspace};
use std::collections::HashSet;
use tracing::{info, warn};
use walkdir::WalkDir;

fn require_tracking(repository: &Repository) -> Result<(), ApiError> {
    if !repository.is_tracking() {
        return Err(ApiError::UsageError(
            "Tracking patterns are only used in track or picky mode".to_string(),
        ));
    }
    Ok(())
}

fn result(repository: &Repository, moved: usize) -> Result<TrackingResult, ApiError> {
    let branch = repository.current_branch();
    Ok(TrackingResult {
        branch,
        patterns: repository.branch(branch)?.tracked.clone(),
        moved,
    })
}

impl WorkspaceCommandService {
    /// Add a tracking pattern to the current branch.
    pub fn add(workspace: &Workspace, pattern: &str) -> Result<TrackingResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        require_tracking(&repository)?;
        GlobPattern::new(pattern)?;
        let branch = repository.current_branch();
        let tracked = &mut repository.branch_mut(branch)?.tracked;
        if tracked.iter().any(|p| p == pattern) {
            return Err(ApiError::UsageError(format!(
                "Pattern '{}' is already tracked",
                pattern
            )));
        }
        tracked.push(pattern.to_string());
        repository.save()?;
        info!(branch, pattern, "tracking pattern added");
        result(&repository, 0)
    }

    /// Remove a tracking pattern from the current branch.
    pub fn rm(workspace: &Workspace, pattern: &str) -> Result<TrackingResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        require_tracking(&repository)?;
        let branch = repository.current_branch();
        let tracked = &mut repository.branch_mut(branch)?.tracked;
        let before = tracked.len();
        tracked.retain(|p| p != pattern);
        if tracked.len() == before {
            return Err(ApiError::UsageError(format!(
                "Pattern '{}' is not tracked",
                pattern
            )));
        }
        repository.save()?;
        info!(branch, pattern, "tracking pattern removed");
        result(&repository, 0)
    }

    /// Replace pattern `from` by `to`, renaming matching working files unless `soft`.
    pub fn mv(
        workspace: &Workspace,
        from: &str,
        to: &str,
        soft: bool,
    ) -> Result<TrackingResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        require_tracking(&repository)?;
        let branch = repository.current_branch();
        if !repository.branch(branch)?.tracked.iter().any(|p| p == from) {
            return Err(ApiError::UsageError(format!("Pattern '{}' is not tracked", from)));
        }
        let source = GlobPattern::new(from)?;
        let target = GlobPattern::new(to)?;
        target.substitute(&source, &[])?;

        let mut moves = Vec::new();
        if !soft {
            let filters = workspace.filters();
            let walker = WalkDir::new(workspace.root())
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_type().is_dir()
                        || (e.file_name() != META_FOLDER
                            && !filters.is_ignored_dir(&e.file_name().to_string_lossy()))
                });
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
                if filters.is_ignored_key(&key) {
                    continue;
                }
                if let Some(captured) = source.captures(&key) {
                    let renamed = target.substitute(&source, &captured)?;
                    moves.push((key, renamed));
                }
            }
            let mut targets = HashSet::new();
            for (key, renamed) in &moves {
                if !targets.insert(renamed.as_str()) {
                    return Err(ApiError::UsageError(format!(
                        "Cannot move: '{}' and another file would both become '{}'",
                        key, renamed
                    )));
                }
                if absolute_path(workspace.root(), renamed).exists() {
                    return Err(ApiError::UsageError(format!(
                        "Cannot move: target '{}' already exists",
                        renamed
                    )));
                }
            }
            for (key, renamed) in &moves {
                let destination = absolute_path(workspace.root(), renamed);
                if let Some(parent) = destination.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::rename(absolute_path(workspace.root(), key), &destination)?;
            }
        }

        let tracked = &mut repository.branch_mut(branch)?.tracked;
        tracked.retain(|p| p != from);
        if !tracked.iter().any(|p| p == to) {
            tracked.push(to.to_string());
        }
        repository.save()?;
        info!(branch, from, to, moved = moves.len(), "tracking pattern moved");
        result(&repository, moves.len())
    }
}
