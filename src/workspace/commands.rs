//! Workspace command service: one entry point per repository operation.
//!
//! Every operation first compares the working tree with the current branch's newest
//! revision. The CLI parses, calls one method and formats the result.

use crate::error::ApiError;
use crate::repository::{BranchRequest, Repository, RepositoryModes};
use crate::store::persistence::{save_revision, MetaLayout};
use crate::store::ChangeSet;
use crate::tree::filter::TrackingScope;
use crate::tree::walker::{detect, find_changes, ChangeDetectionRequest, PersistTarget};
use crate::types::PathMap;
use crate::workspace::types::{
    BranchCreateRequest, BranchCreateResult, CommitRequest, CommitResult, DeleteRequest,
    DeleteResult, OfflineRequest, OfflineResult, OnlineResult, Workspace,
};
use tracing::{info, warn};

pub struct WorkspaceCommandService;

impl WorkspaceCommandService {
    /// Open the repository of a workspace.
    pub fn open(workspace: &Workspace) -> Result<Repository, ApiError> {
        Repository::open(workspace.root())
    }

    /// Working tree changes against `remembered` within `scope`.
    pub(crate) fn local_changes(
        workspace: &Workspace,
        repository: &Repository,
        remembered: &PathMap,
        scope: &TrackingScope,
    ) -> Result<ChangeSet, ApiError> {
        let request =
            ChangeDetectionRequest::new(workspace.root(), remembered, workspace.filters(), scope)
                .check_content(repository.record().strict);
        find_changes(&request)
    }

    /// Fail with a usage error if the working tree differs from the current branch head.
    pub(crate) fn require_clean(
        workspace: &Workspace,
        repository: &Repository,
        action: &str,
    ) -> Result<(), ApiError> {
        let current = repository.current_branch();
        let remembered = repository.head_path_set()?;
        let scope = repository.scope_for(&[current])?;
        let changes = Self::local_changes(workspace, repository, &remembered, &scope)?;
        if !changes.is_empty() {
            return Err(ApiError::UsageError(format!(
                "Cannot {}: {} uncommitted change(s) in the working tree (commit or use --force)",
                action,
                changes.len()
            )));
        }
        Ok(())
    }

    /// Start offline versioning in the workspace root.
    pub fn offline(
        workspace: &Workspace,
        request: &OfflineRequest,
    ) -> Result<OfflineResult, ApiError> {
        let layout = MetaLayout::new(workspace.root());
        if layout.is_offline() {
            if !request.force {
                return Err(ApiError::UsageError(
                    "Repository is already offline (use --force to start over)".to_string(),
                ));
            }
            warn!("Discarding existing offline repository metadata");
            std::fs::remove_dir_all(layout.meta_folder())?;
        }
        let config = workspace.config();
        let modes = RepositoryModes {
            track: request.track || config.track,
            picky: request.picky || config.picky,
            strict: request.strict || config.strict,
            compress: request.compress || config.compress,
        };
        let name = request
            .name
            .clone()
            .unwrap_or_else(|| config.default_branch.clone());
        let mut repository = Repository::create(workspace.root(), modes);
        let branch = repository.create_branch(&BranchRequest {
            name: Some(name.clone()),
            message: Some(
                request
                    .message
                    .clone()
                    .unwrap_or_else(|| "Offline repository created".to_string()),
            ),
            filters: workspace.filters(),
            in_sync: true,
        })?;
        let files = repository.path_set(branch, 0)?.len();
        info!(branch, files, ?modes, "repository taken offline");
        Ok(OfflineResult {
            branch,
            name,
            files,
            compressed: modes.compress,
        })
    }

    /// Stop offline versioning and remove all offline metadata.
    pub fn online(workspace: &Workspace, force: bool) -> Result<OnlineResult, ApiError> {
        let repository = Self::open(workspace)?;
        let unsynced: Vec<String> = repository
            .branches()
            .iter()
            .filter(|b| !b.in_sync)
            .map(|b| b.label())
            .collect();
        if !unsynced.is_empty() && !force {
            return Err(ApiError::UsageError(format!(
                "Branches not in sync with the external VCS: {} (use --force to discard)",
                unsynced.join(", ")
            )));
        }
        let folder = repository.layout().meta_folder().to_path_buf();
        std::fs::remove_dir_all(&folder)?;
        info!(folder = %folder.display(), "repository back online");
        Ok(OnlineResult { removed: folder })
    }

    /// Record the working tree changes as the next revision of the current branch.
    pub fn commit(
        workspace: &Workspace,
        request: &CommitRequest,
    ) -> Result<CommitResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        let branch = repository.current_branch();
        let latest = repository.latest_revision(branch)?;
        let revision = latest + 1;

        if request.tag {
            let message = request.message.as_deref().ok_or_else(|| {
                ApiError::UsageError("A tag needs a commit message".to_string())
            })?;
            if repository.is_tag(message) {
                return Err(ApiError::UsageError(format!(
                    "Tag '{}' already exists",
                    message
                )));
            }
        }
        if repository.record().picky && repository.tracking_patterns(branch).is_empty() {
            return Err(ApiError::UsageError(
                "No tracking patterns to commit in picky mode (add some with 'sos add')"
                    .to_string(),
            ));
        }

        let remembered = repository.path_set(branch, latest)?;
        let scope = repository.scope_for(&[branch])?;
        let blobs = repository.blobs();
        let detection =
            ChangeDetectionRequest::new(workspace.root(), &remembered, workspace.filters(), &scope)
                .check_content(repository.record().strict)
                .persist_to(PersistTarget {
                    blobs: &blobs,
                    branch,
                    revision,
                });
        let outcome = detect(&detection)?;
        let changes = &outcome.changes;
        if changes.is_empty() && !request.force {
            return Err(ApiError::UsageError(
                "Nothing to commit (use --force to record an empty revision)".to_string(),
            ));
        }

        save_revision(repository.layout(), branch, revision, &changes.to_delta())?;
        repository.add_commit(branch, request.message.clone())?;
        if request.tag {
            if let Some(message) = &request.message {
                repository.add_tag(message)?;
            }
        }
        let picky = repository.record().picky;
        let branch_info = repository.branch_mut(branch)?;
        branch_info.in_sync = false;
        if picky {
            branch_info.tracked.clear();
        }
        repository.save()?;

        if outcome.bytes_read > 0 {
            info!(
                ratio = outcome.bytes_written as f64 / outcome.bytes_read as f64,
                "stored {} of {} bytes",
                outcome.bytes_written,
                outcome.bytes_read
            );
        }
        info!(
            branch,
            revision,
            added = changes.additions.len(),
            deleted = changes.deletions.len(),
            modified = changes.modifications.len(),
            "committed"
        );
        Ok(CommitResult {
            branch,
            revision,
            additions: changes.additions.len(),
            deletions: changes.deletions.len(),
            modifications: changes.modifications.len(),
            bytes_read: outcome.bytes_read,
            bytes_written: outcome.bytes_written,
            tagged: request.tag,
        })
    }

    /// Create a branch and, unless `stay`, make it current.
    pub fn branch(
        workspace: &Workspace,
        request: &BranchCreateRequest,
    ) -> Result<BranchCreateResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        let branch_request = BranchRequest {
            name: request.name.clone(),
            message: request.message.clone(),
            filters: workspace.filters(),
            in_sync: false,
        };
        let branch = if request.last {
            repository.duplicate_branch(&branch_request)?
        } else {
            repository.create_branch(&branch_request)?
        };
        if !request.stay {
            repository.set_current_branch(branch)?;
            repository.save()?;
        }
        let files = repository.path_set(branch, 0)?.len();
        Ok(BranchCreateResult {
            branch,
            name: request.name.clone(),
            files,
            switched: !request.stay,
        })
    }

    /// Remove a branch. The working tree follows the newly selected branch if the
    /// current one was deleted.
    pub fn delete(
        workspace: &Workspace,
        request: &DeleteRequest,
    ) -> Result<DeleteResult, ApiError> {
        let mut repository = Self::open(workspace)?;
        let branch = repository.get_branch_by_name(&request.branch)?;
        if repository.branches().len() <= 1 {
            return Err(ApiError::RepositoryStateError(
                "Cannot remove the only branch of the repository".to_string(),
            ));
        }
        if !request.force {
            Self::require_clean(workspace, &repository, "delete a branch")?;
        }
        let was_current = branch == repository.current_branch();
        repository.remove_branch(branch)?;
        let current = repository.current_branch();
        if was_current {
            let revision = repository.latest_revision(current)?;
            let touched = Self::checkout(workspace, &repository, current, revision)?;
            info!(branch = current, touched, "working tree moved to remaining branch");
        }
        Ok(DeleteResult { branch, current })
    }
}
