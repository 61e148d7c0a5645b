//! Branch/Commit Store
//!
//! Owns the durable repository index: mode flags, tags, the branch list and every
//! branch's commit list. Per-operation inputs come in as small request structs.

use crate::error::ApiError;
use crate::history::sequential_path_set;
use crate::store::blob::BlobStore;
use crate::store::persistence::{
    load_commits, load_repository, save_commits, save_repository, save_revision, MetaLayout,
    RepositoryRecord, FORMAT_VERSION, META_FILE, META_FOLDER,
};
use crate::store::{BranchInfo, CommitInfo};
use crate::tree::filter::{PathFilters, TrackingScope};
use crate::tree::walker::{detect, ChangeDetectionRequest, PersistTarget};
use crate::types::{now_millis, PathMap};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Walk up from `start` to the first directory holding `.sos/.meta`.
pub fn find_repository_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(META_FOLDER).join(META_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Mode flags fixed when going offline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryModes {
    pub track: bool,
    pub picky: bool,
    pub strict: bool,
    pub compress: bool,
}

/// Inputs for creating a branch.
pub struct BranchRequest<'a> {
    pub name: Option<String>,
    /// Message of the branch's revision 0
    pub message: Option<String>,
    pub filters: &'a PathFilters,
    pub in_sync: bool,
}

/// Loaded repository index.
#[derive(Debug)]
pub struct Repository {
    layout: MetaLayout,
    record: RepositoryRecord,
    commits: BTreeMap<u32, Vec<CommitInfo>>,
}

impl Repository {
    /// Fresh index without branches; nothing is written until `save`.
    pub fn create(root: &Path, modes: RepositoryModes) -> Self {
        let record = RepositoryRecord {
            format: FORMAT_VERSION,
            version: env!("CARGO_PKG_VERSION").to_string(),
            tags: Vec::new(),
            branch: 0,
            next_branch: 0,
            track: modes.track || modes.picky,
            picky: modes.picky,
            strict: modes.strict,
            compress: modes.compress,
            branches: Vec::new(),
            config: serde_json::Map::new(),
        };
        Self {
            layout: MetaLayout::new(root),
            record,
            commits: BTreeMap::new(),
        }
    }

    /// Load the repository index and every branch's commit list.
    pub fn open(root: &Path) -> Result<Self, ApiError> {
        let layout = MetaLayout::new(root);
        if !layout.is_offline() {
            return Err(ApiError::UsageError(format!(
                "{} is not an offline repository (run 'sos offline' first)",
                root.display()
            )));
        }
        let record = load_repository(&layout)?;
        let mut commits = BTreeMap::new();
        for branch in &record.branches {
            commits.insert(branch.number, load_commits(&layout, branch.number)?);
        }
        debug!(
            branches = record.branches.len(),
            current = record.branch,
            "repository loaded"
        );
        Ok(Self {
            layout,
            record,
            commits,
        })
    }

    pub fn layout(&self) -> &MetaLayout {
        &self.layout
    }

    pub fn record(&self) -> &RepositoryRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut RepositoryRecord {
        &mut self.record
    }

    pub fn blobs(&self) -> BlobStore {
        BlobStore::new(self.layout.clone(), self.record.compress)
    }

    pub fn is_tracking(&self) -> bool {
        self.record.track || self.record.picky
    }

    pub fn save(&self) -> Result<(), ApiError> {
        save_repository(&self.layout, &self.record)?;
        Ok(())
    }

    pub fn save_branch(&self, branch: u32) -> Result<(), ApiError> {
        save_commits(&self.layout, branch, self.commits(branch))?;
        Ok(())
    }

    pub fn current_branch(&self) -> u32 {
        self.record.branch
    }

    pub fn set_current_branch(&mut self, branch: u32) -> Result<(), ApiError> {
        self.branch(branch)?;
        self.record.branch = branch;
        Ok(())
    }

    pub fn branches(&self) -> &[BranchInfo] {
        &self.record.branches
    }

    pub fn branch(&self, number: u32) -> Result<&BranchInfo, ApiError> {
        self.record
            .branches
            .iter()
            .find(|b| b.number == number)
            .ok_or_else(|| ApiError::UsageError(format!("Unknown branch {}", number)))
    }

    pub fn branch_mut(&mut self, number: u32) -> Result<&mut BranchInfo, ApiError> {
        self.record
            .branches
            .iter_mut()
            .find(|b| b.number == number)
            .ok_or_else(|| ApiError::UsageError(format!("Unknown branch {}", number)))
    }

    pub fn commits(&self, branch: u32) -> &[CommitInfo] {
        self.commits.get(&branch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of the newest revision of `branch`.
    pub fn latest_revision(&self, branch: u32) -> Result<u32, ApiError> {
        self.commits(branch).last().map(|c| c.number).ok_or_else(|| {
            ApiError::RepositoryStateError(format!("Branch {} has no revisions", branch))
        })
    }

    /// Path set of `branch` at `revision`.
    pub fn path_set(&self, branch: u32, revision: u32) -> Result<PathMap, ApiError> {
        sequential_path_set(&self.layout, branch, revision)
    }

    /// Path set of the current branch's newest revision.
    pub fn head_path_set(&self) -> Result<PathMap, ApiError> {
        let branch = self.current_branch();
        self.path_set(branch, self.latest_revision(branch)?)
    }

    /// Tracking patterns of a branch; empty in simple mode.
    pub fn tracking_patterns(&self, branch: u32) -> Vec<String> {
        if !self.is_tracking() {
            return Vec::new();
        }
        self.branch(branch)
            .map(|b| b.tracked.clone())
            .unwrap_or_default()
    }

    /// Scope of change detection for the given branches (pattern union in track mode).
    pub fn scope_for(&self, branches: &[u32]) -> Result<TrackingScope, ApiError> {
        if !self.is_tracking() {
            return Ok(TrackingScope::everything());
        }
        let mut patterns: Vec<String> = Vec::new();
        for branch in branches {
            for pattern in self.tracking_patterns(*branch) {
                if !patterns.contains(&pattern) {
                    patterns.push(pattern);
                }
            }
        }
        TrackingScope::only(&patterns)
    }

    /// Resolve a branch number or name.
    pub fn get_branch_by_name(&self, name: &str) -> Result<u32, ApiError> {
        if let Ok(number) = name.parse::<u32>() {
            if self.branch(number).is_ok() {
                return Ok(number);
            }
        }
        self.record
            .branches
            .iter()
            .find(|b| b.name.as_deref() == Some(name))
            .map(|b| b.number)
            .ok_or_else(|| ApiError::UsageError(format!("Unknown branch '{}'", name)))
    }

    /// Resolve a revision number (negative counts from the end) or tag within `branch`.
    pub fn get_revision_by_name(&self, branch: u32, name: &str) -> Result<u32, ApiError> {
        let commits = self.commits(branch);
        if let Ok(index) = name.parse::<i64>() {
            let count = commits.len() as i64;
            let resolved = if index < 0 { count + index } else { index };
            if resolved < 0 || resolved >= count {
                return Err(ApiError::UsageError(format!(
                    "Revision {} out of range for branch {} ({} revisions)",
                    name, branch, count
                )));
            }
            return Ok(commits[resolved as usize].number);
        }
        commits
            .iter()
            .find(|c| c.message.as_deref() == Some(name))
            .map(|c| c.number)
            .ok_or_else(|| {
                ApiError::UsageError(format!("Unknown revision or tag '{}' in branch {}", name, branch))
            })
    }

    /// Parse `branch/revision`, `branch/`, `/revision`, `revision` or `branch`.
    pub fn parse_revision_string(&self, argument: Option<&str>) -> Result<(u32, u32), ApiError> {
        let current = self.current_branch();
        let Some(argument) = argument.map(str::trim).filter(|a| !a.is_empty()) else {
            return Ok((current, self.latest_revision(current)?));
        };
        if let Some((branch_part, revision_part)) = argument.split_once('/') {
            let branch = if branch_part.is_empty() {
                current
            } else {
                self.get_branch_by_name(branch_part)?
            };
            let revision = if revision_part.is_empty() {
                self.latest_revision(branch)?
            } else {
                self.get_revision_by_name(branch, revision_part)?
            };
            return Ok((branch, revision));
        }
        if let Ok(revision) = self.get_revision_by_name(current, argument) {
            return Ok((current, revision));
        }
        let branch = self.get_branch_by_name(argument).map_err(|_| {
            ApiError::UsageError(format!("Unknown branch, revision or tag '{}'", argument))
        })?;
        Ok((branch, self.latest_revision(branch)?))
    }

    fn check_new_branch_name(&self, name: Option<&str>) -> Result<(), ApiError> {
        if let Some(name) = name {
            if self.record.branches.iter().any(|b| b.name.as_deref() == Some(name)) {
                return Err(ApiError::UsageError(format!("Branch '{}' already exists", name)));
            }
        }
        Ok(())
    }

    fn register_branch(
        &mut self,
        number: u32,
        request: &BranchRequest<'_>,
        tracked: Vec<String>,
        paths: &PathMap,
    ) -> Result<(), ApiError> {
        save_revision(&self.layout, number, 0, paths)?;
        let now = now_millis();
        self.commits.insert(
            number,
            vec![CommitInfo {
                number: 0,
                ctime: now,
                message: request.message.clone(),
            }],
        );
        self.record.branches.push(BranchInfo {
            number,
            ctime: now,
            name: request.name.clone(),
            in_sync: request.in_sync,
            tracked,
        });
        self.record.next_branch = number + 1;
        self.save_branch(number)?;
        self.save()
    }

    /// Create the next branch. Simple mode (or a repository without branches) snapshots
    /// the working tree; track mode clones the current branch's newest revision.
    pub fn create_branch(&mut self, request: &BranchRequest<'_>) -> Result<u32, ApiError> {
        if self.is_tracking() && !self.record.branches.is_empty() {
            return self.duplicate_branch(request);
        }
        self.check_new_branch_name(request.name.as_deref())?;
        let number = self.record.next_branch;
        let tracked = if self.record.branches.is_empty() {
            Vec::new()
        } else {
            self.tracking_patterns(self.current_branch())
        };
        let scope = if self.is_tracking() {
            TrackingScope::only(&tracked)?
        } else {
            TrackingScope::everything()
        };

        let blobs = self.blobs();
        let remembered = PathMap::new();
        let detection = ChangeDetectionRequest::new(
            self.layout.root(),
            &remembered,
            request.filters,
            &scope,
        )
        .check_content(self.record.strict)
        .persist_to(PersistTarget {
            blobs: &blobs,
            branch: number,
            revision: 0,
        });
        let outcome = detect(&detection)?;
        info!(
            branch = number,
            files = outcome.changes.additions.len(),
            bytes_read = outcome.bytes_read,
            bytes_written = outcome.bytes_written,
            "branch snapshot written"
        );
        self.register_branch(number, request, tracked, &outcome.changes.to_delta())?;
        Ok(number)
    }

    /// Create the next branch as a copy of the current branch's newest revision.
    pub fn duplicate_branch(&mut self, request: &BranchRequest<'_>) -> Result<u32, ApiError> {
        self.check_new_branch_name(request.name.as_deref())?;
        let source = self.current_branch();
        let source_revision = self.latest_revision(source)?;
        let number = self.record.next_branch;
        let paths = self.path_set(source, source_revision)?;
        let blobs = self.blobs();
        let mut copied = 0u64;
        for info in paths.values().filter(|info| info.has_blob()) {
            copied += blobs.copy_versioned_file(source, source_revision, number, 0, &info.path_hash)?;
        }
        info!(
            branch = number,
            from = source,
            revision = source_revision,
            files = paths.len(),
            bytes = copied,
            "branch cloned"
        );
        let tracked = self.branch(source)?.tracked.clone();
        self.register_branch(number, request, tracked, &paths)?;
        Ok(number)
    }

    /// Delete a branch with all revisions and blobs. The only branch can never be removed.
    ///
    /// Removing the current branch selects the highest remaining number; otherwise the
    /// current branch stays selected.
    pub fn remove_branch(&mut self, number: u32) -> Result<(), ApiError> {
        self.branch(number)?;
        if self.record.branches.len() <= 1 {
            return Err(ApiError::RepositoryStateError(
                "Cannot remove the only branch of the repository".to_string(),
            ));
        }
        let folder = self.layout.branch_folder(number);
        if folder.exists() {
            std::fs::remove_dir_all(&folder)?;
        }
        self.record.branches.retain(|b| b.number != number);
        self.commits.remove(&number);
        if self.record.branch == number {
            if let Some(max) = self.record.branches.iter().map(|b| b.number).max() {
                self.record.branch = max;
            }
        }
        info!(branch = number, current = self.record.branch, "branch removed");
        self.save()
    }

    /// Append a commit to `branch`; the revision metadata must already be written.
    pub fn add_commit(&mut self, branch: u32, message: Option<String>) -> Result<CommitInfo, ApiError> {
        let number = self.commits(branch).len() as u32;
        let commit = CommitInfo {
            number,
            ctime: now_millis(),
            message,
        };
        self.commits.entry(branch).or_default().push(commit.clone());
        self.branch_mut(branch)?.in_sync = false;
        self.save_branch(branch)?;
        self.save()?;
        Ok(commit)
    }

    /// Record a commit message as a unique tag.
    pub fn add_tag(&mut self, tag: &str) -> Result<(), ApiError> {
        if self.record.tags.iter().any(|t| t == tag) {
            return Err(ApiError::UsageError(format!("Tag '{}' already exists", tag)));
        }
        self.record.tags.push(tag.to_string());
        Ok(())
    }

    pub fn is_tag(&self, message: &str) -> bool {
        self.record.tags.iter().any(|t| t == message)
    }
}
