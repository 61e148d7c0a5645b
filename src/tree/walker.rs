//! Change Detector
//!
//! Compares the live working tree with a remembered path map. Walk order is sorted so
//! results are reproducible. Per-file I/O failures are logged and skipped; storage
//! failures while persisting blobs abort the walk.

use crate::error::ApiError;
use crate::store::blob::BlobStore;
use crate::store::persistence::META_FOLDER;
use crate::store::{ChangeSet, PathInfo};
use crate::tree::filter::{PathFilters, TrackingScope};
use crate::tree::hasher::{hash_file, hash_path};
use crate::tree::path::relative_key;
use crate::tree::progress::ProgressThrottle;
use crate::types::{system_time_millis, PathMap};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Where new or changed content is written while detecting.
#[derive(Clone, Copy)]
pub struct PersistTarget<'a> {
    pub blobs: &'a BlobStore,
    pub branch: u32,
    pub revision: u32,
}

/// Parameters for one detection pass, built fresh per call.
pub struct ChangeDetectionRequest<'a> {
    pub root: &'a Path,
    /// Last known state to compare against
    pub remembered: &'a PathMap,
    pub filters: &'a PathFilters,
    pub scope: &'a TrackingScope,
    /// Compare content hashes instead of trusting size and mtime
    pub check_content: bool,
    /// Report the remembered entry for changed paths instead of the live one
    pub inverse: bool,
    pub persist: Option<PersistTarget<'a>>,
}

impl<'a> ChangeDetectionRequest<'a> {
    pub fn new(
        root: &'a Path,
        remembered: &'a PathMap,
        filters: &'a PathFilters,
        scope: &'a TrackingScope,
    ) -> Self {
        Self {
            root,
            remembered,
            filters,
            scope,
            check_content: false,
            inverse: false,
            persist: None,
        }
    }

    pub fn check_content(mut self, check: bool) -> Self {
        self.check_content = check;
        self
    }

    pub fn inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    pub fn persist_to(mut self, target: PersistTarget<'a>) -> Self {
        self.persist = Some(target);
        self
    }
}

/// Detection result with transfer statistics.
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub changes: ChangeSet,
    pub files_visited: u64,
    pub files_skipped: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

enum FileChange {
    Added(PathInfo),
    Modified(PathInfo),
}

/// Compute the change set of the working tree against `request.remembered`.
pub fn find_changes(request: &ChangeDetectionRequest<'_>) -> Result<ChangeSet, ApiError> {
    detect(request).map(|outcome| outcome.changes)
}

/// Like `find_changes`, also reporting visit and transfer counts.
pub fn detect(request: &ChangeDetectionRequest<'_>) -> Result<DetectionOutcome, ApiError> {
    let mut outcome = DetectionOutcome::default();
    let mut seen: HashSet<String> = HashSet::new();
    // Keys (or key prefixes) the walk could not look into
    let mut unreadable: Vec<String> = Vec::new();
    let mut progress = ProgressThrottle::new("detect");

    let walker = WalkDir::new(request.root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| keep_entry(entry, request.filters));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                outcome.files_skipped += 1;
                if let Some(key) = e.path().and_then(|p| relative_key(request.root, p).ok()) {
                    unreadable.push(key);
                }
                continue;
            }
        };
        progress.tick();
        if !entry.file_type().is_file() {
            continue;
        }
        let key = match relative_key(request.root, entry.path()) {
            Ok(key) => key,
            Err(e) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                outcome.files_skipped += 1;
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if request.filters.is_ignored_file(&name) || !request.scope.includes(&key) {
            continue;
        }
        outcome.files_visited += 1;
        seen.insert(key.clone());

        match inspect_file(request, &key, entry.path(), &mut outcome) {
            Ok(Some(FileChange::Added(info))) => {
                outcome.changes.additions.insert(key, info);
            }
            Ok(Some(FileChange::Modified(info))) => {
                outcome.changes.modifications.insert(key, info);
            }
            Ok(None) => {}
            Err(FileError::Io(e)) => {
                warn!("Skipping {}: {}", entry.path().display(), e);
                outcome.files_skipped += 1;
            }
            Err(FileError::Fatal(e)) => return Err(e),
        }
    }

    for (key, previous) in request.remembered {
        if previous.is_tombstone() || seen.contains(key) || is_below_any(key, &unreadable) {
            continue;
        }
        if !request.scope.includes(key) || request.filters.is_ignored_key(key) {
            continue;
        }
        let info = if request.inverse {
            previous.clone()
        } else {
            previous.tombstone()
        };
        outcome.changes.deletions.insert(key.clone(), info);
    }

    debug!(
        visited = outcome.files_visited,
        skipped = outcome.files_skipped,
        added = outcome.changes.additions.len(),
        deleted = outcome.changes.deletions.len(),
        modified = outcome.changes.modifications.len(),
        "change detection finished"
    );
    Ok(outcome)
}

// `prefix` is a file key or a directory key; the empty key is the root itself.
fn is_below_any(key: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| {
        prefix.is_empty()
            || key == prefix
            || key
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

fn keep_entry(entry: &DirEntry, filters: &PathFilters) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    name != META_FOLDER && !filters.is_ignored_dir(&name)
}

enum FileError {
    Io(std::io::Error),
    Fatal(ApiError),
}

impl From<std::io::Error> for FileError {
    fn from(e: std::io::Error) -> Self {
        FileError::Io(e)
    }
}

fn inspect_file(
    request: &ChangeDetectionRequest<'_>,
    key: &str,
    path: &Path,
    outcome: &mut DetectionOutcome,
) -> Result<Option<FileChange>, FileError> {
    let metadata = std::fs::metadata(path)?;
    let size = metadata.len();
    let mtime = system_time_millis(metadata.modified()?);
    let mut live_hash = None;

    let change = match request.remembered.get(key) {
        None => FileChange::Added(PathInfo::new(hash_path(key), size, mtime)),
        Some(previous) if previous.is_tombstone() => {
            FileChange::Added(PathInfo::new(previous.path_hash.clone(), size, mtime))
        }
        Some(previous) => {
            let changed = if previous.size != Some(size) {
                true
            } else if size == 0 {
                false
            } else if request.check_content && previous.content_hash.is_some() {
                let hash = hash_file(path)?;
                let differs = previous.content_hash.as_deref() != Some(hash.as_str());
                live_hash = Some(hash);
                differs
            } else {
                previous.mtime != mtime
            };
            if !changed {
                return Ok(None);
            }
            if request.inverse {
                return Ok(Some(FileChange::Modified(previous.clone())));
            }
            FileChange::Modified(PathInfo::new(previous.path_hash.clone(), size, mtime))
        }
    };

    let change = match change {
        FileChange::Added(info) => FileChange::Added(complete(request, path, info, live_hash, outcome)?),
        FileChange::Modified(info) => {
            FileChange::Modified(complete(request, path, info, live_hash, outcome)?)
        }
    };
    Ok(Some(change))
}

// Fill in the content hash, persisting the blob when a target revision is given.
fn complete(
    request: &ChangeDetectionRequest<'_>,
    path: &Path,
    mut info: PathInfo,
    live_hash: Option<String>,
    outcome: &mut DetectionOutcome,
) -> Result<PathInfo, FileError> {
    if !info.has_blob() {
        return Ok(info);
    }
    if let Some(target) = request.persist {
        let mut source = std::fs::File::open(path)?;
        let written = target
            .blobs
            .write_blob(target.branch, target.revision, &info.path_hash, &mut source)
            .map_err(|e| FileError::Fatal(e.into()))?;
        outcome.bytes_read += written.bytes_read;
        outcome.bytes_written += written.bytes_written;
        info.size = Some(written.bytes_read);
        info.content_hash = Some(written.content_hash);
    } else if let Some(hash) = live_hash {
        info.content_hash = Some(hash);
    } else if request.check_content {
        info.content_hash = Some(hash_file(path)?);
    }
    Ok(info)
}
