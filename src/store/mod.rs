//! Repository data model
//!
//! Records persisted for every tracked path, commit and branch, plus the three-way
//! `ChangeSet` produced by comparing two path states.

pub mod blob;
pub mod persistence;

use crate::types::{ContentHash, Millis, PathHash, PathMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recorded state of one path in one revision.
///
/// `size == None` is a tombstone: the path existed before and is deleted as of this revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    pub path_hash: PathHash,
    pub size: Option<u64>,
    pub mtime: Millis,
    #[serde(default)]
    pub content_hash: Option<ContentHash>,
}

impl PathInfo {
    pub fn new(path_hash: PathHash, size: u64, mtime: Millis) -> Self {
        Self {
            path_hash,
            size: Some(size),
            mtime,
            content_hash: None,
        }
    }

    /// Tombstone for a previously recorded path, keeping its storage key.
    pub fn tombstone(&self) -> Self {
        Self {
            path_hash: self.path_hash.clone(),
            size: None,
            mtime: self.mtime,
            content_hash: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.size.is_none()
    }

    /// Zero-byte files never get a physical blob.
    pub fn has_blob(&self) -> bool {
        matches!(self.size, Some(size) if size > 0)
    }
}

/// Additions, deletions and modifications keyed by relative path. Disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub additions: BTreeMap<String, PathInfo>,
    pub deletions: BTreeMap<String, PathInfo>,
    pub modifications: BTreeMap<String, PathInfo>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty() && self.modifications.is_empty()
    }

    pub fn len(&self) -> usize {
        self.additions.len() + self.deletions.len() + self.modifications.len()
    }

    /// The per-revision delta: additions and modifications as-is, deletions as tombstones.
    pub fn to_delta(&self) -> PathMap {
        let mut delta = PathMap::new();
        for (path, info) in self.additions.iter().chain(self.modifications.iter()) {
            delta.insert(path.clone(), info.clone());
        }
        for (path, info) in &self.deletions {
            delta.insert(path.clone(), info.tombstone());
        }
        delta
    }
}

/// Replay one revision delta onto a running path map. Tombstones remove the path.
pub fn apply_delta(paths: &mut PathMap, delta: &PathMap) {
    for (path, info) in delta {
        if info.is_tombstone() {
            paths.remove(path);
        } else {
            paths.insert(path.clone(), info.clone());
        }
    }
}

/// Compare two recorded path maps.
///
/// Entries of `new` that are tombstones count as deletions if `old` held the path alive.
/// Modifications compare size and, when both sides know it, the content hash.
pub fn diff_path_sets(old: &PathMap, new: &PathMap) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for (path, info) in new {
        match (old.get(path), info.is_tombstone()) {
            (Some(previous), true) if !previous.is_tombstone() => {
                changes.deletions.insert(path.clone(), info.clone());
            }
            (_, true) => {}
            (None, false) => {
                changes.additions.insert(path.clone(), info.clone());
            }
            (Some(previous), false) if previous.is_tombstone() => {
                changes.additions.insert(path.clone(), info.clone());
            }
            (Some(previous), false) => {
                let content_differs = match (&previous.content_hash, &info.content_hash) {
                    (Some(a), Some(b)) => a != b,
                    _ => previous.mtime != info.mtime,
                };
                if previous.size != info.size || content_differs {
                    changes.modifications.insert(path.clone(), info.clone());
                }
            }
        }
    }
    for (path, info) in old {
        if !info.is_tombstone() && !new.contains_key(path) {
            changes.deletions.insert(path.clone(), info.tombstone());
        }
    }
    changes
}

/// One commit of a branch. Numbers are dense from 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub number: u32,
    pub ctime: Millis,
    #[serde(default)]
    pub message: Option<String>,
}

/// One branch of the repository.
///
/// `in_sync` is advisory bookkeeping: whether the latest commit matches the external VCS state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    pub number: u32,
    pub ctime: Millis,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub in_sync: bool,
    #[serde(default)]
    pub tracked: Vec<String>,
}

impl BranchInfo {
    /// Name for display: the branch name or its number.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("b{}", self.number))
    }
}
