//! Revision Reconstructor
//!
//! Revision 0 of a branch is a full snapshot; every later revision stores only its delta.
//! The path set valid at revision `r` is the log replay of deltas `0..=r`, with tombstones
//! removing paths until a later delta re-adds them.

use crate::error::ApiError;
use crate::store::persistence::{load_revision, MetaLayout};
use crate::store::{apply_delta, diff_path_sets, ChangeSet};
use crate::types::PathMap;

/// State after replaying one revision.
#[derive(Debug, Clone)]
pub struct RevisionStep {
    pub revision: u32,
    /// What this revision changed relative to the previous one
    pub changes: ChangeSet,
    /// Full path set valid at this revision
    pub paths: PathMap,
}

/// Iterator over the path set after each revision `0..=up_to`.
///
/// Finite and restartable: create a new replay to start again from revision 0.
pub struct RevisionReplay<'a> {
    layout: &'a MetaLayout,
    branch: u32,
    next: u32,
    up_to: u32,
    paths: PathMap,
    failed: bool,
}

impl<'a> RevisionReplay<'a> {
    pub fn new(layout: &'a MetaLayout, branch: u32, up_to: u32) -> Self {
        Self {
            layout,
            branch,
            next: 0,
            up_to,
            paths: PathMap::new(),
            failed: false,
        }
    }

    fn step(&mut self, revision: u32) -> Result<RevisionStep, ApiError> {
        let delta = load_revision(self.layout, self.branch, revision)?;
        let previous = self.paths.clone();
        apply_delta(&mut self.paths, &delta);
        let changes = diff_path_sets(&previous, &self.paths);
        Ok(RevisionStep {
            revision,
            changes,
            paths: self.paths.clone(),
        })
    }
}

impl Iterator for RevisionReplay<'_> {
    type Item = Result<RevisionStep, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next > self.up_to {
            return None;
        }
        let revision = self.next;
        self.next += 1;
        let step = self.step(revision);
        if step.is_err() {
            self.failed = true;
        }
        Some(step)
    }
}

/// Path set of `branch` as of `up_to`, tombstones excluded.
pub fn sequential_path_set(
    layout: &MetaLayout,
    branch: u32,
    up_to: u32,
) -> Result<PathMap, ApiError> {
    let mut paths = PathMap::new();
    for revision in 0..=up_to {
        let delta = load_revision(layout, branch, revision)?;
        apply_delta(&mut paths, &delta);
    }
    Ok(paths)
}
