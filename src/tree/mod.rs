//! Working tree scanning
//!
//! Walks the live file tree, applies ignore and tracking filters, and computes the
//! `ChangeSet` against a remembered path map.

pub mod filter;
pub mod hasher;
pub mod path;
pub mod progress;
pub mod walker;

pub use filter::{GlobPattern, PathFilters, TrackingScope};
pub use walker::{detect, find_changes, ChangeDetectionRequest, DetectionOutcome, PersistTarget};
