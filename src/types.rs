//! Core types shared across the repository engine.

use std::collections::BTreeMap;

/// PathHash: hex BLAKE3 of a repository-relative path; the blob storage key
pub type PathHash = String;

/// ContentHash: hex BLAKE3 of a file's uncompressed content
pub type ContentHash = String;

/// Milliseconds since the Unix epoch
pub type Millis = i64;

/// Relative path (`/`-separated) to its recorded state, sorted for deterministic output
pub type PathMap = BTreeMap<String, crate::store::PathInfo>;

/// Current wall-clock time in milliseconds
pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

/// Convert a filesystem timestamp to milliseconds since the epoch
pub fn system_time_millis(time: std::time::SystemTime) -> Millis {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp_millis()
}

/// Render a millisecond timestamp for human output
pub fn format_millis(ms: Millis) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}
