//! Error types
//!
//! `StorageError` covers the on-disk layer (metadata files and blobs). `ApiError` is what
//! every repository operation returns; the binary turns it into one message and an exit code.

use thiserror::Error;

/// Errors raised while reading or writing repository files.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Missing metadata file {path}")]
    MissingMetadata { path: String },

    #[error("Malformed metadata in {path}: {message}")]
    Serialization { path: String, message: String },

    #[error("Unsupported metadata format {found} in {path} (expected {expected})")]
    UnsupportedFormat {
        path: String,
        found: u32,
        expected: u32,
    },

    #[error("No versioned file {path_hash} in branch {branch} at or before revision {revision}")]
    UnknownVersionedFile {
        branch: u32,
        revision: u32,
        path_hash: String,
    },

    #[error("Hash collision: a different blob already exists at {path}")]
    HashCollision { path: String },
}

/// Errors surfaced at the operation boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad arguments or unknown branch/revision/tag.
    #[error("{0}")]
    UsageError(String),

    /// Missing or malformed metadata, collisions, forbidden structural changes.
    #[error("Repository state error: {0}")]
    RepositoryStateError(String),

    /// A merge that could not be resolved by the configured policy.
    #[error("Merge conflict: {0}")]
    MergeConflict(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(StorageError),
}

impl ApiError {
    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::UsageError(_) => 1,
            ApiError::RepositoryStateError(_) => 2,
            ApiError::ConfigError(_) => 3,
            ApiError::StorageError(_) => 4,
            ApiError::MergeConflict(_) => 5,
        }
    }

    pub fn is_repository_state(&self) -> bool {
        matches!(self, ApiError::RepositoryStateError(_))
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::IoError(_) | StorageError::InvalidPath(_) => ApiError::StorageError(err),
            structural => ApiError::RepositoryStateError(structural.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::StorageError(StorageError::IoError(err))
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
