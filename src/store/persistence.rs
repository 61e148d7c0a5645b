//! On-disk layout and versioned JSON metadata.
//!
//! ```text
//! <root>/.sos/.meta                  repository record
//! <root>/.sos/b<N>/.meta             branch record (commit list)
//! <root>/.sos/b<N>/r<M>/.meta        revision record (delta only)
//! <root>/.sos/b<N>/r<M>/<pathHash>   blob
//! ```

use crate::error::StorageError;
use crate::store::{BranchInfo, CommitInfo};
use crate::types::PathMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the metadata folder inside the working tree
pub const META_FOLDER: &str = ".sos";

/// Name of the metadata file at every level
pub const META_FILE: &str = ".meta";

/// Schema version written into every metadata file
pub const FORMAT_VERSION: u32 = 1;

/// Paths of every metadata file and blob for one working tree.
#[derive(Debug, Clone)]
pub struct MetaLayout {
    root: PathBuf,
    meta: PathBuf,
}

impl MetaLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            meta: root.join(META_FOLDER),
        }
    }

    /// Working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.sos` folder
    pub fn meta_folder(&self) -> &Path {
        &self.meta
    }

    pub fn repository_file(&self) -> PathBuf {
        self.meta.join(META_FILE)
    }

    pub fn branch_folder(&self, branch: u32) -> PathBuf {
        self.meta.join(format!("b{}", branch))
    }

    pub fn branch_file(&self, branch: u32) -> PathBuf {
        self.branch_folder(branch).join(META_FILE)
    }

    pub fn revision_folder(&self, branch: u32, revision: u32) -> PathBuf {
        self.branch_folder(branch).join(format!("r{}", revision))
    }

    pub fn revision_file(&self, branch: u32, revision: u32) -> PathBuf {
        self.revision_folder(branch, revision).join(META_FILE)
    }

    pub fn blob_path(&self, branch: u32, revision: u32, path_hash: &str) -> PathBuf {
        self.revision_folder(branch, revision).join(path_hash)
    }

    pub fn is_offline(&self) -> bool {
        self.repository_file().is_file()
    }
}

/// Repository-wide record: flags, tags, current branch, branch index, local configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub format: u32,
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub branch: u32,
    pub next_branch: u32,
    #[serde(default)]
    pub track: bool,
    #[serde(default)]
    pub picky: bool,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub branches: Vec<BranchInfo>,
    /// Repository-local configuration overlay
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

/// Per-branch record: the ordered commit list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRecord {
    pub format: u32,
    #[serde(default)]
    pub commits: Vec<CommitInfo>,
}

/// Per-revision record: only the paths that changed relative to the previous revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub format: u32,
    #[serde(default)]
    pub paths: PathMap,
}

trait Versioned {
    fn format(&self) -> u32;
}

impl Versioned for RepositoryRecord {
    fn format(&self) -> u32 {
        self.format
    }
}

impl Versioned for BranchRecord {
    fn format(&self) -> u32 {
        self.format
    }
}

impl Versioned for RevisionRecord {
    fn format(&self) -> u32 {
        self.format
    }
}

fn read_record<T: DeserializeOwned + Versioned>(path: &Path) -> Result<T, StorageError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::MissingMetadata {
            path: path.display().to_string(),
        },
        _ => StorageError::IoError(e),
    })?;
    let record: T = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        StorageError::Serialization {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    })?;
    if record.format() != FORMAT_VERSION {
        return Err(StorageError::UnsupportedFormat {
            path: path.display().to_string(),
            found: record.format(),
            expected: FORMAT_VERSION,
        });
    }
    Ok(record)
}

// Overwrites in place; a crash mid-write leaves a truncated file.
fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record).map_err(|e| StorageError::Serialization {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    writer.flush()?;
    Ok(())
}

pub fn load_repository(layout: &MetaLayout) -> Result<RepositoryRecord, StorageError> {
    read_record(&layout.repository_file())
}

pub fn save_repository(layout: &MetaLayout, record: &RepositoryRecord) -> Result<(), StorageError> {
    write_record(&layout.repository_file(), record)
}

pub fn load_commits(layout: &MetaLayout, branch: u32) -> Result<Vec<CommitInfo>, StorageError> {
    let record: BranchRecord = read_record(&layout.branch_file(branch))?;
    Ok(record.commits)
}

pub fn save_commits(
    layout: &MetaLayout,
    branch: u32,
    commits: &[CommitInfo],
) -> Result<(), StorageError> {
    let record = BranchRecord {
        format: FORMAT_VERSION,
        commits: commits.to_vec(),
    };
    write_record(&layout.branch_file(branch), &record)
}

pub fn load_revision(layout: &MetaLayout, branch: u32, revision: u32) -> Result<PathMap, StorageError> {
    let record: RevisionRecord = read_record(&layout.revision_file(branch, revision))?;
    Ok(record.paths)
}

pub fn save_revision(
    layout: &MetaLayout,
    branch: u32,
    revision: u32,
    paths: &PathMap,
) -> Result<(), StorageError> {
    let record = RevisionRecord {
        format: FORMAT_VERSION,
        paths: paths.clone(),
    };
    write_record(&layout.revision_file(branch, revision), &record)
}
