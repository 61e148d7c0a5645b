//! Blob Store
//!
//! Versioned file contents live at `b<N>/r<M>/<pathHash>`. Only revisions that added or
//! modified a path hold its blob, so reading "the file as of revision r" walks backwards
//! to the nearest revision that physically contains it.

use crate::error::StorageError;
use crate::store::persistence::MetaLayout;
use crate::store::PathInfo;
use crate::tree::hasher::{hash_reader, BUFFER_SIZE};
use crate::types::{ContentHash, Millis};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

/// Outcome of storing one blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobWrite {
    pub content_hash: ContentHash,
    /// Uncompressed bytes consumed from the source
    pub bytes_read: u64,
    /// Bytes physically written (after compression)
    pub bytes_written: u64,
}

/// Reads and writes versioned file contents below the metadata folder.
#[derive(Debug, Clone)]
pub struct BlobStore {
    layout: MetaLayout,
    compress: bool,
}

impl BlobStore {
    pub fn new(layout: MetaLayout, compress: bool) -> Self {
        Self { layout, compress }
    }

    /// Stream content into the blob for `path_hash` in the given revision.
    ///
    /// If a blob already exists there, it must hold the same content; otherwise this is a
    /// hash collision and nothing is overwritten.
    pub fn write_blob<R: Read>(
        &self,
        branch: u32,
        revision: u32,
        path_hash: &str,
        source: &mut R,
    ) -> Result<BlobWrite, StorageError> {
        let target = self.layout.blob_path(branch, revision, path_hash);
        if target.exists() {
            return self.verify_existing(&target, source);
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(&target)?;
        let writer = BufWriter::new(file);
        let (content_hash, bytes_read) = if self.compress {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            let result = copy_hashing(source, &mut encoder)?;
            encoder.finish()?.flush()?;
            result
        } else {
            let mut writer = writer;
            let result = copy_hashing(source, &mut writer)?;
            writer.flush()?;
            result
        };
        let bytes_written = std::fs::metadata(&target)?.len();
        tracing::trace!(
            blob = %target.display(),
            bytes_read,
            bytes_written,
            "blob written"
        );
        Ok(BlobWrite {
            content_hash,
            bytes_read,
            bytes_written,
        })
    }

    fn verify_existing<R: Read>(
        &self,
        target: &Path,
        source: &mut R,
    ) -> Result<BlobWrite, StorageError> {
        let (incoming, bytes_read) = hash_reader(source)?;
        let (existing, _) = hash_reader(&mut self.open_physical(target)?)?;
        if incoming != existing {
            return Err(StorageError::HashCollision {
                path: target.display().to_string(),
            });
        }
        Ok(BlobWrite {
            content_hash: incoming,
            bytes_read,
            bytes_written: 0,
        })
    }

    /// Walk back from `revision` to the revision whose folder holds the blob.
    pub fn find_physical_revision(
        &self,
        branch: u32,
        revision: u32,
        path_hash: &str,
    ) -> Result<(u32, PathBuf), StorageError> {
        let mut current = revision;
        loop {
            let candidate = self.layout.blob_path(branch, current, path_hash);
            if candidate.is_file() {
                return Ok((current, candidate));
            }
            if current == 0 {
                return Err(StorageError::UnknownVersionedFile {
                    branch,
                    revision,
                    path_hash: path_hash.to_string(),
                });
            }
            current -= 1;
        }
    }

    fn open_physical(&self, path: &Path) -> Result<Box<dyn Read>, StorageError> {
        let reader = BufReader::new(File::open(path)?);
        if self.compress {
            Ok(Box::new(GzDecoder::new(reader)))
        } else {
            Ok(Box::new(reader))
        }
    }

    /// Open a decompressing reader for the file as of `revision`.
    pub fn open_blob(
        &self,
        branch: u32,
        revision: u32,
        path_hash: &str,
    ) -> Result<Box<dyn Read>, StorageError> {
        let (_, path) = self.find_physical_revision(branch, revision, path_hash)?;
        self.open_physical(&path)
    }

    /// Read the whole file as of `revision` into memory. Zero-byte entries read as empty.
    pub fn read_blob(
        &self,
        branch: u32,
        revision: u32,
        info: &PathInfo,
    ) -> Result<Vec<u8>, StorageError> {
        if !info.has_blob() {
            return Ok(Vec::new());
        }
        let mut reader = self.open_blob(branch, revision, &info.path_hash)?;
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Ok(content)
    }

    /// Restore the file as of `revision` to `target`, chunk-wise, and apply its mtime.
    pub fn restore_to(
        &self,
        target: &Path,
        branch: u32,
        revision: u32,
        info: &PathInfo,
    ) -> Result<u64, StorageError> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let copied = if info.has_blob() {
            let mut reader = self.open_blob(branch, revision, &info.path_hash)?;
            let mut writer = BufWriter::new(File::create(target)?);
            let mut buffer = vec![0u8; BUFFER_SIZE];
            let mut total = 0u64;
            loop {
                let read = reader.read(&mut buffer)?;
                if read == 0 {
                    break;
                }
                writer.write_all(&buffer[..read])?;
                total += read as u64;
            }
            writer.flush()?;
            total
        } else {
            File::create(target)?;
            0
        };
        set_mtime(target, info.mtime)?;
        Ok(copied)
    }

    /// Copy the physical blob for a path into another branch/revision without recompressing.
    pub fn copy_versioned_file(
        &self,
        from_branch: u32,
        from_revision: u32,
        to_branch: u32,
        to_revision: u32,
        path_hash: &str,
    ) -> Result<u64, StorageError> {
        let (_, source) = self.find_physical_revision(from_branch, from_revision, path_hash)?;
        let target = self.layout.blob_path(to_branch, to_revision, path_hash);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(std::fs::copy(source, target)?)
    }
}

fn copy_hashing<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
) -> std::io::Result<(ContentHash, u64)> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = source.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        sink.write_all(&buffer[..read])?;
        total += read as u64;
    }
    Ok((hex::encode(hasher.finalize().as_bytes()), total))
}

/// Set a file's modification time from a millisecond timestamp.
pub fn set_mtime(path: &Path, mtime: Millis) -> std::io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    let time = UNIX_EPOCH + Duration::from_millis(mtime.max(0) as u64);
    file.set_modified(time)
}
