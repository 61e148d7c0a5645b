//! Path and content hashing

use crate::types::{ContentHash, PathHash};
use std::io::Read;
use unicode_normalization::UnicodeNormalization;

/// Buffer size for streamed hashing and blob copies
pub const BUFFER_SIZE: usize = 1024 * 1024;

/// Compute the storage key for a repository-relative path.
///
/// The path is NFC-normalised first so the same logical name keeps the same key
/// regardless of how the filesystem reports it.
pub fn hash_path(relative: &str) -> PathHash {
    let normalized: String = relative.nfc().collect();
    hex::encode(blake3::hash(normalized.as_bytes()).as_bytes())
}

/// Hash content from a reader in fixed-size chunks. Returns the hash and bytes consumed.
pub fn hash_reader<R: Read>(reader: &mut R) -> std::io::Result<(ContentHash, u64)> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        total += read as u64;
    }
    Ok((hex::encode(hasher.finalize().as_bytes()), total))
}

/// Hash an in-memory buffer.
pub fn hash_bytes(bytes: &[u8]) -> ContentHash {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Hash a file's content.
pub fn hash_file(path: &std::path::Path) -> std::io::Result<ContentHash> {
    let mut file = std::fs::File::open(path)?;
    Ok(hash_reader(&mut file)?.0)
}
