//! Repository-relative path handling

use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

/// Convert a path below `root` into the `/`-separated form used as a map key.
pub fn relative_key(root: &Path, path: &Path) -> Result<String, StorageError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        StorageError::InvalidPath(format!(
            "{} is not inside {}",
            path.display(),
            root.display()
        ))
    })?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str().ok_or_else(|| {
                StorageError::InvalidPath(format!("non UTF-8 path: {}", path.display()))
            })?),
            Component::CurDir => {}
            _ => {
                return Err(StorageError::InvalidPath(format!(
                    "unexpected component in {}",
                    path.display()
                )))
            }
        }
    }
    Ok(parts.join("/"))
}

/// Turn a map key back into a filesystem path below `root`.
pub fn absolute_path(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Directory components of a key, excluding the file name.
pub fn parent_dirs(key: &str) -> impl Iterator<Item = &str> {
    let mut parts: Vec<&str> = key.split('/').collect();
    parts.pop();
    parts.into_iter()
}

/// File name part of a key.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Canonical form of a working tree root.
pub fn canonicalize_root(root: &Path) -> Result<PathBuf, StorageError> {
    dunce::canonicalize(root).map_err(|e| {
        StorageError::InvalidPath(format!("cannot resolve {}: {}", root.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_key_uses_forward_slashes() {
        let root = Path::new("/work");
        let key = relative_key(root, &root.join("src").join("main.rs")).unwrap();
        assert_eq!(key, "src/main.rs");
    }

    #[test]
    fn test_relative_key_outside_root_fails() {
        assert!(relative_key(Path::new("/work"), Path::new("/other/file")).is_err());
    }

    #[test]
    fn test_absolute_path_round_trip() {
        let root = Path::new("/work");
        assert_eq!(absolute_path(root, "a/b.txt"), PathBuf::from("/work/a/b.txt"));
        assert_eq!(file_name("a/b.txt"), "b.txt");
        assert_eq!(parent_dirs("a/b/c.txt").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(parent_dirs("c.txt").count(), 0);
    }
}
