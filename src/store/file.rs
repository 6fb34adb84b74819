//! File-backed durable store
//!
//! Stores one file per key in a directory. File names are a fixed-length
//! hash of the key, so any key fits the filesystem's name limit; the key
//! itself is kept on the first line of the file for listing.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{DurableStore, StoreError, StoreResult};

const FILE_SUFFIX: &str = ".entry";

// ENOSPC / EDQUOT
const NO_SPACE_ERRNO: i32 = 28;
const QUOTA_ERRNO: i32 = 122;

/// Directory-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let hash = blake3::hash(key.as_bytes());
        self.dir.join(format!("{}{}", hash.to_hex(), FILE_SUFFIX))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let content = match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(map_io_error(e)),
        };

        Ok(split_entry(&content)
            .filter(|(stored_key, _)| stored_key == key)
            .map(|(_, value)| value.to_string()))
    }

    async fn write(&self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await.map_err(map_io_error)?;

        let header = serde_json::to_string(key).map_err(|e| StoreError::Other(e.to_string()))?;
        let contents = format!("{}\n{}", header, value);
        let dir = self.dir.clone();
        let target = self.path_for(key);

        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, contents.as_bytes()))
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io_error(e)),
        }
    }

    async fn list_keys(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io_error(e)),
        };

        let mut keys = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(map_io_error)? {
            let is_entry = item
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(FILE_SUFFIX));
            if !is_entry {
                continue;
            }

            if let Some(key) = read_stored_key(&item.path()).await? {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        Ok(keys)
    }
}

/// Writes through a fresh temp file in `dir` and renames it over `target`,
/// so readers never see a half-written entry. The temp file is removed on
/// any failure.
fn write_atomically(dir: &Path, target: &Path, contents: &[u8]) -> StoreResult<()> {
    let mut tmp = NamedTempFile::new_in(dir).map_err(map_io_error)?;
    tmp.write_all(contents).map_err(map_io_error)?;
    tmp.persist(target).map_err(|e| map_io_error(e.error))?;
    Ok(())
}

/// Reads just the key line of an entry file.
async fn read_stored_key(path: &Path) -> StoreResult<Option<String>> {
    let file = match fs::File::open(path).await {
        Ok(file) => file,
        // Deleted since the directory was listed
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(map_io_error(e)),
    };

    let mut header = String::new();
    BufReader::new(file)
        .read_line(&mut header)
        .await
        .map_err(map_io_error)?;

    Ok(serde_json::from_str(header.trim_end_matches('\n')).ok())
}

fn split_entry(content: &str) -> Option<(String, &str)> {
    let (header, value) = content.split_once('\n')?;
    let key = serde_json::from_str(header).ok()?;
    Some((key, value))
}

fn map_io_error(err: std::io::Error) -> StoreError {
    match err.raw_os_error() {
        Some(NO_SPACE_ERRNO) | Some(QUOTA_ERRNO) => StoreError::QuotaExceeded(err.to_string()),
        _ if err.kind() == ErrorKind::PermissionDenied => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Other(err.to_string()),
    }
}
