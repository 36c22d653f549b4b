//! Advisory locks held on a sidecar file next to a data file.
//!
//! Data files are replaced by renaming a temp file over them, so a lock taken
//! on the data file itself would be left on the unlinked inode. The sidecar
//! (`<file>.lock`) is never renamed or removed, which keeps every reader and
//! writer serialized on the same inode.

use crate::Result;
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Held lock; released on drop
#[derive(Debug)]
pub struct LockFile {
    file: File,
}

impl LockFile {
    /// Block until no other holder has the lock for `data_path`
    pub fn exclusive(data_path: &Path) -> Result<Self> {
        let file = open_sidecar(data_path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }

    /// Block until no exclusive holder has the lock for `data_path`
    pub fn shared(data_path: &Path) -> Result<Self> {
        let file = open_sidecar(data_path)?;
        file.lock_shared()?;
        Ok(Self { file })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release lock: {}", e);
        }
    }
}

/// Sidecar path for a data file: `events.jsonl` → `events.jsonl.lock`
pub fn sidecar_path(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".lock");
    data_path.with_file_name(name)
}

fn open_sidecar(data_path: &Path) -> Result<File> {
    if let Some(parent) = data_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(sidecar_path(data_path))?;
    Ok(file)
}
