//! File persistence primitives
//!
//! Record writes are whole-file replacements made atomic with the usual
//! write-to-temp, fsync, rename sequence. New records are first written to
//! a process-private staging file and only become visible when an
//! [`IdAllocator`](super::ids::IdAllocator) publishes them.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::error::{StorageError, StorageResult};

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// Readers observe either the previous content or the new content.
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    if let Err(e) = write_synced(&temp_path, data) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })
}

/// Create a fresh, process-private file in `staging_dir` and fill it
///
/// The name combines the process id with a random suffix so creators in
/// other processes and other threads of this one never share a file.
/// Returns the staged path; the caller owns it from here on.
pub fn stage<F>(staging_dir: &Path, fill: F) -> StorageResult<PathBuf>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    fs::create_dir_all(staging_dir)
        .map_err(|e| StorageError::from_io(e, staging_dir.to_path_buf()))?;

    let staged = staging_dir.join(format!(
        "{}-{}",
        std::process::id(),
        Uuid::new_v4().simple()
    ));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staged)
        .map_err(|e| StorageError::from_io(e, staged.clone()))?;

    let result = fill(&mut file).and_then(|()| file.sync_all());
    if let Err(e) = result {
        drop(file);
        let _ = fs::remove_file(&staged);
        return Err(StorageError::from_io(e, staged));
    }

    Ok(staged)
}

fn write_synced(path: &Path, data: &[u8]) -> StorageResult<()> {
    let mut file = File::create(path).map_err(|e| StorageError::from_io(e, path.to_path_buf()))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .map_err(|e| StorageError::from_io(e, path.to_path_buf()))
}
