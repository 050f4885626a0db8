//! Record id allocation
//!
//! An allocator takes a fully written staged file and publishes it under a
//! fresh id in its table directory. Choosing the id and making the record
//! visible happen in the same filesystem operation, so there is never a
//! moment where an id is claimed but the record is incomplete, or where two
//! creators hold the same id.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
#[cfg(unix)]
use super::persistence::stage;
use crate::config::IdStrategy;

/// Assigns an id to a staged file and publishes it
pub trait IdAllocator: Send + Sync {
    /// Move `staged` into `table_dir` under a new id and return the id
    ///
    /// On success `staged` no longer exists. On failure it may be left
    /// behind as garbage in the staging directory.
    fn commit(&self, staged: &Path, table_dir: &Path) -> StorageResult<u64>;

    fn name(&self) -> &'static str;
}

/// Build the allocator for a configured strategy
pub fn allocator_for(strategy: IdStrategy) -> Box<dyn IdAllocator> {
    match strategy {
        #[cfg(unix)]
        IdStrategy::Inode => Box::new(InodeIds),
        #[cfg(not(unix))]
        IdStrategy::Inode => {
            warn!("inode ids are only available on unix, using sequential ids");
            Box::new(SequentialIds)
        }
        IdStrategy::Sequential => Box::new(SequentialIds),
    }
}

/// Id is the inode number the filesystem gave the staged file
///
/// Inode numbers are unique among live files of one filesystem, but a
/// record rewritten by `atomic_write` moves to a new inode and frees the one
/// its id came from. The name `<id>` can therefore still be taken when the
/// filesystem hands that inode out again, so publishing uses `hard_link`,
/// which never replaces a name. On a clash the content is copied into a new
/// staged file, which gets a different inode while the old one is still
/// held. Staging and db directories must share a filesystem.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct InodeIds;

#[cfg(unix)]
const INODE_ATTEMPTS: usize = 8;

#[cfg(unix)]
impl IdAllocator for InodeIds {
    fn commit(&self, staged: &Path, table_dir: &Path) -> StorageResult<u64> {
        use std::os::unix::fs::MetadataExt;

        let mut current = staged.to_path_buf();
        for _ in 0..INODE_ATTEMPTS {
            let id = fs::metadata(&current)
                .map_err(|e| StorageError::from_io(e, current.clone()))?
                .ino();
            let target = table_dir.join(id.to_string());

            match fs::hard_link(&current, &target) {
                Ok(()) => {
                    if let Err(e) = fs::remove_file(&current) {
                        warn!(staged = %current.display(), error = %e, "could not remove staged file after publishing");
                    }
                    debug!(id, target = %target.display(), "published staged record");
                    return Ok(id);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(id, "inode id already names a record, restaging");
                    current = restage(&current)?;
                }
                Err(source) => {
                    return Err(StorageError::AtomicWriteFailed {
                        from: current,
                        to: target,
                        source,
                    })
                }
            }
        }

        Err(StorageError::AtomicWriteFailed {
            from: current.clone(),
            to: table_dir.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "no free inode id after repeated restaging",
            ),
        })
    }

    fn name(&self) -> &'static str {
        "inode"
    }
}

/// Copy a staged file into a fresh staged file and drop the old one
///
/// The copy is created while the original still exists, so the two never
/// share an inode.
#[cfg(unix)]
fn restage(staged: &Path) -> StorageResult<std::path::PathBuf> {
    let staging_dir = staged.parent().unwrap_or_else(|| Path::new("."));
    let mut source =
        fs::File::open(staged).map_err(|e| StorageError::from_read(e, staged.to_path_buf()))?;
    let fresh = stage(staging_dir, |f| io::copy(&mut source, f).map(|_| ()))?;
    if let Err(e) = fs::remove_file(staged) {
        warn!(staged = %staged.display(), error = %e, "could not remove superseded staged file");
    }
    Ok(fresh)
}

/// Id is one past the highest numeric id currently in the table
///
/// The staged file is published with `hard_link`, which refuses to replace
/// an existing name; a creator that loses the race for an id moves on to
/// the next one. Ids of deleted records at the top of the range may be
/// handed out again.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialIds;

impl IdAllocator for SequentialIds {
    fn commit(&self, staged: &Path, table_dir: &Path) -> StorageResult<u64> {
        let mut id = highest_id(table_dir)? + 1;

        let target = loop {
            let target = table_dir.join(id.to_string());
            match fs::hard_link(staged, &target) {
                Ok(()) => break target,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => id += 1,
                Err(source) => {
                    return Err(StorageError::AtomicWriteFailed {
                        from: staged.to_path_buf(),
                        to: target,
                        source,
                    })
                }
            }
        };

        if let Err(e) = fs::remove_file(staged) {
            warn!(staged = %staged.display(), error = %e, "could not remove staged file after publishing");
        }

        debug!(id, target = %target.display(), "published staged record");
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Highest numeric file name in `dir`, 0 when there is none
fn highest_id(dir: &Path) -> StorageResult<u64> {
    let entries = fs::read_dir(dir).map_err(|e| StorageError::from_read(e, dir.to_path_buf()))?;

    let mut highest = 0;
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::from_read(e, dir.to_path_buf()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(id) = name.parse::<u64>() {
            highest = highest.max(id);
        }
    }
    Ok(highest)
}
