//! Record store
//!
//! Owns the `db/` directory: reads, overwrites and removes record files and
//! creates new records under generated ids.
//!
//! ## Layout
//!
//! ```text
//! db/website          site root: category list, shipping cost, ...
//! db/category/<id>    categories (with an `item` list)
//! db/item/<id>        items (with an `image` list)
//! db/image/<id>       uploaded image files (raw bytes)
//! tmp/                staging area for records being created
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{StorageError, StorageResult};
use super::ids::{allocator_for, IdAllocator};
use super::persistence::{atomic_write, stage};
use crate::config::Config;
use crate::record::{Record, RecordPath};

/// Flat-file record store
pub struct RecordStore {
    db_dir: PathBuf,
    staging_dir: PathBuf,
    ids: Box<dyn IdAllocator>,
}

impl RecordStore {
    /// Open the store described by the configuration
    ///
    /// Nothing is created on disk; see [`Config::ensure_dirs`].
    pub fn open(config: &Config) -> Self {
        Self::with_allocator(
            config.db_path(),
            config.staging_path(),
            allocator_for(config.id_strategy),
        )
    }

    pub fn with_allocator(
        db_dir: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
        ids: Box<dyn IdAllocator>,
    ) -> Self {
        Self {
            db_dir: db_dir.into(),
            staging_dir: staging_dir.into(),
            ids,
        }
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Name of the id allocation strategy in use
    pub fn id_strategy(&self) -> &'static str {
        self.ids.name()
    }

    /// Filesystem location of a record
    pub fn file_path(&self, path: &RecordPath) -> PathBuf {
        self.db_dir.join(path.relative())
    }

    pub fn exists(&self, path: &RecordPath) -> bool {
        self.file_path(path).is_file()
    }

    /// Load a record
    ///
    /// Fails with `NotFound` if the file is absent and `Corrupt` if it
    /// cannot be parsed.
    pub fn read(&self, path: &RecordPath) -> StorageResult<Record> {
        let file = self.file_path(path);
        let text = fs::read_to_string(&file).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => StorageError::Corrupt {
                path: path.to_string(),
                details: "not valid UTF-8".to_string(),
            },
            _ => StorageError::from_read(e, file.clone()),
        })?;

        let record = Record::parse(&text).map_err(|details| StorageError::Corrupt {
            path: path.to_string(),
            details,
        })?;

        debug!(path = %path, fields = record.len(), "read record");
        Ok(record)
    }

    /// Replace a record's content
    pub fn write(&self, path: &RecordPath, record: &Record) -> StorageResult<()> {
        let text = encode(&path.to_string(), record)?;
        atomic_write(&self.file_path(path), text.as_bytes())?;
        debug!(path = %path, fields = record.len(), "wrote record");
        Ok(())
    }

    /// Create a record under a freshly generated id
    ///
    /// The content is staged in a private file and published by the id
    /// allocator; the record appears in `table` complete or not at all.
    pub fn create_with_generated_id(&self, table: &str, record: &Record) -> StorageResult<u64> {
        // Validates the table name before anything touches the disk
        RecordPath::from_id(table, 0)?;
        let text = encode(table, record)?;
        self.create_file_with_generated_id(table, |file| file.write_all(text.as_bytes()))
    }

    /// Create a raw file (e.g. an uploaded image) under a freshly generated id
    pub fn create_file_with_generated_id<F>(&self, table: &str, fill: F) -> StorageResult<u64>
    where
        F: FnOnce(&mut File) -> std::io::Result<()>,
    {
        RecordPath::from_id(table, 0)?;
        let table_dir = self.db_dir.join(table);
        fs::create_dir_all(&table_dir)
            .map_err(|e| StorageError::from_io(e, table_dir.clone()))?;

        let staged = stage(&self.staging_dir, fill)?;
        let id = self.ids.commit(&staged, &table_dir)?;

        info!(table, id, strategy = self.ids.name(), "created record");
        Ok(id)
    }

    /// Delete a record file
    pub fn remove(&self, path: &RecordPath) -> StorageResult<()> {
        let file = self.file_path(path);
        fs::remove_file(&file).map_err(|e| StorageError::from_io(e, file))?;
        info!(path = %path, "removed record");
        Ok(())
    }

    /// Files left in the staging area by interrupted creations
    pub fn staged_leftovers(&self) -> StorageResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.staging_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from_read(e, self.staging_dir.clone())),
        };

        let mut leftovers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::from_read(e, self.staging_dir.clone()))?;
            leftovers.push(entry.path());
        }
        leftovers.sort();
        Ok(leftovers)
    }
}

fn encode(path: &str, record: &Record) -> StorageResult<String> {
    record.to_text().map_err(|details| StorageError::Corrupt {
        path: path.to_string(),
        details,
    })
}
