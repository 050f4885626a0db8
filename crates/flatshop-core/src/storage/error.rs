//! Storage error handling
//!
//! Provides typed errors for record store operations with descriptive
//! messages and recovery suggestions.
//!
//! Data-integrity errors (`Corrupt`, `MissingField`) are never recoverable.
//! Lookups that come up empty and plain I/O failures are reported as
//! recoverable so a caller may choose to answer "not found" instead of
//! aborting; the CGI front end still treats almost all of them as fatal.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Record file does not exist
    #[error("Record not found: '{path}'")]
    NotFound { path: String },

    /// Record file exists but cannot be parsed
    #[error("Record '{path}' is corrupted: {details}")]
    Corrupt { path: String, details: String },

    /// Record lacks a field the caller's schema requires
    #[error("Record '{path}' has no field '{field}'")]
    MissingField { path: String, field: String },

    /// Id is not present in a relationship list
    #[error("Id '{id}' not found in '{path}' field '{field}' (list: '{list}')")]
    TokenNotFound {
        path: String,
        field: String,
        id: String,
        list: String,
    },

    /// Id is not a plain decimal integer
    #[error("Invalid id '{id}' for table '{table}'")]
    InvalidId { table: String, id: String },

    /// Table name is not a simple identifier
    #[error("Invalid table name '{0}'")]
    InvalidTable(String),

    /// Permission denied accessing path
    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error(
        "Disk full or quota exceeded while writing to '{path}'. Free up disk space and try again."
    )]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read file
    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write file
    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Publishing a staged file under its final name failed
    #[error("Atomic write failed: could not rename '{from}' to '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    /// Create an error from an I/O error with path context
    ///
    /// Classifies the error based on its kind (permission, disk full, etc.)
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            io::ErrorKind::NotFound => StorageError::NotFound {
                path: path.display().to_string(),
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// Same as [`StorageError::from_io`] but for failed reads
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::from_io(error, path)
            }
            _ => StorageError::ReadError {
                path,
                source: error,
            },
        }
    }

    /// Whether the error is the "does not exist" family
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::NotFound { .. }
                | StorageError::TokenNotFound { .. }
                | StorageError::InvalidId { .. }
        )
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            StorageError::Corrupt { .. }
                | StorageError::MissingField { .. }
                | StorageError::InvalidTable(_)
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check that the web server user can read and write the db and staging directories.")
            }
            StorageError::Corrupt { .. } => {
                Some("Restore the record from a backup or rewrite it from the admin page.")
            }
            StorageError::AtomicWriteFailed { .. } => {
                Some("The staging directory must be on the same filesystem as the db directory.")
            }
            StorageError::MissingField { .. } => {
                Some("Add the missing field to the record; relationship lists may be empty but must exist.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
