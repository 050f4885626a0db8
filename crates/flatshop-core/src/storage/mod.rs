//! Storage layer
//!
//! Handles record files under `db/`.
//!
//! ## Architecture
//!
//! - **RecordStore**: read / overwrite / remove records, create records under new ids
//! - **IdAllocator**: turns a staged file into a published record with a unique id
//! - **persistence**: atomic whole-file writes and private staging files
//!
//! Every write replaces a whole file via temp-file + rename, so a crash
//! leaves either the old or the new record, never a mix.

pub mod error;
pub mod ids;
pub mod persistence;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use ids::{allocator_for, IdAllocator, SequentialIds};
#[cfg(unix)]
pub use ids::InodeIds;
pub use store::RecordStore;
