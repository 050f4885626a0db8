//! flatshop Core Library
//!
//! This crate provides the data and dispatch core of flatshop, a small
//! catalog-and-cart storefront whose data lives in flat files.
//!
//! # Architecture
//!
//! - **Records**: one file per entity under `db/<table>/<id>`, plus the
//!   `db/website` singleton
//! - **Relationship lists**: space-separated child ids stored in a field
//!   of the parent record (`website.category`, `category.item`, `item.image`)
//!
//! # Quick Start
//!
//! ```text
//! let store = RecordStore::open(&config);
//!
//! // Create a category and link it under the website root
//! let id = store.create_with_generated_id("category", &record)?;
//! linker::add_child(&store, &RecordPath::website(), "category", id)?;
//!
//! // Walk the categories
//! let website = store.read(&RecordPath::website())?;
//! for_each_child(&website, "category", |path| { ...; Ok(Flow::Continue) })?;
//! ```
//!
//! # Modules
//!
//! - `record`: the key/value record and its on-disk format
//! - `storage`: record store, id allocation, atomic writes, errors
//! - `linker`: relationship list edits
//! - `traversal`: visiting the children referenced by a list field
//! - `dispatch`: method + path pattern routing
//! - `config`: application configuration

pub mod config;
pub mod dispatch;
pub mod linker;
pub mod record;
pub mod storage;
pub mod traversal;

pub use config::{Config, IdStrategy};
pub use dispatch::{Dispatch, Method, MethodFilter, Pattern, RouteTable};
pub use record::{Record, RecordPath, WEBSITE};
pub use storage::{RecordStore, StorageError, StorageResult};
pub use traversal::{count_children, for_each_child, Flow};
