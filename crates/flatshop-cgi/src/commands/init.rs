//! Init command handler

use anyhow::{Context, Result};
use tracing::{info, warn};

use flatshop_core::{Config, Record, RecordPath, RecordStore};

use crate::output::Output;
use crate::site::{CATEGORY, TABLES};

/// Create the store layout and an empty `website` record
///
/// An existing `website` record is left untouched.
pub fn run(config: &Config, shipping: u32, output: &Output) -> Result<()> {
    config.ensure_dirs(TABLES)?;
    let store = RecordStore::open(config);

    let template_dir = config.template_path();
    if !template_dir.is_dir() {
        warn!(dir = ?template_dir, "template directory does not exist");
    }

    let website = RecordPath::website();
    if store.exists(&website) {
        output.message(&format!(
            "Website record already exists: {}",
            store.file_path(&website).display()
        ));
        return Ok(());
    }

    let record: Record = [
        (CATEGORY.to_string(), String::new()),
        ("cart.shipping".to_string(), shipping.to_string()),
    ]
    .into_iter()
    .collect();
    store
        .write(&website, &record)
        .context("Failed to create website record")?;

    info!(db = ?store.db_dir(), shipping, "initialized store");
    output.success(&format!("Initialized store in {}", store.db_dir().display()));
    Ok(())
}
