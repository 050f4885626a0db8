//! Check command handler
//!
//! Walks the whole catalog the way the storefront does and reads every
//! record it references, so a broken link or a corrupt file shows up here
//! instead of as a `500` on some page.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::warn;

use flatshop_core::{for_each_child, Config, Flow, RecordPath, RecordStore};

use crate::output::Output;
use crate::site::{CATEGORY, IMAGE, ITEM};

/// What the check found
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub db_dir: String,
    pub id_strategy: String,
    pub categories: usize,
    pub items: usize,
    pub images: usize,
    pub staged_leftovers: Vec<String>,
}

pub fn run(config: &Config, output: &Output) -> Result<()> {
    let store = RecordStore::open(config);
    let report = check_store(&store)?;
    output.print_check_report(&report);
    Ok(())
}

/// Read every record reachable from `website`
///
/// Stops at the first record that is missing or cannot be parsed.
pub fn check_store(store: &RecordStore) -> Result<CheckReport> {
    let website_path = RecordPath::website();
    let website = store
        .read(&website_path)
        .context("Cannot read the website record (run `flatshop init`?)")?;
    website.require("cart.shipping", &website_path)?;

    let mut items = 0;
    let mut images = 0;
    let categories = for_each_child(&website, CATEGORY, |category_path| {
        let category = store.read(category_path)?;
        items += for_each_child(&category, ITEM, |item_path| {
            let item = store.read(item_path)?;
            images += for_each_child(&item, IMAGE, |image_path| {
                if !store.exists(image_path) {
                    bail!("{} lists missing image file {}", item_path, image_path);
                }
                Ok::<_, anyhow::Error>(Flow::Continue)
            })?;
            Ok::<_, anyhow::Error>(Flow::Continue)
        })?;
        Ok::<_, anyhow::Error>(Flow::Continue)
    })?;

    let staged_leftovers: Vec<String> = store
        .staged_leftovers()?
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    for path in &staged_leftovers {
        warn!(path = %path, "leftover staged file");
    }

    Ok(CheckReport {
        db_dir: store.db_dir().display().to_string(),
        id_strategy: store.id_strategy().to_string(),
        categories,
        items,
        images,
        staged_leftovers,
    })
}
