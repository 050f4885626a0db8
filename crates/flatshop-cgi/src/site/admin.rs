//! Catalog administration
//!
//! One page with an edit form for every category, item and image, plus
//! the form posts that change the catalog. Every post answers with a
//! `303` back to `/admin/`.
//!
//! Relationship lists are only ever changed through the linker: creating
//! links the new id into its parent, deleting unlinks it, and edits keep
//! whatever list the record already had.

use anyhow::Result;
use tracing::{info, warn};

use flatshop_core::linker::{add_child, remove_child};
use flatshop_core::{
    for_each_child, Flow, Record, RecordPath, RecordStore, StorageError, StorageResult,
};

use super::{capture, Site, CATEGORY, IMAGE, ITEM};
use crate::response::Response;

const ADMIN: &str = "/admin/";

/// `GET /admin/`
pub fn admin(site: &Site, out: &mut Response, _: &[String]) -> Result<()> {
    let website = site.head(out, "Administration")?;

    for_each_child(&website, CATEGORY, |path| {
        admin_category(site, out, path)?;
        Ok::<_, anyhow::Error>(Flow::Continue)
    })?;
    site.render(out, "admin-category-add.html", &Record::new())?;

    site.foot(out);
    Ok(())
}

fn admin_category(site: &Site, out: &mut Response, path: &RecordPath) -> Result<()> {
    let category = site.read_entity(path)?;
    site.render(out, "admin-category-edit.html", &category)?;

    for_each_child(&category, ITEM, |item_path| {
        let mut item = site.read_entity(item_path)?;
        item.set("category.file", path.id().unwrap_or_default());

        out.push_str("<article class=\"admin\">\n");
        site.render(out, "admin-item-edit.html", &item)?;
        for_each_child(&item, IMAGE, |image_path| {
            let vars: Record = [
                ("item.file", item_path.id().unwrap_or_default()),
                ("file", image_path.id().unwrap_or_default()),
            ]
            .into_iter()
            .collect();
            site.render(out, "admin-image-edit.html", &vars)?;
            Ok::<_, anyhow::Error>(Flow::Continue)
        })?;
        site.render(out, "admin-image-add.html", &item)?;
        out.push_str("</article>\n");
        Ok::<_, anyhow::Error>(Flow::Continue)
    })?;

    site.render(out, "admin-item-add.html", &category)
}

/// `POST /admin/category/add/`
pub fn category_add(site: &Site, out: &mut Response, _: &[String]) -> Result<()> {
    let mut category = site.request.parse_payload()?;
    category.set_default(ITEM, "");

    create_child(site, &RecordPath::website(), CATEGORY, |store| {
        store.create_with_generated_id(CATEGORY, &category)
    })?;

    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/category/edit/<category>/`
pub fn category_edit(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let path = RecordPath::entity(CATEGORY, capture(captures, 0)?)?;
    replace_fields(site, &path, ITEM)?;
    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/category/del/<category>/`
///
/// The category's items stay on disk, unreachable.
pub fn category_del(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let path = RecordPath::entity(CATEGORY, capture(captures, 0)?)?;
    delete_child(site, &RecordPath::website(), &path)?;
    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/item/add/<category>/`
pub fn item_add(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let parent = RecordPath::entity(CATEGORY, capture(captures, 0)?)?;
    let mut item = site.request.parse_payload()?;
    item.set_default(IMAGE, "");

    create_child(site, &parent, ITEM, |store| {
        store.create_with_generated_id(ITEM, &item)
    })?;

    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/item/edit/<item>/`
pub fn item_edit(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let path = RecordPath::entity(ITEM, capture(captures, 0)?)?;
    replace_fields(site, &path, IMAGE)?;
    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/item/del/<category>/<item>/`
pub fn item_del(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let parent = RecordPath::entity(CATEGORY, capture(captures, 0)?)?;
    let path = RecordPath::entity(ITEM, capture(captures, 1)?)?;
    delete_child(site, &parent, &path)?;
    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/image/add/<item>/`: store the uploaded file as a new image
pub fn image_add(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let parent = RecordPath::entity(ITEM, capture(captures, 0)?)?;

    create_child(site, &parent, IMAGE, |store| {
        store.create_file_with_generated_id(IMAGE, |file| site.request.receive_file(file))
    })?;

    out.redirect(303, ADMIN);
    Ok(())
}

/// `POST /admin/image/del/<item>/<image>/`
pub fn image_del(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let parent = RecordPath::entity(ITEM, capture(captures, 0)?)?;
    let path = RecordPath::entity(IMAGE, capture(captures, 1)?)?;
    delete_child(site, &parent, &path)?;
    out.redirect(303, ADMIN);
    Ok(())
}

/// Create a record in `table` and link it into `parent[table]`
///
/// The parent is checked first so a bad parent leaves nothing behind.
fn create_child<F>(site: &Site, parent: &RecordPath, table: &str, create: F) -> Result<u64>
where
    F: FnOnce(&RecordStore) -> StorageResult<u64>,
{
    site.store.read(parent)?.require(table, parent)?;

    let id = create(&site.store)?;
    add_child(&site.store, parent, table, id)?;

    info!(parent = %parent, table, id, "created");
    Ok(id)
}

/// Overwrite an existing record with the submitted form
///
/// `list` (the record's relationship list) keeps its current value.
fn replace_fields(site: &Site, path: &RecordPath, list: &str) -> Result<()> {
    let current = site.store.read(path)?;
    let mut record = site.request.parse_payload()?;
    match current.get(list) {
        Some(children) => record.set(list, children),
        None => warn!(path = %path, field = list, "record has no relationship list"),
    }

    site.store.write(path, &record)?;
    info!(path = %path, fields = record.len(), "edited");
    Ok(())
}

/// Unlink `path` from `parent[<table of path>]` and delete its file
fn delete_child(site: &Site, parent: &RecordPath, path: &RecordPath) -> Result<()> {
    let id = path.id().unwrap_or_default();
    remove_child(&site.store, parent, path.table(), id)?;

    match site.store.remove(path) {
        Ok(()) => {}
        Err(StorageError::NotFound { .. }) => {
            warn!(path = %path, "unlinked record had no file");
        }
        Err(e) => return Err(e.into()),
    }

    info!(parent = %parent, path = %path, "deleted");
    Ok(())
}
