//! Public catalog pages

use anyhow::Result;
use tracing::{debug, warn};

use flatshop_core::{for_each_child, Flow, Record, RecordPath, StorageError};

use super::{Site, CATEGORY, IMAGE, ITEM};
use crate::response::Response;
use crate::templates::escape_html;

/// `GET /`: every category with its items, each shown with its first image
pub fn home(site: &Site, out: &mut Response, _: &[String]) -> Result<()> {
    let website = site.head(out, "Home")?;

    for_each_child(&website, CATEGORY, |path| {
        let category = site.read_entity(path)?;
        site.render(out, "home-category-head.html", &category)?;
        for_each_child(&category, ITEM, |path| {
            home_item(site, out, path)?;
            Ok::<_, anyhow::Error>(Flow::Continue)
        })?;
        site.render(out, "home-category-foot.html", &category)?;
        Ok::<_, anyhow::Error>(Flow::Continue)
    })?;

    site.foot(out);
    Ok(())
}

fn home_item(site: &Site, out: &mut Response, path: &RecordPath) -> Result<()> {
    let item = site.read_entity(path)?;
    site.render(out, "home-item-head.html", &item)?;
    // Thumbnail only
    for_each_child(&item, IMAGE, |path| {
        site.render(out, "home-image.html", &file_vars(path))?;
        Ok::<_, anyhow::Error>(Flow::Stop)
    })?;
    site.render(out, "home-item-foot.html", &item)
}

/// `GET /item/<id>/`: one item with all of its images, the first one selected
///
/// An unknown id renders the 404 page instead of failing.
pub fn item(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let id = captures.first().map(String::as_str).unwrap_or_default();

    let item = match RecordPath::entity(ITEM, id).and_then(|path| {
        site.store.read(&path).map(|mut record| {
            record.set("file", id);
            record
        })
    }) {
        Ok(item) => item,
        Err(e @ (StorageError::NotFound { .. } | StorageError::InvalidId { .. })) => {
            debug!(id, error = %e, "no such item");
            return not_found(site, out, &[site.request.path.clone()]);
        }
        Err(e) => return Err(e.into()),
    };

    let name = item.get("item.name").unwrap_or_else(|| {
        warn!(id, "item has no name");
        ""
    });
    site.head(out, name)?;
    site.render(out, "item-head.html", &item)?;

    let mut first = true;
    for_each_child(&item, IMAGE, |path| {
        let mut vars = file_vars(path);
        if first {
            vars.set("checked", "checked");
            first = false;
        }
        site.render(out, "item-image.html", &vars)?;
        Ok::<_, anyhow::Error>(Flow::Continue)
    })?;

    site.render(out, "item-foot.html", &item)?;
    site.foot(out);
    Ok(())
}

/// Catch-all: `404` page naming the requested path
pub fn not_found(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let path = captures.first().map(String::as_str).unwrap_or_default();

    out.set_status(404);
    let website = site.head(out, "404")?;
    site.render(out, "404.html", &website)?;
    out.push_str(&format!("<code>{}</code>\n", escape_html(path)));
    site.foot(out);
    Ok(())
}

/// Images are raw files, so templates only get their id
fn file_vars(path: &RecordPath) -> Record {
    [("file", path.id().unwrap_or_default())].into_iter().collect()
}
