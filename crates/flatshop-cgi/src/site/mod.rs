//! Storefront
//!
//! Every page is assembled from templates around data walked out of the
//! record store: the `website` record lists categories, each category
//! lists items, each item lists images.
//!
//! Handlers share one signature so they can sit in a [`RouteTable`]. They
//! write into a buffered [`Response`]; any error they return is answered
//! with a `500` by the caller.

mod admin;
mod cart;
mod catalog;

use anyhow::Result;
use tracing::debug;

use flatshop_core::{count_children, for_each_child, Flow, Record, RecordPath, RecordStore, RouteTable};

use crate::request::Request;
use crate::response::Response;
use crate::templates::Templates;

pub use admin::{
    admin, category_add, category_del, category_edit, image_add, image_del, item_add, item_del,
    item_edit,
};
pub use cart::{cart, cart_add, cart_del, cart_done, cart_error};
pub use catalog::{home, item, not_found};

pub const CATEGORY: &str = "category";
pub const ITEM: &str = "item";
pub const IMAGE: &str = "image";

/// Record tables under the db root
pub const TABLES: &[&str] = &[CATEGORY, ITEM, IMAGE];

/// Cookie holding the cart: item ids separated by spaces
const CART_COOKIE: &str = ITEM;

/// A request handler; receives the wildcard captures of its route
pub type Handler = fn(&Site, &mut Response, &[String]) -> Result<()>;

/// Everything a handler needs to answer one request
pub struct Site {
    pub store: RecordStore,
    pub templates: Templates,
    pub request: Request,
}

impl Site {
    pub fn new(store: RecordStore, templates: Templates, request: Request) -> Self {
        Self {
            store,
            templates,
            request,
        }
    }

    /// Route the request and run its handler
    pub fn handle(&self, routes: &RouteTable<Handler>) -> Result<Response> {
        let hit = routes.dispatch(&self.request.method, &self.request.path);
        debug!(
            method = %self.request.method,
            path = %self.request.path,
            route = hit.pattern,
            "dispatching request"
        );

        let mut out = Response::html();
        (hit.handler)(self, &mut out, &hit.captures)?;
        Ok(out)
    }

    fn render(&self, out: &mut Response, template: &str, vars: &Record) -> Result<()> {
        self.templates.render(out, template, vars)
    }

    /// Load a record for rendering, with its id exposed as `file`
    fn read_entity(&self, path: &RecordPath) -> Result<Record> {
        let mut record = self.store.read(path)?;
        if let Some(id) = path.id() {
            record.set("file", id);
        }
        Ok(record)
    }

    fn cookies(&self) -> Record {
        self.request.parse_cookies()
    }

    fn cart_count(&self) -> Result<usize> {
        let cookies = self.cookies();
        if !cookies.contains(CART_COOKIE) {
            return Ok(0);
        }
        Ok(count_children(&cookies, CART_COOKIE)?)
    }

    /// Open a page: site header, category navigation and cart link
    ///
    /// Returns the `website` record (with `page-name` set) for templates
    /// that render site-wide values.
    fn head(&self, out: &mut Response, page_name: &str) -> Result<Record> {
        let cart_count = self.cart_count()?;

        let mut website = self.store.read(&RecordPath::website())?;
        website.set("page-name", page_name);

        self.render(out, "website-head.html", &website)?;
        out.push_str("<nav>\n");
        for_each_child(&website, CATEGORY, |path| {
            let category = self.read_entity(path)?;
            self.render(out, "website-nav-category.html", &category)?;
            Ok::<_, anyhow::Error>(Flow::Continue)
        })?;

        out.push_str("<a href=\"/cart/\" class=\"button right\">Cart");
        if cart_count > 0 {
            out.push_str(&format!(" <span class=\"counter\">{}</span>", cart_count));
        }
        out.push_str("</a>\n</nav>\n<main>\n");

        Ok(website)
    }

    fn foot(&self, out: &mut Response) {
        out.push_str("</main>\n");
    }
}

/// Wildcard capture of the matched route
fn capture(captures: &[String], index: usize) -> Result<&str> {
    captures
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Route has no capture #{}", index))
}
