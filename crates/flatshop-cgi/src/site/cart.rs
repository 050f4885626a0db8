//! Shopping cart
//!
//! The cart lives entirely in the `item` cookie as a list of item ids, one
//! token per unit, so adding the same item twice lists it twice.

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};

use flatshop_core::linker::{append_token, remove_token};
use flatshop_core::{for_each_child, Flow, Record, RecordPath, StorageError};

use super::{capture, not_found, Site, CART_COOKIE, ITEM};
use crate::response::Response;

/// `GET /cart/`: cart lines and totals, or the empty-cart page
pub fn cart(site: &Site, out: &mut Response, _: &[String]) -> Result<()> {
    let cookies = site.cookies();
    let website = site.head(out, "Cart")?;

    let items = cookies.get(CART_COOKIE).unwrap_or_default();
    if items.trim().is_empty() {
        site.render(out, "cart-empty.html", &website)?;
        site.foot(out);
        return Ok(());
    }

    let mut subtotal: u32 = 0;
    for_each_child(&cookies, CART_COOKIE, |path| {
        let item = site.read_entity(path)?;
        site.render(out, "cart-item.html", &item)?;

        let price = parse_amount(item.require("item.price", path)?)
            .with_context(|| format!("Invalid price for {}", path))?;
        subtotal = subtotal
            .checked_add(price)
            .ok_or_else(|| anyhow!("Cart subtotal overflows at {}", path))?;
        Ok::<_, anyhow::Error>(Flow::Continue)
    })?;

    let shipping = parse_amount(website.require("cart.shipping", &RecordPath::website())?)
        .context("Invalid shipping cost")?;
    let total = subtotal
        .checked_add(shipping)
        .ok_or_else(|| anyhow!("Cart total overflows"))?;

    let vars: Record = [
        ("cart.subtotal", subtotal.to_string()),
        ("cart.shipping", shipping.to_string()),
        ("cart.total", total.to_string()),
        ("cart.items", items.to_string()),
    ]
    .into_iter()
    .collect();
    site.render(out, "cart-checkout.html", &vars)?;

    site.foot(out);
    Ok(())
}

/// `POST /cart/add/<id>/`: put one more unit in the cart
///
/// Sends the user back where they came from. Only ids of existing items
/// reach the cookie; anything else gets the 404 page.
pub fn cart_add(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let id = capture(captures, 0)?;
    match RecordPath::entity(ITEM, id) {
        Ok(path) if site.store.exists(&path) => {}
        Ok(_) | Err(StorageError::InvalidId { .. }) => {
            debug!(id, "refusing to add unknown item to cart");
            return not_found(site, out, &[site.request.path.clone()]);
        }
        Err(e) => return Err(e.into()),
    }

    let cookies = site.cookies();
    let items = append_token(cookies.get(CART_COOKIE).unwrap_or_default(), id);

    info!(id, "added to cart");
    out.set_cookie(CART_COOKIE, &items);
    let back = site.request.referer.as_deref().unwrap_or("/cart/");
    out.redirect(303, back);
    Ok(())
}

/// `POST /cart/del/<id>/`: take one unit out of the cart
pub fn cart_del(site: &Site, out: &mut Response, captures: &[String]) -> Result<()> {
    let id = capture(captures, 0)?;
    let cookies = site.cookies();
    let current = cookies
        .get(CART_COOKIE)
        .ok_or_else(|| anyhow!("No cart cookie"))?;
    let items = remove_token(current, id)
        .ok_or_else(|| anyhow!("Item {} is not in the cart '{}'", id, current))?;

    info!(id, "removed from cart");
    out.set_cookie(CART_COOKIE, &items);
    out.redirect(303, "/cart/");
    Ok(())
}

/// `GET /cart/done/`: payment succeeded, empty the cart
pub fn cart_done(site: &Site, out: &mut Response, _: &[String]) -> Result<()> {
    out.set_cookie(CART_COOKIE, "");
    let website = site.head(out, "Payment complete")?;
    site.render(out, "cart-done.html", &website)?;
    site.foot(out);
    Ok(())
}

/// `GET /cart/error/`: payment failed, the cart is kept
pub fn cart_error(site: &Site, out: &mut Response, _: &[String]) -> Result<()> {
    let website = site.head(out, "Payment error")?;
    site.render(out, "cart-error.html", &website)?;
    site.foot(out);
    Ok(())
}

/// Amount in minor currency units
fn parse_amount(text: &str) -> Result<u32> {
    text.trim()
        .parse::<u32>()
        .with_context(|| format!("'{}' is not an amount", text))
}
