//! The storefront's route table

use flatshop_core::RouteTable;

use crate::site::{self, Handler};

/// Every page and form post, most specific first
pub fn table() -> RouteTable<Handler> {
    RouteTable::<Handler>::builder()
        .get("/", site::home)
        .get("/item/*/", site::item)
        .get("/cart/", site::cart)
        .post("/cart/add/*/", site::cart_add)
        .post("/cart/del/*/", site::cart_del)
        .get("/cart/done/", site::cart_done)
        .get("/cart/error/", site::cart_error)
        .get("/admin/", site::admin)
        .post("/admin/category/add/", site::category_add)
        .post("/admin/category/edit/*/", site::category_edit)
        .post("/admin/category/del/*/", site::category_del)
        .post("/admin/item/add/*/", site::item_add)
        .post("/admin/item/edit/*/", site::item_edit)
        .post("/admin/item/del/*/*/", site::item_del)
        .post("/admin/image/add/*/", site::image_add)
        .post("/admin/image/del/*/*/", site::image_del)
        .fallback(site::not_found)
}
