//! flatshop CGI
//!
//! The storefront served through CGI: request and response plumbing,
//! templates, the page handlers and their route table, plus the
//! maintenance commands the `flatshop` binary runs.

pub mod commands;
pub mod logging;
pub mod multipart;
pub mod output;
pub mod request;
pub mod response;
pub mod routes;
pub mod site;
pub mod templates;
