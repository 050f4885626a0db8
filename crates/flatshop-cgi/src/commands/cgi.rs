//! CGI command handler
//!
//! Answers exactly one request: reads it from the environment and stdin,
//! runs the matching handler and writes the response to stdout.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use flatshop_core::{Config, RecordStore, StorageError};

use crate::request::Request;
use crate::response::Response;
use crate::routes;
use crate::site::Site;
use crate::templates::Templates;

/// Handle the request of this process
///
/// Returns `false` when the request failed and was answered with a `500`.
pub fn run(config: &Config) -> Result<bool> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let request = match Request::from_env(io::stdin().lock()) {
        Ok(request) => request,
        Err(e) => {
            error!("Failed to read request: {:#}", e);
            Response::internal_error()
                .write_cgi(&mut out)
                .context("Failed to write response")?;
            return Ok(false);
        }
    };

    serve(config, request, &mut out)
}

/// Answer `request` on `out`
pub fn serve(config: &Config, request: Request, out: &mut impl Write) -> Result<bool> {
    let method = request.method.clone();
    let path = request.path.clone();
    let site = Site::new(
        RecordStore::open(config),
        Templates::new(config.template_path()),
        request,
    );

    let (response, ok) = match site.handle(&routes::table()) {
        Ok(response) => (response, true),
        Err(e) => {
            error!(method = %method, path = %path, "Request failed: {:#}", e);
            if let Some(storage) = storage_error(&e) {
                if let Some(hint) = storage.recovery_suggestion() {
                    warn!(recoverable = storage.is_recoverable(), "{}", hint);
                }
            }
            (Response::internal_error(), false)
        }
    };

    response
        .write_cgi(out)
        .context("Failed to write response")?;
    info!(method = %method, path = %path, status = response.status(), "served");
    Ok(ok)
}

/// The storage failure behind a handler error, if there is one
fn storage_error(error: &anyhow::Error) -> Option<&StorageError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatshop_core::Method;

    use crate::site::testing::Shop;

    fn served(shop: &Shop, request: Request) -> (bool, String) {
        let mut out = Vec::new();
        let ok = serve(&shop.config(), request, &mut out).unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_serve_page() {
        let shop = Shop::stocked();

        let (ok, text) = served(&shop, Request::new(Method::Get, "/"));
        assert!(ok);
        assert!(text.starts_with("Status: 200 OK\r\nContent-Type: text/html"));
        assert!(text.contains("[item 1 Blue mug]"));
    }

    #[test]
    fn test_serve_redirect() {
        let shop = Shop::stocked();

        let (ok, text) = served(
            &shop,
            Request::new(Method::Post, "/cart/add/1/").with_cookies("item=2"),
        );
        assert!(ok);
        assert!(text.contains("Status: 303 See Other\r\n"));
        assert!(text.contains("Location: /cart/\r\n"));
        assert!(text.contains("Set-Cookie: item=2%201; Path=/"));
    }

    #[test]
    fn test_failure_becomes_500() {
        let shop = Shop::stocked();
        std::fs::write(shop.root().join("db/website"), "garbage = [").unwrap();

        let (ok, text) = served(&shop, Request::new(Method::Get, "/"));
        assert!(!ok);
        assert!(text.starts_with("Status: 500 Internal Server Error\r\n"));
        assert!(!text.contains("garbage"));
    }

    #[test]
    fn test_storage_error_found_behind_context() {
        let shop = Shop::stocked();
        std::fs::write(shop.root().join("db/website"), "garbage = [").unwrap();

        let err = shop.send(Request::new(Method::Get, "/")).unwrap_err();
        let storage = storage_error(&err).unwrap();
        assert!(matches!(storage, StorageError::Corrupt { .. }));
        assert!(!storage.is_recoverable());
        assert!(storage.recovery_suggestion().is_some());

        assert!(storage_error(&anyhow::anyhow!("No cart cookie")).is_none());
    }
}
