//! Buffered CGI response
//!
//! Pages are assembled in memory and written out once the handler has
//! finished, so a handler that fails halfway can still be answered with a
//! clean `500` instead of half a page.

use std::io::{self, Write};

use crate::request::percent_encode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    content_type: String,
    location: Option<String>,
    cookies: Vec<(String, String)>,
    body: String,
}

impl Default for Response {
    fn default() -> Self {
        Self::html()
    }
}

impl Response {
    /// Empty `200 text/html` response
    pub fn html() -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            location: None,
            cookies: Vec::new(),
            body: String::new(),
        }
    }

    /// Generic failure page; deliberately reveals nothing about the cause
    pub fn internal_error() -> Self {
        let mut response = Self::html();
        response.status = 500;
        response.content_type = "text/plain; charset=utf-8".to_string();
        response.body = "Internal Server Error\n".to_string();
        response
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Append raw HTML
    pub fn push_str(&mut self, html: &str) {
        self.body.push_str(html);
    }

    /// Redirect (e.g. `303 See Other` after a form post); drops any body
    pub fn redirect(&mut self, status: u16, location: &str) {
        self.status = status;
        self.location = Some(location.to_string());
        self.body.clear();
    }

    /// Set a cookie for the whole site; the value is percent-encoded
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.retain(|(n, _)| n != name);
        self.cookies.push((name.to_string(), value.to_string()));
    }

    /// Value a cookie was set to in this response
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Write headers and body in CGI form
    pub fn write_cgi(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "Status: {} {}\r\n", self.status, reason(self.status))?;
        write!(out, "Content-Type: {}\r\n", self.content_type)?;
        if let Some(location) = &self.location {
            write!(out, "Location: {}\r\n", location)?;
        }
        for (name, value) in &self.cookies {
            write!(
                out,
                "Set-Cookie: {}={}; Path=/; SameSite=Lax\r\n",
                name,
                percent_encode(value)
            )?;
        }
        write!(out, "\r\n")?;
        out.write_all(self.body.as_bytes())?;
        out.flush()
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        303 => "See Other",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(response: &Response) -> String {
        let mut out = Vec::new();
        response.write_cgi(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_html_page() {
        let mut response = Response::html();
        response.push_str("<main>\n");

        let text = written(&response);
        assert!(text.starts_with("Status: 200 OK\r\nContent-Type: text/html"));
        assert!(text.ends_with("\r\n\r\n<main>\n"));
    }

    #[test]
    fn test_redirect_with_cookie() {
        let mut response = Response::html();
        response.push_str("discarded");
        response.set_cookie("item", "4 8");
        response.set_cookie("item", "4 8 15");
        response.redirect(303, "/cart/");

        let text = written(&response);
        assert!(text.contains("Status: 303 See Other\r\n"));
        assert!(text.contains("Location: /cart/\r\n"));
        assert!(text.contains("Set-Cookie: item=4%208%2015; Path=/"));
        assert_eq!(text.matches("Set-Cookie").count(), 1);
        assert!(text.ends_with("\r\n\r\n"));
        assert_eq!(response.cookie("item"), Some("4 8 15"));
    }

    #[test]
    fn test_internal_error() {
        let text = written(&Response::internal_error());
        assert!(text.starts_with("Status: 500 Internal Server Error\r\n"));
        assert!(text.ends_with("Internal Server Error\n"));
    }
}
