//! CGI request
//!
//! The web server hands each request to a fresh process through environment
//! variables (`REQUEST_METHOD`, `PATH_INFO`, `HTTP_COOKIE`, ...) and the
//! request body on stdin.

use std::collections::HashMap;
use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use flatshop_core::{Method, Record};

use crate::multipart;

/// Largest request body accepted (uploaded images included)
const MAX_BODY: u64 = 32 * 1024 * 1024;

/// An incoming request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub referer: Option<String>,
    pub content_type: Option<String>,
    cookie_header: String,
    body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            referer: None,
            content_type: None,
            cookie_header: String::new(),
            body: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, header: impl Into<String>) -> Self {
        self.cookie_header = header.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }

    /// Build the request from the process environment and `stdin`
    pub fn from_env(stdin: impl Read) -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars, stdin)
    }

    /// Build the request from CGI variables
    pub fn from_vars(vars: &HashMap<String, String>, stdin: impl Read) -> Result<Self> {
        let non_empty = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        let method = Method::parse(vars.get("REQUEST_METHOD").map_or("GET", String::as_str));
        let path = non_empty("PATH_INFO")
            .or_else(|| non_empty("DOCUMENT_URI"))
            .unwrap_or_else(|| "/".to_string());

        let length = match non_empty("CONTENT_LENGTH") {
            Some(len) => len
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid CONTENT_LENGTH '{}'", len))?,
            None => 0,
        };
        if length > MAX_BODY {
            bail!("Request body of {} bytes exceeds the {} byte limit", length, MAX_BODY);
        }

        let mut body = Vec::with_capacity(length as usize);
        stdin
            .take(length)
            .read_to_end(&mut body)
            .context("Failed to read request body")?;
        if (body.len() as u64) < length {
            bail!("Request body truncated: got {} of {} bytes", body.len(), length);
        }

        Ok(Self {
            method,
            path,
            referer: non_empty("HTTP_REFERER"),
            content_type: non_empty("CONTENT_TYPE"),
            cookie_header: vars.get("HTTP_COOKIE").cloned().unwrap_or_default(),
            body,
        })
    }

    /// Decode a submitted form into a record
    ///
    /// Supports `application/x-www-form-urlencoded` and the text fields of
    /// `multipart/form-data`.
    pub fn parse_payload(&self) -> Result<Record> {
        let content_type = self.content_type.as_deref().unwrap_or_default();

        if let Some(boundary) = multipart::boundary(content_type) {
            let mut record = Record::new();
            for part in multipart::parts(&self.body, &boundary)? {
                if part.filename.is_some() {
                    continue;
                }
                let Some(name) = part.name else { continue };
                let value = std::str::from_utf8(part.data)
                    .with_context(|| format!("Form field '{}' is not UTF-8", name))?;
                record.set(name, value);
            }
            return Ok(record);
        }

        let body = std::str::from_utf8(&self.body).context("Form body is not UTF-8")?;
        Ok(parse_pairs(body, '&', true))
    }

    /// Decode the `Cookie` header into a record
    pub fn parse_cookies(&self) -> Record {
        parse_pairs(&self.cookie_header, ';', false)
    }

    /// Write an uploaded file to `dest`
    ///
    /// Takes the first file part of a multipart body, or the whole body for
    /// any other content type.
    pub fn receive_file(&self, dest: &mut impl Write) -> io::Result<()> {
        let content_type = self.content_type.as_deref().unwrap_or_default();

        let data = match multipart::boundary(content_type) {
            Some(boundary) => {
                let parts = multipart::parts(&self.body, &boundary)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
                parts
                    .into_iter()
                    .find(|part| part.filename.is_some())
                    .map(|part| part.data)
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidData, "multipart body has no file part")
                    })?
            }
            None => self.body.as_slice(),
        };

        if data.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "uploaded file is empty"));
        }
        dest.write_all(data)
    }
}

fn parse_pairs(input: &str, separator: char, plus_as_space: bool) -> Record {
    input
        .split(separator)
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                percent_decode(key, plus_as_space),
                percent_decode(value, plus_as_space),
            )
        })
        .collect()
}

/// Decode `%XX` escapes (and `+` when asked); malformed escapes are kept as is
pub fn percent_decode(input: &str, plus_as_space: bool) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' if plus_as_space => out.push(b' '),
            b'%' => match (hex_value(bytes.get(i + 1)), hex_value(bytes.get(i + 2))) {
                (Some(high), Some(low)) => {
                    out.push(high << 4 | low);
                    i += 2;
                }
                _ => out.push(b'%'),
            },
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: Option<&u8>) -> Option<u8> {
    (*byte? as char).to_digit(16).map(|d| d as u8)
}

/// Escape everything but unreserved characters
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars() {
        let env = vars(&[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/admin/item/add/3/"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
            ("CONTENT_LENGTH", "17"),
            ("HTTP_COOKIE", "item=4%208; theme=dark"),
            ("HTTP_REFERER", "https://shop.example/item/4/"),
        ]);

        let request = Request::from_vars(&env, &b"item.name=Mug&x=1trailing"[..]).unwrap();

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/admin/item/add/3/");
        assert_eq!(request.referer.as_deref(), Some("https://shop.example/item/4/"));
        assert_eq!(request.parse_payload().unwrap().get("x"), Some("1"));
        assert_eq!(request.parse_cookies().get("item"), Some("4 8"));
        assert_eq!(request.parse_cookies().get("theme"), Some("dark"));
    }

    #[test]
    fn test_from_vars_defaults() {
        let request = Request::from_vars(&vars(&[("PATH_INFO", "")]), io::empty()).unwrap();

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/");
        assert!(request.referer.is_none());
        assert!(request.parse_cookies().is_empty());
    }

    #[test]
    fn test_truncated_body() {
        let env = vars(&[("REQUEST_METHOD", "POST"), ("CONTENT_LENGTH", "100")]);
        assert!(Request::from_vars(&env, &b"short"[..]).is_err());

        let env = vars(&[("CONTENT_LENGTH", "lots")]);
        assert!(Request::from_vars(&env, io::empty()).is_err());
    }

    #[test]
    fn test_urlencoded_payload() {
        let request = Request::new(Method::Post, "/admin/category/add/").with_body(
            "application/x-www-form-urlencoded",
            "category.name=Caf%C3%A9+%26+Tea&item=&flag",
        );

        let payload = request.parse_payload().unwrap();
        assert_eq!(payload.get("category.name"), Some("Café & Tea"));
        assert_eq!(payload.get("item"), Some(""));
        assert_eq!(payload.get("flag"), Some(""));
    }

    #[test]
    fn test_multipart_payload_and_file() {
        let body = b"--b\r\n\
Content-Disposition: form-data; name=\"item.name\"\r\n\r\nMug\r\n\
--b\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\n\r\nJPEGDATA\r\n\
--b--\r\n";
        let request = Request::new(Method::Post, "/admin/image/add/1/")
            .with_body("multipart/form-data; boundary=b", &body[..]);

        let payload = request.parse_payload().unwrap();
        assert_eq!(payload.get("item.name"), Some("Mug"));
        assert!(!payload.contains("file"));

        let mut file = Vec::new();
        request.receive_file(&mut file).unwrap();
        assert_eq!(file, b"JPEGDATA");
    }

    #[test]
    fn test_receive_file_rejects_empty_upload() {
        let request = Request::new(Method::Post, "/admin/image/add/1/");
        let mut file = Vec::new();
        assert!(request.receive_file(&mut file).is_err());
    }

    #[test]
    fn test_percent_round_trip() {
        assert_eq!(percent_encode("4 8 15"), "4%208%2015");
        assert_eq!(percent_decode("4%208%2015", false), "4 8 15");
        assert_eq!(percent_decode("a+b", false), "a+b");
        assert_eq!(percent_decode("a+b", true), "a b");
        assert_eq!(percent_decode("100%", true), "100%");
        assert_eq!(percent_decode("%zz", true), "%zz");
    }
}
