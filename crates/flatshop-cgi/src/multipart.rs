//! Minimal `multipart/form-data` reader
//!
//! Enough for browser form posts: named text fields and file uploads,
//! each part carrying a `Content-Disposition: form-data` header.

use anyhow::{bail, Result};

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part<'a> {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub data: &'a [u8],
}

/// Boundary parameter of a `multipart/form-data` content type
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .filter_map(|param| param.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()).to_string())
        .filter(|value| !value.is_empty())
}

/// Split a multipart body into its parts
pub fn parts<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<Part<'a>>> {
    let delimiter = format!("--{}", boundary);
    let next_delimiter = format!("\r\n--{}", boundary);

    let Some(first) = find(body, delimiter.as_bytes()) else {
        bail!("multipart body does not contain its boundary");
    };
    let mut pos = first + delimiter.len();

    let mut parts = Vec::new();
    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(parts);
        }
        let Some(rest) = rest.strip_prefix(b"\r\n") else {
            bail!("malformed multipart delimiter line");
        };
        pos += 2;

        let Some(end) = find(rest, next_delimiter.as_bytes()) else {
            bail!("unterminated multipart body");
        };
        parts.push(parse_part(&rest[..end])?);
        pos += end + next_delimiter.len();
    }
}

fn parse_part(raw: &[u8]) -> Result<Part<'_>> {
    let Some(split) = find(raw, b"\r\n\r\n") else {
        bail!("multipart part has no header terminator");
    };
    let headers = String::from_utf8_lossy(&raw[..split]);
    let data = &raw[split + 4..];

    let mut name = None;
    let mut filename = None;
    for line in headers.split("\r\n") {
        let Some((header, value)) = line.split_once(':') else {
            continue;
        };
        if !header.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for param in value.split(';').skip(1) {
            match param.trim().split_once('=') {
                Some((key, v)) if key.trim().eq_ignore_ascii_case("name") => {
                    name = Some(unquote(v.trim()).to_string());
                }
                Some((key, v)) if key.trim().eq_ignore_ascii_case("filename") => {
                    filename = Some(unquote(v.trim()).to_string());
                }
                _ => {}
            }
        }
    }

    Ok(Part {
        name,
        filename,
        data,
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"item.name\"\r\n\
\r\n\
Blue mug\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"mug.png\"\r\n\
Content-Type: image/png\r\n\
\r\n\
\x89PNG\r\n\x1a\n\r\n\
--XyZ--\r\n";

    #[test]
    fn test_boundary() {
        assert_eq!(
            boundary("multipart/form-data; boundary=XyZ").as_deref(),
            Some("XyZ")
        );
        assert_eq!(
            boundary("Multipart/Form-Data; charset=utf-8; boundary=\"a b\"").as_deref(),
            Some("a b")
        );
        assert_eq!(boundary("application/x-www-form-urlencoded"), None);
        assert_eq!(boundary("multipart/form-data"), None);
    }

    #[test]
    fn test_parts() {
        let parts = parts(BODY, "XyZ").unwrap();
        assert_eq!(parts.len(), 2);

        assert_eq!(parts[0].name.as_deref(), Some("item.name"));
        assert_eq!(parts[0].filename, None);
        assert_eq!(parts[0].data, b"Blue mug");

        assert_eq!(parts[1].filename.as_deref(), Some("mug.png"));
        // Binary content keeps its own CRLF bytes
        assert_eq!(parts[1].data, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_unterminated_body() {
        let body = b"--XyZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue";
        assert!(parts(body, "XyZ").is_err());
        assert!(parts(b"no boundary here", "XyZ").is_err());
    }
}
