//! Page templates
//!
//! A template is an HTML fragment from the template directory in which
//! `{{field}}` is replaced by the HTML-escaped value of that field of a
//! record. Fields the record lacks render as nothing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use flatshop_core::Record;

use crate::response::Response;

pub struct Templates {
    dir: PathBuf,
}

impl Templates {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append the named template, filled from `vars`, to the response body
    pub fn render(&self, out: &mut Response, name: &str, vars: &Record) -> Result<()> {
        let path = self.dir.join(name);
        let template = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template {:?}", path))?;
        out.push_str(&substitute(&template, vars));
        Ok(())
    }
}

fn substitute(template: &str, vars: &Record) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let key = rest[start + 2..start + 2 + len].trim();
        out.push_str(&escape_html(vars.get(key).unwrap_or_default()));
        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    out
}

/// Escape text for use in HTML content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
