//! Request path dispatcher
//!
//! An ordered table of `(method filter, pattern, handler)` entries. The
//! first entry whose filter and pattern both match wins, so specific routes
//! go first. Tables can only be finished with a catch-all fallback, which
//! makes "no route matched" impossible.
//!
//! ## Patterns
//!
//! - literal text must match exactly
//! - `*` matches one non-empty path segment (no `/`) and captures it
//! - a `*` at the very end of the pattern captures the rest of the path,
//!   slashes included
//!
//! ```text
//! "/item/*/"          /item/42/        -> ["42"]
//! "/admin/item/del/*/*/"  /admin/item/del/3/12/ -> ["3", "12"]
//! "*"                 /anything/at/all -> ["/anything/at/all"]
//! ```

use std::fmt;

/// HTTP request method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Head => write!(f, "HEAD"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
            Method::Other(m) => write!(f, "{}", m),
        }
    }
}

/// Which request methods a route accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(m) => m == method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Segment,
    Rest,
}

/// A compiled path pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    parts: Vec<Part>,
}

impl Pattern {
    pub fn new(source: &str) -> Self {
        let mut parts = Vec::new();
        let pieces: Vec<&str> = source.split('*').collect();
        for (i, literal) in pieces.iter().enumerate() {
            if !literal.is_empty() {
                parts.push(Part::Literal(literal.to_string()));
            }
            let Some(next) = pieces.get(i + 1) else { break };
            // A `*` closing the pattern swallows the rest of the path
            if next.is_empty() && i + 2 == pieces.len() {
                parts.push(Part::Rest);
                break;
            }
            parts.push(Part::Segment);
        }
        Self {
            source: source.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a request path, returning the captured values in order
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let mut captured = Vec::new();
        if match_parts(&self.parts, path, &mut captured) {
            Some(captured)
        } else {
            None
        }
    }
}

fn match_parts(parts: &[Part], path: &str, captured: &mut Vec<String>) -> bool {
    let Some((part, rest)) = parts.split_first() else {
        return path.is_empty();
    };

    match part {
        Part::Literal(literal) => match path.strip_prefix(literal.as_str()) {
            Some(remaining) => match_parts(rest, remaining, captured),
            None => false,
        },
        Part::Rest => {
            captured.push(path.to_string());
            true
        }
        Part::Segment => {
            let segment_end = path.find('/').unwrap_or(path.len());
            // Shortest first, so "*.jpg"-style literals after a wildcard still match
            for end in path[..segment_end]
                .char_indices()
                .map(|(i, c)| i + c.len_utf8())
            {
                captured.push(path[..end].to_string());
                if match_parts(rest, &path[end..], captured) {
                    return true;
                }
                captured.pop();
            }
            false
        }
    }
}

/// One entry of a route table
#[derive(Debug, Clone)]
pub struct Route<H> {
    pub method: MethodFilter,
    pub pattern: Pattern,
    pub handler: H,
}

/// The winning route for a request
#[derive(Debug)]
pub struct Dispatch<'a, H> {
    pub handler: &'a H,
    pub pattern: &'a str,
    pub captures: Vec<String>,
}

/// Ordered route table that always ends in a catch-all
#[derive(Debug, Clone)]
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> RouteTable<H> {
    pub fn builder() -> RouteTableBuilder<H> {
        RouteTableBuilder { routes: Vec::new() }
    }

    /// Find the first route accepting `method` and `path`
    pub fn dispatch(&self, method: &Method, path: &str) -> Dispatch<'_, H> {
        for route in &self.routes {
            if !route.method.accepts(method) {
                continue;
            }
            if let Some(captures) = route.pattern.captures(path) {
                return Dispatch {
                    handler: &route.handler,
                    pattern: route.pattern.as_str(),
                    captures,
                };
            }
        }

        // The builder always appends an `Any "*"` route, which matches every path
        let fallback = &self.routes[self.routes.len() - 1];
        Dispatch {
            handler: &fallback.handler,
            pattern: fallback.pattern.as_str(),
            captures: vec![path.to_string()],
        }
    }

    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }
}

/// Builder for [`RouteTable`]; finished by [`RouteTableBuilder::fallback`]
pub struct RouteTableBuilder<H> {
    routes: Vec<Route<H>>,
}

impl<H> RouteTableBuilder<H> {
    pub fn route(mut self, method: MethodFilter, pattern: &str, handler: H) -> Self {
        self.routes.push(Route {
            method,
            pattern: Pattern::new(pattern),
            handler,
        });
        self
    }

    pub fn get(self, pattern: &str, handler: H) -> Self {
        self.route(MethodFilter::Only(Method::Get), pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: H) -> Self {
        self.route(MethodFilter::Only(Method::Post), pattern, handler)
    }

    pub fn any(self, pattern: &str, handler: H) -> Self {
        self.route(MethodFilter::Any, pattern, handler)
    }

    /// Append the catch-all route and finish the table
    pub fn fallback(self, handler: H) -> RouteTable<H> {
        let table = self.any("*", handler);
        RouteTable {
            routes: table.routes,
        }
    }
}
