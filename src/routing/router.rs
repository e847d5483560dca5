//! Route lookup.
//!
//! # Responsibilities
//! - Normalize the candidate path (query, fragment, trailing slash)
//! - Look up matching route for request
//! - Return matched entry or an explicit NotFound / MethodNotAllowed
//!
//! # Design Decisions
//! - O(n) ordered scan, first match allowing the method wins
//! - Same table + same request always gives the same answer
//! - NotFound and MethodNotAllowed stay distinct so callers can report precisely

use std::collections::BTreeSet;

use crate::routing::table::{Route, RouteEntry, RouteTable};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route matches {path}")]
    NotFound { path: String },

    #[error("method {method} is not allowed for {path}")]
    MethodNotAllowed {
        method: String,
        path: String,
        allowed: Vec<String>,
    },
}

/// Strip query and fragment, then one trailing `/` (a bare `/` is kept).
pub fn normalize_path(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = &raw[..end];
    match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    }
}

impl RouteTable {
    /// Select the entry serving `method` on `raw_path`.
    pub fn route(&self, method: &str, raw_path: &str) -> Result<&RouteEntry, RouteError> {
        self.lookup(method, raw_path).map(|route| &route.entry)
    }

    /// Like [`RouteTable::route`], keeping the compiled template alongside.
    pub fn lookup(&self, method: &str, raw_path: &str) -> Result<&Route, RouteError> {
        let path = normalize_path(raw_path);
        let mut allowed: Option<BTreeSet<&str>> = None;

        for route in self.iter().filter(|r| r.template.matches(path)) {
            if route.entry.allows(method) {
                return Ok(route);
            }
            allowed
                .get_or_insert_with(BTreeSet::new)
                .extend(route.entry.methods.iter().map(String::as_str));
        }

        match allowed {
            Some(allowed) => Err(RouteError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
                allowed: allowed.into_iter().map(str::to_string).collect(),
            }),
            None => Err(RouteError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}
