//! Route table storage.
//!
//! # Responsibilities
//! - Hold the compiled routes in their final, ordered form
//! - Describe each route's backend target
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Ordered list, not a map: definition order, then discovery order
//! - Effective paths are unique (enforced by builder.rs)

use std::collections::{BTreeMap, BTreeSet};

use crate::remote::ConnectionContext;
use crate::routing::compiler::CompiledTemplate;

/// Method name that accepts every HTTP method.
pub const ANY_METHOD: &str = "ANY";

/// The resolved backend target of one routable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Path template after stage prefixing; the uniqueness key.
    pub effective_path: String,
    /// Path template as the remote API knows it.
    pub original_path: String,
    pub resource_id: String,
    pub rest_api_id: String,
    pub methods: BTreeSet<String>,
    pub context: ConnectionContext,
    pub stage: Option<String>,
    pub stage_variables: BTreeMap<String, String>,
}

impl RouteEntry {
    /// Returns true if this entry accepts `method`.
    pub fn allows(&self, method: &str) -> bool {
        self.methods.contains(method) || self.methods.contains(ANY_METHOD)
    }

    /// Map a request path matched by this entry back to the path the remote
    /// API expects, i.e. without the stage prefix.
    pub fn upstream_path<'a>(&self, request_path: &'a str) -> &'a str {
        let Some(stage) = self.stage.as_deref() else {
            return request_path;
        };
        let stripped = request_path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(stage))
            .filter(|rest| rest.is_empty() || rest.starts_with('/'));
        match stripped {
            Some("") => "/",
            Some(rest) => rest,
            None => request_path,
        }
    }
}

/// One compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub template: CompiledTemplate,
    pub entry: RouteEntry,
}

/// Every route the bridge can serve, in lookup order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_routes(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Effective paths in lookup order.
    pub fn paths(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.entry.effective_path.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn entry(stage: Option<&str>, methods: &[&str]) -> RouteEntry {
        RouteEntry {
            effective_path: "/pets".into(),
            original_path: "/pets".into(),
            resource_id: "r1".into(),
            rest_api_id: "api".into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            context: ConnectionContext {
                profile: None,
                region: "us-east-1".into(),
                endpoint: Url::parse("http://localhost:4566").unwrap(),
            },
            stage: stage.map(str::to_string),
            stage_variables: BTreeMap::new(),
        }
    }

    #[test]
    fn any_method_allows_everything() {
        assert!(entry(None, &["ANY"]).allows("PATCH"));
        assert!(entry(None, &["GET"]).allows("GET"));
        assert!(!entry(None, &["GET"]).allows("POST"));
        assert!(!entry(None, &["GET"]).allows("get"));
    }

    #[test]
    fn upstream_path_strips_stage() {
        let staged = entry(Some("v1"), &["GET"]);
        assert_eq!(staged.upstream_path("/v1/pets/42"), "/pets/42");
        assert_eq!(staged.upstream_path("/v1"), "/");
        assert_eq!(staged.upstream_path("/v1/"), "/");
        assert_eq!(staged.upstream_path("/v10/pets"), "/v10/pets");

        let plain = entry(None, &["GET"]);
        assert_eq!(plain.upstream_path("/v1/pets"), "/v1/pets");
    }
}
