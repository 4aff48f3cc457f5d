//! Sender link resolution.
//!
//! Before a sender path is stored with a notice or handed to a
//! redirect, it must correspond to a route the site actually serves.
//! Unresolvable paths are dropped rather than stored broken.

use std::collections::HashSet;

/// Decides whether a site-relative path resolves to a real route.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, path: &str) -> bool;
}

/// Resolver accepting `/{kind}/{id}/` paths for a fixed set of entity
/// kinds.
#[derive(Debug, Clone, Default)]
pub struct KindRouteResolver {
    kinds: HashSet<String>,
}

impl KindRouteResolver {
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = String>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }
}

impl RouteResolver for KindRouteResolver {
    fn resolve(&self, path: &str) -> bool {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        matches!(segments.as_slice(), [kind, id] if !id.is_empty() && self.kinds.contains(*kind))
    }
}

/// Resolver that accepts every non-empty path, for deployments whose
/// URL space mirrors entity kinds directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRouteResolver;

impl RouteResolver for OpenRouteResolver {
    fn resolve(&self, path: &str) -> bool {
        !path.is_empty()
    }
}
