//! Route storage.
//!
//! # Responsibilities
//! - Store compiled routes per method
//! - Apply the conflict policy on re-registration
//! - Answer `resolve` by delegating to the path matcher
//!
//! # Design Decisions
//! - Filled during setup, read-only while serving (no locks on the hot path)
//! - Static routes keyed by full path, O(1) lookup
//! - Dynamic routes keyed by literal prefix, then by variable arity

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::handler::Handler;
use crate::routing::matcher::{self, RouteMatch};
use crate::routing::pattern::RoutePattern;
use crate::routing::types::{ConflictPolicy, Method, RouteError};

/// Per-route options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOptions {
    /// Run the body parser before the handler. Defaults to `true` for every method.
    pub expects_body: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self { expects_body: true }
    }
}

/// A registered route.
pub struct RouteEntry {
    pub method: Method,
    pub pattern: RoutePattern,
    pub options: RouteOptions,
    pub handler: Arc<dyn Handler>,
}

impl RouteEntry {
    /// Variable names in declaration order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.pattern.variable_names()
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    Replaced,
}

#[derive(Default)]
struct MethodRoutes {
    static_routes: HashMap<String, Arc<RouteEntry>>,
    dynamic_routes: HashMap<String, HashMap<usize, Arc<RouteEntry>>>,
}

/// All routes known to a router.
#[derive(Default)]
pub struct RouteTable {
    methods: HashMap<Method, MethodRoutes>,
    policy: ConflictPolicy,
}

impl RouteTable {
    /// Create an empty table with the given conflict policy.
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            methods: HashMap::new(),
            policy,
        }
    }

    /// Current conflict policy.
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Change the conflict policy for later registrations.
    pub fn set_policy(&mut self, policy: ConflictPolicy) {
        self.policy = policy;
    }

    /// Insert a route, or replace the one with the same key.
    ///
    /// The key is `(method, path)` for static routes and
    /// `(method, prefix, arity)` for dynamic ones.
    pub fn register(
        &mut self,
        method: Method,
        pattern: RoutePattern,
        handler: Arc<dyn Handler>,
        options: RouteOptions,
    ) -> Result<Registration, RouteError> {
        let key = pattern.key();
        let arity = pattern.arity();
        let routes = self.methods.entry(method).or_default();

        let slot = if pattern.is_static() {
            routes.static_routes.get(&key)
        } else {
            routes.dynamic_routes.get(&key).and_then(|by_arity| by_arity.get(&arity))
        };

        if let Some(existing) = slot {
            match self.policy {
                ConflictPolicy::Reject => {
                    return Err(RouteError::Conflict {
                        method,
                        pattern: pattern.as_str().to_string(),
                    });
                }
                ConflictPolicy::Warn => {
                    tracing::warn!(
                        method = %method,
                        pattern = %pattern,
                        replaced = %existing.pattern,
                        "Route registration replaces an existing route"
                    );
                }
                ConflictPolicy::Replace => {}
            }
        }

        let entry = Arc::new(RouteEntry {
            method,
            pattern,
            options,
            handler,
        });

        let previous = if entry.pattern.is_static() {
            routes.static_routes.insert(key, entry)
        } else {
            routes
                .dynamic_routes
                .entry(key)
                .or_default()
                .insert(arity, entry)
        };

        Ok(match previous {
            Some(_) => Registration::Replaced,
            None => Registration::Inserted,
        })
    }

    /// Find the route for `path`, with its bound variables.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        matcher::resolve(self, method, path).into_match()
    }

    pub(crate) fn static_route(&self, method: Method, path: &str) -> Option<&Arc<RouteEntry>> {
        self.methods.get(&method)?.static_routes.get(path)
    }

    pub(crate) fn dynamic_routes(
        &self,
        method: Method,
        prefix: &str,
    ) -> Option<&HashMap<usize, Arc<RouteEntry>>> {
        self.methods.get(&method)?.dynamic_routes.get(prefix)
    }

    /// Every registered route, static routes first.
    pub fn routes(&self) -> impl Iterator<Item = &Arc<RouteEntry>> {
        self.methods.values().flat_map(|routes| {
            routes
                .static_routes
                .values()
                .chain(routes.dynamic_routes.values().flat_map(HashMap::values))
        })
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes().count()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("policy", &self.policy)
            .field("routes", &self.routes().collect::<Vec<_>>())
            .finish()
    }
}
