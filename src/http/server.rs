//! Router facade and HTTP server setup.
//!
//! # Responsibilities
//! - Public registration API (`get`, `post`, `route`, `set_header`, `mount`)
//! - Freeze the routes into a [`Dispatcher`] when serving starts
//! - Wire the dispatcher into an Axum app with tracing and body limits
//! - Bind a listener and serve with graceful shutdown
//!
//! # Design Decisions
//! - Each `Router` owns its table and headers; there is no global state
//! - Registration is a setup phase; serving consumes the router
//! - Every path and method reaches the dispatcher, which answers misses itself

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::Request;
use axum::response::Response;
use axum::routing::any;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::RouterConfig;
use crate::http::body::{BodyParser, FormParser, DEFAULT_MAX_BODY_BYTES};
use crate::http::dispatch::Dispatcher;
use crate::http::handler::Handler;
use crate::http::response::parse_header;
use crate::lifecycle::signals::shutdown_signal;
use crate::routing::{
    ConflictPolicy, Method, Registration, RouteError, RouteMatch, RouteOptions, RoutePattern,
    RouteTable,
};

/// Port used by [`Router::listen`] when none is given.
pub const DEFAULT_PORT: u16 = 9000;

/// Errors from binding or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A group of routes registered together, e.g. one per resource.
pub trait Routes {
    fn register(self, router: &mut Router) -> Result<(), RouteError>;
}

/// Route registration and serving.
pub struct Router {
    table: RouteTable,
    headers: Vec<(HeaderName, HeaderValue)>,
    parser: Option<Arc<dyn BodyParser>>,
    body_limit: usize,
    verbose: bool,
}

impl Router {
    /// Create a router with diagnostics off.
    pub fn new() -> Self {
        Self::with_verbose(false)
    }

    /// Create a router; `verbose` enables registration, resolution and payload logging.
    pub fn with_verbose(verbose: bool) -> Self {
        Self {
            table: RouteTable::default(),
            headers: Vec::new(),
            parser: None,
            body_limit: DEFAULT_MAX_BODY_BYTES,
            verbose,
        }
    }

    /// Create a router from configuration, including its global headers.
    pub fn from_config(config: &RouterConfig) -> Result<Self, RouteError> {
        let mut router = Self::with_verbose(config.verbose)
            .on_conflict(config.on_conflict)
            .body_limit(config.body.max_bytes);
        for header in &config.headers {
            router.set_header(&header.name, &header.value)?;
        }
        Ok(router)
    }

    /// Set what happens when a route is registered twice.
    pub fn on_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.table.set_policy(policy);
        self
    }

    /// Limit on buffered request bodies for the default parser.
    pub fn body_limit(mut self, max_bytes: usize) -> Self {
        self.body_limit = max_bytes;
        self
    }

    /// Replace the default urlencoded/JSON/multipart parser.
    pub fn body_parser(mut self, parser: impl BodyParser) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Whether diagnostics are logged.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Register a GET route.
    pub fn get<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::Get, pattern, handler, RouteOptions::default())
    }

    /// Register a POST route.
    pub fn post<H: Handler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::Post, pattern, handler, RouteOptions::default())
    }

    /// Register a route with explicit options.
    pub fn route<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<&mut Self, RouteError> {
        let pattern = RoutePattern::parse(pattern)?;
        let kind = if pattern.is_static() { "static" } else { "dynamic" };
        let shown = pattern.to_string();

        let registration = self
            .table
            .register(method, pattern, Arc::new(handler), options)?;

        if self.verbose {
            tracing::info!(
                method = %method,
                pattern = %shown,
                kind = kind,
                replaced = registration == Registration::Replaced,
                "Added route"
            );
        }
        Ok(self)
    }

    /// Add a header sent on every response, in call order.
    ///
    /// Calls with an empty name or value are ignored. A later header with the
    /// same name replaces the earlier one.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, RouteError> {
        if name.is_empty() || value.is_empty() {
            return Ok(self);
        }
        let header = parse_header(name, value)?;
        self.headers.push(header);
        if self.verbose {
            tracing::info!(name = %name, value = %value, "Pushed header");
        }
        Ok(self)
    }

    /// Register a group of routes.
    pub fn mount<R: Routes>(&mut self, routes: R) -> Result<&mut Self, RouteError> {
        routes.register(self)?;
        Ok(self)
    }

    /// Resolve a path against the routes registered so far.
    pub fn resolve(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.table.resolve(method, path)
    }

    /// Routes registered so far.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Freeze the routes into a dispatcher.
    pub fn into_dispatcher(self) -> Dispatcher {
        let parser: Arc<dyn BodyParser> = match self.parser {
            Some(parser) => parser,
            None => Arc::new(FormParser::new(self.body_limit)),
        };
        Dispatcher::new(self.table, self.headers, parser, self.verbose)
    }

    /// Build the Axum app serving these routes.
    pub fn into_service(self) -> axum::Router {
        let body_limit = self.body_limit;
        build_app(Arc::new(self.into_dispatcher()), body_limit)
    }

    /// Bind `0.0.0.0:<port>` (default 9000) and serve until Ctrl+C.
    pub async fn listen(self, port: Option<u16>) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(DEFAULT_PORT)));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        if self.verbose {
            tracing::info!(port = addr.port(), "Listening on port");
        }
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        let routes = self.table.len();
        let app = self.into_service();

        tracing::info!(address = %addr, routes = routes, "HTTP server starting");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("table", &self.table)
            .field("headers", &self.headers)
            .field("body_limit", &self.body_limit)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

/// Build the Axum router that hands every request to the dispatcher.
fn build_app(dispatcher: Arc<Dispatcher>, body_limit: usize) -> axum::Router {
    axum::Router::new()
        .route("/", any(route_request))
        .route("/{*path}", any(route_request))
        .with_state(dispatcher)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}

async fn route_request(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Response {
    dispatcher.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::config::{HeaderConfig, RouterConfig};
    use crate::http::handler::HandlerResult;
    use crate::http::request::RouteData;

    async fn show_user(data: RouteData) -> HandlerResult {
        let id = data.fields.get("id").unwrap_or_default().to_string();
        data.response.send(format!("user {}", id));
        Ok(())
    }

    async fn ok(data: RouteData) -> HandlerResult {
        data.response.send("ok");
        Ok(())
    }

    struct UserRoutes;

    impl Routes for UserRoutes {
        fn register(self, router: &mut Router) -> Result<(), RouteError> {
            router.get("/users/@id", show_user)?.post("/users", ok)?;
            Ok(())
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_registration_chains() {
        let mut router = Router::new();
        router
            .get("/", ok)
            .unwrap()
            .get("/users/@id", show_user)
            .unwrap()
            .post("/submit", ok)
            .unwrap();

        assert_eq!(router.table().len(), 3);
        let matched = router.resolve(Method::Get, "/users/5").unwrap();
        assert_eq!(matched.variable("id"), Some("5"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut router = Router::new();
        assert_eq!(
            router.get("users", ok).err(),
            Some(RouteError::MissingLeadingSlash("users".into()))
        );
        assert!(router.table().is_empty());
    }

    #[test]
    fn test_set_header_ignores_empty_and_rejects_invalid() {
        let mut router = Router::new();
        router.set_header("", "x").unwrap();
        router.set_header("X-Empty", "").unwrap();
        assert!(router.headers.is_empty());

        assert!(router.set_header("bad name", "x").is_err());
        router.set_header("X-A", "1").unwrap();
        assert_eq!(router.headers.len(), 1);
    }

    #[test]
    fn test_verbose_registration() {
        let mut router = Router::with_verbose(true);
        router.get("/users/@id", show_user).unwrap();
        router.get("/users/@id", show_user).unwrap();
        router.set_header("X-A", "1").unwrap();
        assert_eq!(router.table().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_header_name_keeps_last_value() {
        let mut router = Router::new();
        router.set_header("X-Env", "staging").unwrap();
        router.set_header("X-Env", "production").unwrap();
        router.get("/", ok).unwrap();

        let response = router
            .into_service()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let values: Vec<_> = response.headers().get_all("x-env").iter().collect();
        assert_eq!(values, vec!["production"]);
    }

    #[test]
    fn test_mount_route_group() {
        let mut router = Router::new();
        router.mount(UserRoutes).unwrap();
        assert!(router.resolve(Method::Get, "/users/1").is_some());
        assert!(router.resolve(Method::Post, "/users").is_some());
    }

    #[test]
    fn test_from_config() {
        let mut config = RouterConfig::default();
        config.verbose = true;
        config.on_conflict = ConflictPolicy::Reject;
        config.headers.push(HeaderConfig {
            name: "Access-Control-Allow-Origin".into(),
            value: "*".into(),
        });

        let mut router = Router::from_config(&config).unwrap();
        assert!(router.is_verbose());
        assert_eq!(router.headers.len(), 1);

        router.get("/a", ok).unwrap();
        assert!(matches!(router.get("/a", ok), Err(RouteError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_service_routes_every_path() {
        let mut router = Router::new();
        router.get("/users/@id", show_user).unwrap();
        router.set_header("X-Powered-By", "routeman").unwrap();
        let app = router.into_service();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/users/42").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-powered-by"], "routeman");
        assert_eq!(body_string(response).await, "user 42");

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-powered-by"], "routeman");
        assert_eq!(
            body_string(response).await,
            r#"{"status":404,"message":"Unknown route to /."}"#
        );
    }
}
