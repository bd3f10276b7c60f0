use crate::auth::CredentialStore;
use crate::builder::ClientBuilder;
use crate::config::ClientConfig;
use crate::error::RestError;
use crate::registry::Registry;
use crate::response::Response;
use crate::route::{Params, Route, RouteRequest};
use crate::route_builder::RouteBuilder;
use crate::transport::Transport;
use crate::url::Url;
use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Result of resolving a path on a [`Client`]
#[derive(Debug, Clone)]
pub enum Lookup {
    Route(Arc<Route>),
    /// An absolute path outside the base path, returned untouched
    /// (only with `legacy_paths` enabled)
    Passthrough(String),
}

impl Lookup {
    #[must_use]
    pub fn into_route(self) -> Option<Arc<Route>> {
        match self {
            Lookup::Route(route) => Some(route),
            Lookup::Passthrough(_) => None,
        }
    }

    #[must_use]
    pub fn as_route(&self) -> Option<&Arc<Route>> {
        match self {
            Lookup::Route(route) => Some(route),
            Lookup::Passthrough(_) => None,
        }
    }
}

/// Headers and params sent with every request of a client
#[derive(Debug, Clone, Default)]
pub(crate) struct ClientDefaults {
    pub(crate) headers: HeaderMap,
    pub(crate) params: Params,
}

pub(crate) struct ClientInner {
    origin: String,
    root: Url,
    root_route: Arc<Route>,
    routes: RouteBuilder,
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    credentials: Option<Arc<CredentialStore>>,
    config: ClientConfig,
    defaults: RwLock<ClientDefaults>,
}

/// Route-resolving REST client.
///
/// Paths resolve to cached [`Route`] handles: `client.route("users/info")`
/// always yields the same `Arc<Route>` for the life of the client. Paths
/// starting with `/` are taken relative to the API root, so a client built
/// on `http://api.test/v1` maps `/v1/users` and `users` to the same route.
///
/// Cloning is cheap and shares the route cache, registry and transport.
///
/// ```ignore
/// let client = Client::new("http://api.test/")?;
/// let resp = client.route("users")?.request().param("page", 2).send().await?;
/// for user in resp.data().as_list().unwrap_or_default() {
///     println!("{}", user["name"].as_str().unwrap_or("?"));
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Client with default configuration
    ///
    /// # Errors
    /// Returns `RestError::Config` or `RestError::Tls` if the default
    /// transport cannot be set up
    pub fn new(base: &str) -> Result<Self, RestError> {
        Self::builder(base).build()
    }

    #[must_use]
    pub fn builder(base: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base)
    }

    pub(crate) fn assemble(
        base: &Url,
        config: ClientConfig,
        registry: Arc<Registry>,
        transport: Arc<dyn Transport>,
        credentials: Option<Arc<CredentialStore>>,
    ) -> Self {
        let root = base.without_query();
        let inner = Arc::new_cyclic(|weak| {
            let routes = RouteBuilder::new(weak.clone(), base.query().clone());
            let root_route = routes.resolve(base);
            ClientInner {
                origin: base.origin(),
                root,
                root_route,
                routes,
                registry,
                transport,
                credentials,
                config,
                defaults: RwLock::new(ClientDefaults::default()),
            }
        });
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Route for the base URL itself
    #[must_use]
    pub fn root(&self) -> Arc<Route> {
        Arc::clone(&self.inner.root_route)
    }

    /// `scheme://host` of the base URL
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Base URL without query; its query pairs seed every route's defaults
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.root
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    /// Number of distinct routes created so far
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }

    /// Resolve a path to a route.
    ///
    /// A relative path extends the base URL. An absolute path must start with
    /// the base path, which is stripped before resolving. Query pairs in the
    /// path become default params of the route.
    ///
    /// # Errors
    /// Returns `RestError::OutsideBasePath` for an absolute path outside the
    /// base path, unless `legacy_paths` is set
    pub fn lookup(&self, path: &str) -> Result<Lookup, RestError> {
        if !path.starts_with('/') {
            return Ok(Lookup::Route(self.resolve_relative(&self.inner.root, path)));
        }

        let (segments, query) = Url::split(path, self.inner.config.repeated_keys);
        let base = self.inner.root.segments();
        if segments.starts_with(base) {
            let rest = segments.into_iter().skip(base.len());
            let url = self.inner.root.extend_parts(rest, query);
            return Ok(Lookup::Route(self.inner.routes.resolve(&url)));
        }

        if self.inner.config.legacy_paths {
            tracing::debug!(path = %path, "Path outside base path returned unresolved");
            return Ok(Lookup::Passthrough(path.to_owned()));
        }
        Err(RestError::OutsideBasePath {
            path: path.to_owned(),
            base: self.inner.root.path_string(),
        })
    }

    /// Like [`lookup`](Self::lookup) but always yields a route
    ///
    /// # Errors
    /// Returns `RestError::OutsideBasePath` for an absolute path outside the
    /// base path, in legacy mode too
    pub fn route(&self, path: &str) -> Result<Arc<Route>, RestError> {
        match self.lookup(path)? {
            Lookup::Route(route) => Ok(route),
            Lookup::Passthrough(path) => Err(RestError::OutsideBasePath {
                path,
                base: self.inner.root.path_string(),
            }),
        }
    }

    /// Resolve a URL or path found in a response body or header.
    ///
    /// An absolute URL on this client's origin has the origin stripped and is
    /// then resolved like an absolute path.
    ///
    /// # Errors
    /// Returns `RestError::ForeignOrigin` for an absolute URL on another
    /// origin, or the [`lookup`](Self::lookup) error
    pub fn resolve_url(&self, value: &str) -> Result<Lookup, RestError> {
        if let Some(rest) = value.strip_prefix(self.origin())
            && (rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
        {
            let path = if rest.starts_with('/') {
                rest.to_owned()
            } else {
                format!("/{rest}")
            };
            return self.lookup(&path);
        }

        if value.contains("://") {
            return Err(RestError::ForeignOrigin {
                url: value.to_owned(),
                origin: self.origin().to_owned(),
            });
        }
        self.lookup(value)
    }

    /// Start a request against the base URL
    pub fn request(&self) -> RouteRequest {
        self.inner.root_route.request()
    }

    /// Send a request to the base URL with its defaults
    ///
    /// # Errors
    /// See [`RouteRequest::send`]
    pub async fn call(&self) -> Result<Response, RestError> {
        self.inner.root_route.call().await
    }

    /// Register basic-auth credentials for URLs under `path` (the client
    /// origin when `None`).
    ///
    /// Has no effect on a client built without HTTP auth.
    pub fn add_credentials(&self, username: &str, password: &str, path: Option<&str>) {
        let Some(store) = &self.inner.credentials else {
            tracing::debug!("Client has no credential store; credentials ignored");
            return;
        };
        store.add(path.unwrap_or(self.origin()), username, password);
    }

    #[must_use]
    pub fn credentials(&self) -> Option<&Arc<CredentialStore>> {
        self.inner.credentials.as_ref()
    }

    /// Add a parameter sent with every request of this client.
    ///
    /// Route defaults and call-site params of the same name take precedence.
    pub fn add_param(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .defaults
            .write()
            .params
            .insert(key.into(), value.into());
    }

    pub fn add_params<I, K, V>(&self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut defaults = self.inner.defaults.write();
        for (key, value) in params {
            defaults.params.insert(key.into(), value.into());
        }
    }

    /// Set a header sent with every request of this client, replacing any
    /// previous value for `name`. Route and call-site headers of the same
    /// name take precedence.
    ///
    /// # Errors
    /// Returns `RestError::InvalidHeaderName`/`InvalidHeaderValue` for invalid input
    pub fn add_header(&self, name: &str, value: &str) -> Result<(), RestError> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.inner.defaults.write().headers.insert(name, value);
        Ok(())
    }

    /// Snapshot of the client-wide params
    #[must_use]
    pub fn default_params(&self) -> Params {
        self.inner.defaults.read().params.clone()
    }

    /// Snapshot of the client-wide headers
    #[must_use]
    pub fn default_headers(&self) -> HeaderMap {
        self.inner.defaults.read().headers.clone()
    }

    pub(crate) fn defaults(&self) -> ClientDefaults {
        self.inner.defaults.read().clone()
    }

    pub(crate) fn resolve_relative(&self, base: &Url, path: &str) -> Arc<Route> {
        let url = base.extend(path, self.inner.config.repeated_keys);
        self.inner.routes.resolve(&url)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.origin)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base", &self.inner.root.to_string())
            .field("routes", &self.route_count())
            .finish_non_exhaustive()
    }
}
