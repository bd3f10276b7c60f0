use crate::client::{Client, ClientInner};
use crate::error::RestError;
use crate::registry::{FORM_URLENCODED, TEXT_PLAIN};
use crate::response::Response;
use crate::transport::TransportRequest;
use crate::url::Url;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// Request parameters (form fields or JSON object members)
pub type Params = serde_json::Map<String, Value>;

const DEFAULT_METHOD: &str = "GET";

#[derive(Debug, Clone)]
struct RouteDefaults {
    method: String,
    headers: HeaderMap,
    params: Params,
}

/// Handle bound to one resolved endpoint URL.
///
/// Routes are created and cached by the owning [`Client`]: every lookup of
/// the same path returns the same `Arc<Route>`, so default parameters and
/// headers added through one handle are seen through all of them. A route
/// only holds a weak reference to its client.
///
/// ```ignore
/// let client = Client::new("http://api.test/")?;
/// let info = client.route("users")?.child("info")?;
/// assert_eq!(info.to_string(), "http://api.test/users/info/");
///
/// let resp = info.request().method("post").param("name", "alice").send().await?;
/// ```
pub struct Route {
    url: Url,
    defaults: RwLock<RouteDefaults>,
    client: Weak<ClientInner>,
}

impl Route {
    pub(crate) fn new(url: Url, client: Weak<ClientInner>) -> Self {
        Self {
            url,
            defaults: RwLock::new(RouteDefaults {
                method: DEFAULT_METHOD.to_owned(),
                headers: HeaderMap::new(),
                params: Params::new(),
            }),
            client,
        }
    }

    /// Endpoint URL (path only; query pairs live in the default params)
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Merge parameters into the defaults sent with every request.
    /// Existing keys are overwritten.
    pub fn add_params<I, K, V>(&self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut defaults = self.defaults.write();
        for (key, value) in params {
            defaults.params.insert(key.into(), value.into());
        }
    }

    pub fn add_param(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.defaults.write().params.insert(key.into(), value.into());
    }

    /// Set a default header, replacing any previous value for `name`
    ///
    /// # Errors
    /// Returns `RestError::InvalidHeaderName`/`InvalidHeaderValue` for invalid input
    pub fn add_header(&self, name: &str, value: &str) -> Result<(), RestError> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.defaults.write().headers.insert(name, value);
        Ok(())
    }

    /// Method used when a request does not name one
    pub fn set_default_method(&self, method: impl Into<String>) {
        self.defaults.write().method = method.into();
    }

    #[must_use]
    pub fn default_method(&self) -> String {
        self.defaults.read().method.clone()
    }

    /// Snapshot of the default parameters
    #[must_use]
    pub fn default_params(&self) -> Params {
        self.defaults.read().params.clone()
    }

    /// Snapshot of the default headers
    #[must_use]
    pub fn default_headers(&self) -> HeaderMap {
        self.defaults.read().headers.clone()
    }

    /// The owning client
    ///
    /// # Errors
    /// Returns `RestError::ClientDropped` once the client is gone
    pub fn client(&self) -> Result<Client, RestError> {
        self.client
            .upgrade()
            .map(Client::from_inner)
            .ok_or(RestError::ClientDropped)
    }

    /// Route for a sub-path of this one.
    ///
    /// `name` may hold several segments and a query string
    /// (`"users/42?page=2"`). A leading `/` resolves from the client root
    /// instead, exactly like [`Client::route`].
    ///
    /// # Errors
    /// Returns `RestError::ClientDropped` if the client is gone, or the
    /// client's lookup error for a root-relative `name`
    pub fn child(&self, name: &str) -> Result<Arc<Route>, RestError> {
        let client = self.client()?;
        if name.starts_with('/') {
            return client.route(name);
        }
        Ok(client.resolve_relative(&self.url, name))
    }

    /// Start a request against this route
    pub fn request(self: &Arc<Self>) -> RouteRequest {
        RouteRequest::new(Arc::clone(self))
    }

    /// Send a request with the route defaults only
    ///
    /// # Errors
    /// See [`RouteRequest::send`]
    pub async fn call(self: &Arc<Self>) -> Result<Response, RestError> {
        self.request().send().await
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.url, f)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let defaults = self.defaults.read();
        f.debug_struct("Route")
            .field("url", &self.url.to_string())
            .field("method", &defaults.method)
            .field("params", &defaults.params)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.url.to_string() == other.url.to_string()
    }
}

impl PartialEq<str> for Route {
    fn eq(&self, other: &str) -> bool {
        self.url.to_string() == other
    }
}

impl PartialEq<&str> for Route {
    fn eq(&self, other: &&str) -> bool {
        self.url.to_string() == *other
    }
}

/// A single request against a [`Route`], layered over the route defaults,
/// which are in turn layered over the client-wide defaults.
///
/// Header errors are captured while building and reported by
/// [`build`](Self::build) / [`send`](Self::send).
#[must_use = "RouteRequest does nothing until .send() is called"]
pub struct RouteRequest {
    route: Arc<Route>,
    method: Option<String>,
    headers: Vec<(HeaderName, HeaderValue)>,
    params: Params,
    body: Option<String>,
    /// Error captured during building (deferred to `send()`)
    error: Option<RestError>,
}

impl RouteRequest {
    fn new(route: Arc<Route>) -> Self {
        Self {
            route,
            method: None,
            headers: Vec::new(),
            params: Params::new(),
            body: None,
            error: None,
        }
    }

    /// HTTP method for this request (any case)
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Add a header; call-site headers replace route defaults of the same name
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            (Err(e), _) => self.error = Some(RestError::InvalidHeaderName(e)),
            (_, Err(e)) => self.error = Some(RestError::InvalidHeaderValue(e)),
        }
        self
    }

    /// Add several headers
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        for (name, value) in headers {
            self = self.header(&name, &value);
        }
        self
    }

    /// Add a parameter; array values become repeated form pairs
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in params {
            self.params.insert(key.into(), value.into());
        }
        self
    }

    /// Raw body, used only when the request carries no parameters.
    /// Defaults `Content-Type` to `text/plain`.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Resolve defaults, encode the body and produce the transport request
    ///
    /// # Errors
    /// Returns a deferred header error, `RestError::InvalidMethod`, an encoder
    /// error, or `RestError::ClientDropped`
    pub fn build(self) -> Result<TransportRequest, RestError> {
        self.prepare().map(|(_, request)| request)
    }

    /// Send the request and normalize the response
    ///
    /// # Errors
    /// - `RestError::InvalidUrl` when the transport fails before any status
    /// - `RestError::Request` for 4xx, `RestError::Server` for 5xx
    /// - decode errors for a malformed body under a handled MIME type
    pub async fn send(self) -> Result<Response, RestError> {
        let (client, request) = self.prepare()?;
        let url = request.url.clone();
        tracing::debug!(method = %request.method, url = %url, "Sending request");

        let raw = client.transport().execute(request).await.map_err(|source| {
            tracing::debug!(url = %url, error = %source, "Transport failed");
            RestError::InvalidUrl { url, source }
        })?;

        Response::new(raw, &client)
    }

    fn prepare(self) -> Result<(Client, TransportRequest), RestError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let client = self.route.client()?;
        let defaults = self.route.defaults.read().clone();
        let shared = client.defaults();

        let method_name = self
            .method
            .unwrap_or(defaults.method)
            .to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| RestError::InvalidMethod(method_name.clone()))?;

        // client-wide, then route, then call-site; a later layer replaces by name
        let mut headers = shared.headers;
        headers.extend(defaults.headers);
        for (name, _) in &self.headers {
            headers.remove(name);
        }
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        let mut params = shared.params;
        params.extend(defaults.params);
        params.extend(self.params);

        let body = if params.is_empty() {
            match self.body {
                Some(body) => {
                    headers
                        .entry(CONTENT_TYPE)
                        .or_insert(HeaderValue::from_static(TEXT_PLAIN));
                    body
                }
                None => String::new(),
            }
        } else {
            let content_type = headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(FORM_URLENCODED))
                .to_str()
                .unwrap_or_default()
                .to_owned();
            match client.registry().encoder(&content_type) {
                Some(encode) => encode(&params)?,
                None => {
                    tracing::debug!(content_type = %content_type, "No encoder for content type; parameters not sent");
                    self.body.unwrap_or_default()
                }
            }
        };

        let mut url = self.route.url.to_string();
        if method == Method::GET && !body.is_empty() {
            url.push('?');
            url.push_str(&body);
        }

        Ok((
            client,
            TransportRequest {
                method,
                url,
                headers,
                body: Bytes::from(body),
            },
        ))
    }
}
