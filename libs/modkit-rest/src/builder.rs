use crate::auth::CredentialStore;
use crate::client::Client;
use crate::config::{ClientConfig, RedirectConfig};
use crate::cookies::{CookieJar, CookiePolicy};
use crate::error::RestError;
use crate::registry::Registry;
use crate::transport::{HyperTransport, Transport};
use crate::url::{RepeatedKeyPolicy, Url};
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`Client`].
///
/// ```ignore
/// let client = Client::builder("https://api.test/v1")
///     .timeout(Duration::from_secs(5))
///     .basic_auth("user", "secret")
///     .cookies(true)
///     .build()?;
/// ```
#[must_use]
pub struct ClientBuilder {
    base: String,
    config: ClientConfig,
    registry: Option<Arc<Registry>>,
    transport: Option<Arc<dyn Transport>>,
    credentials: Option<Arc<CredentialStore>>,
    basic_auth: Option<(String, String)>,
    cookies: Option<Arc<CookieJar>>,
}

impl ClientBuilder {
    /// Builder for `base` with default configuration
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_config(base, ClientConfig::default())
    }

    pub fn with_config(base: impl Into<String>, config: ClientConfig) -> Self {
        Self {
            base: base.into(),
            config,
            registry: None,
            transport: None,
            credentials: None,
            basic_auth: None,
            cookies: None,
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Timeout for one whole exchange, redirects included
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Follow redirects (default) or return 3xx responses as-is
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.config.redirect = if follow {
            RedirectConfig::default()
        } else {
            RedirectConfig::disabled()
        };
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.redirect.max_redirects = max_redirects;
        self
    }

    pub fn redirect(mut self, config: RedirectConfig) -> Self {
        self.config.redirect = config;
        self
    }

    /// How repeated query keys collapse into route defaults
    pub fn repeated_keys(mut self, policy: RepeatedKeyPolicy) -> Self {
        self.config.repeated_keys = policy;
        self
    }

    /// Hand back absolute paths outside the base path unresolved instead of failing
    pub fn legacy_paths(mut self, enabled: bool) -> Self {
        self.config.legacy_paths = enabled;
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Use a shared registry instead of a fresh one with the built-in handlers
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the built-in hyper transport.
    ///
    /// Basic auth and cookies are features of the built-in transport and are
    /// not applied to a custom one.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Enable HTTP basic auth with credentials for the whole base origin
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Enable HTTP basic auth backed by an existing store
    pub fn credential_store(mut self, store: Arc<CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Keep cookies between requests using a jar that accepts everything
    pub fn cookies(mut self, enabled: bool) -> Self {
        self.cookies = enabled.then(|| Arc::new(CookieJar::new()));
        self
    }

    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookies = Some(jar);
        self
    }

    pub fn cookie_policy(mut self, policy: impl CookiePolicy + 'static) -> Self {
        self.cookies = Some(Arc::new(CookieJar::with_policy(policy)));
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns `RestError::Config` for a base URL without a host,
    /// `RestError::Tls` if the TLS connector cannot be built, or
    /// `RestError::InvalidHeaderValue` for an invalid user agent
    pub fn build(self) -> Result<Client, RestError> {
        let base = Url::parse_with(&self.base, self.config.repeated_keys);
        if base.host().is_empty() {
            return Err(RestError::Config(format!(
                "base URL '{}' has no host",
                self.base
            )));
        }

        let credentials = match (self.credentials, self.basic_auth) {
            (store, Some((username, password))) => {
                let store = store.unwrap_or_default();
                store.add(&base.origin(), &username, &password);
                Some(store)
            }
            (store, None) => store,
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => {
                if credentials.is_some() || self.cookies.is_some() {
                    tracing::warn!(
                        "Custom transport configured; basic auth and cookies are not applied"
                    );
                }
                transport
            }
            None => Arc::new(HyperTransport::new(
                &self.config,
                credentials.clone(),
                self.cookies,
            )?),
        };

        let registry = self.registry.unwrap_or_default();
        tracing::debug!(base = %base, "Building REST client");

        Ok(Client::assemble(
            &base,
            self.config,
            registry,
            transport,
            credentials,
        ))
    }
}
