use crate::url::RepeatedKeyPolicy;
use std::time::Duration;

/// Default User-Agent header value
pub const DEFAULT_USER_AGENT: &str = concat!("modkit-rest/", env!("CARGO_PKG_VERSION"));

/// Redirect following for the built-in transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    /// Maximum number of redirects to follow (default: 10)
    ///
    /// Set to `0` to disable redirect following entirely; the 3xx response is
    /// then returned as-is.
    pub max_redirects: usize,

    /// Strip `Authorization`, `Cookie` and `Proxy-Authorization` when a
    /// redirect leaves the original origin (default: true)
    pub strip_sensitive_headers: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: 10,
            strip_sensitive_headers: true,
        }
    }
}

impl RedirectConfig {
    /// Do not follow redirects
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_redirects: 0,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_redirects > 0
    }
}

/// Client configuration.
///
/// Usually assembled through [`ClientBuilder`](crate::ClientBuilder); can be
/// passed whole with [`ClientBuilder::with_config`](crate::ClientBuilder::with_config).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User-Agent header (default: `modkit-rest/<version>`)
    pub user_agent: String,

    /// Timeout for one whole exchange including redirects (default: 30 seconds)
    pub request_timeout: Duration,

    pub redirect: RedirectConfig,

    /// How repeated query keys in a path collapse into route defaults
    pub repeated_keys: RepeatedKeyPolicy,

    /// Return absolute paths outside the base path as
    /// [`Lookup::Passthrough`](crate::Lookup::Passthrough) instead of failing
    pub legacy_paths: bool,

    /// Idle connection timeout (default: 90 seconds, `None` keeps them)
    pub pool_idle_timeout: Option<Duration>,

    /// Idle connections kept per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            request_timeout: Duration::from_secs(30),
            redirect: RedirectConfig::default(),
            repeated_keys: RepeatedKeyPolicy::default(),
            legacy_paths: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}
