//! Minimal cookie jar for the built-in transport.
//!
//! Cookies are keyed by host (port ignored) and name. Attributes other than
//! `Max-Age=0` (removal) are ignored: no path scoping, expiry or `Secure`
//! handling.

use crate::url::Url;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Decides which cookies are stored and sent
pub trait CookiePolicy: Send + Sync {
    /// Store a cookie received from `host`
    fn accept(&self, _host: &str, _name: &str, _value: &str) -> bool {
        true
    }

    /// Send a stored cookie to `host`
    fn send(&self, _host: &str, _name: &str) -> bool {
        true
    }
}

/// Stores and sends every cookie
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllCookies;

impl CookiePolicy for AcceptAllCookies {}

pub struct CookieJar {
    policy: Arc<dyn CookiePolicy>,
    cookies: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(AcceptAllCookies)
    }

    #[must_use]
    pub fn with_policy(policy: impl CookiePolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
            cookies: RwLock::new(HashMap::new()),
        }
    }

    /// Add a `Cookie` header with the cookies stored for `url`'s host.
    /// An existing `Cookie` header is left untouched.
    pub fn attach(&self, url: &str, headers: &mut HeaderMap) {
        if headers.contains_key(COOKIE) {
            return;
        }
        let host = cookie_host(url);
        let cookies = self.cookies.read();
        let Some(stored) = cookies.get(&host) else {
            return;
        };

        let line = stored
            .iter()
            .filter(|(name, _)| self.policy.send(&host, name))
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if line.is_empty() {
            return;
        }
        match HeaderValue::try_from(line) {
            Ok(value) => {
                headers.insert(COOKIE, value);
            }
            Err(err) => tracing::debug!(host = %host, error = %err, "Skipping unencodable cookies"),
        }
    }

    /// Record every `Set-Cookie` header of a response from `url`
    pub fn store(&self, url: &str, headers: &HeaderMap) {
        let host = cookie_host(url);
        for raw in headers.get_all(SET_COOKIE) {
            let Ok(raw) = raw.to_str() else {
                continue;
            };
            let Some((name, value, expired)) = parse_set_cookie(raw) else {
                continue;
            };

            let mut cookies = self.cookies.write();
            if expired {
                if let Some(stored) = cookies.get_mut(&host) {
                    stored.remove(name);
                }
                continue;
            }
            if !self.policy.accept(&host, name, value) {
                tracing::debug!(host = %host, cookie = %name, "Cookie rejected by policy");
                continue;
            }
            cookies
                .entry(host.clone())
                .or_default()
                .insert(name.to_owned(), value.to_owned());
        }
    }

    /// Stored value of cookie `name` for `host`
    #[must_use]
    pub fn get(&self, host: &str, name: &str) -> Option<String> {
        self.cookies
            .read()
            .get(&host.to_ascii_lowercase())
            .and_then(|stored| stored.get(name).cloned())
    }

    /// Total number of stored cookies
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.read().values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cookies.write().clear();
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar")
            .field("cookies", &self.len())
            .finish_non_exhaustive()
    }
}

fn cookie_host(url: &str) -> String {
    let url = Url::parse(url);
    let host = url.host();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !host.ends_with(']') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    };
    host.to_ascii_lowercase()
}

// name=value[; attr[=value]]...
fn parse_set_cookie(raw: &str) -> Option<(&str, &str, bool)> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let expired = parts.any(|attr| {
        attr.split_once('=').is_some_and(|(key, value)| {
            key.trim().eq_ignore_ascii_case("max-age") && value.trim() == "0"
        })
    });
    Some((name, value.trim().trim_matches('"'), expired))
}
