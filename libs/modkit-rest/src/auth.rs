//! Basic-auth credential store.

use crate::url::{RepeatedKeyPolicy, Url};
use base64::{Engine as _, engine::general_purpose};
use http::HeaderValue;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use zeroize::Zeroizing;

struct Credential {
    scope: Url,
    username: String,
    password: SecretString,
}

impl Credential {
    fn covers(&self, target: &Url) -> bool {
        self.scope.protocol() == target.protocol()
            && self.scope.host().eq_ignore_ascii_case(target.host())
            && target.segments().starts_with(self.scope.segments())
    }
}

/// Username/password pairs keyed by URL prefix.
///
/// A prefix covers every URL on the same origin whose path starts with the
/// prefix path, segment-wise. When several prefixes cover a URL the longest
/// one is used.
#[derive(Default)]
pub struct CredentialStore {
    entries: RwLock<Vec<Credential>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add credentials for `prefix`, replacing an entry with the same scope
    pub fn add(&self, prefix: &str, username: &str, password: &str) {
        let scope = Url::parse_with(prefix, RepeatedKeyPolicy::default()).without_query();
        let credential = Credential {
            scope,
            username: username.to_owned(),
            password: SecretString::from(password.to_owned()),
        };

        let mut entries = self.entries.write();
        entries.retain(|existing| existing.scope != credential.scope);
        tracing::debug!(scope = %credential.scope, "Registered credentials");
        entries.push(credential);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// `Basic` authorization header for `url`, if any prefix covers it
    #[must_use]
    pub fn header_for(&self, url: &str) -> Option<HeaderValue> {
        let target = Url::parse(url);
        let entries = self.entries.read();
        let credential = entries
            .iter()
            .filter(|c| c.covers(&target))
            .max_by_key(|c| c.scope.segments().len())?;

        let plain = Zeroizing::new(format!(
            "{}:{}",
            credential.username,
            credential.password.expose_secret()
        ));
        let encoded = Zeroizing::new(general_purpose::STANDARD.encode(plain.as_bytes()));
        let mut value = HeaderValue::try_from(format!("Basic {}", &*encoded)).ok()?;
        value.set_sensitive(true);
        Some(value)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scopes: Vec<String> = self
            .entries
            .read()
            .iter()
            .map(|c| c.scope.to_string())
            .collect();
        f.debug_struct("CredentialStore")
            .field("scopes", &scopes)
            .finish()
    }
}
