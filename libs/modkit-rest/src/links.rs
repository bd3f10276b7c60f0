//! `Link` response header (`<url>; rel="next", <url>; rel="last"`).

use crate::client::{Client, Lookup};
use crate::error::RestError;
use crate::route::Route;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// One `<url>; key=value; ...` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    url: String,
    params: BTreeMap<String, String>,
}

impl Link {
    /// Parse one entry; `None` when the URL part is empty
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (url, rest) = raw
            .strip_prefix('<')
            .and_then(|r| r.split_once('>'))
            .or_else(|| raw.split_once(';'))
            .unwrap_or((raw, ""));
        let url = url.trim_matches(|c: char| matches!(c, ' ' | '<' | '>' | '"'));
        if url.is_empty() {
            return None;
        }

        let params = rest
            .split(';')
            .filter_map(|part| {
                let (key, value) = part
                    .trim_matches(|c: char| matches!(c, ' ' | '"' | '\''))
                    .split_once('=')?;
                let value = value.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
                Some((key.trim().to_ascii_lowercase(), value.to_owned()))
            })
            .collect();

        Some(Self {
            url: url.to_owned(),
            params,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Relation types; `rel` may list several separated by spaces
    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.params
            .get("rel")
            .map(|rel| rel.split_whitespace())
            .into_iter()
            .flatten()
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Relation-keyed view of a response's `Link` header.
///
/// Routes are resolved on demand through the owning client.
#[derive(Clone)]
pub struct Links {
    entries: BTreeMap<String, Link>,
    client: Client,
}

impl Links {
    /// Parse a header value. Entries without a `rel` are skipped; a later
    /// entry for the same relation replaces an earlier one.
    #[must_use]
    pub fn parse(header: &str, client: &Client) -> Self {
        let mut entries = BTreeMap::new();
        for link in split_entries(header).filter_map(Link::parse) {
            let rels: Vec<String> = link.rels().map(str::to_owned).collect();
            if rels.is_empty() {
                tracing::debug!(url = %link.url, "Skipping link without rel");
                continue;
            }
            for rel in rels {
                entries.insert(rel, link.clone());
            }
        }
        Self {
            entries,
            client: client.clone(),
        }
    }

    #[must_use]
    pub fn get(&self, rel: &str) -> Option<&Link> {
        self.entries.get(rel)
    }

    /// Route for a relation, `None` if the relation is absent
    #[must_use]
    pub fn route(&self, rel: &str) -> Option<Result<Arc<Route>, RestError>> {
        let link = self.entries.get(rel)?;
        Some(
            self.client
                .resolve_url(&link.url)
                .and_then(|lookup| match lookup {
                    Lookup::Route(route) => Ok(route),
                    Lookup::Passthrough(path) => Err(RestError::OutsideBasePath {
                        path,
                        base: self.client.base_url().path_string(),
                    }),
                }),
        )
    }

    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a header value on commas outside `<...>`
fn split_entries(header: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0usize;
    header.split(move |c: char| match c {
        '<' => {
            depth += 1;
            false
        }
        '>' => {
            depth = depth.saturating_sub(1);
            false
        }
        ',' => depth == 0,
        _ => false,
    })
}

impl fmt::Debug for Links {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(rel, link)| (rel, &link.url)))
            .finish()
    }
}
