//! URL value type used for route resolution.
//!
//! A [`Url`] is a protocol, a host, a list of path segments and a flat query
//! map. Segments are never empty and never contain `/`; a trailing slash is a
//! rendering rule, not part of the value. Parsing is total: a missing or
//! malformed scheme falls back to `http` and an unparseable query string
//! yields an empty map.

use std::collections::BTreeMap;
use std::fmt;

/// Flat query map (one value per key)
pub type Query = BTreeMap<String, String>;

const DEFAULT_PROTOCOL: &str = "http";
const PATH_DELIMITER: char = '/';
const QUERY_DELIMITER: char = '?';

/// How a query string with a repeated key collapses into a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatedKeyPolicy {
    /// The last occurrence wins (`a=1&a=2` → `a=2`)
    #[default]
    LastWins,
    /// The first occurrence wins (`a=1&a=2` → `a=1`)
    FirstWins,
    /// Keys that appear more than once are dropped entirely
    DropRepeated,
}

impl RepeatedKeyPolicy {
    /// Parse a raw query string (without the leading `?`) under this policy.
    ///
    /// Pairs with an empty value are ignored.
    #[must_use]
    pub fn parse_query(self, raw: &str) -> Query {
        let mut query = Query::new();
        let mut repeated = Vec::new();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key.is_empty() || value.is_empty() {
                continue;
            }
            match query.entry(key.into_owned()) {
                std::collections::btree_map::Entry::Vacant(slot) => {
                    slot.insert(value.into_owned());
                }
                std::collections::btree_map::Entry::Occupied(mut slot) => match self {
                    RepeatedKeyPolicy::LastWins => {
                        slot.insert(value.into_owned());
                    }
                    RepeatedKeyPolicy::FirstWins => {}
                    RepeatedKeyPolicy::DropRepeated => repeated.push(slot.key().clone()),
                },
            }
        }

        for key in repeated {
            query.remove(&key);
        }
        query
    }
}

/// Protocol + host + path segments + query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    protocol: String,
    host: String,
    path: Vec<String>,
    query: Query,
}

impl Url {
    /// Build a URL from its parts. Segments are normalized the same way
    /// parsing normalizes them.
    #[must_use]
    pub fn from_parts(
        protocol: impl Into<String>,
        host: impl Into<String>,
        path: impl IntoIterator<Item = impl AsRef<str>>,
        query: Query,
    ) -> Self {
        let protocol = protocol.into();
        Self {
            protocol: if is_valid_scheme(&protocol) {
                protocol
            } else {
                DEFAULT_PROTOCOL.to_owned()
            },
            host: host.into(),
            path: path
                .into_iter()
                .flat_map(|segment| split_segments(segment.as_ref()))
                .collect(),
            query,
        }
    }

    /// Parse a raw URL string, keeping the last value of repeated query keys.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self::parse_with(raw, RepeatedKeyPolicy::default())
    }

    /// Parse a raw URL string with an explicit repeated-key policy.
    ///
    /// `scheme://host/path?query`, `//host/path` and `host/path` are accepted;
    /// the fragment is discarded.
    #[must_use]
    pub fn parse_with(raw: &str, policy: RepeatedKeyPolicy) -> Self {
        let raw = raw.trim();
        let raw = raw.split_once('#').map_or(raw, |(before, _)| before);
        let (location, query) = match raw.split_once(QUERY_DELIMITER) {
            Some((location, query)) => (location, policy.parse_query(query)),
            None => (raw, Query::new()),
        };

        let (protocol, rest) = match location.split_once("://") {
            Some((scheme, rest)) if is_valid_scheme(scheme) => (scheme.to_ascii_lowercase(), rest),
            Some((_, rest)) => (DEFAULT_PROTOCOL.to_owned(), rest),
            None => (
                DEFAULT_PROTOCOL.to_owned(),
                location.strip_prefix("//").unwrap_or(location),
            ),
        };

        let (host, path) = rest.split_once(PATH_DELIMITER).unwrap_or((rest, ""));

        Self {
            protocol,
            host: host.to_owned(),
            path: split_segments(path),
            query,
        }
    }

    /// Break a relative path (optionally carrying a query string) into its
    /// segments and query map.
    #[must_use]
    pub fn split(path: &str, policy: RepeatedKeyPolicy) -> (Vec<String>, Query) {
        match path.split_once(QUERY_DELIMITER) {
            Some((path, query)) => (split_segments(path), policy.parse_query(query)),
            None => (split_segments(path), Query::new()),
        }
    }

    /// New URL with `addition`'s segments appended and its query merged in
    /// (the addition wins on key conflicts).
    #[must_use]
    pub fn extend(&self, addition: &str, policy: RepeatedKeyPolicy) -> Self {
        let (segments, query) = Self::split(addition, policy);
        self.extend_parts(segments, query)
    }

    /// Same as [`extend`](Self::extend) with pre-split parts.
    #[must_use]
    pub fn extend_parts(&self, segments: impl IntoIterator<Item = String>, query: Query) -> Self {
        let mut url = self.clone();
        url.path
            .extend(segments.into_iter().filter(|s| is_valid_segment(s)));
        url.query.extend(query);
        url
    }

    /// Copy of this URL without its query map
    #[must_use]
    pub fn without_query(&self) -> Self {
        Self {
            query: Query::new(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// `{protocol}://{host}` without any path
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.protocol, self.host)
    }

    /// Path rendered with leading and trailing slashes (`/` for the root)
    #[must_use]
    pub fn path_string(&self) -> String {
        if self.path.is_empty() {
            return PATH_DELIMITER.to_string();
        }
        format!("/{}/", self.path.join("/"))
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.protocol, self.host, self.path_string())
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split(PATH_DELIMITER)
        .filter(|segment| is_valid_segment(segment))
        .map(str::to_owned)
        .collect()
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(PATH_DELIMITER)
}

// RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_url() {
        let url = Url::parse("https://api.test/users/info?page=2&limit=10");
        assert_eq!(url.protocol(), "https");
        assert_eq!(url.host(), "api.test");
        assert_eq!(url.segments(), ["users", "info"]);
        assert_eq!(url.query().get("page").map(String::as_str), Some("2"));
        assert_eq!(url.query().get("limit").map(String::as_str), Some("10"));
    }

    #[test]
    fn test_parse_defaults_missing_scheme() {
        let url = Url::parse("api.test/users");
        assert_eq!(url.protocol(), "http");
        assert_eq!(url.host(), "api.test");
        assert_eq!(url.segments(), ["users"]);

        let url = Url::parse("//api.test/");
        assert_eq!(url.to_string(), "http://api.test/");
    }

    #[test]
    fn test_parse_defaults_malformed_scheme() {
        let url = Url::parse("ht!tp://api.test/x");
        assert_eq!(url.protocol(), "http");
        assert_eq!(url.host(), "api.test");
        assert_eq!(url.segments(), ["x"]);
    }

    #[test]
    fn test_parse_drops_empty_segments() {
        let url = Url::parse("http://api.test//users///info/");
        assert_eq!(url.segments(), ["users", "info"]);
    }

    #[test]
    fn test_parse_garbage_query_is_total() {
        let url = Url::parse("http://api.test/?&&==&%%%");
        assert!(url.query().is_empty());
    }

    #[test]
    fn test_render_trailing_slash() {
        assert_eq!(Url::parse("http://api.test").to_string(), "http://api.test/");
        assert_eq!(
            Url::parse("http://api.test/users/info").to_string(),
            "http://api.test/users/info/"
        );
        assert_eq!(
            Url::parse("http://api.test/users?x=1").to_string(),
            "http://api.test/users/"
        );
    }

    #[test]
    fn test_trailing_slash_not_part_of_equality() {
        assert_eq!(
            Url::parse("http://api.test/users/"),
            Url::parse("http://api.test/users")
        );
        assert_ne!(
            Url::parse("http://api.test/users?a=1"),
            Url::parse("http://api.test/users")
        );
    }

    #[test]
    fn test_extend_appends_segments_and_merges_query() {
        let base = Url::parse("http://api.test/v1?token=abc&page=1");
        let url = base.extend("users/42?page=3", RepeatedKeyPolicy::LastWins);

        assert_eq!(url.segments(), ["v1", "users", "42"]);
        assert_eq!(url.query().get("token").map(String::as_str), Some("abc"));
        assert_eq!(url.query().get("page").map(String::as_str), Some("3"));
        // base untouched
        assert_eq!(base.segments(), ["v1"]);
    }

    #[test]
    fn test_repeated_key_policies() {
        let raw = "a=1&a=2&b=3";

        let last = RepeatedKeyPolicy::LastWins.parse_query(raw);
        assert_eq!(last.get("a").map(String::as_str), Some("2"));

        let first = RepeatedKeyPolicy::FirstWins.parse_query(raw);
        assert_eq!(first.get("a").map(String::as_str), Some("1"));

        let dropped = RepeatedKeyPolicy::DropRepeated.parse_query(raw);
        assert!(!dropped.contains_key("a"));
        assert_eq!(dropped.get("b").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_query_decodes_percent_and_plus() {
        let query = RepeatedKeyPolicy::LastWins.parse_query("q=hello+world&tag=a%2Fb");
        assert_eq!(query.get("q").map(String::as_str), Some("hello world"));
        assert_eq!(query.get("tag").map(String::as_str), Some("a/b"));
    }

    #[test]
    fn test_from_parts_filters_segments() {
        let url = Url::from_parts("https", "api.test", ["a/b", "", "c"], Query::new());
        assert_eq!(url.segments(), ["a", "b", "c"]);
        assert_eq!(url.origin(), "https://api.test");
        assert_eq!(url.path_string(), "/a/b/c/");
    }
}
