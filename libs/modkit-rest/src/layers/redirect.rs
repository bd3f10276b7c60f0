//! Redirect policy for the built-in transport.
//!
//! Follows redirects up to [`RedirectConfig::max_redirects`] and, once a
//! redirect has left the original origin, drops `Authorization`, `Cookie`
//! and `Proxy-Authorization` from every following request.

use crate::config::RedirectConfig;
use http::{Request, Uri, header};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

const SENSITIVE_HEADERS: &[header::HeaderName] = &[
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// Implements [`tower_http::follow_redirect::policy::Policy`]; cloned fresh
/// for every request, so counters never leak between requests.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    config: RedirectConfig,
    followed: usize,
    left_origin: bool,
}

impl RedirectPolicy {
    #[must_use]
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config,
            followed: 0,
            left_origin: false,
        }
    }

    fn same_origin(a: &Uri, b: &Uri) -> bool {
        let scheme_a = a.scheme_str().unwrap_or("http");
        let scheme_b = b.scheme_str().unwrap_or("http");
        let port_a = a.port_u16().unwrap_or_else(|| default_port(scheme_a));
        let port_b = b.port_u16().unwrap_or_else(|| default_port(scheme_b));

        scheme_a.eq_ignore_ascii_case(scheme_b)
            && a.host().unwrap_or("").eq_ignore_ascii_case(b.host().unwrap_or(""))
            && port_a == port_b
    }
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "https" => 443,
        _ => 80,
    }
}

impl<B: Clone, E> Policy<B, E> for RedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        if self.followed >= self.config.max_redirects {
            tracing::debug!(
                followed = self.followed,
                max = self.config.max_redirects,
                location = %attempt.location(),
                "Not following redirect"
            );
            return Ok(Action::Stop);
        }
        self.followed += 1;

        if !Self::same_origin(attempt.previous(), attempt.location()) {
            self.left_origin = true;
        }
        tracing::debug!(location = %attempt.location(), "Following redirect");
        Ok(Action::Follow)
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        if self.left_origin && self.config.strip_sensitive_headers {
            let headers = request.headers_mut();
            for name in SENSITIVE_HEADERS {
                headers.remove(name);
            }
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        Some(body.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_same_origin() {
        assert!(RedirectPolicy::same_origin(
            &uri("http://api.test/a"),
            &uri("http://api.test:80/b")
        ));
        assert!(RedirectPolicy::same_origin(
            &uri("https://API.test/a"),
            &uri("https://api.test/b")
        ));
        assert!(!RedirectPolicy::same_origin(
            &uri("http://api.test/a"),
            &uri("https://api.test/a")
        ));
        assert!(!RedirectPolicy::same_origin(
            &uri("http://api.test/a"),
            &uri("http://api.test:8080/a")
        ));
        assert!(!RedirectPolicy::same_origin(
            &uri("http://api.test/a"),
            &uri("http://other.test/a")
        ));
    }

    #[test]
    fn test_strips_only_after_leaving_origin() {
        let mut policy = RedirectPolicy::new(RedirectConfig::default());
        let mut req = Request::get("http://other.test/")
            .header(header::AUTHORIZATION, "Basic x")
            .header(header::COOKIE, "a=b")
            .header("x-keep", "1")
            .body(())
            .unwrap();

        <RedirectPolicy as Policy<(), ()>>::on_request(&mut policy, &mut req);
        assert!(req.headers().contains_key(header::AUTHORIZATION));

        policy.left_origin = true;
        <RedirectPolicy as Policy<(), ()>>::on_request(&mut policy, &mut req);
        assert!(!req.headers().contains_key(header::AUTHORIZATION));
        assert!(!req.headers().contains_key(header::COOKIE));
        assert!(req.headers().contains_key("x-keep"));
    }

    #[test]
    fn test_stripping_can_be_disabled() {
        let mut policy = RedirectPolicy::new(RedirectConfig {
            strip_sensitive_headers: false,
            ..Default::default()
        });
        policy.left_origin = true;
        let mut req = Request::get("http://other.test/")
            .header(header::AUTHORIZATION, "Basic x")
            .body(())
            .unwrap();
        <RedirectPolicy as Policy<(), ()>>::on_request(&mut policy, &mut req);
        assert!(req.headers().contains_key(header::AUTHORIZATION));
    }
}
