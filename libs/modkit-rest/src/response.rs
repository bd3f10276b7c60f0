use crate::client::Client;
use crate::error::{RestError, StatusError};
use crate::links::Links;
use crate::registry::ResponseContext;
use crate::transport::TransportResponse;
use crate::value::Data;
use bytes::Bytes;
use http::header::LINK;
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::ops::Index;

/// A normalized response.
///
/// Built eagerly: status classification, MIME decoding, datatype coercion and
/// `Link` parsing all happen in [`Response::new`]. Status 400..=499 becomes
/// `RestError::Request`, 500 and above `RestError::Server`, so a `Response`
/// value always has a status below 400.
pub struct Response {
    status: StatusCode,
    url: String,
    headers: HeaderMap,
    body: Bytes,
    data: Data,
    links: Option<Links>,
}

impl Response {
    /// Normalize a raw transport response using `client`'s registry
    ///
    /// # Errors
    /// - `RestError::Server` / `RestError::Request` for 5xx / 4xx, carrying the body text
    /// - `RestError::Utf8` or a handler error for a malformed body under a handled MIME type
    pub fn new(raw: TransportResponse, client: &Client) -> Result<Self, RestError> {
        if raw.status.as_u16() >= 400 {
            tracing::debug!(status = %raw.status, url = %raw.url, "Error status");
            let err = StatusError::new(raw.status, raw.text_lossy());
            return Err(if raw.status.as_u16() >= 500 {
                RestError::Server(err)
            } else {
                RestError::Request(err)
            });
        }

        let registry = client.registry();
        let ctx = ResponseContext {
            client,
            status: raw.status,
            headers: &raw.headers,
            url: &raw.url,
        };
        let data = registry.decode(&ctx, raw.content_type(), &raw.body)?;
        let data = registry.coerce(&ctx, data);

        let links = link_header(&raw.headers).map(|header| Links::parse(&header, client));

        Ok(Self {
            status: raw.status,
            url: raw.url,
            headers: raw.headers,
            body: raw.body,
            data,
            links,
        })
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// True for any status below 400
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 400
    }

    /// Final URL after redirects
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body bytes
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Raw body as text, invalid UTF-8 replaced
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    #[must_use]
    pub fn data(&self) -> &Data {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Data {
        self.data
    }

    /// Member of a map body
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Data> {
        self.data.get(key)
    }

    #[must_use]
    pub fn links(&self) -> Option<&Links> {
        self.links.as_ref()
    }
}

impl Index<&str> for Response {
    type Output = Data;

    fn index(&self, key: &str) -> &Data {
        &self.data[key]
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("links", &self.links)
            .finish_non_exhaustive()
    }
}

// Several Link headers are equivalent to one comma-joined header
fn link_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::HeaderValue;
    use http::header::CONTENT_TYPE;

    fn raw(status: u16, content_type: Option<&str>, body: &'static str) -> TransportResponse {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        TransportResponse {
            status: StatusCode::from_u16(status).unwrap(),
            url: "http://api.test/things/".to_owned(),
            headers,
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn test_status_boundaries() {
        let client = Client::new("http://api.test/").unwrap();

        let ok = Response::new(raw(399, None, ""), &client).unwrap();
        assert!(ok.is_success());

        let err = Response::new(raw(400, None, "bad"), &client).unwrap_err();
        assert!(matches!(err, RestError::Request(_)));
        assert!(err == 400);

        let err = Response::new(raw(499, None, ""), &client).unwrap_err();
        assert!(matches!(err, RestError::Request(_)));

        let err = Response::new(raw(500, None, "boom"), &client).unwrap_err();
        assert!(matches!(err, RestError::Server(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_not_found_displays_body() {
        let client = Client::new("http://api.test/").unwrap();
        let err = Response::new(raw(404, Some("text/plain"), "not found"), &client).unwrap_err();
        assert_eq!(err.to_string(), "not found");
        assert!(err == 404);
    }

    #[test]
    fn test_json_body_coerced() {
        let client = Client::new("http://api.test/").unwrap();
        let resp = Response::new(
            raw(
                200,
                Some("application/json; charset=utf-8"),
                r#"{"url": "/widgets/9", "when": "07/04/76", "name": "w"}"#,
            ),
            &client,
        )
        .unwrap();

        assert_eq!(
            resp["url"].as_route().unwrap().to_string(),
            "http://api.test/widgets/9/"
        );
        assert!(resp["when"].as_date().is_some());
        assert_eq!(resp.get("name").and_then(Data::as_str), Some("w"));
        assert!(resp.links().is_none());
    }

    #[test]
    fn test_unhandled_mime_keeps_raw_bytes() {
        let client = Client::new("http://api.test/").unwrap();
        let resp = Response::new(raw(200, Some("text/plain"), "/not/a/route"), &client).unwrap();
        assert_eq!(
            resp.data().as_bytes(),
            Some(&Bytes::from_static(b"/not/a/route"))
        );
        assert_eq!(resp.text(), "/not/a/route");
    }

    #[test]
    fn test_malformed_json_propagates() {
        let client = Client::new("http://api.test/").unwrap();
        let err = Response::new(raw(200, Some("application/json"), "{"), &client).unwrap_err();
        assert!(matches!(err, RestError::Json(_)));
    }

    #[test]
    fn test_multiple_link_headers_merge() {
        let client = Client::new("http://api.test/").unwrap();
        let mut response = raw(200, None, "");
        response
            .headers
            .append(LINK, HeaderValue::from_static(r#"</a>; rel="next""#));
        response
            .headers
            .append(LINK, HeaderValue::from_static(r#"</b>; rel="prev""#));

        let resp = Response::new(response, &client).unwrap();
        let links = resp.links().unwrap();
        assert_eq!(links.len(), 2);
    }
}
