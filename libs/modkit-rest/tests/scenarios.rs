//! End-to-end client behavior over an in-memory transport.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDate;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use modkit_rest::{
    Client, Data, Outcome, RestError, StatusKind, Transport, TransportError, TransportRequest,
    TransportResponse,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

/// Answers every request with the same canned response and records requests
struct CannedTransport {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: &'static str,
    seen: Mutex<Vec<TransportRequest>>,
}

impl CannedTransport {
    fn new(status: u16, content_type: Option<&'static str>, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn json(body: &'static str) -> Arc<Self> {
        Self::new(200, Some("application/json"), body)
    }

    fn last(&self) -> TransportRequest {
        self.seen.lock().last().cloned().unwrap()
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = request.url.clone();
        self.seen.lock().push(request);

        let mut headers = HeaderMap::new();
        if let Some(ct) = self.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        Ok(TransportResponse {
            status: self.status,
            url,
            headers,
            body: Bytes::from_static(self.body.as_bytes()),
        })
    }
}

struct FailingTransport;

#[async_trait]
impl Transport for FailingTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        Err(TransportError::Connect(
            format!("connection refused: {}", request.url).into(),
        ))
    }
}

fn client_with(transport: Arc<dyn Transport>) -> Client {
    Client::builder("http://api.test/")
        .transport(transport)
        .build()
        .unwrap()
}

#[test]
fn test_nested_path_renders_with_trailing_slash() {
    let client = Client::new("http://api.test/").unwrap();
    let info = client.route("users").unwrap().child("info").unwrap();
    assert_eq!(info.to_string(), "http://api.test/users/info/");
}

#[tokio::test]
async fn test_same_origin_path_in_body_becomes_route() {
    let transport = CannedTransport::json(r#"{"url": "/widgets/9"}"#);
    let client = client_with(transport);

    let resp = client.call().await.unwrap();
    let route = resp["url"].as_route().unwrap();
    assert_eq!(route.to_string(), "http://api.test/widgets/9/");
    assert!(Arc::ptr_eq(route, &client.route("widgets/9").unwrap()));
}

#[tokio::test]
async fn test_date_string_in_body_becomes_date() {
    let transport = CannedTransport::json(r#"{"when": "07/04/76"}"#);
    let client = client_with(transport);

    let resp = client.call().await.unwrap();
    let expected = NaiveDate::from_ymd_opt(1976, 7, 4)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(resp["when"].as_date(), Some(expected));
}

#[tokio::test]
async fn test_sequence_param_form_encodes_as_repeated_pairs() {
    let transport = CannedTransport::json("{}");
    let client = client_with(transport.clone());

    client
        .route("posts")
        .unwrap()
        .request()
        .method("POST")
        .param("tags", json!(["a", "b"]))
        .send()
        .await
        .unwrap();

    let sent = transport.last();
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.body, Bytes::from_static(b"tags=a&tags=b"));
    assert_eq!(sent.url, "http://api.test/posts/");
}

#[tokio::test]
async fn test_not_found_is_request_error_displaying_body() {
    let transport = CannedTransport::new(404, Some("text/plain"), "not found");
    let client = client_with(transport);

    let err = client.route("missing").unwrap().call().await.unwrap_err();
    assert!(matches!(err, RestError::Request(_)));
    assert_eq!(err.to_string(), "not found");
    assert!(err == 404);
}

#[tokio::test]
async fn test_status_classification_boundaries() {
    let cases = [(399, None), (400, Some(4)), (499, Some(4)), (500, Some(5)), (503, Some(5))];
    for (status, expected) in cases {
        let client = client_with(CannedTransport::new(status, None, "body"));
        let result = client.call().await;
        match (expected, result) {
            (None, Ok(resp)) => assert_eq!(resp.status().as_u16(), status),
            (Some(4), Err(RestError::Request(err))) | (Some(5), Err(RestError::Server(err))) => {
                assert_eq!(err.code(), status);
                assert_eq!(err.body(), "body");
            }
            (_, other) => panic!("status {status}: unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_route_defaults_merge_with_call_site() {
    let transport = CannedTransport::json("[]");
    let client = client_with(transport.clone());

    let users = client.route("users?limit=10").unwrap();
    users.add_header("X-Team", "core").unwrap();
    client.route("users").unwrap().add_param("page", 1);

    users.request().param("page", 3).send().await.unwrap();

    let sent = transport.last();
    assert_eq!(sent.method, Method::GET);
    assert_eq!(sent.url, "http://api.test/users/?limit=10&page=3");
    assert_eq!(sent.headers.get("x-team").unwrap(), "core");
}

#[tokio::test]
async fn test_json_params_round_trip_through_json_handler() {
    let transport = Arc::new(EchoTransport);
    let client = client_with(transport);

    let resp = client
        .route("echo")
        .unwrap()
        .request()
        .method("PUT")
        .header("Content-Type", "application/json")
        .param("name", "widget")
        .param("count", 3)
        .param("tags", json!(["x", "y"]))
        .send()
        .await
        .unwrap();

    assert_eq!(resp["name"].as_str(), Some("widget"));
    assert_eq!(resp["count"].as_i64(), Some(3));
    let tags: Vec<_> = resp["tags"]
        .as_list()
        .unwrap()
        .iter()
        .filter_map(Data::as_str)
        .collect();
    assert_eq!(tags, ["x", "y"]);
}

/// Sends the request body back with the request content type
struct EchoTransport;

#[async_trait]
impl Transport for EchoTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut headers = HeaderMap::new();
        if let Some(ct) = request.headers.get(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, ct.clone());
        }
        Ok(TransportResponse {
            status: StatusCode::OK,
            url: request.url,
            headers,
            body: request.body,
        })
    }
}

#[tokio::test]
async fn test_transport_failure_is_invalid_url() {
    let client = client_with(Arc::new(FailingTransport));

    let err = client.route("users").unwrap().call().await.unwrap_err();
    match err {
        RestError::InvalidUrl { url, source } => {
            assert_eq!(url, "http://api.test/users/");
            assert!(matches!(source, TransportError::Connect(_)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_status_pairs() {
    let ok = client_with(CannedTransport::json(r#"{"a": 1}"#));
    let (kind, outcome) = ok.request().send_coded().await.unwrap();
    assert_eq!(kind, StatusKind::Success);
    assert_eq!(outcome.into_response().unwrap()["a"].as_i64(), Some(1));

    let missing = client_with(CannedTransport::new(404, None, "nope"));
    let (kind, outcome) = missing.request().send_coded().await.unwrap();
    assert_eq!(kind.code(), 4);
    assert!(matches!(outcome, Outcome::Error(ref err) if err.to_string() == "nope"));

    let down = client_with(Arc::new(FailingTransport));
    let (kind, outcome) = down.request().send_coded().await.unwrap();
    assert_eq!(kind, StatusKind::InvalidUrl);
    assert!(matches!(outcome, Outcome::Nothing));

    let malformed = client_with(CannedTransport::json("{"));
    assert!(matches!(
        malformed.request().send_coded().await,
        Err(RestError::Json(_))
    ));
}

#[tokio::test]
async fn test_route_outlives_client() {
    let route = {
        let client = client_with(CannedTransport::json("{}"));
        client.route("users").unwrap()
    };
    assert!(matches!(route.call().await, Err(RestError::ClientDropped)));
}

#[tokio::test]
async fn test_client_defaults_reach_every_route() {
    let transport = CannedTransport::json("{}");
    let client = Client::builder("http://api.test/1?key=app")
        .transport(transport.clone())
        .build()
        .unwrap();
    client.add_param("token", "secret");
    client.add_header("X-Client", "boards").unwrap();

    client.route("boards").unwrap().call().await.unwrap();
    let boards = transport.last();
    assert_eq!(
        boards.url,
        "http://api.test/1/boards/?key=app&token=secret"
    );
    assert_eq!(boards.headers.get("x-client").unwrap(), "boards");

    let cards = client.route("cards/7").unwrap();
    cards.add_param("token", "scoped");
    cards.request().method("POST").send().await.unwrap();
    let sent = transport.last();
    assert_eq!(sent.url, "http://api.test/1/cards/7/");
    assert_eq!(sent.body, Bytes::from_static(b"key=app&token=scoped"));
    assert_eq!(sent.headers.get("x-client").unwrap(), "boards");
}
