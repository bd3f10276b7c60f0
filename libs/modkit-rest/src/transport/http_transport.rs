use super::{Transport, TransportRequest, TransportResponse};
use crate::auth::CredentialStore;
use crate::config::ClientConfig;
use crate::cookies::CookieJar;
use crate::error::{RestError, TransportError};
use crate::layers::{BasicAuthLayer, RedirectPolicy, UserAgentLayer};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower::util::BoxCloneSyncService;
use tower::{BoxError, ServiceBuilder, ServiceExt};
use tower_http::follow_redirect::{FollowRedirectLayer, RequestUri};

type HttpService = BoxCloneSyncService<Request<Full<Bytes>>, Response<Incoming>, BoxError>;

/// Default [`Transport`]: pooled hyper client over rustls (HTTP and HTTPS).
///
/// Layer stack (outer to inner):
/// `UserAgent → [BasicAuth] → FollowRedirect → hyper client`.
/// Cookies are attached before and stored after the exchange; the whole
/// exchange, redirects and body read included, runs under one timeout.
pub struct HyperTransport {
    service: HttpService,
    timeout: Duration,
    cookies: Option<Arc<CookieJar>>,
}

impl HyperTransport {
    /// # Errors
    /// Returns `RestError::Tls` if the TLS connector cannot be built, or
    /// `RestError::InvalidHeaderValue` for an invalid user agent
    pub fn new(
        config: &ClientConfig,
        credentials: Option<Arc<CredentialStore>>,
        cookies: Option<Arc<CookieJar>>,
    ) -> Result<Self, RestError> {
        let https = build_https_connector()?;

        let mut client_builder = Client::builder(TokioExecutor::new());
        client_builder
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(idle_timeout) = config.pool_idle_timeout {
            client_builder.pool_idle_timeout(idle_timeout);
        }
        let hyper_client = client_builder.build::<_, Full<Bytes>>(https);

        let service = ServiceBuilder::new()
            .layer(UserAgentLayer::try_new(&config.user_agent)?)
            .option_layer(credentials.map(BasicAuthLayer::new))
            .layer(FollowRedirectLayer::with_policy(RedirectPolicy::new(
                config.redirect.clone(),
            )))
            .service(hyper_client)
            .map_err(Into::<BoxError>::into);

        Ok(Self {
            service: BoxCloneSyncService::new(service),
            timeout: config.request_timeout,
            cookies,
        })
    }

    async fn exchange(
        &self,
        request: Request<Full<Bytes>>,
        url: &str,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .service
            .clone()
            .oneshot(request)
            .await
            .map_err(TransportError::Connect)?;

        let final_url = response
            .extensions()
            .get::<RequestUri>()
            .map_or_else(|| url.to_owned(), |uri| uri.0.to_string());

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TransportError::Body(Box::new(e)))?
            .to_bytes();

        Ok(TransportResponse {
            status: parts.status,
            url: final_url,
            headers: parts.headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let TransportRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        let uri = parse_target(&url)?;
        if let Some(jar) = &self.cookies {
            jar.attach(&url, &mut headers);
        }

        let mut http_request = Request::new(Full::new(body));
        *http_request.method_mut() = method;
        *http_request.uri_mut() = uri;
        *http_request.headers_mut() = headers;

        let response = tokio::time::timeout(self.timeout, self.exchange(http_request, &url))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))??;

        if let Some(jar) = &self.cookies {
            jar.store(&response.url, &response.headers);
        }
        Ok(response)
    }
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .field("cookies", &self.cookies.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_target(url: &str) -> Result<Uri, TransportError> {
    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| TransportError::InvalidUri {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;
    if uri.scheme().is_none() || uri.host().is_none_or(str::is_empty) {
        return Err(TransportError::InvalidUri {
            url: url.to_owned(),
            reason: "URL must be absolute".to_owned(),
        });
    }
    Ok(uri)
}

fn build_https_connector() -> Result<HttpsConnector<HttpConnector>, RestError> {
    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(provider)
        .map_err(|e| RestError::Tls(Box::new(e)))?
        .https_or_http()
        .enable_all_versions()
        .build();
    Ok(connector)
}
