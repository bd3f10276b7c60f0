use crate::auth::CredentialStore;
use http::Request;
use http::header::AUTHORIZATION;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Sends basic-auth credentials up front for URLs covered by a
/// [`CredentialStore`]. Requests that already carry `Authorization` pass
/// through unchanged.
#[derive(Clone, Debug)]
pub struct BasicAuthLayer {
    store: Arc<CredentialStore>,
}

impl BasicAuthLayer {
    #[must_use]
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthService {
            inner,
            store: Arc::clone(&self.store),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BasicAuthService<S> {
    inner: S,
    store: Arc<CredentialStore>,
}

impl<S, B> Service<Request<B>> for BasicAuthService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        if !req.headers().contains_key(AUTHORIZATION)
            && let Some(value) = self.store.header_for(&req.uri().to_string())
        {
            req.headers_mut().insert(AUTHORIZATION, value);
        }
        self.inner.call(req)
    }
}
