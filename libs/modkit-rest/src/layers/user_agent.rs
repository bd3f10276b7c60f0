use crate::error::RestError;
use http::header::USER_AGENT;
use http::{HeaderValue, Request};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Sets `User-Agent` on requests that do not carry one
#[derive(Clone, Debug)]
pub struct UserAgentLayer {
    user_agent: HeaderValue,
}

impl UserAgentLayer {
    /// # Errors
    /// Returns `RestError::InvalidHeaderValue` if `user_agent` is not a valid header value
    pub fn try_new(user_agent: &str) -> Result<Self, RestError> {
        Ok(Self {
            user_agent: HeaderValue::try_from(user_agent)?,
        })
    }
}

impl<S> Layer<S> for UserAgentLayer {
    type Service = UserAgentService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        UserAgentService {
            inner,
            user_agent: self.user_agent.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserAgentService<S> {
    inner: S,
    user_agent: HeaderValue,
}

impl<S, B> Service<Request<B>> for UserAgentService<S>
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
        req.headers_mut()
            .entry(USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());
        self.inner.call(req)
    }
}
