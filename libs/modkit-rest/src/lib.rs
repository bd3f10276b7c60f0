#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! REST client for `ModKit` built around cached path routes
//!
//! A [`Client`] is bound to a base URL. Paths resolve to [`Route`] handles
//! that are created once and cached for the life of the client, so defaults
//! set on a route through one access path are seen through every other.
//!
//! Responses are normalized eagerly:
//! - 4xx and 5xx statuses become [`RestError::Request`] / [`RestError::Server`],
//!   whose `Display` is the raw response body
//! - bodies are decoded by MIME type (JSON, form) through a [`Registry`]
//! - string leaves are coerced into richer values: dates matching a
//!   registered pattern, and URLs on the client's own origin become [`Route`]s
//! - `Link` headers are exposed as relation-keyed [`Links`]
//!
//! The built-in transport is a pooled hyper client over rustls with
//! redirect following, preemptive basic auth and an optional cookie jar.
//! Anything implementing [`Transport`] can replace it.
//!
//! # Example
//!
//! ```ignore
//! use modkit_rest::Client;
//!
//! let client = Client::new("https://api.example.com/v1")?;
//! let users = client.route("users")?;
//! users.add_param("limit", 50);
//!
//! let resp = users.request().param("page", 2).send().await?;
//! if let Some(next) = resp.links().and_then(|links| links.route("next")) {
//!     let page = next?.call().await?;
//! }
//! ```

mod auth;
mod builder;
mod client;
mod compat;
mod config;
mod cookies;
mod encode;
mod error;
pub mod handlers;
pub mod layers;
mod links;
mod registry;
mod response;
mod route;
mod route_builder;
pub mod transport;
mod url;
mod value;

pub use auth::CredentialStore;
pub use builder::ClientBuilder;
pub use client::{Client, Lookup};
pub use compat::{Outcome, StatusKind, into_status_pair};
pub use config::{ClientConfig, DEFAULT_USER_AGENT, RedirectConfig};
pub use cookies::{AcceptAllCookies, CookieJar, CookiePolicy};
pub use error::{RestError, StatusError, TransportError};
pub use links::{Link, Links};
pub use registry::{
    ConvertFn, DetectFn, EncodeFn, FORM_URLENCODED, JSON, MimeFn, Registry, ResponseContext,
    TEXT_PLAIN,
};
pub use response::Response;
pub use route::{Params, Route, RouteRequest};
pub use transport::{HyperTransport, Transport, TransportRequest, TransportResponse};
pub use url::{Query, RepeatedKeyPolicy, Url};
pub use value::Data;
