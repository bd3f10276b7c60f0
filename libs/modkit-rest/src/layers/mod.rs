//! Tower layers for the built-in transport
//!
//! - [`UserAgentLayer`] - Adds User-Agent header to all requests
//! - [`BasicAuthLayer`] - Adds preemptive basic-auth credentials
//! - [`RedirectPolicy`] - Redirect limit and cross-origin header stripping

mod basic_auth;
mod redirect;
mod user_agent;

pub use basic_auth::{BasicAuthLayer, BasicAuthService};
pub use redirect::RedirectPolicy;
pub use user_agent::{UserAgentLayer, UserAgentService};
