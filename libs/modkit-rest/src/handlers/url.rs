//! Datatype handler turning path-like strings into routes on the response's
//! own client.

use crate::client::Lookup;
use crate::registry::ResponseContext;
use crate::value::Data;

/// A string starting with `/` or with the client's origin
#[must_use]
pub fn detect(ctx: &ResponseContext<'_>, value: &Data) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.starts_with('/') || s.starts_with(ctx.client.origin()))
}

/// Resolve the value into a [`Data::Route`]; anything that does not resolve
/// to a route stays a string.
#[must_use]
pub fn convert(ctx: &ResponseContext<'_>, value: Data) -> Data {
    let Some(text) = value.as_str() else {
        return value;
    };

    match ctx.client.resolve_url(text) {
        Ok(Lookup::Route(route)) => Data::Route(route),
        Ok(Lookup::Passthrough(_)) => value,
        Err(err) => {
            tracing::debug!(value = %text, error = %err, "Leaving unresolvable URL as string");
            value
        }
    }
}
