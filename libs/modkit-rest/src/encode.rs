//! Built-in request body encoders.

use crate::error::RestError;
use crate::route::Params;
use serde_json::Value;

/// Form-urlencode parameters. Array values expand into repeated pairs
/// (`tags=a&tags=b`); other values are stringified.
///
/// # Errors
/// Returns `RestError::FormEncode` if serialization fails
pub fn form(params: &Params) -> Result<String, RestError> {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(params.len());
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (key.as_str(), scalar_text(item))));
            }
            other => pairs.push((key.as_str(), scalar_text(other))),
        }
    }
    Ok(serde_urlencoded::to_string(pairs)?)
}

/// JSON-encode parameters as one object
///
/// # Errors
/// Returns `RestError::Json` if serialization fails
pub fn json(params: &Params) -> Result<String, RestError> {
    Ok(serde_json::to_string(params)?)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
