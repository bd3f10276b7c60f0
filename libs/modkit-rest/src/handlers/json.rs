use crate::error::RestError;
use crate::registry::ResponseContext;
use crate::value::Data;

/// `application/json` body handler
///
/// # Errors
/// Returns `RestError::Json` for malformed JSON text
pub fn decode(_ctx: &ResponseContext<'_>, body: &str) -> Result<Data, RestError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    Ok(Data::from(value))
}
