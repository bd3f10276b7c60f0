use crate::error::RestError;
use crate::registry::ResponseContext;
use crate::value::Data;
use std::collections::BTreeMap;

/// `application/x-www-form-urlencoded` body handler.
///
/// Keys seen once map to a string, repeated keys map to a list of their
/// values in wire order. Blank values are skipped.
///
/// # Errors
/// Never fails; malformed pairs are ignored.
pub fn decode(_ctx: &ResponseContext<'_>, body: &str) -> Result<Data, RestError> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        if value.is_empty() {
            continue;
        }
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let map = grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                Data::String(values.remove(0))
            } else {
                Data::List(values.into_iter().map(Data::String).collect())
            };
            (key, value)
        })
        .collect();

    Ok(Data::Map(map))
}
