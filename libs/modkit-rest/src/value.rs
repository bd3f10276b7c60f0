use crate::route::Route;
use bytes::Bytes;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::ops::Index;
use std::sync::Arc;

/// Parsed response data.
///
/// MIME handlers produce the plain JSON-like variants; datatype coercion then
/// replaces string leaves with [`Data::Date`] or [`Data::Route`] where a
/// registered detector recognizes them. [`Data::Bytes`] holds a body no MIME
/// handler claimed.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Date(NaiveDateTime),
    Route(Arc<Route>),
    Bytes(Bytes),
    List(Vec<Data>),
    Map(BTreeMap<String, Data>),
}

static NULL: Data = Data::Null;

impl Data {
    /// Scalars are the leaves datatype detectors run on
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Data::List(_) | Data::Map(_))
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Data::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Data::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Data::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Data::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Data::Date(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_route(&self) -> Option<&Arc<Route>> {
        match self {
            Data::Route(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Data::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Data]> {
        match self {
            Data::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Data>> {
        match self {
            Data::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Map lookup; `None` for a missing key or a non-map value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Data> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<serde_json::Value> for Data {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Data::Null,
            serde_json::Value::Bool(b) => Data::Bool(b),
            serde_json::Value::Number(n) => Data::Number(n),
            serde_json::Value::String(s) => Data::String(s),
            serde_json::Value::Array(items) => {
                Data::List(items.into_iter().map(Data::from).collect())
            }
            serde_json::Value::Object(map) => {
                Data::Map(map.into_iter().map(|(k, v)| (k, Data::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Data::String(value.to_owned())
    }
}

impl From<String> for Data {
    fn from(value: String) -> Self {
        Data::String(value)
    }
}

impl Index<&str> for Data {
    type Output = Data;

    fn index(&self, key: &str) -> &Data {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Data {
    type Output = Data;

    fn index(&self, index: usize) -> &Data {
        self.as_list()
            .and_then(|items| items.get(index))
            .unwrap_or(&NULL)
    }
}
