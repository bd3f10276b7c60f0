//! Response normalization registries.
//!
//! A [`Registry`] holds three tables consulted while a response is built and
//! while a request body is encoded:
//!
//! - MIME handlers: decode a body (by content type essence) into [`Data`]
//! - datatype handlers: ordered `(detect, convert)` pairs run over every scalar
//!   leaf of the decoded tree; the first detector that accepts a value wins
//! - encoders: turn request parameters into a body for a content type
//!
//! Tables are append-only. `Registry::new()` installs the built-in handlers;
//! a client owns one registry (shared through `Arc`) instead of relying on
//! process-global state.

use crate::client::Client;
use crate::encode;
use crate::error::RestError;
use crate::handlers::{self, DateFormats};
use crate::route::Params;
use crate::value::Data;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Decodes a UTF-8 body into structured data
pub type MimeFn = dyn Fn(&ResponseContext<'_>, &str) -> Result<Data, RestError> + Send + Sync;

/// Reports whether a scalar should be converted. Must not panic on any input.
pub type DetectFn = dyn Fn(&ResponseContext<'_>, &Data) -> bool + Send + Sync;

/// Replaces a detected scalar. Returning the input leaves it unchanged.
pub type ConvertFn = dyn Fn(&ResponseContext<'_>, Data) -> Data + Send + Sync;

/// Encodes request parameters into a body string
pub type EncodeFn = dyn Fn(&Params) -> Result<String, RestError> + Send + Sync;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";

/// What a handler can see about the response being normalized
pub struct ResponseContext<'a> {
    pub client: &'a Client,
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    pub url: &'a str,
}

/// A registered datatype detector and its converter
pub struct DatatypeHandler {
    detect: Box<DetectFn>,
    convert: Box<ConvertFn>,
}

pub struct Registry {
    mimetypes: RwLock<HashMap<String, Arc<MimeFn>>>,
    datatypes: RwLock<Vec<Arc<DatatypeHandler>>>,
    encoders: RwLock<HashMap<String, Arc<EncodeFn>>>,
    dates: Arc<DateFormats>,
}

impl Registry {
    /// Registry with the built-in handlers installed: JSON and form MIME
    /// handlers, the date then URL datatype handlers, and the form and JSON
    /// encoders.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();

        registry.register_mimetype(JSON, handlers::json::decode);
        registry.register_mimetype(FORM_URLENCODED, handlers::form::decode);

        let dates = Arc::clone(&registry.dates);
        let dates_convert = Arc::clone(&registry.dates);
        registry.register_datatype(
            move |_, value| dates.detect(value),
            move |_, value| dates_convert.convert(value),
        );
        registry.register_datatype(handlers::url::detect, handlers::url::convert);

        registry.register_encoder(FORM_URLENCODED, encode::form);
        registry.register_encoder(JSON, encode::json);

        registry
    }

    /// Registry without any handlers. Date formats registered on it are only
    /// used if a datatype handler that consults them is added.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            mimetypes: RwLock::new(HashMap::new()),
            datatypes: RwLock::new(Vec::new()),
            encoders: RwLock::new(HashMap::new()),
            dates: Arc::new(DateFormats::with_defaults()),
        }
    }

    /// Register a MIME handler, replacing any handler for the same type
    pub fn register_mimetype<F>(&self, mime: &str, handler: F)
    where
        F: Fn(&ResponseContext<'_>, &str) -> Result<Data, RestError> + Send + Sync + 'static,
    {
        let key = normalize_mime(mime);
        if self
            .mimetypes
            .write()
            .insert(key.clone(), Arc::new(handler))
            .is_some()
        {
            tracing::debug!(mime = %key, "Replaced MIME handler");
        }
    }

    /// Append a datatype handler. Handlers run in registration order.
    pub fn register_datatype<D, C>(&self, detect: D, convert: C)
    where
        D: Fn(&ResponseContext<'_>, &Data) -> bool + Send + Sync + 'static,
        C: Fn(&ResponseContext<'_>, Data) -> Data + Send + Sync + 'static,
    {
        self.datatypes.write().push(Arc::new(DatatypeHandler {
            detect: Box::new(detect),
            convert: Box::new(convert),
        }));
    }

    /// Register a request body encoder, replacing any for the same type
    pub fn register_encoder<F>(&self, content_type: &str, encoder: F)
    where
        F: Fn(&Params) -> Result<String, RestError> + Send + Sync + 'static,
    {
        let key = normalize_mime(content_type);
        if self
            .encoders
            .write()
            .insert(key.clone(), Arc::new(encoder))
            .is_some()
        {
            tracing::debug!(content_type = %key, "Replaced encoder");
        }
    }

    /// Add a `(regex, strftime format)` pair to the built-in date detector.
    ///
    /// The regex is matched at the start of the value; the first registered
    /// pattern that matches decides the format.
    ///
    /// # Errors
    /// Returns `RestError::InvalidPattern` if the regex does not compile
    pub fn register_date_format(&self, pattern: &str, format: &str) -> Result<(), RestError> {
        self.dates.register(pattern, format)
    }

    /// Shared date format table used by the built-in date detector
    #[must_use]
    pub fn date_formats(&self) -> &Arc<DateFormats> {
        &self.dates
    }

    /// Encoder registered for a content type, if any
    #[must_use]
    pub fn encoder(&self, content_type: &str) -> Option<Arc<EncodeFn>> {
        self.encoders
            .read()
            .get(&normalize_mime(content_type))
            .cloned()
    }

    #[must_use]
    pub fn has_mimetype(&self, mime: &str) -> bool {
        self.mimetypes.read().contains_key(&normalize_mime(mime))
    }

    /// Decode a body through the MIME handler for `content_type`.
    ///
    /// Bodies with no matching handler come back as [`Data::Bytes`].
    ///
    /// # Errors
    /// Returns `RestError::Utf8` for a non-UTF-8 body under a handled type, or
    /// whatever the handler reports for a malformed body.
    pub fn decode(
        &self,
        ctx: &ResponseContext<'_>,
        content_type: Option<&str>,
        body: &Bytes,
    ) -> Result<Data, RestError> {
        let handler = content_type
            .map(normalize_mime)
            .and_then(|mime| self.mimetypes.read().get(&mime).cloned());

        match handler {
            Some(handler) => {
                let text = std::str::from_utf8(body)?;
                handler(ctx, text)
            }
            None => Ok(Data::Bytes(body.clone())),
        }
    }

    /// Walk `data` and replace every scalar the datatype handlers recognize.
    #[must_use]
    pub fn coerce(&self, ctx: &ResponseContext<'_>, data: Data) -> Data {
        // Handlers may call back into the client, so no lock is held while they run
        let handlers: Vec<Arc<DatatypeHandler>> = self.datatypes.read().clone();
        coerce_with(&handlers, ctx, data)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut mimetypes: Vec<String> = self.mimetypes.read().keys().cloned().collect();
        mimetypes.sort();
        let mut encoders: Vec<String> = self.encoders.read().keys().cloned().collect();
        encoders.sort();
        f.debug_struct("Registry")
            .field("mimetypes", &mimetypes)
            .field("datatypes", &self.datatypes.read().len())
            .field("encoders", &encoders)
            .finish_non_exhaustive()
    }
}

fn coerce_with(handlers: &[Arc<DatatypeHandler>], ctx: &ResponseContext<'_>, data: Data) -> Data {
    match data {
        Data::List(items) => Data::List(
            items
                .into_iter()
                .map(|item| coerce_with(handlers, ctx, item))
                .collect(),
        ),
        Data::Map(map) => Data::Map(
            map.into_iter()
                .map(|(key, value)| (key, coerce_with(handlers, ctx, value)))
                .collect(),
        ),
        scalar => match handlers.iter().find(|h| (h.detect)(ctx, &scalar)) {
            Some(handler) => (handler.convert)(ctx, scalar),
            None => scalar,
        },
    }
}

/// Lower-cased MIME essence (`type/subtype`) without parameters
pub(crate) fn normalize_mime(raw: &str) -> String {
    match raw.parse::<mime::Mime>() {
        Ok(parsed) => parsed.essence_str().to_owned(),
        Err(_) => raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase(),
    }
}
