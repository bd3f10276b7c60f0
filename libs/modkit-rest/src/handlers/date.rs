use crate::error::RestError;
use crate::value::Data;
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use regex::Regex;

/// `MM/DD/YY`
pub const DEFAULT_PATTERN: &str = "[0-3][0-9]/[0-3][0-9]/[0-9]{2}";
pub const DEFAULT_FORMAT: &str = "%m/%d/%y";

#[derive(Debug)]
struct DateFormat {
    matcher: Regex,
    format: String,
}

/// Ordered `(regex, strftime format)` table behind the date datatype handler.
///
/// Detection and conversion both pick the first pattern matching the start
/// of the string, so no state is carried between the two calls.
#[derive(Debug, Default)]
pub struct DateFormats {
    formats: RwLock<Vec<DateFormat>>,
}

impl DateFormats {
    /// Table holding only the `MM/DD/YY` format
    #[must_use]
    pub fn with_defaults() -> Self {
        let formats = Self::default();
        if let Ok(matcher) = anchored(DEFAULT_PATTERN) {
            formats.formats.write().push(DateFormat {
                matcher,
                format: DEFAULT_FORMAT.to_owned(),
            });
        }
        formats
    }

    /// Append a format; earlier registrations take precedence.
    ///
    /// # Errors
    /// Returns `RestError::InvalidPattern` if `pattern` is not a valid regex
    pub fn register(&self, pattern: &str, format: &str) -> Result<(), RestError> {
        let matcher = anchored(pattern)?;
        self.formats.write().push(DateFormat {
            matcher,
            format: format.to_owned(),
        });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.formats.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formats.read().is_empty()
    }

    /// True for a string whose start matches a registered pattern
    #[must_use]
    pub fn detect(&self, value: &Data) -> bool {
        value.as_str().is_some_and(|s| self.format_for(s).is_some())
    }

    /// Parse with the first matching format. A value that matched a pattern
    /// but does not parse is returned unchanged.
    #[must_use]
    pub fn convert(&self, value: Data) -> Data {
        let Some(text) = value.as_str() else {
            return value;
        };
        let Some(format) = self.format_for(text) else {
            return value;
        };

        match parse(text, &format) {
            Some(date) => Data::Date(date),
            None => {
                tracing::warn!(value = %text, format = %format, "Date pattern matched but value did not parse");
                value
            }
        }
    }

    fn format_for(&self, text: &str) -> Option<String> {
        self.formats
            .read()
            .iter()
            .find(|f| f.matcher.is_match(text))
            .map(|f| f.format.clone())
    }
}

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

fn parse(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
