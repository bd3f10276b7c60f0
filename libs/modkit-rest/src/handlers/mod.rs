//! Built-in MIME and datatype handlers installed by [`Registry::new`](crate::Registry::new).

pub mod date;
pub mod form;
pub mod json;
pub mod url;

pub use date::DateFormats;
