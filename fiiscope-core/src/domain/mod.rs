//! Domain types: field tags, values, records, tickers.

pub mod field;
pub mod record;
pub mod ticker;

pub use field::{FieldName, FieldValue};
pub use record::CanonicalRecord;
pub use ticker::Ticker;

use thiserror::Error;

/// Errors raised while building domain values from user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("ticker must not be empty")]
    EmptyTicker,

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("invalid trust order: {0}")]
    InvalidTrustOrder(String),

    #[error("unknown cache mode: {0}")]
    UnknownCacheMode(String),
}
