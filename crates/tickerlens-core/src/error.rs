use thiserror::Error;

use crate::data_source::SourceError;
use crate::routing::RouteFailure;

/// Input rejected before any provider is contacted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // tickers
    #[error("ticker is empty")]
    EmptySymbol,
    #[error("ticker is {len} characters long; at most {max} are allowed")]
    SymbolTooLong { len: usize, max: usize },
    #[error("ticker cannot start with '{ch}'; use a letter or '^'")]
    SymbolInvalidStart { ch: char },
    #[error("ticker has unsupported character '{ch}' at position {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    // enumerations parsed from user input
    #[error("unknown interval '{value}' (try 1d, 1wk or 1mo)")]
    InvalidInterval { value: String },
    #[error("unknown data source '{value}' (try auto, yahoo or alphavantage)")]
    InvalidSource { value: String },

    // time
    #[error("'{value}' is not an RFC 3339 timestamp in UTC")]
    TimestampNotUtc { value: String },
    #[error("'{value}' is not a YYYY-MM-DD date")]
    InvalidDate { value: String },
    #[error("date range is reversed: {start} comes after {end}")]
    InvalidDateRange { start: String, end: String },

    // market records
    #[error("'{value}' is not an ISO 4217 currency code")]
    InvalidCurrency { value: String },
    #[error("{field} is NaN or infinite")]
    NonFiniteValue { field: &'static str },
    #[error("{field} is negative")]
    NegativeValue { field: &'static str },
    #[error("bar low is above bar high")]
    InvalidBarRange,
    #[error("bar open or close falls outside its low..high range")]
    InvalidBarBounds,

    // requests
    #[error("no symbols were given")]
    EmptySymbolList,
    #[error("search text is blank")]
    EmptyQuery,
    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },

    // envelope metadata
    #[error("request id is shorter than 8 characters")]
    InvalidRequestId,
    #[error("'{value}' is not a vMAJOR.MINOR.PATCH schema version")]
    InvalidSchemaVersion { value: String },
    #[error("envelope error has no code")]
    EmptyErrorCode,
    #[error("envelope error has no message")]
    EmptyErrorMessage,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}='{value}' is not usable: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("request timeout cannot be zero")]
    ZeroTimeout,
}

/// Everything a dashboard call can fail with.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Route(#[from] RouteFailure),
    #[error("could not encode JSON output: {0}")]
    Serialization(#[from] serde_json::Error),
}
