//! Data source trait and request/response types.
//!
//! Every upstream provider is wrapped in a [`DataSource`] adapter so the router
//! and dashboard service never see provider payloads.
//!
//! # Endpoints
//!
//! | Endpoint | Request | Response | Description |
//! |----------|---------|----------|-------------|
//! | Quote | [`QuoteRequest`] | [`QuoteBatch`] | Delayed quotes |
//! | History | [`HistoryRequest`] | [`BarSeries`] | OHLCV bars at 1d, 1wk or 1mo, oldest first |
//! | Fundamentals | [`Symbol`] | [`Fundamentals`] | Valuation and growth metrics |
//! | Search | [`SearchRequest`] | [`SearchBatch`] | Ticker lookup |
//! | Trending | [`TrendingRequest`] | [`QuoteBatch`] | Market-wide quotes for the movers view |
//!
//! # Example
//!
//! ```rust,ignore
//! use tickerlens_core::{DataSource, QuoteRequest, SourceError, Symbol, YahooAdapter};
//!
//! async fn fetch_quote(adapter: &YahooAdapter) -> Result<(), SourceError> {
//!     let request = QuoteRequest::new(vec![Symbol::parse("AAPL")?])?;
//!     let response = adapter.quote(request).await?;
//!     for quote in &response.quotes {
//!         println!("{}: {:?}", quote.symbol, quote.price);
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::http_client::HttpError;
use crate::{
    BarSeries, Fundamentals, Instrument, Interval, ProviderId, Quote, Symbol, TradingDate,
    ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Quote,
    History,
    Fundamentals,
    Search,
    Trending,
}

impl Endpoint {
    pub const ALL: [Self; 5] = [
        Self::Quote,
        Self::History,
        Self::Fundamentals,
        Self::Search,
        Self::Trending,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::History => "history",
            Self::Fundamentals => "fundamentals",
            Self::Search => "search",
            Self::Trending => "trending",
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoints an adapter can serve. Serializes as the list of supported endpoint names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<Endpoint>")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn full() -> Self {
        Self(0b1_1111)
    }

    pub fn only(endpoints: &[Endpoint]) -> Self {
        Self(endpoints.iter().fold(0, |mask, endpoint| mask | endpoint.bit()))
    }

    pub const fn supports(self, endpoint: Endpoint) -> bool {
        self.0 & endpoint.bit() != 0
    }

    pub fn supported_endpoints(self) -> Vec<&'static str> {
        Vec::from(self).into_iter().map(Endpoint::as_str).collect()
    }
}

impl From<CapabilitySet> for Vec<Endpoint> {
    fn from(set: CapabilitySet) -> Self {
        Endpoint::ALL
            .into_iter()
            .filter(|endpoint| set.supports(*endpoint))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// What an adapter reports about itself when asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    /// False while a local quota or an open circuit is holding calls back.
    pub rate_available: bool,
    /// Base preference for `auto` ordering; higher goes first.
    pub score: u16,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool, score: u16) -> Self {
        Self {
            state,
            rate_available,
            score,
        }
    }

    pub const fn healthy(score: u16) -> Self {
        Self::new(HealthState::Healthy, true, score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    RateLimited,
    InvalidSymbol,
    Network,
    Unknown,
}

impl SourceErrorKind {
    /// Rate limits and network faults may clear up on their own.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::RateLimited | Self::Network)
    }
}

/// Provider failure as seen by the router and the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    fn of_kind(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.is_transient(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::of_kind(SourceErrorKind::RateLimited, message)
    }

    pub fn invalid_symbol(message: impl Into<String>) -> Self {
        Self::of_kind(SourceErrorKind::InvalidSymbol, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::of_kind(SourceErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::of_kind(SourceErrorKind::Unknown, message)
    }

    pub fn unsupported_endpoint(endpoint: Endpoint) -> Self {
        Self::unknown(format!("{endpoint} is not offered by this source"))
    }

    pub fn adapter_not_registered(provider: ProviderId) -> Self {
        Self::unknown(format!("{provider} is not configured"))
    }

    /// 429 is a rate limit, 404 an unknown symbol, anything else a network fault.
    pub fn from_status(status: u16, provider: &str) -> Self {
        let message = format!("{provider} answered HTTP {status}");
        match status {
            429 => Self::rate_limited(message),
            404 => Self::invalid_symbol(message),
            _ => Self::network(message),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::RateLimited => "RATE_LIMIT",
            SourceErrorKind::InvalidSymbol => "INVALID_SYMBOL",
            SourceErrorKind::Network => "NETWORK_ERROR",
            SourceErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl std::error::Error for SourceError {}

impl From<HttpError> for SourceError {
    fn from(error: HttpError) -> Self {
        Self {
            retryable: error.retryable(),
            ..Self::network(error.message())
        }
    }
}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        let message = error.to_string();
        match error {
            ValidationError::EmptySymbol
            | ValidationError::SymbolTooLong { .. }
            | ValidationError::SymbolInvalidStart { .. }
            | ValidationError::SymbolInvalidChar { .. } => Self::invalid_symbol(message),
            _ => Self::unknown(message),
        }
    }
}

/// Request payload for quote endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub symbols: Vec<Symbol>,
}

impl QuoteRequest {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, ValidationError> {
        if symbols.is_empty() {
            return Err(ValidationError::EmptySymbolList);
        }
        Ok(Self { symbols })
    }
}

/// Request payload for history endpoints. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub start: TradingDate,
    pub end: TradingDate,
    pub interval: Interval,
}

impl HistoryRequest {
    pub fn new(
        symbol: Symbol,
        start: TradingDate,
        end: TradingDate,
        interval: Interval,
    ) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            symbol,
            start,
            end,
            interval,
        })
    }

    /// Window covering the `days` calendar days up to and including today.
    pub fn trailing_days(
        symbol: Symbol,
        days: u32,
        interval: Interval,
    ) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::ZeroLimit { field: "days" });
        }
        let end = TradingDate::today();
        Self::new(symbol, end.saturating_sub_days(days), end, interval)
    }

    /// Number of calendar days covered by the range.
    pub fn span_days(&self) -> i64 {
        self.start.days_until(self.end) + 1
    }
}

/// Request payload for search endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Result<Self, ValidationError> {
        let query = query.into().trim().to_owned();
        if query.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if limit == 0 {
            return Err(ValidationError::ZeroLimit {
                field: "search limit",
            });
        }
        Ok(Self { query, limit })
    }
}

/// Request payload for the market-wide trending endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendingRequest {
    pub limit: usize,
}

impl TrendingRequest {
    pub fn new(limit: usize) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroLimit {
                field: "trending limit",
            });
        }
        Ok(Self { limit })
    }
}

/// Normalized quote batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteBatch {
    pub quotes: Vec<Quote>,
}

/// Normalized search batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBatch {
    pub query: String,
    pub results: Vec<Instrument>,
}

/// Boxed future returned by every adapter method.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Source adapter contract.
///
/// Implementations must be `Send + Sync`: one adapter instance is shared by
/// concurrent dashboard requests.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn capabilities(&self) -> CapabilitySet;

    fn quote<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch>;

    /// Bars at `req.interval`, ordered oldest first.
    fn history<'a>(&'a self, req: HistoryRequest) -> SourceFuture<'a, BarSeries>;

    fn fundamentals<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, Fundamentals>;

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, SearchBatch>;

    /// Quotes for a market-wide universe of symbols, the input of the movers view.
    fn trending<'a>(&'a self, req: TrendingRequest) -> SourceFuture<'a, QuoteBatch>;

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}
