//! # tickerlens core
//!
//! Provider adapters, routing and the analytics behind the tickerlens stock
//! dashboard.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`indicators`] | SMA, RSI, support/resistance and metric badges |
//! | [`market`] | Top gainers, losers and most active quotes |
//! | [`format`] | Abbreviated market cap, volume, price and percent strings |
//! | [`dashboard`] | Request orchestration and view models |
//! | [`search`] | Ticker search session with per-search cancellation |
//! | [`adapters`] | Yahoo Finance and Alpha Vantage adapters |
//! | [`routing`] | Source selection, fallback, timeout and retry |
//! | [`circuit_breaker`] | Circuit breaker shared by adapter calls |
//! | [`throttling`] | Alpha Vantage request budget |
//! | [`config`] | Environment configuration |
//! | [`data_source`] | Adapter trait and request/response types |
//! | [`domain`] | Quote, bar, fundamentals and instrument models |
//! | [`envelope`] | Response envelope for machine-readable output |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickerlens_core::{Dashboard, IndicatorSettings, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dashboard = Dashboard::default();
//!     let overview = dashboard
//!         .overview(Symbol::parse("AAPL")?, IndicatorSettings::default())
//!         .await?;
//!
//!     println!("{} {}", overview.data.symbol, overview.data.display.price);
//!     Ok(())
//! }
//! ```
//!
//! ## Data flow
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI            │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Dashboard      │────▶│ Indicators       │
//! │                 │     │ Market / Format  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  Source Router  │────▶│ Timeout / Retry  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ HTTP Client      │
//! │ (Yahoo, AV)     │     │ (reqwest/noop)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Provider failures are classified into four kinds:
//!
//! ```rust
//! use tickerlens_core::{SourceError, SourceErrorKind};
//!
//! fn should_fall_back(error: &SourceError) -> bool {
//!     match error.kind() {
//!         SourceErrorKind::RateLimited | SourceErrorKind::Network => true,
//!         SourceErrorKind::InvalidSymbol | SourceErrorKind::Unknown => false,
//!     }
//! }
//!
//! assert!(should_fall_back(&SourceError::rate_limited("slow down")));
//! ```
//!
//! The indicator, market and format functions never fail; short input yields
//! an empty series or `None`.

pub mod adapters;
pub mod circuit_breaker;
pub mod config;
pub mod dashboard;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod format;
pub mod http_client;
pub mod indicators;
pub mod market;
pub mod retry;
pub mod routing;
pub mod search;
pub mod source;
pub mod throttling;

pub use adapters::{AlphaVantageAdapter, YahooAdapter, YahooAuthManager};

pub use circuit_breaker::{CircuitBreaker, CircuitState};

pub use config::Config;

pub use dashboard::{
    collect_badges, Dashboard, IndicatorReport, IndicatorSettings, MetricBadge, QuoteDisplay,
    Routed, SymbolOverview,
};

pub use data_source::{
    CapabilitySet, DataSource, Endpoint, HealthState, HealthStatus, HistoryRequest, QuoteBatch,
    QuoteRequest, SearchBatch, SearchRequest, SourceError, SourceErrorKind, SourceFuture,
    TrendingRequest,
};

pub use domain::{
    AssetClass, Bar, BarSeries, Fundamentals, Instrument, Interval, Quote, Symbol, TradingDate,
    UtcDateTime,
};

pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

pub use error::{ConfigError, CoreError, ValidationError};

pub use format::{format_market_cap, format_percent, format_price, format_volume, RawNumber};

pub use http_client::{
    HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

pub use indicators::{
    classify, rsi, sma, support_resistance, Badge, IndicatorPoint, Level, Metric, PriceLevels,
    Tier,
};

pub use market::{summarize, summarize_with_limit, MarketSummary, MARKET_LIST_LIMIT};

pub use retry::{Backoff, RetryConfig};

pub use routing::{
    CallPolicy, RouteFailure, RouteResult, RouteSuccess, SourceRouter, SourceRouterBuilder,
    SourceSnapshot, SourceStrategy,
};

pub use search::{SearchOutcome, SearchSession, SearchState, SearchTicket, SearchToken};

pub use source::ProviderId;

pub use throttling::RequestBudget;
