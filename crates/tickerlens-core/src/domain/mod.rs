//! # Domain Models
//!
//! Canonical types for quotes, daily price history and search results.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Quote`] | Point quote with optional fundamentals |
//! | [`Fundamentals`] | Market cap, P/E, yield, beta, 52-week range, P/S, revenue growth |
//! | [`Bar`] | Daily OHLCV record with adjusted close |
//! | [`BarSeries`] | Price history for one symbol |
//! | [`Instrument`] | Ticker search hit |
//! | [`Symbol`] | Validated ticker |
//! | [`Interval`] | Bar spacing (1d, 1wk, 1mo) |
//! | [`TradingDate`] | Session date (`YYYY-MM-DD`) |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates invariants; adapters drop records that fail validation
//! rather than failing a whole response.

mod interval;
mod models;
mod symbol;
mod timestamp;

pub use interval::Interval;
pub use models::{
    validate_currency_code, AssetClass, Bar, BarSeries, Fundamentals, Instrument, Quote,
};
pub use symbol::Symbol;
pub use timestamp::{TradingDate, UtcDateTime};
