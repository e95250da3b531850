mod alphavantage;
mod offline;
mod yahoo;

pub use alphavantage::AlphaVantageAdapter;
pub use yahoo::{YahooAdapter, YahooAuthManager};
