//! CLI argument definitions for tickerlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Latest quotes for one or more symbols |
//! | `history` | OHLCV history at 1d, 1wk or 1mo |
//! | `indicators` | SMA, RSI and support/resistance for a symbol |
//! | `overview` | Quote, fundamentals, indicators and badges in one view |
//! | `movers` | Top gainers, losers and most active |
//! | `search` | Ticker search by symbol or company name |
//! | `sources` | Provider health and capabilities |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--source` | `auto` | `auto`, `yahoo` or `alphavantage` |
//! | `--timeout-ms` | `10000` | Per-call provider timeout |
//! | `--offline` | `false` | Serve deterministic offline data |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! `--source` and `--timeout-ms` fall back to `TICKERLENS_SOURCE` and
//! `TICKERLENS_TIMEOUT_MS`.
//!
//! # Examples
//!
//! ```bash
//! tickerlens quote AAPL MSFT
//! tickerlens indicators AAPL --sma-period 50 --pretty
//! tickerlens movers --limit 5 --offline
//! ```

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "tickerlens",
    author,
    version,
    about = "Stock dashboard data from the command line",
    long_about = "tickerlens fetches quotes, history and fundamentals from Yahoo Finance \
(with Alpha Vantage as fallback) and computes moving averages, RSI, support/resistance \
levels and market movers. Output is a JSON envelope on stdout."
)]
pub struct Cli {
    /// Source selection: auto, yahoo or alphavantage.
    #[arg(long, global = true, env = "TICKERLENS_SOURCE")]
    pub source: Option<String>,

    /// Per-call provider timeout in milliseconds.
    #[arg(long, global = true, env = "TICKERLENS_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Serve deterministic offline data instead of calling providers.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log at debug level on stderr (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest quote(s) for one or more symbols.
    ///
    ///   tickerlens quote AAPL
    ///   tickerlens quote AAPL MSFT GOOGL --pretty
    Quote(QuoteArgs),

    /// OHLCV history, oldest first.
    ///
    ///   tickerlens history AAPL --days 30
    History(HistoryArgs),

    /// Moving average, RSI and support/resistance levels.
    ///
    ///   tickerlens indicators AAPL --sma-period 50 --rsi-period 14
    Indicators(IndicatorsArgs),

    /// Quote header, fundamentals, badges and indicators for one symbol.
    Overview(OverviewArgs),

    /// Top gainers, losers and most active among trending symbols.
    Movers(MoversArgs),

    /// Search for tickers by symbol or company name.
    Search(SearchArgs),

    /// Registered providers with health and capabilities.
    Sources,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// One or more market symbols (e.g., AAPL, MSFT, ^GSPC).
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub symbol: String,

    /// Calendar days of history ending today.
    #[arg(long, default_value_t = 90)]
    pub days: u32,

    /// Bar interval: 1d, 1wk or 1mo.
    #[arg(long, default_value = "1d")]
    pub interval: String,
}

#[derive(Debug, Args)]
pub struct IndicatorsArgs {
    pub symbol: String,

    #[arg(long, default_value_t = 20)]
    pub sma_period: usize,

    #[arg(long, default_value_t = 14)]
    pub rsi_period: usize,

    /// Calendar days of history fed to the indicators.
    #[arg(long, default_value_t = 180)]
    pub days: u32,
}

#[derive(Debug, Args)]
pub struct OverviewArgs {
    pub symbol: String,

    /// Calendar days of history fed to the indicators.
    #[arg(long, default_value_t = 180)]
    pub days: u32,
}

#[derive(Debug, Args)]
pub struct MoversArgs {
    /// Entries per list, at most 10.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=10))]
    pub limit: u16,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Free-form search query (symbol or company name).
    pub query: String,

    /// Maximum number of results to return.
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_indicator_options_and_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tickerlens",
            "indicators",
            "AAPL",
            "--sma-period",
            "50",
            "--offline",
            "--pretty",
        ])
        .expect("valid arguments");

        assert!(cli.offline);
        assert!(cli.pretty);
        match cli.command {
            Command::Indicators(args) => {
                assert_eq!(args.symbol, "AAPL");
                assert_eq!(args.sma_period, 50);
                assert_eq!(args.rsi_period, 14);
                assert_eq!(args.days, 180);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn quote_requires_a_symbol() {
        assert!(Cli::try_parse_from(["tickerlens", "quote"]).is_err());
    }

    #[test]
    fn source_and_timeout_are_optional_overrides() {
        let cli = Cli::try_parse_from([
            "tickerlens",
            "--source",
            "alphavantage",
            "--timeout-ms",
            "2500",
            "movers",
        ])
        .expect("valid arguments");

        assert_eq!(cli.source.as_deref(), Some("alphavantage"));
        assert_eq!(cli.timeout_ms, Some(2_500));
        assert!(matches!(cli.command, Command::Movers(MoversArgs { limit: 10 })));
    }

    #[test]
    fn movers_limit_is_between_one_and_ten() {
        assert!(Cli::try_parse_from(["tickerlens", "movers", "--limit", "25"]).is_err());
        assert!(Cli::try_parse_from(["tickerlens", "movers", "--limit", "0"]).is_err());
        let cli = Cli::try_parse_from(["tickerlens", "movers", "--limit", "3"])
            .expect("valid arguments");
        assert!(matches!(cli.command, Command::Movers(MoversArgs { limit: 3 })));
    }
}
