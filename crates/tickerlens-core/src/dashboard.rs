//! Dashboard service: routes provider calls and assembles view models.
//!
//! Every method returns a [`Routed`] value carrying the providers tried and any
//! warnings, so the CLI can build an envelope without knowing how many
//! upstream calls a view needed.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::data_source::{QuoteBatch, QuoteRequest, SearchBatch, SearchRequest, TrendingRequest};
use crate::format::{format_market_cap, format_percent, format_price, format_volume};
use crate::indicators::{
    classify, rsi, sma, support_resistance, Badge, IndicatorPoint, Metric, PriceLevels,
};
use crate::market::{summarize_with_limit, MarketSummary, MARKET_LIST_LIMIT};
use crate::routing::{
    RouteFailure, RouteSuccess, SourceRouter, SourceRouterBuilder, SourceSnapshot, SourceStrategy,
};
use crate::{
    BarSeries, CoreError, EnvelopeError, Fundamentals, HistoryRequest, Interval, ProviderId, Quote,
    SourceError, Symbol, UtcDateTime, ValidationError,
};

pub const DEFAULT_HISTORY_DAYS: u32 = 180;
pub const DEFAULT_SMA_PERIOD: usize = 20;
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Quotes requested from the trending endpoint before ranking movers.
pub const TRENDING_UNIVERSE: usize = 25;

/// Window sizes for the indicator views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSettings {
    pub sma_period: usize,
    pub rsi_period: usize,
    pub history_days: u32,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_period: DEFAULT_SMA_PERIOD,
            rsi_period: DEFAULT_RSI_PERIOD,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

impl IndicatorSettings {
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.sma_period == 0 {
            return Err(ValidationError::ZeroLimit {
                field: "sma_period",
            });
        }
        if self.rsi_period == 0 {
            return Err(ValidationError::ZeroLimit {
                field: "rsi_period",
            });
        }
        if self.history_days == 0 {
            return Err(ValidationError::ZeroLimit { field: "days" });
        }
        Ok(self)
    }
}

/// A view model plus the routing trail that produced it.
#[derive(Debug, Clone)]
pub struct Routed<T> {
    pub data: T,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl<T> Routed<T> {
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Routed<U> {
        Routed {
            data: f(self.data),
            source_chain: self.source_chain,
            warnings: self.warnings,
            errors: self.errors,
            latency_ms: self.latency_ms,
        }
    }

    fn extend_chain(&mut self, chain: &[ProviderId]) {
        for provider in chain {
            if !self.source_chain.contains(provider) {
                self.source_chain.push(*provider);
            }
        }
    }

    /// Folds a secondary successful call into this trail.
    fn absorb<U>(&mut self, other: &RouteSuccess<U>) {
        self.extend_chain(&other.source_chain);
        self.warnings.extend(other.warnings.iter().cloned());
        self.errors.extend(other.errors.iter().cloned());
        self.latency_ms = self.latency_ms.max(other.latency_ms);
    }

    /// Records a secondary call that failed without failing the whole view.
    fn absorb_failure(&mut self, section: &str, failure: RouteFailure) {
        self.extend_chain(&failure.source_chain);
        let reason = failure
            .last_error()
            .map(|error| error.message.clone())
            .unwrap_or_else(|| failure.to_string());
        self.warnings.push(format!("{section} unavailable: {reason}"));
        self.errors.extend(failure.errors);
        self.latency_ms = self.latency_ms.max(failure.latency_ms);
    }
}

impl<T> From<RouteSuccess<T>> for Routed<T> {
    fn from(success: RouteSuccess<T>) -> Self {
        Self {
            data: success.data,
            source_chain: success.source_chain,
            warnings: success.warnings,
            errors: success.errors,
            latency_ms: success.latency_ms,
        }
    }
}

/// Indicator series computed over one symbol's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bar_count: usize,
    pub last_close: Option<f64>,
    pub sma_period: usize,
    pub sma: Vec<IndicatorPoint>,
    pub rsi_period: usize,
    pub rsi: Vec<IndicatorPoint>,
    pub levels: Option<PriceLevels>,
    pub rsi_badge: Option<Badge>,
}

impl IndicatorReport {
    /// Sorts the series oldest first, then runs every indicator over it.
    pub fn compute(series: BarSeries, settings: IndicatorSettings) -> Self {
        let series = series.into_chronological();
        let rsi = rsi(&series.bars, settings.rsi_period);
        let rsi_badge = rsi
            .last()
            .and_then(|point| classify(Metric::Rsi, point.value));

        Self {
            bar_count: series.len(),
            last_close: series.last_close(),
            sma_period: settings.sma_period,
            sma: sma(&series.bars, settings.sma_period),
            rsi_period: settings.rsi_period,
            rsi,
            levels: support_resistance(&series.bars),
            rsi_badge,
            symbol: series.symbol,
            interval: series.interval,
        }
    }

    pub fn latest_rsi(&self) -> Option<f64> {
        self.rsi.last().map(|point| point.value)
    }
}

/// Display strings for the quote header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteDisplay {
    pub price: String,
    pub change_percent: String,
    pub market_cap: String,
    pub volume: String,
}

impl QuoteDisplay {
    pub fn new(quote: &Quote, fundamentals: &Fundamentals) -> Self {
        Self {
            price: format_price(quote.price),
            change_percent: format_percent(quote.change_percent),
            market_cap: format_market_cap(fundamentals.market_cap),
            volume: format_volume(quote.volume),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricBadge {
    pub metric: Metric,
    pub value: f64,
    #[serde(flatten)]
    pub badge: Badge,
}

/// Everything the single-symbol view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolOverview {
    pub symbol: Symbol,
    pub name: Option<String>,
    pub currency: String,
    pub as_of: UtcDateTime,
    pub display: QuoteDisplay,
    pub quote: Quote,
    pub fundamentals: Fundamentals,
    pub badges: Vec<MetricBadge>,
    /// `None` when history could not be fetched.
    pub indicators: Option<IndicatorReport>,
}

/// Badges for every fundamental that is present, then the latest RSI.
pub fn collect_badges(
    fundamentals: &Fundamentals,
    indicators: Option<&IndicatorReport>,
) -> Vec<MetricBadge> {
    let inputs = [
        (Metric::RevenueGrowth, fundamentals.revenue_growth),
        (Metric::TrailingPe, fundamentals.trailing_pe),
        (Metric::PriceToSales, fundamentals.price_to_sales),
        (Metric::DividendYield, fundamentals.dividend_yield),
        (Metric::Rsi, indicators.and_then(IndicatorReport::latest_rsi)),
    ];

    inputs
        .into_iter()
        .filter_map(|(metric, value)| {
            let value = value?;
            let badge = classify(metric, value)?;
            Some(MetricBadge {
                metric,
                value,
                badge,
            })
        })
        .collect()
}

/// Request orchestration over a shared [`SourceRouter`].
#[derive(Clone)]
pub struct Dashboard {
    router: Arc<SourceRouter>,
    strategy: SourceStrategy,
}

impl Default for Dashboard {
    /// Offline dashboard with automatic source selection.
    fn default() -> Self {
        Self::new(SourceRouter::default(), SourceStrategy::Auto)
    }
}

impl Dashboard {
    pub fn new(router: SourceRouter, strategy: SourceStrategy) -> Self {
        Self {
            router: Arc::new(router),
            strategy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            SourceRouterBuilder::from_config(config).build(),
            config.source.clone(),
        )
    }

    pub fn with_strategy(mut self, strategy: SourceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn router(&self) -> &SourceRouter {
        &self.router
    }

    pub fn strategy(&self) -> &SourceStrategy {
        &self.strategy
    }

    pub async fn quotes(&self, symbols: Vec<Symbol>) -> Result<Routed<QuoteBatch>, CoreError> {
        let request = QuoteRequest::new(symbols)?;
        let success = self
            .router
            .route_quote(&request, self.strategy.clone())
            .await?;
        Ok(success.into())
    }

    pub async fn history(
        &self,
        symbol: Symbol,
        days: u32,
        interval: Interval,
    ) -> Result<Routed<BarSeries>, CoreError> {
        let request = HistoryRequest::trailing_days(symbol, days, interval)?;
        let success = self
            .router
            .route_history(&request, self.strategy.clone())
            .await?;
        Ok(Routed::from(success).map(BarSeries::into_chronological))
    }

    pub async fn indicators(
        &self,
        symbol: Symbol,
        settings: IndicatorSettings,
    ) -> Result<Routed<IndicatorReport>, CoreError> {
        let settings = settings.validate()?;
        let routed = self
            .history(symbol, settings.history_days, Interval::Daily)
            .await?;
        tracing::debug!(bars = routed.data.len(), "computing indicators");
        Ok(routed.map(|series| IndicatorReport::compute(series, settings)))
    }

    /// Quote, fundamentals and history fetched concurrently.
    ///
    /// Only the quote is required; a failed fundamentals or history call leaves
    /// a warning and the matching section empty.
    pub async fn overview(
        &self,
        symbol: Symbol,
        settings: IndicatorSettings,
    ) -> Result<Routed<SymbolOverview>, CoreError> {
        let settings = settings.validate()?;
        let quote_request = QuoteRequest::new(vec![symbol.clone()])?;
        let history_request =
            HistoryRequest::trailing_days(symbol.clone(), settings.history_days, Interval::Daily)?;

        let (quote, fundamentals, history) = tokio::join!(
            self.router
                .route_quote(&quote_request, self.strategy.clone()),
            self.router
                .route_fundamentals(&symbol, self.strategy.clone()),
            self.router
                .route_history(&history_request, self.strategy.clone()),
        );

        let mut routed = Routed::from(quote?);
        let quote = routed
            .data
            .quotes
            .iter()
            .find(|quote| quote.symbol == symbol)
            .cloned()
            .ok_or_else(|| {
                SourceError::invalid_symbol(format!("no quote returned for {symbol}"))
            })?;

        let fundamentals = match fundamentals {
            Ok(success) => {
                routed.absorb(&success);
                success.data.merge(quote.fundamentals.clone())
            }
            Err(failure) => {
                tracing::warn!(%symbol, error = %failure, "fundamentals unavailable");
                routed.absorb_failure("fundamentals", failure);
                quote.fundamentals.clone()
            }
        }
        .sanitized();

        let indicators = match history {
            Ok(success) => {
                routed.absorb(&success);
                Some(IndicatorReport::compute(success.data, settings))
            }
            Err(failure) => {
                tracing::warn!(%symbol, error = %failure, "history unavailable");
                routed.absorb_failure("history", failure);
                None
            }
        };

        let badges = collect_badges(&fundamentals, indicators.as_ref());
        tracing::info!(
            %symbol,
            sources = routed.source_chain.len(),
            warnings = routed.warnings.len(),
            "overview assembled"
        );

        Ok(routed.map(|_| SymbolOverview {
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            currency: quote.currency.clone(),
            as_of: quote.as_of,
            display: QuoteDisplay::new(&quote, &fundamentals),
            badges,
            indicators,
            fundamentals,
            quote,
        }))
    }

    /// Top gainers, losers and most active among the trending universe.
    ///
    /// `list_limit` is capped at [`MARKET_LIST_LIMIT`]; zero means the cap.
    pub async fn market_overview(
        &self,
        list_limit: usize,
    ) -> Result<Routed<MarketSummary>, CoreError> {
        let list_limit = match list_limit {
            0 => MARKET_LIST_LIMIT,
            limit => limit.min(MARKET_LIST_LIMIT),
        };
        let request = TrendingRequest::new(TRENDING_UNIVERSE)?;
        let success = self
            .router
            .route_trending(request, self.strategy.clone())
            .await?;
        tracing::debug!(universe = success.data.quotes.len(), "ranking market movers");
        Ok(Routed::from(success).map(|batch| summarize_with_limit(&batch.quotes, list_limit)))
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Routed<SearchBatch>, CoreError> {
        let request = SearchRequest::new(query, limit)?;
        let success = self
            .router
            .route_search(&request, self.strategy.clone())
            .await?;
        Ok(success.into())
    }

    pub async fn sources(&self) -> Vec<SourceSnapshot> {
        self.router.snapshots().await
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    use super::*;
    use crate::data_source::{CapabilitySet, DataSource, Endpoint, HealthStatus, SourceFuture};
    use crate::indicators::{Level, Tier};
    use crate::retry::RetryConfig;
    use crate::routing::CallPolicy;
    use crate::{Bar, TradingDate};

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    /// Serves quotes only; every other endpoint fails with a network error.
    struct QuoteOnlySource;

    impl DataSource for QuoteOnlySource {
        fn id(&self) -> ProviderId {
            ProviderId::Yahoo
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::full()
        }

        fn quote<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch> {
            Box::pin(async move {
                let quotes = req
                    .symbols
                    .into_iter()
                    .map(|symbol| {
                        Quote::new(
                            symbol,
                            Some(187.5),
                            Some(1.5),
                            Some(0.81),
                            Some(48_000_000),
                            "USD",
                            UtcDateTime::now(),
                        )
                        .map(|quote| {
                            quote.with_fundamentals(Fundamentals {
                                market_cap: Some(2.9e12),
                                trailing_pe: Some(29.0),
                                ..Fundamentals::default()
                            })
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, SourceError>(QuoteBatch { quotes })
            })
        }

        fn history<'a>(&'a self, _req: HistoryRequest) -> SourceFuture<'a, BarSeries> {
            Box::pin(async { Err(SourceError::network("connection reset")) })
        }

        fn fundamentals<'a>(&'a self, _symbol: Symbol) -> SourceFuture<'a, Fundamentals> {
            Box::pin(async { Err(SourceError::network("connection reset")) })
        }

        fn search<'a>(&'a self, _req: SearchRequest) -> SourceFuture<'a, SearchBatch> {
            Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Search)) })
        }

        fn trending<'a>(&'a self, _req: TrendingRequest) -> SourceFuture<'a, QuoteBatch> {
            Box::pin(async { Err(SourceError::unsupported_endpoint(Endpoint::Trending)) })
        }

        fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
            Box::pin(async { HealthStatus::healthy(90) })
        }
    }

    fn quote_only_dashboard() -> Dashboard {
        let router = SourceRouter::new(vec![Arc::new(QuoteOnlySource) as Arc<dyn DataSource>])
            .with_call_policy(CallPolicy {
                timeout: Duration::from_millis(200),
                retry: RetryConfig::no_retry(),
            });
        Dashboard::new(router, SourceStrategy::Auto)
    }

    #[tokio::test]
    async fn offline_overview_has_every_section() {
        let dashboard = Dashboard::default();

        let routed = dashboard
            .overview(symbol("AAPL"), IndicatorSettings::default())
            .await
            .expect("offline overview");
        let overview = routed.data;

        assert_eq!(overview.symbol.as_str(), "AAPL");
        assert_eq!(overview.name.as_deref(), Some("Apple Inc."));
        assert!(overview.display.price.starts_with('$'));
        assert_ne!(overview.display.market_cap, "N/A");
        let indicators = overview.indicators.expect("history available offline");
        assert!(indicators.bar_count > DEFAULT_SMA_PERIOD);
        assert_eq!(indicators.sma.len(), indicators.bar_count - DEFAULT_SMA_PERIOD + 1);
        assert!(indicators.levels.is_some());
        assert!(overview
            .badges
            .iter()
            .any(|badge| badge.metric == Metric::Rsi));
        assert_eq!(routed.source_chain, vec![ProviderId::Yahoo]);
        assert!(routed.warnings.is_empty());
    }

    #[tokio::test]
    async fn failed_secondary_calls_become_warnings() {
        let dashboard = quote_only_dashboard();

        let routed = dashboard
            .overview(symbol("MSFT"), IndicatorSettings::default())
            .await
            .expect("quote alone is enough");

        assert!(routed.data.indicators.is_none());
        assert_eq!(routed.data.display.market_cap, "$2.9T");
        assert_eq!(routed.data.display.change_percent, "+0.81%");
        assert_eq!(routed.warnings.len(), 2);
        assert!(routed.warnings[0].starts_with("fundamentals unavailable"));
        assert!(routed.warnings[1].starts_with("history unavailable"));
        assert!(routed
            .errors
            .iter()
            .all(|error| error.code == "NETWORK_ERROR"));
        assert_eq!(
            routed.data.badges,
            vec![MetricBadge {
                metric: Metric::TrailingPe,
                value: 29.0,
                badge: Badge::new(Level::Neutral, Tier::Weak),
            }]
        );
    }

    #[tokio::test]
    async fn quote_failure_fails_the_overview() {
        let router = SourceRouter::new(Vec::new());
        let dashboard = Dashboard::new(router, SourceStrategy::Auto);

        let error = dashboard
            .overview(symbol("AAPL"), IndicatorSettings::default())
            .await
            .expect_err("no sources registered");

        match error {
            CoreError::Route(failure) => {
                assert_eq!(failure.endpoint, Endpoint::Quote);
                assert_eq!(
                    failure.last_error().map(|error| error.code.as_str()),
                    Some("NO_SOURCE")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn zero_periods_are_rejected_before_routing() {
        let dashboard = Dashboard::default();
        let settings = IndicatorSettings {
            sma_period: 0,
            ..IndicatorSettings::default()
        };

        let error = dashboard
            .indicators(symbol("AAPL"), settings)
            .await
            .expect_err("zero period");

        assert!(matches!(
            error,
            CoreError::Validation(ValidationError::ZeroLimit {
                field: "sma_period"
            })
        ));
    }

    #[tokio::test]
    async fn market_overview_ranks_trending_quotes() {
        let dashboard = Dashboard::default();

        let routed = dashboard.market_overview(5).await.expect("offline movers");
        let summary = routed.data;

        assert!(summary.gainers.len() <= 5);
        assert!(summary.losers.len() <= 5);
        assert_eq!(summary.actives.len(), 5);
        assert!(summary
            .actives
            .iter()
            .all(|quote| quote.symbol.as_str() != "^VIX"));
        assert!(summary
            .gainers
            .windows(2)
            .all(|pair| pair[0].change_percent >= pair[1].change_percent));
    }

    #[test]
    fn report_sorts_history_before_computing() {
        let start = TradingDate::from_ymd(2024, 3, 1).expect("valid date");
        let bars = (0..30_u32)
            .rev()
            .map(|offset| {
                let close = 100.0 + f64::from(offset);
                Bar::new(
                    start.saturating_add_days(offset),
                    close,
                    close,
                    close,
                    close,
                    None,
                    1_000,
                )
                .expect("valid bar")
            })
            .collect();
        let series = BarSeries::new(symbol("SPY"), Interval::Daily, bars);

        let report = IndicatorReport::compute(series, IndicatorSettings::default());

        assert_eq!(report.last_close, Some(129.0));
        assert_eq!(report.latest_rsi(), Some(100.0));
        assert_eq!(report.rsi_badge, Some(Badge::new(Level::Negative, Tier::Strong)));
        assert_eq!(report.rsi.len(), 30 - DEFAULT_RSI_PERIOD - 1);
    }
}
