use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::adapters::offline::OfflineMarket;
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{
    CapabilitySet, DataSource, HealthState, HealthStatus, HistoryRequest, QuoteBatch,
    QuoteRequest, SearchBatch, SearchRequest, SourceError, SourceFuture, TrendingRequest,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::{
    AssetClass, Bar, BarSeries, Fundamentals, Instrument, ProviderId, Quote, Symbol, TradingDate,
    UtcDateTime,
};

const QUERY1: &str = "https://query1.finance.yahoo.com";
const QUERY2: &str = "https://query2.finance.yahoo.com";
const REFERER: &str = "https://finance.yahoo.com/";
const CRUMB_TTL: Duration = Duration::from_secs(3_600);

/// Cookie/crumb handshake for Yahoo's unofficial API.
///
/// The session cookie lands in the transport's cookie jar when `fc.yahoo.com`
/// is visited; the crumb is then fetched once and appended to every query URL.
#[derive(Default)]
pub struct YahooAuthManager {
    cached: Mutex<Option<(String, Instant)>>,
    refresh: tokio::sync::Mutex<()>,
}

impl YahooAuthManager {
    fn cached_crumb(&self) -> Option<String> {
        let cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        cached
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < CRUMB_TTL)
            .map(|(crumb, _)| crumb.clone())
    }

    pub async fn crumb(
        &self,
        http_client: &Arc<dyn HttpClient>,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        // Concurrent callers wait here and reuse the winner's crumb.
        let _guard = self.refresh.lock().await;
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }

        let crumb = fetch_crumb(http_client, timeout_ms).await?;
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((crumb.clone(), Instant::now()));
        Ok(crumb)
    }

    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

async fn fetch_crumb(
    http_client: &Arc<dyn HttpClient>,
    timeout_ms: u64,
) -> Result<String, SourceError> {
    let cookie_request = HttpRequest::get("https://fc.yahoo.com")
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);
    // fc.yahoo.com answers 404 but still sets the session cookie.
    if let Err(error) = http_client.execute(cookie_request).await {
        tracing::debug!(%error, "yahoo cookie bootstrap failed");
    }

    for base in [QUERY1, QUERY2] {
        let request = HttpRequest::get(format!("{base}/v1/test/getcrumb"))
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);
        let Ok(response) = http_client.execute(request).await else {
            continue;
        };

        if response.status == 429 {
            return Err(SourceError::rate_limited(
                "yahoo rate limited the crumb handshake",
            ));
        }

        let body = response.body.trim();
        let looks_like_crumb =
            response.is_success() && !body.is_empty() && body.len() < 100 && !body.contains(' ');
        if looks_like_crumb && !body.contains('<') {
            tracing::debug!(host = base, "obtained yahoo crumb");
            return Ok(body.to_owned());
        }
    }

    Err(SourceError::network(
        "failed to fetch yahoo crumb from all endpoints",
    ))
}

/// Yahoo Finance adapter. Serves offline data when built without a real transport.
#[derive(Clone)]
pub struct YahooAdapter {
    health_state: HealthState,
    rate_available: bool,
    score: u16,
    http_client: Arc<dyn HttpClient>,
    circuit_breaker: CircuitBreaker,
    auth: Arc<YahooAuthManager>,
    timeout_ms: u64,
    offline: OfflineMarket,
    use_real_api: bool,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self {
            health_state: HealthState::Healthy,
            rate_available: true,
            score: 90,
            http_client: Arc::new(NoopHttpClient),
            circuit_breaker: CircuitBreaker::new(ProviderId::Yahoo),
            auth: Arc::new(YahooAuthManager::default()),
            timeout_ms: 10_000,
            offline: OfflineMarket::new(0x5941_484f),
            use_real_api: false,
        }
    }
}

impl YahooAdapter {
    pub fn with_health(health_state: HealthState, rate_available: bool) -> Self {
        Self {
            health_state,
            rate_available,
            ..Self::default()
        }
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            use_real_api,
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn is_offline(&self) -> bool {
        !self.use_real_api
    }

    /// GETs `{path_and_query}&crumb=..` and returns the body of a 2xx response.
    ///
    /// A 401/403 invalidates the crumb and retries once with a fresh one.
    async fn get_json(&self, base: &str, path_and_query: &str) -> Result<String, SourceError> {
        self.circuit_breaker.check()?;

        let mut refreshed = false;
        loop {
            let crumb = match self.auth.crumb(&self.http_client, self.timeout_ms).await {
                Ok(crumb) => crumb,
                Err(error) => {
                    self.circuit_breaker.record_failure();
                    return Err(error);
                }
            };
            let url = format!(
                "{base}{path_and_query}&crumb={}",
                urlencoding::encode(&crumb)
            );
            let request = HttpRequest::get(url)
                .with_header("referer", REFERER)
                .with_timeout_ms(self.timeout_ms);

            let response = match self.http_client.execute(request).await {
                Ok(response) => response,
                Err(error) => {
                    self.circuit_breaker.record_failure();
                    tracing::warn!(error = %error, "yahoo transport error");
                    return Err(error.into());
                }
            };

            if matches!(response.status, 401 | 403) && !refreshed {
                tracing::debug!(status = response.status, "yahoo rejected crumb, refreshing");
                self.auth.invalidate();
                refreshed = true;
                continue;
            }

            self.circuit_breaker.record_status(response.status);
            // A JSON 404 names the unknown symbol; the payload parser reports it.
            let json_not_found =
                response.status == 404 && response.body.trim_start().starts_with('{');
            if response.is_success() || json_not_found {
                return Ok(response.body);
            }
            return Err(SourceError::from_status(response.status, "yahoo"));
        }
    }

    async fn fetch_real_quotes(&self, symbols: &[Symbol]) -> Result<QuoteBatch, SourceError> {
        let joined = symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let body = self
            .get_json(
                QUERY1,
                &format!("/v7/finance/quote?symbols={}", urlencoding::encode(&joined)),
            )
            .await?;
        let batch = parse_quote_response(&body)?;
        if batch.quotes.is_empty() {
            return Err(SourceError::invalid_symbol(format!(
                "yahoo returned no quotes for {joined}"
            )));
        }
        Ok(batch)
    }

    async fn fetch_real_history(&self, req: &HistoryRequest) -> Result<BarSeries, SourceError> {
        let period1 = req.start.unix_seconds();
        // period2 is exclusive upstream.
        let period2 = req.end.saturating_add_days(1).unix_seconds();
        let body = self
            .get_json(
                QUERY1,
                &format!(
                    "/v8/finance/chart/{}?period1={period1}&period2={period2}&interval={}&events=div%2Csplit",
                    urlencoding::encode(req.symbol.as_str()),
                    req.interval.as_str(),
                ),
            )
            .await?;
        parse_chart_response(&body, req)
    }

    async fn fetch_real_fundamentals(&self, symbol: &Symbol) -> Result<Fundamentals, SourceError> {
        let body = self
            .get_json(
                QUERY1,
                &format!(
                    "/v10/finance/quoteSummary/{}?modules=price%2CsummaryDetail%2CdefaultKeyStatistics%2CfinancialData",
                    urlencoding::encode(symbol.as_str())
                ),
            )
            .await?;
        parse_quote_summary_response(&body)
    }

    async fn fetch_real_search(&self, req: &SearchRequest) -> Result<SearchBatch, SourceError> {
        let body = self
            .get_json(
                QUERY2,
                &format!(
                    "/v1/finance/search?q={}&quotesCount={}&newsCount=0",
                    urlencoding::encode(&req.query),
                    req.limit
                ),
            )
            .await?;
        parse_search_response(&body, req)
    }

    async fn fetch_real_trending(&self, limit: usize) -> Result<QuoteBatch, SourceError> {
        let body = self
            .get_json(QUERY1, &format!("/v1/finance/trending/US?count={limit}"))
            .await?;
        let symbols = parse_trending_response(&body, limit)?;
        if symbols.is_empty() {
            return Ok(QuoteBatch { quotes: Vec::new() });
        }
        self.fetch_real_quotes(&symbols).await
    }

    fn health_snapshot(&self) -> HealthStatus {
        self.circuit_breaker.apply(HealthStatus::new(
            self.health_state,
            self.rate_available,
            self.score,
        ))
    }
}

impl DataSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::full()
    }

    fn quote<'a>(&'a self, req: QuoteRequest) -> SourceFuture<'a, QuoteBatch> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_quotes(&req.symbols).await
            } else {
                self.offline.quotes(&req.symbols)
            }
        })
    }

    fn history<'a>(&'a self, req: HistoryRequest) -> SourceFuture<'a, BarSeries> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_history(&req).await
            } else {
                self.offline.history(&req)
            }
        })
    }

    fn fundamentals<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, Fundamentals> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_fundamentals(&symbol).await
            } else {
                Ok(self.offline.fundamentals(&symbol))
            }
        })
    }

    fn search<'a>(&'a self, req: SearchRequest) -> SourceFuture<'a, SearchBatch> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_search(&req).await
            } else {
                Ok(self.offline.search(&req))
            }
        })
    }

    fn trending<'a>(&'a self, req: TrendingRequest) -> SourceFuture<'a, QuoteBatch> {
        Box::pin(async move {
            if self.use_real_api {
                self.fetch_real_trending(req.limit).await
            } else {
                self.offline.trending(req.limit)
            }
        })
    }

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>> {
        Box::pin(async move { self.health_snapshot() })
    }
}

fn parse_body<'de, T: Deserialize<'de>>(body: &'de str, what: &str) -> Result<T, SourceError> {
    serde_json::from_str(body)
        .map_err(|e| SourceError::unknown(format!("failed to parse yahoo {what} response: {e}")))
}

fn api_error(error: Option<YahooApiError>) -> Result<(), SourceError> {
    match error {
        None => Ok(()),
        Some(error) if error.code.eq_ignore_ascii_case("Not Found") => {
            Err(SourceError::invalid_symbol(error.description))
        }
        Some(error) => Err(SourceError::unknown(format!(
            "yahoo API error {}: {}",
            error.code, error.description
        ))),
    }
}

fn parse_quote_response(body: &str) -> Result<QuoteBatch, SourceError> {
    let response: YahooQuoteResponse = parse_body(body, "quote")?;
    api_error(response.quote_response.error)?;

    let quotes = response
        .quote_response
        .result
        .into_iter()
        .filter_map(|data| {
            let symbol = Symbol::parse(&data.symbol).ok()?;
            let as_of = data
                .regular_market_time
                .and_then(UtcDateTime::from_unix_seconds)
                .unwrap_or_else(UtcDateTime::now);
            let volume = data.regular_market_volume.and_then(|v| u64::try_from(v).ok());
            let currency = data.currency.unwrap_or_else(|| String::from("USD"));
            let fundamentals = Fundamentals {
                market_cap: data.market_cap,
                trailing_pe: data.trailing_pe,
                dividend_yield: data.trailing_annual_dividend_yield,
                fifty_two_week_high: data.fifty_two_week_high,
                fifty_two_week_low: data.fifty_two_week_low,
                ..Fundamentals::default()
            };

            let quote = Quote::new(
                symbol,
                data.regular_market_price,
                data.regular_market_change,
                data.regular_market_change_percent,
                volume,
                &currency,
                as_of,
            );
            match quote {
                Ok(quote) => Some(
                    quote
                        .with_name(data.long_name.or(data.short_name))
                        .with_fundamentals(fundamentals),
                ),
                Err(error) => {
                    tracing::debug!(symbol = %data.symbol, %error, "dropping invalid yahoo quote");
                    None
                }
            }
        })
        .collect();

    Ok(QuoteBatch { quotes })
}

fn parse_chart_response(body: &str, req: &HistoryRequest) -> Result<BarSeries, SourceError> {
    let response: YahooChartResponse = parse_body(body, "chart")?;
    api_error(response.chart.error)?;

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(SourceError::invalid_symbol(format!(
            "yahoo returned no chart for {}",
            req.symbol
        )));
    };

    let gmtoffset = result.meta.and_then(|meta| meta.gmtoffset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .and_then(|values| values.into_iter().next())
        .map(|series| series.adjclose)
        .unwrap_or_default();

    // Weekly and monthly bars are stamped at their period start, which can precede `req.start`.
    let first_period = req.start.period_start(req.interval);
    let mut bars = Vec::with_capacity(timestamps.len());
    for (index, ts) in timestamps.iter().enumerate() {
        // Session date in exchange-local time.
        let Some(date) = TradingDate::from_unix_seconds(ts.saturating_add(gmtoffset)) else {
            continue;
        };
        if date < first_period || date > req.end {
            continue;
        }

        let field = |values: &[Option<f64>]| values.get(index).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };
        let volume = quote
            .volume
            .get(index)
            .copied()
            .flatten()
            .and_then(|v| u64::try_from(v).ok())
            .unwrap_or(0);

        match Bar::new(date, open, high, low, close, field(&adjclose), volume) {
            Ok(bar) => bars.push(bar),
            Err(error) => tracing::debug!(%date, %error, "dropping invalid yahoo bar"),
        }
    }

    Ok(BarSeries::new(req.symbol.clone(), req.interval, bars).into_chronological())
}

fn parse_quote_summary_response(body: &str) -> Result<Fundamentals, SourceError> {
    let response: YahooQuoteSummaryResponse = parse_body(body, "quoteSummary")?;
    api_error(response.quote_summary.error)?;

    let Some(result) = response
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
    else {
        return Err(SourceError::invalid_symbol(
            "yahoo returned no quoteSummary result",
        ));
    };

    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();
    let price = result.price.unwrap_or_default();

    Ok(Fundamentals {
        market_cap: raw(&price.market_cap).or_else(|| raw(&detail.market_cap)),
        trailing_pe: raw(&detail.trailing_pe),
        dividend_yield: raw(&detail.dividend_yield),
        beta: raw(&detail.beta).or_else(|| raw(&stats.beta)),
        fifty_two_week_high: raw(&detail.fifty_two_week_high),
        fifty_two_week_low: raw(&detail.fifty_two_week_low),
        price_to_sales: raw(&detail.price_to_sales_trailing_12_months),
        revenue_growth: raw(&financial.revenue_growth),
    }
    .sanitized())
}

fn parse_search_response(body: &str, req: &SearchRequest) -> Result<SearchBatch, SourceError> {
    let response: YahooSearchResponse = parse_body(body, "search")?;

    let results = response
        .quotes
        .into_iter()
        .filter_map(|hit| {
            let symbol = Symbol::parse(&hit.symbol).ok()?;
            let name = hit
                .long_name
                .or(hit.short_name)
                .unwrap_or_else(|| hit.symbol.clone());
            let asset_class = hit
                .quote_type
                .as_deref()
                .map(AssetClass::from_provider_label)
                .unwrap_or(AssetClass::Other);
            Some(Instrument::new(
                symbol,
                name,
                hit.exch_disp.or(hit.exchange),
                asset_class,
            ))
        })
        .take(req.limit)
        .collect();

    Ok(SearchBatch {
        query: req.query.clone(),
        results,
    })
}

fn parse_trending_response(body: &str, limit: usize) -> Result<Vec<Symbol>, SourceError> {
    let response: YahooTrendingResponse = parse_body(body, "trending")?;
    api_error(response.finance.error)?;

    Ok(response
        .finance
        .result
        .into_iter()
        .flatten()
        .flat_map(|result| result.quotes)
        .filter_map(|quote| Symbol::parse(&quote.symbol).ok())
        .take(limit)
        .collect())
}

fn raw(value: &Option<YahooRawValue>) -> Option<f64> {
    value
        .as_ref()
        .and_then(|value| value.raw)
        .filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResponseData,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponseData {
    #[serde(default)]
    result: Vec<YahooQuoteData>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteData {
    symbol: String,
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<f64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
    regular_market_volume: Option<i64>,
    regular_market_time: Option<i64>,
    currency: Option<String>,
    market_cap: Option<f64>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
    trailing_annual_dividend_yield: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooChartResult {
    meta: Option<YahooChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
    adjclose: Option<Vec<YahooChartAdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct YahooChartAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooQuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryData {
    #[serde(default)]
    result: Option<Vec<YahooQuoteSummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuoteSummaryResult {
    price: Option<YahooPriceModule>,
    summary_detail: Option<YahooSummaryDetailModule>,
    default_key_statistics: Option<YahooKeyStatisticsModule>,
    financial_data: Option<YahooFinancialDataModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooPriceModule {
    market_cap: Option<YahooRawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooSummaryDetailModule {
    market_cap: Option<YahooRawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<YahooRawValue>,
    dividend_yield: Option<YahooRawValue>,
    beta: Option<YahooRawValue>,
    fifty_two_week_high: Option<YahooRawValue>,
    fifty_two_week_low: Option<YahooRawValue>,
    price_to_sales_trailing_12_months: Option<YahooRawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct YahooKeyStatisticsModule {
    beta: Option<YahooRawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooFinancialDataModule {
    revenue_growth: Option<YahooRawValue>,
}

/// `{ "raw": 2.1e12, "fmt": "2.1T" }`; Yahoo sends `{}` when the value is unknown.
#[derive(Debug, Clone, Deserialize)]
struct YahooRawValue {
    #[serde(default)]
    raw: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YahooSearchResponse {
    #[serde(default)]
    quotes: Vec<YahooSearchQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooSearchQuote {
    symbol: String,
    #[serde(rename = "shortname")]
    short_name: Option<String>,
    #[serde(rename = "longname")]
    long_name: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "exchDisp")]
    exch_disp: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooTrendingResponse {
    finance: YahooTrendingData,
}

#[derive(Debug, Deserialize)]
struct YahooTrendingData {
    #[serde(default)]
    result: Option<Vec<YahooTrendingResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooTrendingResult {
    #[serde(default)]
    quotes: Vec<YahooTrendingQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooTrendingQuote {
    symbol: String,
}
