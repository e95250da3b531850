use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::adapters::offline::OfflineMarket;
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{
    CapabilitySet, DataSource, HealthState, HealthStatus, HistoryRequest, QuoteBatch,
    QuoteRequest, SearchBatch, SearchRequest, SourceError, SourceFuture, TrendingRequest,
};
use crate::http_client::{HttpClient, HttpRequest, NoopHttpClient};
use crate::throttling::RequestBudget;
use crate::{
    AssetClass, Bar, BarSeries, Fundamentals, Instrument, Interval, ProviderId, Quote, Symbol,
    TradingDate, UtcDateTime,
};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// `compact` returns the latest 100 sessions; anything longer needs `full`.
const COMPACT_SPAN_DAYS: i64 = 100;

/// Alpha Vantage adapter. Serves offline data when built without a real transport.
#[derive(Clone)]
pub struct AlphaVantageAdapter {
    health_state: HealthState,
    rate_available: bool,
    score: u16,
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    circuit_breaker: CircuitBreaker,
    budget: RequestBudget,
    timeout_ms: u64,
    offline: OfflineMarket,
    use_real_api: bool,
}

impl Default for AlphaVantageAdapter {
    fn default() -> Self {
        Self {
            health_state: HealthState::Healthy,
            rate_available: true,
            score: 70,
            http_client: Arc::new(NoopHttpClient),
            api_key: String::from("demo"),
            circuit_breaker: CircuitBreaker::new(ProviderId::Alphavantage),
            budget: RequestBudget::alphavantage_free_tier(),
            timeout_ms: 10_000,
            offline: OfflineMarket::new(0x4156_5f51),
            use_real_api: false,
        }
    }
}

impl AlphaVantageAdapter {
    pub fn with_health(health_state: HealthState, rate_available: bool) -> Self {
        Self {
            health_state,
            rate_available,
            ..Self::default()
        }
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        let use_real_api = !http_client.is_mock();
        Self {
            http_client,
            api_key: api_key.into(),
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

    /// Calls `function` with `params` and returns the decoded JSON body.
    ///
    /// Alpha Vantage answers 200 for most failures, so the body is classified too.
    async fn call(&self, function: &str, params: &[(&str, &str)]) -> Result<Value, SourceError> {
        self.circuit_breaker.check()?;

        if let Err(delay) = self.budget.acquire() {
            tracing::debug!(
                function,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "alphavantage local budget exhausted"
            );
            return Err(SourceError::rate_limited(format!(
                "alphavantage free-tier limit exceeded; retry in {:.2}s",
                delay.as_secs_f64()
            )));
        }

        let mut url = format!("{BASE_URL}?function={function}");
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url.push_str("&apikey=");
        url.push_str(&urlencoding::encode(&self.api_key));

        let request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(error) => {
                self.circuit_breaker.record_failure();
                tracing::warn!(function, error = %error, "alphavantage transport error");
                return Err(error.into());
            }
        };

        self.circuit_breaker.record_status(response.status);
        if !response.is_success() {
            return Err(SourceError::from_status(response.status, "alphavantage"));
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::unknown(format!("failed to parse alphavantage {function} response: {e}"))
        })?;
        classify_payload(&body)?;
        Ok(body)
    }

    async fn fetch_real_quotes(&self, symbols: &[Symbol]) -> Result<QuoteBatch, SourceError> {
        // GLOBAL_QUOTE is single-symbol; each one spends a unit of budget.
        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let body = self
                .call("GLOBAL_QUOTE", &[("symbol", symbol.as_str())])
                .await?;
            quotes.push(parse_global_quote(body, symbol)?);
        }
        Ok(QuoteBatch { quotes })
    }

    async fn fetch_real_history(&self, req: &HistoryRequest) -> Result<BarSeries, SourceError> {
        let (function, _) = req.interval.alphavantage_series();
        let symbol = ("symbol", req.symbol.as_str());
        let body = if req.interval == Interval::Daily {
            let outputsize = if req.span_days() > COMPACT_SPAN_DAYS {
                "full"
            } else {
                "compact"
            };
            self.call(function, &[symbol, ("outputsize", outputsize)])
                .await?
        } else {
            self.call(function, &[symbol]).await?
        };
        parse_time_series(body, req)
    }

    async fn fetch_real_fundamentals(&self, symbol: &Symbol) -> Result<Fundamentals, SourceError> {
        let body = self.call("OVERVIEW", &[("symbol", symbol.as_str())]).await?;
        parse_overview(body, symbol)
    }

    async fn fetch_real_search(&self, req: &SearchRequest) -> Result<SearchBatch, SourceError> {
        let body = self
            .call("SYMBOL_SEARCH", &[("keywords", req.query.as_str())])
            .await?;
        parse_search(body, req)
    }

    async fn fetch_real_trending(&self, limit: usize) -> Result<QuoteBatch, SourceError> {
        let body = self.call("TOP_GAINERS_LOSERS", &[]).await?;
        parse_top_movers(body, limit)
    }

    fn health_snapshot(&self) -> HealthStatus {
        self.circuit_breaker.apply(HealthStatus::new(
            self.health_state,
            self.rate_available && self.budget.has_budget(),
            self.score,
        ))
    }
}

impl DataSource for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Alphavantage
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

/// Maps Alpha Vantage's in-band error objects onto the error taxonomy.
fn classify_payload(body: &Value) -> Result<(), SourceError> {
    if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
        return Err(SourceError::invalid_symbol(message));
    }
    for key in ["Note", "Information"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return Err(SourceError::rate_limited(message));
        }
    }
    Ok(())
}

fn decode<T: for<'de> Deserialize<'de>>(body: Value, what: &str) -> Result<T, SourceError> {
    serde_json::from_value(body).map_err(|e| {
        SourceError::unknown(format!("unexpected alphavantage {what} payload: {e}"))
    })
}

/// Numeric field that Alpha Vantage sends as a string; `"None"`, `"-"` and `""` mean missing.
fn number(value: Option<&str>) -> Option<f64> {
    let value = value?.trim().trim_end_matches('%');
    if matches!(value, "" | "None" | "-") {
        return None;
    }
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_global_quote(body: Value, requested: &Symbol) -> Result<Quote, SourceError> {
    let response: AlphaVantageQuoteResponse = decode(body, "GLOBAL_QUOTE")?;
    let Some(data) = response.quote.filter(|data| data.symbol.is_some()) else {
        return Err(SourceError::invalid_symbol(format!(
            "alphavantage has no quote for {requested}"
        )));
    };

    let symbol = match data.symbol.as_deref() {
        Some(raw) => Symbol::parse(raw).unwrap_or_else(|_| requested.clone()),
        None => requested.clone(),
    };
    let as_of = data
        .latest_trading_day
        .as_deref()
        .and_then(|day| TradingDate::parse(day).ok())
        .and_then(|day| UtcDateTime::from_unix_seconds(day.unix_seconds()))
        .unwrap_or_else(UtcDateTime::now);
    let volume = number(data.volume.as_deref())
        .filter(|v| *v >= 0.0)
        .map(|v| v as u64);

    let quote = Quote::new(
        symbol,
        number(data.price.as_deref()),
        number(data.change.as_deref()),
        number(data.change_percent.as_deref()),
        volume,
        "USD",
        as_of,
    )?;
    Ok(quote)
}

fn parse_time_series(mut body: Value, req: &HistoryRequest) -> Result<BarSeries, SourceError> {
    let (function, key) = req.interval.alphavantage_series();
    let Some(raw_series) = body.get_mut(key).map(Value::take) else {
        return Err(SourceError::invalid_symbol(format!(
            "alphavantage returned no {} series for {}",
            req.interval, req.symbol
        )));
    };
    let series: BTreeMap<String, AlphaVantageBar> = decode(raw_series, function)?;

    let mut bars = Vec::with_capacity(series.len());
    // Keys are newest first in the payload; BTreeMap already yields them oldest first.
    for (day, raw) in series {
        let Ok(date) = TradingDate::parse(&day) else {
            continue;
        };
        if date < req.start || date > req.end {
            continue;
        }
        // Weekly and monthly keys are the last session of the period.
        let date = date.period_start(req.interval);
        let (Some(open), Some(high), Some(low), Some(close)) = (
            number(Some(raw.open.as_str())),
            number(Some(raw.high.as_str())),
            number(Some(raw.low.as_str())),
            number(Some(raw.close.as_str())),
        ) else {
            continue;
        };
        let volume = number(Some(raw.volume.as_str()))
            .filter(|v| *v >= 0.0)
            .map_or(0, |v| v as u64);

        match Bar::new(date, open, high, low, close, None, volume) {
            Ok(bar) => bars.push(bar),
            Err(error) => tracing::debug!(%date, %error, "dropping invalid alphavantage bar"),
        }
    }

    Ok(BarSeries::new(req.symbol.clone(), req.interval, bars).into_chronological())
}

fn parse_overview(body: Value, symbol: &Symbol) -> Result<Fundamentals, SourceError> {
    if body.as_object().map_or(true, |object| object.is_empty()) {
        return Err(SourceError::invalid_symbol(format!(
            "alphavantage has no overview for {symbol}"
        )));
    }
    let overview: AlphaVantageOverview = decode(body, "OVERVIEW")?;

    Ok(Fundamentals {
        market_cap: number(overview.market_capitalization.as_deref()),
        trailing_pe: number(overview.pe_ratio.as_deref()),
        dividend_yield: number(overview.dividend_yield.as_deref()),
        beta: number(overview.beta.as_deref()),
        fifty_two_week_high: number(overview.week_52_high.as_deref()),
        fifty_two_week_low: number(overview.week_52_low.as_deref()),
        price_to_sales: number(overview.price_to_sales.as_deref()),
        revenue_growth: number(overview.revenue_growth.as_deref()),
    }
    .sanitized())
}

fn parse_search(body: Value, req: &SearchRequest) -> Result<SearchBatch, SourceError> {
    let response: AlphaVantageSearchResponse = decode(body, "SYMBOL_SEARCH")?;

    let results = response
        .best_matches
        .into_iter()
        .filter_map(|hit| {
            let symbol = Symbol::parse(&hit.symbol).ok()?;
            let asset_class = hit
                .kind
                .as_deref()
                .map(AssetClass::from_provider_label)
                .unwrap_or(AssetClass::Other);
            Some(Instrument::new(symbol, hit.name, hit.region, asset_class))
        })
        .take(req.limit)
        .collect();

    Ok(SearchBatch {
        query: req.query.clone(),
        results,
    })
}

/// Flattens the three mover lists into one quote batch, first occurrence wins.
fn parse_top_movers(body: Value, limit: usize) -> Result<QuoteBatch, SourceError> {
    let response: AlphaVantageTopMovers = decode(body, "TOP_GAINERS_LOSERS")?;
    let as_of = UtcDateTime::now();
    let mut seen = HashSet::new();

    let quotes = response
        .top_gainers
        .into_iter()
        .chain(response.top_losers)
        .chain(response.most_actively_traded)
        .filter_map(|item| {
            let symbol = Symbol::parse(&item.ticker).ok()?;
            if !seen.insert(symbol.clone()) {
                return None;
            }
            let volume = number(Some(item.volume.as_str()))
                .filter(|v| *v >= 0.0)
                .map(|v| v as u64);
            Quote::new(
                symbol,
                number(Some(item.price.as_str())),
                number(Some(item.change_amount.as_str())),
                number(Some(item.change_percentage.as_str())),
                volume,
                "USD",
                as_of,
            )
            .ok()
        })
        .take(limit)
        .collect();

    Ok(QuoteBatch { quotes })
}

#[derive(Debug, Deserialize)]
struct AlphaVantageQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<AlphaVantageQuoteData>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageQuoteData {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    latest_trading_day: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageOverview {
    #[serde(rename = "MarketCapitalization")]
    market_capitalization: Option<String>,
    #[serde(rename = "PERatio")]
    pe_ratio: Option<String>,
    #[serde(rename = "DividendYield")]
    dividend_yield: Option<String>,
    #[serde(rename = "Beta")]
    beta: Option<String>,
    #[serde(rename = "52WeekHigh")]
    week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    week_52_low: Option<String>,
    #[serde(rename = "PriceToSalesRatioTTM")]
    price_to_sales: Option<String>,
    #[serde(rename = "QuarterlyRevenueGrowthYOY")]
    revenue_growth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<AlphaVantageSearchMatch>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageSearchMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
    #[serde(rename = "3. type")]
    kind: Option<String>,
    #[serde(rename = "4. region")]
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageTopMovers {
    #[serde(default)]
    top_gainers: Vec<AlphaVantageMover>,
    #[serde(default)]
    top_losers: Vec<AlphaVantageMover>,
    #[serde(default)]
    most_actively_traded: Vec<AlphaVantageMover>,
}

#[derive(Debug, Deserialize)]
struct AlphaVantageMover {
    ticker: String,
    price: String,
    change_amount: String,
    change_percentage: String,
    volume: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};

    struct RecordingHttpClient {
        body: String,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn replying(body: &str) -> Self {
            Self {
                body: body.to_owned(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let body = self.body.clone();
            Box::pin(async move { Ok(HttpResponse::new(200, body)) })
        }
    }

    const QUOTE_BODY: &str = r#"{"Global Quote":{"01. symbol":"IBM","02. open":"168.10","03. high":"170.00","04. low":"167.50","05. price":"169.42","06. volume":"3456789","07. latest trading day":"2024-03-01","08. previous close":"166.90","09. change":"2.52","10. change percent":"1.5099%"}}"#;

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    #[tokio::test]
    async fn quote_request_appends_api_key_query_parameter() {
        let client = Arc::new(RecordingHttpClient::replying(QUOTE_BODY));
        let adapter = AlphaVantageAdapter::with_http_client(client.clone(), "secret-key");
        let request = QuoteRequest::new(vec![symbol("IBM")]).expect("valid request");

        let batch = adapter.quote(request).await.expect("quote should succeed");
        let quote = &batch.quotes[0];
        assert_eq!(quote.price, Some(169.42));
        assert_eq!(quote.change_percent, Some(1.5099));
        assert_eq!(quote.volume, Some(3_456_789));

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.contains("function=GLOBAL_QUOTE"));
        assert!(requests[0].url.contains("symbol=IBM"));
        assert!(requests[0].url.ends_with("apikey=secret-key"));
    }

    #[tokio::test]
    async fn quote_rate_limits_after_five_calls_per_minute() {
        let client = Arc::new(RecordingHttpClient::replying(QUOTE_BODY));
        let adapter = AlphaVantageAdapter::with_http_client(client.clone(), "demo");
        let request = QuoteRequest::new(vec![symbol("IBM")]).expect("valid request");

        for _ in 0..5 {
            adapter.quote(request.clone()).await.expect("within free-tier budget");
        }

        let error = adapter.quote(request).await.expect_err("sixth call must be throttled");
        assert_eq!(error.kind(), SourceErrorKind::RateLimited);
        assert_eq!(client.recorded_requests().len(), 5);
        assert!(!adapter.health().await.rate_available);
    }

    #[test]
    fn in_band_note_is_rate_limited_and_error_message_is_invalid_symbol() {
        let note = serde_json::json!({"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute"});
        assert_eq!(
            classify_payload(&note).expect_err("note").kind(),
            SourceErrorKind::RateLimited
        );

        let info = serde_json::json!({"Information": "premium endpoint"});
        assert_eq!(
            classify_payload(&info).expect_err("information").kind(),
            SourceErrorKind::RateLimited
        );

        let invalid = serde_json::json!({"Error Message": "Invalid API call."});
        assert_eq!(
            classify_payload(&invalid).expect_err("error message").kind(),
            SourceErrorKind::InvalidSymbol
        );
    }

    #[test]
    fn empty_global_quote_is_invalid_symbol() {
        let error = parse_global_quote(serde_json::json!({"Global Quote": {}}), &symbol("ZZZZ"))
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidSymbol);
    }

    #[test]
    fn daily_series_is_oldest_first_and_clipped_to_range() {
        let body = serde_json::json!({
            "Meta Data": {"2. Symbol": "IBM"},
            "Time Series (Daily)": {
                "2024-03-05": {"1. open": "170.0", "2. high": "171.0", "3. low": "169.0", "4. close": "170.5", "5. volume": "100"},
                "2024-03-04": {"1. open": "169.0", "2. high": "170.2", "3. low": "168.1", "4. close": "170.0", "5. volume": "200"},
                "2024-03-01": {"1. open": "168.0", "2. high": "169.5", "3. low": "167.2", "4. close": "169.0", "5. volume": "300"},
                "2024-02-29": {"1. open": "167.0", "2. high": "168.4", "3. low": "166.0", "4. close": "168.0", "5. volume": "400"}
            }
        });
        let request = HistoryRequest::new(
            symbol("IBM"),
            TradingDate::from_ymd(2024, 3, 1).expect("valid"),
            TradingDate::from_ymd(2024, 3, 4).expect("valid"),
            Interval::Daily,
        )
        .expect("valid request");

        let series = parse_time_series(body, &request).expect("series parses");
        let dates = series
            .bars
            .iter()
            .map(|bar| bar.date.to_string())
            .collect::<Vec<_>>();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-04"]);
        assert_eq!(series.bars[0].adj_close, series.bars[0].close);
    }

    #[test]
    fn weekly_request_reads_the_weekly_series_key() {
        let body = serde_json::json!({
            "Weekly Time Series": {
                "2024-03-08": {"1. open": "170.0", "2. high": "174.0", "3. low": "168.0", "4. close": "173.0", "5. volume": "900"},
                "2024-03-01": {"1. open": "166.0", "2. high": "171.0", "3. low": "165.5", "4. close": "170.0", "5. volume": "800"}
            }
        });
        let request = HistoryRequest::new(
            symbol("IBM"),
            TradingDate::from_ymd(2024, 2, 1).expect("valid"),
            TradingDate::from_ymd(2024, 3, 31).expect("valid"),
            Interval::Weekly,
        )
        .expect("valid request");

        let series = parse_time_series(body.clone(), &request).expect("weekly parses");
        assert_eq!(series.len(), 2);
        assert_eq!(series.interval, Interval::Weekly);
        assert_eq!(series.bars[0].date.to_string(), "2024-02-26");
        assert_eq!(series.bars[1].date.to_string(), "2024-03-04");

        let daily = HistoryRequest { interval: Interval::Daily, ..request };
        let error = parse_time_series(body, &daily).expect_err("no daily key");
        assert_eq!(error.kind(), SourceErrorKind::InvalidSymbol);
    }

    #[test]
    fn overview_treats_none_and_dash_as_missing() {
        let body = serde_json::json!({
            "Symbol": "IBM",
            "MarketCapitalization": "155000000000",
            "PERatio": "None",
            "DividendYield": "0.0392",
            "Beta": "-",
            "52WeekHigh": "199.18",
            "52WeekLow": "135.87",
            "PriceToSalesRatioTTM": "2.5",
            "QuarterlyRevenueGrowthYOY": "0.041"
        });

        let fundamentals = parse_overview(body, &symbol("IBM")).expect("overview parses");
        assert_eq!(fundamentals.market_cap, Some(155_000_000_000.0));
        assert_eq!(fundamentals.trailing_pe, None);
        assert_eq!(fundamentals.beta, None);
        assert_eq!(fundamentals.revenue_growth, Some(0.041));
    }

    #[test]
    fn top_movers_are_merged_without_duplicates() {
        let body = serde_json::json!({
            "top_gainers": [
                {"ticker": "ABCD", "price": "2.10", "change_amount": "1.05", "change_percentage": "100.0%", "volume": "1200"}
            ],
            "top_losers": [
                {"ticker": "WXYZ", "price": "0.50", "change_amount": "-0.40", "change_percentage": "-44.4444%", "volume": "9000"}
            ],
            "most_actively_traded": [
                {"ticker": "ABCD", "price": "2.10", "change_amount": "1.05", "change_percentage": "100.0%", "volume": "1200"},
                {"ticker": "SPY", "price": "510.00", "change_amount": "1.00", "change_percentage": "0.196%", "volume": "80000000"}
            ]
        });

        let batch = parse_top_movers(body, 10).expect("movers parse");
        let tickers = batch
            .quotes
            .iter()
            .map(|quote| quote.symbol.as_str())
            .collect::<Vec<_>>();
        assert_eq!(tickers, vec!["ABCD", "WXYZ", "SPY"]);
        assert_eq!(batch.quotes[1].change_percent, Some(-44.4444));
    }

    #[test]
    fn search_maps_best_matches() {
        let body = serde_json::json!({"bestMatches": [
            {"1. symbol": "TSCO.LON", "2. name": "Tesco PLC", "3. type": "Equity", "4. region": "United Kingdom"},
            {"1. symbol": "TSCDY", "2. name": "Tesco plc", "3. type": "Equity", "4. region": "United States"}
        ]});
        let request = SearchRequest::new("tesco", 1).expect("valid");

        let batch = parse_search(body, &request).expect("search parses");
        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].symbol.as_str(), "TSCO.LON");
        assert_eq!(batch.results[0].asset_class, AssetClass::Equity);
    }

    #[tokio::test]
    async fn offline_mode_serves_quotes_without_network() {
        let adapter = AlphaVantageAdapter::default();
        assert!(adapter.is_offline());
        let request = QuoteRequest::new(vec![symbol("AAPL")]).expect("valid");

        let quote = adapter.quote(request).await.expect("offline quote");
        assert_eq!(quote.quotes.len(), 1);
    }
}
