//! Provider selection and fallback.
//!
//! A route walks a chain of providers for one endpoint. Each candidate is
//! admitted (registered, capable, healthy, within budget), called under the
//! [`CallPolicy`], and on failure its error is logged before the next one is
//! tried. `Strict` stops at the first refusal.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::adapters::{AlphaVantageAdapter, YahooAdapter};
use crate::config::Config;
use crate::data_source::{
    CapabilitySet, DataSource, Endpoint, HealthState, HealthStatus, HistoryRequest, QuoteBatch,
    QuoteRequest, SearchBatch, SearchRequest, SourceError, TrendingRequest,
};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::retry::RetryConfig;
use crate::{BarSeries, EnvelopeError, Fundamentals, ProviderId, Symbol, ValidationError};

/// How the router picks providers for a call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceStrategy {
    /// Every capable provider, best health first.
    #[default]
    Auto,
    /// The listed providers in order, duplicates dropped.
    Priority(Vec<ProviderId>),
    /// One provider and no fallback.
    Strict(ProviderId),
}

impl FromStr for SourceStrategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            auto if auto.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            name => name.parse().map(Self::Strict),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

impl CallPolicy {
    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone)]
pub struct RouteSuccess<T> {
    pub data: T,
    pub selected_source: ProviderId,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    /// Failures of providers tried before `selected_source`.
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

/// Every candidate refused or failed.
#[derive(Debug, Clone)]
pub struct RouteFailure {
    pub endpoint: Endpoint,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
}

impl RouteFailure {
    pub fn last_error(&self) -> Option<&EnvelopeError> {
        self.errors.last()
    }
}

impl fmt::Display for RouteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no provider could serve {}", self.endpoint)?;
        match self.last_error() {
            Some(error) => write!(f, " (last error {}: {})", error.code, error.message),
            None => Ok(()),
        }
    }
}

impl std::error::Error for RouteFailure {}

pub type RouteResult<T> = Result<RouteSuccess<T>, RouteFailure>;

/// Point-in-time view of one registered provider.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourceSnapshot {
    pub id: ProviderId,
    pub capabilities: CapabilitySet,
    pub health: HealthStatus,
}

impl SourceSnapshot {
    pub fn available(self) -> bool {
        !matches!(self.health.state, HealthState::Unhealthy)
    }

    pub fn status_label(self) -> &'static str {
        match (self.health.rate_available, self.health.state) {
            (false, _) => "rate_limited",
            (true, HealthState::Healthy) => "healthy",
            (true, HealthState::Degraded) => "degraded",
            (true, HealthState::Unhealthy) => "unhealthy",
        }
    }
}

/// Assembles a [`SourceRouter`] from configuration.
///
/// Real mode shares one HTTP client between adapters and registers Alpha
/// Vantage only when a key is present (`TICKERLENS_ALPHAVANTAGE_API_KEY`, or
/// `ALPHAVANTAGE_API_KEY`). Offline mode registers both providers with
/// synthetic data.
///
/// ```rust,ignore
/// let router = SourceRouterBuilder::from_config(&Config::from_env()?).build();
/// ```
#[derive(Default)]
pub struct SourceRouterBuilder {
    offline: bool,
    alphavantage_api_key: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    call_policy: CallPolicy,
    without_yahoo: bool,
    without_alphavantage: bool,
}

impl SourceRouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            offline: config.offline,
            alphavantage_api_key: config.alphavantage_api_key.clone(),
            call_policy: config.call_policy(),
            ..Self::default()
        }
    }

    pub fn with_offline_mode(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn with_alphavantage_key(mut self, key: impl Into<String>) -> Self {
        self.alphavantage_api_key = Some(key.into());
        self
    }

    /// Replaces the reqwest transport used in real mode.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_call_policy(mut self, call_policy: CallPolicy) -> Self {
        self.call_policy = call_policy;
        self
    }

    pub fn with_alphavantage_enabled(mut self, enabled: bool) -> Self {
        self.without_alphavantage = !enabled;
        self
    }

    pub fn with_yahoo_enabled(mut self, enabled: bool) -> Self {
        self.without_yahoo = !enabled;
        self
    }

    pub fn build(self) -> SourceRouter {
        let adapters = if self.offline {
            self.offline_adapters()
        } else {
            self.live_adapters()
        };
        SourceRouter::new(adapters).with_call_policy(self.call_policy)
    }

    fn offline_adapters(&self) -> Vec<Arc<dyn DataSource>> {
        let mut adapters: Vec<Arc<dyn DataSource>> = Vec::with_capacity(2);
        if !self.without_yahoo {
            adapters.push(Arc::new(YahooAdapter::default()));
        }
        if !self.without_alphavantage {
            adapters.push(Arc::new(AlphaVantageAdapter::default()));
        }
        adapters
    }

    fn live_adapters(&self) -> Vec<Arc<dyn DataSource>> {
        let timeout_ms = self.call_policy.timeout_ms();
        let http: Arc<dyn HttpClient> = match &self.http_client {
            Some(client) => Arc::clone(client),
            None => Arc::new(ReqwestHttpClient::new()),
        };

        let mut adapters: Vec<Arc<dyn DataSource>> = Vec::with_capacity(2);
        if !self.without_yahoo {
            let yahoo = YahooAdapter::with_http_client(Arc::clone(&http)).with_timeout_ms(timeout_ms);
            adapters.push(Arc::new(yahoo));
        }
        if self.without_alphavantage {
            return adapters;
        }
        match &self.alphavantage_api_key {
            Some(key) => {
                let alphavantage = AlphaVantageAdapter::with_http_client(http, key.clone())
                    .with_timeout_ms(timeout_ms);
                adapters.push(Arc::new(alphavantage));
            }
            None => tracing::debug!("alphavantage not registered: no api key"),
        }
        adapters
    }
}

type InvokeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Registered providers plus the policy every call runs under.
pub struct SourceRouter {
    adapters: HashMap<ProviderId, Arc<dyn DataSource>>,
    call_policy: CallPolicy,
}

impl Default for SourceRouter {
    /// Offline router with both providers registered.
    fn default() -> Self {
        SourceRouterBuilder::new().with_offline_mode().build()
    }
}

/// Errors collected while walking a chain.
#[derive(Default)]
struct Attempts {
    chain: Vec<ProviderId>,
    errors: Vec<EnvelopeError>,
}

impl Attempts {
    fn refused(&mut self, provider: ProviderId, error: &SourceError) {
        self.errors.push(EnvelopeError::from_source(Some(provider), error));
    }
}

impl SourceRouter {
    pub fn new(adapters: Vec<Arc<dyn DataSource>>) -> Self {
        Self {
            adapters: adapters.into_iter().map(|source| (source.id(), source)).collect(),
            call_policy: CallPolicy::default(),
        }
    }

    pub fn with_call_policy(mut self, call_policy: CallPolicy) -> Self {
        self.call_policy = call_policy;
        self
    }

    pub fn call_policy(&self) -> &CallPolicy {
        &self.call_policy
    }

    /// Providers a call would try, in order. Falls back to every registered
    /// provider when the strategy yields none.
    pub async fn source_chain_for_strategy(
        &self,
        endpoint: Endpoint,
        strategy: &SourceStrategy,
    ) -> Vec<ProviderId> {
        let chain = self.plan(endpoint, strategy).await;
        if chain.is_empty() {
            self.registered()
        } else {
            chain
        }
    }

    pub async fn snapshot(&self, provider: ProviderId) -> Option<SourceSnapshot> {
        let source = self.adapters.get(&provider)?;
        Some(SourceSnapshot {
            id: provider,
            capabilities: source.capabilities(),
            health: source.health().await,
        })
    }

    /// One snapshot per registered provider, ordered by name.
    pub async fn snapshots(&self) -> Vec<SourceSnapshot> {
        let mut snapshots = Vec::with_capacity(self.adapters.len());
        for provider in self.registered() {
            snapshots.extend(self.snapshot(provider).await);
        }
        snapshots
    }

    pub async fn route_quote(
        &self,
        req: &QuoteRequest,
        strategy: SourceStrategy,
    ) -> RouteResult<QuoteBatch> {
        self.route(Endpoint::Quote, strategy, |source| source.quote(req.clone()))
            .await
    }

    pub async fn route_history(
        &self,
        req: &HistoryRequest,
        strategy: SourceStrategy,
    ) -> RouteResult<BarSeries> {
        self.route(Endpoint::History, strategy, |source| source.history(req.clone()))
            .await
    }

    pub async fn route_fundamentals(
        &self,
        symbol: &Symbol,
        strategy: SourceStrategy,
    ) -> RouteResult<Fundamentals> {
        self.route(Endpoint::Fundamentals, strategy, |source| {
            source.fundamentals(symbol.clone())
        })
        .await
    }

    pub async fn route_search(
        &self,
        req: &SearchRequest,
        strategy: SourceStrategy,
    ) -> RouteResult<SearchBatch> {
        self.route(Endpoint::Search, strategy, |source| source.search(req.clone()))
            .await
    }

    pub async fn route_trending(
        &self,
        req: TrendingRequest,
        strategy: SourceStrategy,
    ) -> RouteResult<QuoteBatch> {
        self.route(Endpoint::Trending, strategy, |source| source.trending(req))
            .await
    }

    async fn route<'r, T, F>(
        &'r self,
        endpoint: Endpoint,
        strategy: SourceStrategy,
        mut invoke: F,
    ) -> RouteResult<T>
    where
        F: FnMut(&'r dyn DataSource) -> InvokeFuture<'r, T>,
    {
        let started = Instant::now();
        let strict = matches!(strategy, SourceStrategy::Strict(_));
        let mut attempts = Attempts::default();

        for provider in self.plan(endpoint, &strategy).await {
            attempts.chain.push(provider);

            let outcome = match self.admit(provider, endpoint).await {
                Ok(source) => self.call(source, endpoint, &mut invoke).await,
                Err(refusal) => Err(refusal),
            };

            match outcome {
                Ok(data) => {
                    let mut warnings = Vec::new();
                    if !attempts.errors.is_empty() {
                        tracing::info!(%provider, %endpoint, failed = attempts.errors.len(), "served by fallback provider");
                        warnings.push(format!(
                            "served by {} after {} provider(s) failed",
                            provider.display_name(),
                            attempts.errors.len()
                        ));
                    }
                    return Ok(RouteSuccess {
                        data,
                        selected_source: provider,
                        source_chain: attempts.chain,
                        warnings,
                        errors: attempts.errors,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(error) => {
                    tracing::warn!(%provider, %endpoint, code = error.code(), %error, "provider attempt failed");
                    attempts.refused(provider, &error);
                    if strict {
                        break;
                    }
                }
            }
        }

        let Attempts { mut chain, mut errors } = attempts;
        if chain.is_empty() {
            chain = self.registered();
        }
        if errors.is_empty() {
            errors.push(EnvelopeError {
                code: String::from("NO_SOURCE"),
                message: format!("no registered provider supports {endpoint}"),
                retryable: Some(false),
                source: None,
            });
        }

        Err(RouteFailure {
            endpoint,
            source_chain: chain,
            warnings: vec![format!("every provider failed for {endpoint}")],
            errors,
            latency_ms: elapsed_ms(started),
        })
    }

    /// Resolves a provider that is registered, capable, healthy and within budget.
    async fn admit(
        &self,
        provider: ProviderId,
        endpoint: Endpoint,
    ) -> Result<&dyn DataSource, SourceError> {
        let source = self
            .adapters
            .get(&provider)
            .ok_or_else(|| SourceError::adapter_not_registered(provider))?;

        if !source.capabilities().supports(endpoint) {
            return Err(SourceError::unsupported_endpoint(endpoint));
        }

        let health = source.health().await;
        if health.state == HealthState::Unhealthy {
            return Err(SourceError::network(format!(
                "{} reports itself unhealthy",
                provider.display_name()
            )));
        }
        if !health.rate_available {
            return Err(SourceError::rate_limited(format!(
                "{} has no request budget left",
                provider.display_name()
            )));
        }
        Ok(source.as_ref())
    }

    /// Runs one provider call under the timeout, retrying transient failures.
    async fn call<'r, T, F>(
        &self,
        source: &'r dyn DataSource,
        endpoint: Endpoint,
        invoke: &mut F,
    ) -> Result<T, SourceError>
    where
        F: FnMut(&'r dyn DataSource) -> InvokeFuture<'r, T>,
    {
        let timeout = self.call_policy.timeout;
        self.call_policy
            .retry
            .run(endpoint.as_str(), || {
                let pending = invoke(source);
                async move {
                    tokio::time::timeout(timeout, pending).await.unwrap_or_else(|_| {
                        Err(SourceError::network(format!(
                            "{endpoint} timed out after {}ms",
                            timeout.as_millis()
                        )))
                    })
                }
            })
            .await
    }

    async fn plan(&self, endpoint: Endpoint, strategy: &SourceStrategy) -> Vec<ProviderId> {
        match strategy {
            SourceStrategy::Auto => self.ranked(endpoint).await,
            SourceStrategy::Priority(order) => {
                let mut chain: Vec<ProviderId> = Vec::with_capacity(order.len());
                for provider in order {
                    if !chain.contains(provider) {
                        chain.push(*provider);
                    }
                }
                chain
            }
            SourceStrategy::Strict(provider) => vec![*provider],
        }
    }

    /// Capable providers by descending health score; ties go to name order.
    async fn ranked(&self, endpoint: Endpoint) -> Vec<ProviderId> {
        let mut ranked = Vec::with_capacity(self.adapters.len());
        for provider in self.registered() {
            let Some(source) = self.adapters.get(&provider) else {
                continue;
            };
            if source.capabilities().supports(endpoint) {
                ranked.push((provider, rank_score(source.health().await)));
            }
        }
        ranked.sort_by(|(_, left), (_, right)| right.cmp(left));
        ranked.into_iter().map(|(provider, _)| provider).collect()
    }

    fn registered(&self) -> Vec<ProviderId> {
        let mut providers: Vec<ProviderId> = self.adapters.keys().copied().collect();
        providers.sort_by_key(|provider| provider.as_str());
        providers
    }
}

fn rank_score(health: HealthStatus) -> i32 {
    let state = match health.state {
        HealthState::Healthy => 250,
        HealthState::Degraded => 100,
        HealthState::Unhealthy => 0,
    };
    let budget = if health.rate_available { 150 } else { 0 };
    state + budget + i32::from(health.score)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
