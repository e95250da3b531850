//! Per-provider circuit breaker.
//!
//! Consecutive upstream failures open the circuit. While it is open, calls fail
//! fast and the provider reports itself unhealthy, so `auto` routing moves on.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::data_source::{HealthState, HealthStatus, SourceError};
use crate::ProviderId;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Tripwire {
    state: CircuitState,
    failures: u32,
    opened_at: Option<Instant>,
}

/// Shared breaker for one provider; clones observe the same circuit.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    provider: ProviderId,
    threshold: u32,
    cool_down: Duration,
    tripwire: Arc<Mutex<Tripwire>>,
}

impl CircuitBreaker {
    pub fn new(provider: ProviderId) -> Self {
        Self::with_limits(provider, DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOL_DOWN)
    }

    pub fn with_limits(provider: ProviderId, threshold: u32, cool_down: Duration) -> Self {
        Self {
            provider,
            threshold: threshold.max(1),
            cool_down,
            tripwire: Arc::new(Mutex::new(Tripwire {
                state: CircuitState::Closed,
                failures: 0,
                opened_at: None,
            })),
        }
    }

    fn tripwire(&self) -> MutexGuard<'_, Tripwire> {
        self.tripwire.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails fast while open. Once the cool-down has passed a single probe goes through.
    pub fn check(&self) -> Result<(), SourceError> {
        let mut wire = self.tripwire();
        if wire.state != CircuitState::Open {
            return Ok(());
        }

        let cooled = wire
            .opened_at
            .is_some_and(|opened_at| opened_at.elapsed() >= self.cool_down);
        if !cooled {
            return Err(SourceError::network(format!(
                "{} circuit breaker is open; skipping upstream call",
                self.provider
            )));
        }

        wire.state = CircuitState::HalfOpen;
        wire.opened_at = None;
        tracing::debug!(provider = %self.provider, "circuit half-open, probing upstream");
        Ok(())
    }

    pub fn record_success(&self) {
        let mut wire = self.tripwire();
        if wire.state != CircuitState::Closed {
            tracing::info!(provider = %self.provider, "circuit closed");
        }
        wire.state = CircuitState::Closed;
        wire.failures = 0;
        wire.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut wire = self.tripwire();
        wire.failures = wire.failures.saturating_add(1);

        let trips = wire.state == CircuitState::HalfOpen || wire.failures >= self.threshold;
        if !trips {
            return;
        }
        if wire.state != CircuitState::Open {
            tracing::warn!(provider = %self.provider, failures = wire.failures, "circuit opened");
        }
        wire.state = CircuitState::Open;
        wire.opened_at = Some(Instant::now());
    }

    /// 5xx and 429 count against the circuit; any other answer means the upstream is up.
    pub fn record_status(&self, status: u16) {
        if status >= 500 || status == 429 {
            self.record_failure();
        } else {
            self.record_success();
        }
    }

    pub fn state(&self) -> CircuitState {
        self.tripwire().state
    }

    pub fn failures(&self) -> u32 {
        self.tripwire().failures
    }

    /// Folds the circuit into an adapter's configured health.
    pub fn apply(&self, health: HealthStatus) -> HealthStatus {
        match self.state() {
            CircuitState::Closed => health,
            CircuitState::HalfOpen if health.state == HealthState::Healthy => {
                HealthStatus::new(HealthState::Degraded, health.rate_available, health.score)
            }
            CircuitState::HalfOpen => health,
            CircuitState::Open => HealthStatus::new(HealthState::Unhealthy, false, health.score),
        }
    }
}
