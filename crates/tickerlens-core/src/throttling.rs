//! Client-side request budget for quota-limited providers.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// `limit` calls per `window`, spent locally before a request leaves the process.
///
/// Clones share the same budget.
#[derive(Clone)]
pub struct RequestBudget {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
    exhausted_until: Arc<Mutex<Option<Instant>>>,
    limit: u32,
    window: Duration,
}

impl RequestBudget {
    pub fn new(limit: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        let replenish = (window / burst.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            clock: DefaultClock::default(),
            exhausted_until: Arc::new(Mutex::new(None)),
            limit: burst.get(),
            window,
        }
    }

    /// Alpha Vantage free tier: five calls per minute.
    pub fn alphavantage_free_tier() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Spends one call, or returns how long until the next one is available.
    pub fn acquire(&self) -> Result<(), Duration> {
        let mut exhausted_until = self
            .exhausted_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match self.limiter.check() {
            Ok(()) => {
                *exhausted_until = None;
                Ok(())
            }
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                *exhausted_until = Some(Instant::now() + wait);
                Err(wait)
            }
        }
    }

    /// False between a refused [`acquire`](Self::acquire) and the moment budget returns.
    pub fn has_budget(&self) -> bool {
        self.exhausted_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(true, |until| Instant::now() >= until)
    }
}
