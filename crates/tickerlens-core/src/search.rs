//! Ticker search as an explicit request/response state machine.
//!
//! Every [`SearchSession::begin`] starts a new generation and cancels the
//! token of the search still in flight. Results are accepted only for the
//! current generation, so a slow response can never overwrite a newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::dashboard::Dashboard;
use crate::data_source::SearchBatch;
use crate::{EnvelopeError, Instrument};

/// Cancellation flag shared between a session and one in-flight search.
#[derive(Debug, Clone, Default)]
pub struct SearchToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl SearchToken {
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// One search issued by a session.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub generation: u64,
    pub query: String,
    pub token: SearchToken,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(Result<SearchBatch, EnvelopeError>),
    Cancelled,
}

impl SearchTicket {
    /// Runs the search unless the ticket is cancelled first.
    pub async fn execute(&self, dashboard: &Dashboard, limit: usize) -> SearchOutcome {
        tokio::select! {
            biased;
            () = self.token.cancelled() => SearchOutcome::Cancelled,
            result = dashboard.search(&self.query, limit) => SearchOutcome::Completed(
                result
                    .map(|routed| routed.data)
                    .map_err(|error| EnvelopeError::from(&error)),
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SearchState {
    #[default]
    Idle,
    Pending {
        generation: u64,
        query: String,
    },
    Ready {
        generation: u64,
        batch: SearchBatch,
    },
    Failed {
        generation: u64,
        query: String,
        error: EnvelopeError,
    },
}

#[derive(Debug, Default)]
pub struct SearchSession {
    generation: u64,
    in_flight: Option<SearchToken>,
    state: SearchState,
}

impl SearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Results of the last accepted search; empty in every other state.
    pub fn results(&self) -> &[Instrument] {
        match &self.state {
            SearchState::Ready { batch, .. } => &batch.results,
            _ => &[],
        }
    }

    /// Starts a search for `query`, cancelling the previous one.
    ///
    /// A blank query only cancels and returns the session to `Idle`.
    pub fn begin(&mut self, query: impl Into<String>) -> Option<SearchTicket> {
        self.cancel_in_flight();
        self.generation += 1;

        let query = query.into().trim().to_owned();
        if query.is_empty() {
            self.state = SearchState::Idle;
            return None;
        }

        let token = SearchToken::default();
        self.in_flight = Some(token.clone());
        self.state = SearchState::Pending {
            generation: self.generation,
            query: query.clone(),
        };
        tracing::debug!(generation = self.generation, %query, "search started");

        Some(SearchTicket {
            generation: self.generation,
            query,
            token,
        })
    }

    /// Applies an outcome. Returns `false` when it was discarded as stale or cancelled.
    pub fn complete(&mut self, ticket: &SearchTicket, outcome: SearchOutcome) -> bool {
        if ticket.generation != self.generation || ticket.token.is_cancelled() {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                "discarding stale search result"
            );
            return false;
        }

        let result = match outcome {
            SearchOutcome::Cancelled => return false,
            SearchOutcome::Completed(result) => result,
        };

        self.in_flight = None;
        self.state = match result {
            Ok(batch) => SearchState::Ready {
                generation: ticket.generation,
                batch,
            },
            Err(error) => SearchState::Failed {
                generation: ticket.generation,
                query: ticket.query.clone(),
                error,
            },
        };
        true
    }

    /// Cancels the in-flight search, if any, and returns to `Idle`.
    pub fn cancel(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
        self.state = SearchState::Idle;
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AssetClass, Symbol};

    fn batch(query: &str, symbols: &[&str]) -> SearchBatch {
        SearchBatch {
            query: query.to_owned(),
            results: symbols
                .iter()
                .map(|symbol| {
                    Instrument::new(
                        Symbol::parse(symbol).expect("valid symbol"),
                        *symbol,
                        None,
                        AssetClass::Equity,
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn newer_search_cancels_and_supersedes_older_one() {
        let mut session = SearchSession::new();

        let first = session.begin("app").expect("ticket");
        let second = session.begin("apple").expect("ticket");

        assert!(first.token.is_cancelled());
        assert!(!second.token.is_cancelled());
        assert_eq!(second.generation, first.generation + 1);

        assert!(session.complete(&second, SearchOutcome::Completed(Ok(batch("apple", &["AAPL"])))));
        assert!(!session.complete(&first, SearchOutcome::Completed(Ok(batch("app", &["APP"])))));

        let symbols = session
            .results()
            .iter()
            .map(|instrument| instrument.symbol.as_str())
            .collect::<Vec<_>>();
        assert_eq!(symbols, vec!["AAPL"]);
    }

    #[test]
    fn blank_query_returns_to_idle() {
        let mut session = SearchSession::new();
        let ticket = session.begin("msft").expect("ticket");

        assert!(session.begin("   ").is_none());

        assert!(ticket.token.is_cancelled());
        assert_eq!(session.state(), &SearchState::Idle);
        assert!(!session.complete(&ticket, SearchOutcome::Completed(Ok(batch("msft", &["MSFT"])))));
        assert!(session.results().is_empty());
    }

    #[test]
    fn failures_are_kept_with_their_query() {
        let mut session = SearchSession::new();
        let ticket = session.begin(" nvda ").expect("ticket");
        let error = EnvelopeError::new("NETWORK_ERROR", "connection reset").expect("valid error");

        assert!(session.complete(&ticket, SearchOutcome::Completed(Err(error.clone()))));

        assert_eq!(
            session.state(),
            &SearchState::Failed {
                generation: ticket.generation,
                query: String::from("nvda"),
                error,
            }
        );
    }

    #[tokio::test]
    async fn cancelled_ticket_does_not_run() {
        let dashboard = Dashboard::default();
        let mut session = SearchSession::new();
        let ticket = session.begin("apple").expect("ticket");
        session.cancel();

        let outcome = ticket.execute(&dashboard, 5).await;

        assert_eq!(outcome, SearchOutcome::Cancelled);
        assert!(!session.complete(&ticket, outcome));
        assert_eq!(session.state(), &SearchState::Idle);
    }

    #[tokio::test]
    async fn offline_search_reaches_ready_state() {
        let dashboard = Dashboard::default();
        let mut session = SearchSession::new();
        let ticket = session.begin("apple").expect("ticket");

        let outcome = ticket.execute(&dashboard, 5).await;

        assert!(session.complete(&ticket, outcome));
        assert!(session
            .results()
            .iter()
            .any(|instrument| instrument.symbol.as_str() == "AAPL"));
    }
}
