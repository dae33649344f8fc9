//! Single-attempt request execution with uniform pending/error bookkeeping.
//!
//! Each dispatched request takes a ticket carrying an increasing sequence
//! number. Only the most recently issued ticket may settle the request state;
//! a slower, older response that finishes afterwards is reported as
//! [`Outcome::Superseded`] and its payload is dropped.
//!
//! [`Orchestrator`] keeps a controller's state and its [`RequestTracker`]
//! behind one lock, so deciding whether to dispatch, checking the ticket and
//! writing the response all happen under the same guard.

use std::future::Future;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use health_common::error::TransportError;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    seq: u64,
}

/// Result of settling a ticket.
#[derive(Debug)]
pub enum Outcome<T> {
    Completed(T),
    Failed(AppError),
    /// A newer request was issued while this one was in flight.
    Superseded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestTracker {
    latest: u64,
    latest_settled: bool,
    last_error: Option<String>,
    /// Prefix for recorded failure messages, e.g. "Failed to search for doctors".
    context: Option<String>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self {
            latest: 0,
            latest_settled: true,
            last_error: None,
            context: None,
        }
    }
}

impl RequestTracker {
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..Self::default()
        }
    }

    /// Issue a ticket for a new attempt and clear the previous error.
    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        self.latest_settled = false;
        self.last_error = None;
        RequestTicket { seq: self.latest }
    }

    pub fn settle<T>(&mut self, ticket: RequestTicket, result: Result<T, AppError>) -> Outcome<T> {
        if ticket.seq != self.latest {
            debug!(
                seq = ticket.seq,
                latest = self.latest,
                "discarding superseded response"
            );
            return Outcome::Superseded;
        }
        self.latest_settled = true;
        match result {
            Ok(value) => Outcome::Completed(value),
            Err(err) => {
                let status = match &err {
                    AppError::Transport(e) => e.status().map(|s| s.as_u16()),
                    _ => None,
                };
                warn!(seq = ticket.seq, status = ?status, error = %err, "request failed");
                self.last_error = Some(match &self.context {
                    Some(context) => format!("{context}: {err}"),
                    None => err.to_string(),
                });
                Outcome::Failed(err)
            }
        }
    }

    /// Record a failure that happened before anything was dispatched.
    pub fn reject(&mut self, err: &AppError) {
        self.last_error = Some(err.to_string());
    }

    /// Show a fixed banner in place of the recorded error text.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn is_pending(&self) -> bool {
        !self.latest_settled
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// State that carries its own request bookkeeping.
pub trait Tracked {
    fn tracker(&self) -> &RequestTracker;

    fn tracker_mut(&mut self) -> &mut RequestTracker;
}

#[derive(Debug)]
pub struct Orchestrator<S> {
    state: Mutex<S>,
}

impl<S: Tracked> Orchestrator<S> {
    pub fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().await
    }

    /// Run one request: one attempt, no retry, no extra timeout.
    ///
    /// `prepare` runs under the lock and decides what to send; `None` means
    /// nothing is dispatched and `execute` returns `None`. `settle` receives the
    /// outcome under the same lock that checked the ticket.
    pub async fn execute<P, T, F, R>(
        &self,
        prepare: impl FnOnce(&mut S) -> Option<P>,
        request: impl FnOnce(P) -> F,
        settle: impl FnOnce(&mut S, Outcome<T>) -> R,
    ) -> Option<R>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let (ticket, input) = {
            let mut state = self.state.lock().await;
            let input = prepare(&mut *state)?;
            (state.tracker_mut().begin(), input)
        };
        let result = request(input).await.map_err(AppError::from);

        let mut state = self.state.lock().await;
        let outcome = state.tracker_mut().settle(ticket, result);
        Some(settle(&mut *state, outcome))
    }

    pub async fn reject(&self, err: &AppError) {
        self.state.lock().await.tracker_mut().reject(err);
    }

    pub async fn set_error(&self, message: impl Into<String>) {
        self.state.lock().await.tracker_mut().set_error(message);
    }

    pub async fn is_pending(&self) -> bool {
        self.state.lock().await.tracker().is_pending()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .tracker()
            .last_error()
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_common::backend::StatusCode;
    use tokio::sync::oneshot;

    fn server_error() -> TransportError {
        TransportError::Upstream {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        }
    }

    #[derive(Debug, Default)]
    struct Panel {
        requests: RequestTracker,
        shown: Option<&'static str>,
    }

    impl Tracked for Panel {
        fn tracker(&self) -> &RequestTracker {
            &self.requests
        }

        fn tracker_mut(&mut self) -> &mut RequestTracker {
            &mut self.requests
        }
    }

    fn show(panel: &mut Panel, outcome: Outcome<&'static str>) {
        if let Outcome::Completed(value) = outcome {
            panel.shown = Some(value);
        }
    }

    #[test]
    fn test_tracker_pending_until_latest_settles() {
        let mut tracker = RequestTracker::default();
        assert!(!tracker.is_pending());

        let first = tracker.begin();
        let second = tracker.begin();
        assert_ne!(first, second);
        assert!(tracker.is_pending());

        assert!(matches!(tracker.settle(first, Ok(1)), Outcome::Superseded));
        assert!(tracker.is_pending());

        assert!(matches!(
            tracker.settle(second, Ok(2)),
            Outcome::Completed(2)
        ));
        assert!(!tracker.is_pending());
    }

    #[test]
    fn test_failure_sets_error_and_next_attempt_clears_it() {
        let mut tracker = RequestTracker::default();
        let ticket = tracker.begin();
        let outcome: Outcome<()> = tracker.settle(ticket, Err(AppError::from(server_error())));
        assert!(matches!(outcome, Outcome::Failed(AppError::Transport(_))));
        assert!(!tracker.is_pending());
        assert!(tracker
            .last_error()
            .unwrap()
            .starts_with("Error from server: 500"));

        tracker.begin();
        assert!(tracker.last_error().is_none());
    }

    #[test]
    fn test_context_prefixes_failure_message() {
        let mut tracker = RequestTracker::with_context("Failed to search for doctors");
        let ticket = tracker.begin();
        let _: Outcome<()> = tracker.settle(ticket, Err(AppError::from(server_error())));
        assert!(tracker
            .last_error()
            .unwrap()
            .starts_with("Failed to search for doctors: Error from server: 500"));
    }

    #[test]
    fn test_stale_failure_does_not_touch_error() {
        let mut tracker = RequestTracker::default();
        let old = tracker.begin();
        let new = tracker.begin();
        let outcome: Outcome<()> = tracker.settle(old, Err(AppError::from(server_error())));
        assert!(matches!(outcome, Outcome::Superseded));
        assert!(tracker.last_error().is_none());
        assert!(matches!(tracker.settle(new, Ok(())), Outcome::Completed(())));
    }

    #[tokio::test]
    async fn test_execute_toggles_pending() {
        let orchestrator = Orchestrator::new(Panel::default());
        let (tx, rx) = oneshot::channel::<&'static str>();

        let request = orchestrator.execute(
            |_| Some(()),
            |()| async move { Ok(rx.await.unwrap_or("dropped")) },
            show,
        );
        let observer = async {
            let pending = orchestrator.is_pending().await;
            tx.send("done").unwrap();
            pending
        };
        let (dispatched, was_pending) = tokio::join!(request, observer);

        assert!(dispatched.is_some());
        assert!(was_pending);
        assert!(!orchestrator.is_pending().await);
        assert!(orchestrator.last_error().await.is_none());
        assert_eq!(orchestrator.lock().await.shown, Some("done"));
    }

    #[tokio::test]
    async fn test_prepare_can_decline_dispatch() {
        let orchestrator = Orchestrator::new(Panel::default());
        let dispatched = orchestrator
            .execute(|_| None::<()>, |()| async { Ok("never") }, show)
            .await;
        assert!(dispatched.is_none());
        assert!(!orchestrator.is_pending().await);
        assert!(orchestrator.lock().await.shown.is_none());
    }

    #[tokio::test]
    async fn test_slow_older_response_never_reaches_state() {
        let orchestrator = Orchestrator::new(Panel::default());
        let (release_slow, slow_gate) = oneshot::channel::<()>();

        let slow = orchestrator.execute(
            |_| Some(()),
            |()| async move {
                slow_gate.await.ok();
                Ok("stale")
            },
            |panel, outcome| {
                let superseded = matches!(outcome, Outcome::Superseded);
                show(panel, outcome);
                superseded
            },
        );
        let fast = async {
            let settled = orchestrator
                .execute(|_| Some(()), |()| async { Ok("fresh") }, show)
                .await;
            release_slow.send(()).unwrap();
            settled
        };
        let (slow_superseded, fast_settled) = tokio::join!(slow, fast);

        assert_eq!(slow_superseded, Some(true));
        assert!(fast_settled.is_some());
        assert_eq!(orchestrator.lock().await.shown, Some("fresh"));
        assert!(!orchestrator.is_pending().await);
    }

    #[tokio::test]
    async fn test_reject_records_validation_message() {
        let orchestrator = Orchestrator::new(Panel::default());
        orchestrator
            .reject(&AppError::Validation("Please enter a location".to_string()))
            .await;
        assert_eq!(
            orchestrator.last_error().await.as_deref(),
            Some("Please enter a location")
        );
        assert!(!orchestrator.is_pending().await);
    }
}
