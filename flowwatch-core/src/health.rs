//! Time-windowed liveness tracking for a single source.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use flowwatch_types::CallOutcome;
use parking_lot::Mutex;

/// Anything that can answer "has this source reported within `window`?".
///
/// Implemented by [`HealthTracker`], and by the KPI and environment services
/// whose liveness is derived from their own state.
pub trait Liveness: Send + Sync {
    fn is_healthy(&self, window: Duration) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
struct Marks {
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
}

/// Last success and last failure of one monitored source.
///
/// Both timestamps live behind one lock so a reader never sees a success
/// from one update paired with a failure from another. Timestamps never move
/// backward: recording an outcome older than the stored one is a no-op for
/// that field.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use chrono::{TimeDelta, Utc};
/// use flowwatch_core::HealthTracker;
///
/// let tracker = HealthTracker::new();
/// assert!(!tracker.is_healthy(Duration::from_secs(30)));
///
/// tracker.mark_success();
/// assert!(tracker.is_healthy(Duration::from_secs(30)));
///
/// tracker.mark_failure_at(Utc::now() + TimeDelta::seconds(1));
/// assert!(!tracker.is_healthy(Duration::from_secs(30)));
/// ```
#[derive(Debug, Default)]
pub struct HealthTracker {
    marks: Mutex<Marks>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_success(&self) {
        self.mark_success_at(Utc::now());
    }

    pub fn mark_success_at(&self, at: DateTime<Utc>) {
        let mut marks = self.marks.lock();
        marks.last_success = Some(latest(marks.last_success, at));
    }

    pub fn mark_failure(&self) {
        self.mark_failure_at(Utc::now());
    }

    pub fn mark_failure_at(&self, at: DateTime<Utc>) {
        let mut marks = self.marks.lock();
        marks.last_failure = Some(latest(marks.last_failure, at));
    }

    /// Record the terminal outcome of a remote call.
    pub fn record(&self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::Success => self.mark_success(),
            CallOutcome::Failure => self.mark_failure(),
        }
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.marks.lock().last_success
    }

    pub fn last_failure(&self) -> Option<DateTime<Utc>> {
        self.marks.lock().last_failure
    }

    /// Healthy right now. Same as the [`Liveness`] impl.
    pub fn is_healthy(&self, window: Duration) -> bool {
        self.is_healthy_at(window, Utc::now())
    }

    /// Healthy at `now` if the last success falls within `window` (inclusive)
    /// and no failure has been recorded after it.
    pub fn is_healthy_at(&self, window: Duration, now: DateTime<Utc>) -> bool {
        let marks = *self.marks.lock();

        let Some(success) = marks.last_success else {
            return false;
        };
        if marks.last_failure.is_some_and(|failure| failure > success) {
            return false;
        }
        within_window(success, window, now)
    }
}

impl Liveness for HealthTracker {
    fn is_healthy(&self, window: Duration) -> bool {
        HealthTracker::is_healthy(self, window)
    }
}

/// Whether `at` lies no more than `window` before `now`.
///
/// A window too large for chrono counts as unbounded.
pub(crate) fn within_window(at: DateTime<Utc>, window: Duration, now: DateTime<Utc>) -> bool {
    match TimeDelta::from_std(window) {
        Ok(window) => now.signed_duration_since(at) <= window,
        Err(_) => true,
    }
}

fn latest(current: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    current.map_or(candidate, |current| current.max(candidate))
}
