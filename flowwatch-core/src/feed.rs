//! Connection state of the inbound feeds.

use std::collections::BTreeMap;

use flowwatch_types::FeedStatus;
use parking_lot::RwLock;
use tracing::info;

/// Tracks a [`FeedStatus`] per named feed.
///
/// A feed that was never registered reads as [`FeedStatus::Disabled`].
#[derive(Debug, Default)]
pub struct FeedState {
    feeds: RwLock<BTreeMap<String, FeedStatus>>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition. Logged only when the status actually changes.
    pub fn set_status(&self, feed: &str, status: FeedStatus) {
        let previous = self.feeds.write().insert(feed.to_string(), status);
        if previous != Some(status) {
            info!(feed, ?status, "feed status changed");
        }
    }

    pub fn status(&self, feed: &str) -> FeedStatus {
        self.feeds.read().get(feed).copied().unwrap_or_default()
    }

    /// Every known feed and its status.
    pub fn snapshot(&self) -> BTreeMap<String, FeedStatus> {
        self.feeds.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_feed_is_disabled() {
        assert_eq!(FeedState::new().status("amqp"), FeedStatus::Disabled);
    }

    #[test]
    fn transitions_are_visible_in_snapshot() {
        let state = FeedState::new();
        state.set_status("amqp", FeedStatus::Connecting);
        state.set_status("tcp", FeedStatus::Active);
        state.set_status("amqp", FeedStatus::Active);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["amqp"], FeedStatus::Active);
        assert_eq!(state.status("tcp"), FeedStatus::Active);
    }
}
