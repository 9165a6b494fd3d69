//! The append-only event log service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use flowwatch_types::{topics, EventFilter, EventLogInput, EventLogRecord, Page, PageRequest};
use tracing::{debug, error};

use crate::broadcast::{publish_json, Publish};
use crate::store::EventStore;
use crate::{CoreError, HealthTracker};

/// Validates, stores and broadcasts event-log records, and answers searches.
///
/// A record is published on the `eventlog` topic only after the store has
/// accepted it. The log's health tracker follows the store: a successful
/// append marks it healthy, a failed one marks it failed.
pub struct EventLog {
    store: Arc<dyn EventStore>,
    publisher: Arc<dyn Publish>,
    health: Arc<HealthTracker>,
}

impl EventLog {
    pub fn new(
        store: Arc<dyn EventStore>,
        publisher: Arc<dyn Publish>,
        health: Arc<HealthTracker>,
    ) -> Self {
        Self {
            store,
            publisher,
            health,
        }
    }

    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    /// Append a record stamped with the current time.
    pub fn append(&self, input: EventLogInput) -> Result<EventLogRecord, CoreError> {
        self.append_at(input, Utc::now())
    }

    pub(crate) fn append_at(
        &self,
        input: EventLogInput,
        created_at: DateTime<Utc>,
    ) -> Result<EventLogRecord, CoreError> {
        let input = validate(input)?;
        let record = EventLogRecord::from_input(input, created_at);

        if let Err(e) = self.store.append(&record) {
            error!(error = %e, module = %record.module_name, "failed to store event record");
            self.health.mark_failure();
            return Err(e.into());
        }
        self.health.mark_success();

        debug!(
            module = %record.module_name,
            location = %record.location,
            "event record appended"
        );
        publish_json(self.publisher.as_ref(), topics::EVENTLOG, &record);
        Ok(record)
    }

    /// Filtered, newest-first, offset-paginated search.
    ///
    /// Records with equal `created_at` are returned most recently appended
    /// first.
    pub fn search(
        &self,
        filter: &EventFilter,
        page: i64,
        size: i64,
    ) -> Result<Page<EventLogRecord>, CoreError> {
        let request = PageRequest::new(page, size)?;

        let mut records = self.store.scan(filter)?;
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Page::slice(records, request))
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

fn validate(mut input: EventLogInput) -> Result<EventLogInput, CoreError> {
    if input.content.trim().is_empty() {
        return Err(CoreError::blank("content"));
    }
    if input.location.trim().is_empty() {
        return Err(CoreError::blank("location"));
    }
    if input.module_name.trim().is_empty() {
        return Err(CoreError::blank("module_name"));
    }
    input.product_name = input.product_name.filter(|p| !p.trim().is_empty());
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::testing::RecordingPublisher;
    use crate::store::MemoryEventStore;
    use crate::StoreError;

    struct Fixture {
        log: EventLog,
        publisher: Arc<RecordingPublisher>,
        health: Arc<HealthTracker>,
    }

    fn fixture_with(store: Arc<dyn EventStore>) -> Fixture {
        let publisher = Arc::new(RecordingPublisher::default());
        let health = Arc::new(HealthTracker::new());
        let log = EventLog::new(store, publisher.clone(), health.clone());
        Fixture {
            log,
            publisher,
            health,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(MemoryEventStore::new()))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    struct BrokenStore;

    impl EventStore for BrokenStore {
        fn append(&self, _: &EventLogRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk detached".into()))
        }

        fn scan(&self, _: &EventFilter) -> Result<Vec<EventLogRecord>, StoreError> {
            Err(StoreError::Unavailable("disk detached".into()))
        }

        fn len(&self) -> Result<usize, StoreError> {
            Ok(0)
        }
    }

    #[test]
    fn append_stamps_stores_and_publishes() {
        let f = fixture();
        let record = f
            .log
            .append(EventLogInput::new("Belt jam", "Conveyor", "CONVEYOR").with_product("Product 1"))
            .unwrap();

        assert_eq!(record.content, "Belt jam");
        assert_eq!(record.product_name.as_deref(), Some("Product 1"));

        let published = f.publisher.on_topic(topics::EVENTLOG);
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["event_content"], "Belt jam");
        assert_eq!(published[0]["module_name"], "CONVEYOR");
        assert!(f.health.last_success().is_some());
    }

    #[test]
    fn append_rejects_blank_fields() {
        let f = fixture();
        for input in [
            EventLogInput::new(" ", "AGV 01", "KPI"),
            EventLogInput::new("x", "", "KPI"),
            EventLogInput::new("x", "AGV 01", "\t"),
        ] {
            let err = f.log.append(input).unwrap_err();
            assert!(matches!(err, CoreError::InvalidField { .. }));
        }
        assert!(f.publisher.messages().is_empty());
        assert!(f.health.last_success().is_none());
    }

    #[test]
    fn blank_product_becomes_none() {
        let f = fixture();
        let record = f
            .log
            .append(EventLogInput::new("x", "AGV 01", "KPI").with_product("  "))
            .unwrap();
        assert_eq!(record.product_name, None);
    }

    #[test]
    fn failed_store_is_not_published_and_marks_failure() {
        let f = fixture_with(Arc::new(BrokenStore));
        let err = f.log.append(EventLogInput::new("x", "AGV 01", "KPI")).unwrap_err();

        assert!(matches!(err, CoreError::Storage(_)));
        assert!(f.publisher.messages().is_empty());
        assert!(f.health.last_failure().is_some());
    }

    #[test]
    fn search_pages_newest_first() {
        let f = fixture();
        for i in 0..25 {
            f.log
                .append_at(EventLogInput::new(format!("event {i}"), "AGV 01", "KPI"), at(i))
                .unwrap();
        }

        let first = f.log.search(&EventFilter::new(), 0, 20).unwrap();
        assert_eq!(first.len(), 20);
        assert_eq!(first.total_elements, 25);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.content[0].content, "event 24");
        assert!(first
            .content
            .windows(2)
            .all(|w| w[0].created_at >= w[1].created_at));

        let second = f.log.search(&EventFilter::new(), 1, 20).unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second.content[4].content, "event 0");
    }

    #[test]
    fn equal_timestamps_return_latest_append_first() {
        let f = fixture();
        f.log
            .append_at(EventLogInput::new("older", "AGV 01", "KPI"), at(0))
            .unwrap();
        f.log
            .append_at(EventLogInput::new("newer", "AGV 01", "KPI"), at(0))
            .unwrap();

        let page = f.log.search(&EventFilter::new(), 0, 10).unwrap();
        assert_eq!(page.content[0].content, "newer");
        assert_eq!(page.content[1].content, "older");
    }

    #[test]
    fn search_applies_every_filter() {
        let f = fixture();
        f.log
            .append_at(EventLogInput::new("a", "AGV 01", "KPI"), at(10))
            .unwrap();
        f.log
            .append_at(EventLogInput::new("b", "AGV 02", "KPI"), at(20))
            .unwrap();
        f.log
            .append_at(EventLogInput::new("c", "AGV 01", "CAMERA"), at(30))
            .unwrap();
        f.log
            .append_at(EventLogInput::new("d", "AGV 01", "KPI"), at(40))
            .unwrap();

        let filter = EventFilter::new()
            .module("KPI")
            .location("AGV 01")
            .since(at(0))
            .until(at(30));
        let page = f.log.search(&filter, 0, 10).unwrap();

        let contents: Vec<_> = page.content.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["a"]);
        assert_eq!(page.total_elements, 1);
    }

    #[test]
    fn search_rejects_invalid_pages() {
        let f = fixture();
        assert!(matches!(
            f.log.search(&EventFilter::new(), -1, 10),
            Err(CoreError::InvalidPage(_))
        ));
        assert!(matches!(
            f.log.search(&EventFilter::new(), 0, 0),
            Err(CoreError::InvalidPage(_))
        ));
    }

    #[test]
    fn search_surfaces_store_errors() {
        let f = fixture_with(Arc::new(BrokenStore));
        assert!(matches!(
            f.log.search(&EventFilter::new(), 0, 10),
            Err(CoreError::Storage(_))
        ));
    }
}
