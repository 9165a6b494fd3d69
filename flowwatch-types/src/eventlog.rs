//! Event-log records, search filters and pagination.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The client-supplied part of an event-log entry.
///
/// Accepts both the dashboard's wire keys (`event_content`, ...) and the
/// plain names (`content`, `location`, `productName`, `moduleName`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLogInput {
    #[cfg_attr(feature = "serde", serde(rename = "event_content", alias = "content", default))]
    pub content: String,

    #[cfg_attr(feature = "serde", serde(rename = "event_location", alias = "location", default))]
    pub location: String,

    #[cfg_attr(
        feature = "serde",
        serde(alias = "productName", default, skip_serializing_if = "Option::is_none")
    )]
    pub product_name: Option<String>,

    #[cfg_attr(feature = "serde", serde(alias = "moduleName", default))]
    pub module_name: String,
}

impl EventLogInput {
    pub fn new(
        content: impl Into<String>,
        location: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            location: location.into(),
            product_name: None,
            module_name: module_name.into(),
        }
    }

    pub fn with_product(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }
}

/// A stored event-log entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventLogRecord {
    /// Assigned by the log when the record is appended.
    pub created_at: DateTime<Utc>,

    #[cfg_attr(feature = "serde", serde(rename = "event_content"))]
    pub content: String,

    #[cfg_attr(feature = "serde", serde(rename = "event_location"))]
    pub location: String,

    #[cfg_attr(feature = "serde", serde(default))]
    pub product_name: Option<String>,

    pub module_name: String,
}

impl EventLogRecord {
    /// Stamp an input with its creation time.
    pub fn from_input(input: EventLogInput, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            content: input.content,
            location: input.location,
            product_name: input.product_name,
            module_name: input.module_name,
        }
    }
}

/// Conjunctive search criteria. Unset (or blank) criteria match everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Exact module name.
    pub module: Option<String>,
    /// Exact location.
    pub location: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Whether `record` satisfies every set criterion.
    pub fn matches(&self, record: &EventLogRecord) -> bool {
        let after_from = self.from.map_or(true, |from| record.created_at >= from);
        let before_to = self.to.map_or(true, |to| record.created_at <= to);
        let module_ok = non_blank(&self.module).map_or(true, |m| record.module_name == m);
        let location_ok = non_blank(&self.location).map_or(true, |l| record.location == l);
        after_from && before_to && module_ok && location_ok
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Rejected pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPage {
    #[error("page must be >= 0, got {0}")]
    NegativePage(i64),

    #[error("page size must be > 0, got {0}")]
    NonPositiveSize(i64),
}

/// A validated offset-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
}

impl PageRequest {
    /// Validate raw caller values. Nothing is clamped.
    pub fn new(page: i64, size: i64) -> Result<Self, InvalidPage> {
        if page < 0 {
            return Err(InvalidPage::NegativePage(page));
        }
        if size <= 0 {
            return Err(InvalidPage::NonPositiveSize(size));
        }
        Ok(Self {
            page: usize::try_from(page).unwrap_or(usize::MAX),
            size: usize::try_from(size).unwrap_or(usize::MAX),
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Index of the first element on this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of results plus what a client needs to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Cut `request`'s page out of the full, already ordered result set.
    pub fn slice(all: Vec<T>, request: PageRequest) -> Self {
        let total_elements = all.len();
        let total_pages = total_elements.div_ceil(request.size());
        let content = all
            .into_iter()
            .skip(request.offset())
            .take(request.size())
            .collect();

        Self {
            content,
            page: request.page(),
            size: request.size(),
            total_elements,
            total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(module: &str, location: &str, secs: i64) -> EventLogRecord {
        EventLogRecord::from_input(
            EventLogInput::new("content", location, module),
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn page_request_rejects_bad_values() {
        assert_eq!(PageRequest::new(-1, 20), Err(InvalidPage::NegativePage(-1)));
        assert_eq!(PageRequest::new(0, 0), Err(InvalidPage::NonPositiveSize(0)));
        assert_eq!(PageRequest::new(0, -5), Err(InvalidPage::NonPositiveSize(-5)));
        assert!(PageRequest::new(3, 1).is_ok());
    }

    #[test]
    fn slice_reports_totals() {
        let items: Vec<u32> = (0..25).collect();

        let first = Page::slice(items.clone(), PageRequest::new(0, 20).unwrap());
        assert_eq!(first.len(), 20);
        assert_eq!(first.total_elements, 25);
        assert_eq!(first.total_pages, 2);

        let second = Page::slice(items.clone(), PageRequest::new(1, 20).unwrap());
        assert_eq!(second.content, vec![20, 21, 22, 23, 24]);

        let past_end = Page::slice(items, PageRequest::new(5, 20).unwrap());
        assert!(past_end.is_empty());
        assert_eq!(past_end.total_pages, 2);
    }

    #[test]
    fn slice_of_nothing_has_zero_pages() {
        let page = Page::<u32>::slice(Vec::new(), PageRequest::new(0, 10).unwrap());
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn filter_is_conjunctive() {
        let filter = EventFilter::new()
            .module("AGV 01")
            .since(Utc.timestamp_opt(100, 0).unwrap())
            .until(Utc.timestamp_opt(200, 0).unwrap());

        assert!(filter.matches(&record("AGV 01", "line", 150)));
        assert!(filter.matches(&record("AGV 01", "line", 100)));
        assert!(filter.matches(&record("AGV 01", "line", 200)));
        assert!(!filter.matches(&record("AGV 01", "line", 99)));
        assert!(!filter.matches(&record("AGV 01", "line", 201)));
        assert!(!filter.matches(&record("KPI", "line", 150)));
    }

    #[test]
    fn blank_filters_are_ignored() {
        let filter = EventFilter::new().module("  ").location("");
        assert!(filter.matches(&record("KPI", "AGV 02", 0)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn input_accepts_wire_and_plain_keys() {
        let wire: EventLogInput = serde_json::from_str(
            r#"{"event_content":"jam","event_location":"AGV 01","product_name":"Product 1","module_name":"AGV"}"#,
        )
        .unwrap();
        let plain: EventLogInput = serde_json::from_str(
            r#"{"content":"jam","location":"AGV 01","productName":"Product 1","moduleName":"AGV"}"#,
        )
        .unwrap();
        assert_eq!(wire, plain);
    }
}
