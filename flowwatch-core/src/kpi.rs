//! Production counter aggregation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use flowwatch_types::{
    topics, CounterRow, EventLogInput, KpiEventPayload, KpiSummary, ProductionCode,
};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::broadcast::{publish_json, Publish};
use crate::health::{within_window, Liveness};
use crate::store::CounterStore;
use crate::{CoreError, EventLog};

/// Module name stamped on defect records.
pub const DEFECT_MODULE: &str = "KPI";

/// Content of the event-log record written for every defective unit.
pub const DEFECT_CONTENT: &str = "Defective inductor detected";

/// Applies production codes to the counter row and publishes the summary.
///
/// All updates to the row go through one lock, so concurrent events are
/// never lost. The row is read from the store on first use and cached after
/// every successful save.
pub struct KpiAggregator {
    store: Arc<dyn CounterStore>,
    publisher: Arc<dyn Publish>,
    event_log: Arc<EventLog>,
    row: Mutex<Option<CounterRow>>,
}

impl KpiAggregator {
    pub fn new(
        store: Arc<dyn CounterStore>,
        publisher: Arc<dyn Publish>,
        event_log: Arc<EventLog>,
    ) -> Self {
        Self {
            store,
            publisher,
            event_log,
            row: Mutex::new(None),
        }
    }

    /// Count one unit and return the new summary.
    ///
    /// `at` defaults to now. A defect additionally appends a record to the
    /// event log once the counter is committed; failure of that append is
    /// logged and does not undo the count. If the row cannot be saved the
    /// cached row is left as it was.
    pub fn apply_event(
        &self,
        code: ProductionCode,
        at: Option<DateTime<Utc>>,
    ) -> Result<KpiSummary, CoreError> {
        let summary = {
            let mut cached = self.row.lock();
            let mut row = match *cached {
                Some(row) => row,
                None => self.load()?,
            };

            row.increment(code);
            row.last_event_at = Some(at.unwrap_or_else(Utc::now));

            if let Err(e) = self.store.save(&row) {
                error!(%code, error = %e, "failed to save counter row");
                return Err(e.into());
            }
            *cached = Some(row);

            let summary = row.summary();
            publish_json(self.publisher.as_ref(), topics::KPI_SUMMARY, &summary);
            summary
        };

        debug!(%code, total = summary.total, "production event applied");

        if code.is_defect() {
            self.record_defect(code);
        }
        Ok(summary)
    }

    /// Parse a raw code and apply it. Blank or unknown codes are logged and
    /// rejected without touching any state.
    pub fn apply_raw(
        &self,
        code: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<KpiSummary, CoreError> {
        let code: ProductionCode = code.parse().map_err(|e| {
            warn!(code, error = %e, "ignoring production event");
            e
        })?;
        self.apply_event(code, at)
    }

    /// Apply a payload as pushed by the inspection station.
    pub fn apply_payload(&self, payload: &KpiEventPayload) -> Result<KpiSummary, CoreError> {
        self.apply_raw(&payload.code, payload.at())
    }

    /// Current counters.
    pub fn snapshot(&self) -> Result<CounterRow, CoreError> {
        let mut cached = self.row.lock();
        match *cached {
            Some(row) => Ok(row),
            None => {
                let row = self.load()?;
                *cached = Some(row);
                Ok(row)
            }
        }
    }

    /// Current summary.
    pub fn snapshot_summary(&self) -> Result<KpiSummary, CoreError> {
        Ok(self.snapshot()?.summary())
    }

    fn load(&self) -> Result<CounterRow, CoreError> {
        match self.store.load() {
            Ok(row) => Ok(row.unwrap_or_default()),
            Err(e) => {
                error!(error = %e, "failed to load counter row");
                Err(e.into())
            }
        }
    }

    fn record_defect(&self, code: ProductionCode) {
        let line = code.line();
        let input = EventLogInput::new(DEFECT_CONTENT, line.location(), DEFECT_MODULE)
            .with_product(line.product_name());

        if let Err(e) = self.event_log.append(input) {
            warn!(%code, error = %e, "counted defect but could not log it");
        }
    }
}

impl Liveness for KpiAggregator {
    /// Healthy when the last production event arrived within `window`.
    /// A row that cannot be read counts as unhealthy.
    fn is_healthy(&self, window: Duration) -> bool {
        match self.snapshot() {
            Ok(row) => row
                .last_event_at
                .is_some_and(|at| within_window(at, window, Utc::now())),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for KpiAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KpiAggregator")
            .field("row", &*self.row.lock())
            .finish_non_exhaustive()
    }
}
