//! Latest environment reading.

use std::sync::Arc;
use std::time::Duration;

use flowwatch_types::{topics, EnvironmentPayload, EnvironmentReading};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::broadcast::{publish_json, Publish};
use crate::health::Liveness;
use crate::{CoreError, HealthTracker};

/// Keeps the most recent temperature and humidity and broadcasts every
/// change on the `environment` topic.
pub struct EnvironmentMonitor {
    reading: Mutex<Option<EnvironmentReading>>,
    publisher: Arc<dyn Publish>,
    health: Arc<HealthTracker>,
}

impl EnvironmentMonitor {
    pub fn new(publisher: Arc<dyn Publish>, health: Arc<HealthTracker>) -> Self {
        Self {
            reading: Mutex::new(None),
            publisher,
            health,
        }
    }

    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    /// Merge a sensor push into the current reading.
    ///
    /// Fields absent from the payload keep their previous value. A payload
    /// with no measurement, or with a non-finite one, is rejected and does
    /// not count as a report.
    pub fn apply(&self, payload: &EnvironmentPayload) -> Result<EnvironmentReading, CoreError> {
        if payload.is_empty() {
            warn!("environment payload carries no measurement");
            return Err(CoreError::InvalidField {
                field: "environment",
                reason: "temperature or humidity is required",
            });
        }
        if !payload.temperature.map_or(true, f64::is_finite) {
            return Err(CoreError::InvalidField {
                field: "temperature",
                reason: "must be a finite number",
            });
        }
        if !payload.humidity.map_or(true, f64::is_finite) {
            return Err(CoreError::InvalidField {
                field: "humidity",
                reason: "must be a finite number",
            });
        }

        let reading = {
            let mut current = self.reading.lock();
            let reading = current.get_or_insert_with(EnvironmentReading::default);
            reading.apply(payload);
            *reading
        };
        self.health.mark_success();

        debug!(
            temperature_c = reading.temperature_c,
            humidity_pct = reading.humidity_pct,
            "environment updated"
        );
        publish_json(self.publisher.as_ref(), topics::ENVIRONMENT, &reading);
        Ok(reading)
    }

    /// The latest reading, if any sensor has reported yet.
    pub fn current(&self) -> Option<EnvironmentReading> {
        *self.reading.lock()
    }
}

impl Liveness for EnvironmentMonitor {
    fn is_healthy(&self, window: Duration) -> bool {
        self.health.is_healthy(window)
    }
}

impl std::fmt::Debug for EnvironmentMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentMonitor")
            .field("reading", &self.current())
            .finish_non_exhaustive()
    }
}
