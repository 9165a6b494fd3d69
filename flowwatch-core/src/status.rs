//! Consolidated health status across all monitored sources.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use flowwatch_types::{SourceId, SystemStatusSnapshot};

use crate::health::Liveness;

struct Registration {
    source: Arc<dyn Liveness>,
    window: Duration,
}

/// Composes a [`SystemStatusSnapshot`] by querying every registered source
/// at call time.
///
/// Nothing is cached and nothing is mutated: each flag is computed from its
/// own source alone. Sources that were never registered report `false`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use flowwatch_core::{HealthTracker, SystemStatusAggregator};
/// use flowwatch_types::SourceId;
///
/// let camera = Arc::new(HealthTracker::new());
/// let status = SystemStatusAggregator::builder()
///     .source(SourceId::Agv1Camera, camera.clone())
///     .build();
///
/// camera.mark_success();
/// let snapshot = status.get_status();
/// assert!(snapshot.agv1_cam_ok);
/// assert!(!snapshot.kpi_ok);
/// ```
pub struct SystemStatusAggregator {
    sources: BTreeMap<SourceId, Registration>,
}

impl SystemStatusAggregator {
    pub fn builder() -> SystemStatusAggregatorBuilder {
        SystemStatusAggregatorBuilder::default()
    }

    pub fn get_status(&self) -> SystemStatusSnapshot {
        let mut snapshot = SystemStatusSnapshot::default();
        for (id, registration) in &self.sources {
            snapshot.set(*id, registration.source.is_healthy(registration.window));
        }
        snapshot
    }

    /// Window used for `source`, if it is registered.
    pub fn window(&self, source: SourceId) -> Option<Duration> {
        self.sources.get(&source).map(|r| r.window)
    }
}

impl std::fmt::Debug for SystemStatusAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.sources.iter().map(|(id, r)| (id, r.window)))
            .finish()
    }
}

/// Builder for [`SystemStatusAggregator`].
#[derive(Default)]
pub struct SystemStatusAggregatorBuilder {
    sources: BTreeMap<SourceId, Registration>,
}

impl SystemStatusAggregatorBuilder {
    /// Register `liveness` for `id` with the source's default window.
    pub fn source(self, id: SourceId, liveness: Arc<dyn Liveness>) -> Self {
        self.source_with_window(id, liveness, id.default_window())
    }

    /// Register `liveness` for `id` with an explicit window.
    pub fn source_with_window(
        mut self,
        id: SourceId,
        liveness: Arc<dyn Liveness>,
        window: Duration,
    ) -> Self {
        self.sources.insert(
            id,
            Registration {
                source: liveness,
                window,
            },
        );
        self
    }

    pub fn build(self) -> SystemStatusAggregator {
        SystemStatusAggregator {
            sources: self.sources,
        }
    }
}
