//! Service wiring.
//!
//! Every service is built once here and shared as an `Arc` handle by the
//! server, the feeds and the simulator.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use flowwatch_adapters::camera::CameraProxy;
use flowwatch_core::{
    Broadcaster, CounterStore, EnvironmentMonitor, EventLog, EventStore, FeedState,
    FileCounterStore, HealthTracker, JsonlEventStore, KpiAggregator, MemoryCounterStore,
    MemoryEventStore, SystemStatusAggregator,
};
use flowwatch_types::SourceId;
use tracing::info;

use crate::duration::format_duration;
use crate::settings::Settings;

/// Name under which the line protocol listener reports its status.
pub const TCP_FEED: &str = "tcp";
/// Name under which the AMQP subscription reports its status.
pub const AMQP_FEED: &str = "amqp";

/// The running engine.
pub struct App {
    pub broadcaster: Arc<Broadcaster>,
    pub kpi: Arc<KpiAggregator>,
    pub event_log: Arc<EventLog>,
    pub environment: Arc<EnvironmentMonitor>,
    pub cameras: CameraProxy,
    pub camera_health: BTreeMap<SourceId, Arc<HealthTracker>>,
    pub status: SystemStatusAggregator,
    pub feeds: FeedState,
}

impl App {
    /// Build the engine from settings, opening file-backed stores when a data
    /// directory is configured.
    pub fn build(settings: &Settings) -> Result<Self> {
        let (counters, events): (Arc<dyn CounterStore>, Arc<dyn EventStore>) =
            match &settings.storage.data_dir {
                Some(dir) => {
                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("failed to create {}", dir.display()))?;
                    let counters: Arc<dyn CounterStore> =
                        Arc::new(FileCounterStore::new(dir.join("counters.json")));
                    let events: Arc<dyn EventStore> = Arc::new(
                        JsonlEventStore::open(dir.join("events.jsonl"))
                            .context("failed to open event log")?,
                    );
                    info!(data_dir = %dir.display(), "using file-backed storage");
                    (counters, events)
                }
                None => {
                    info!("using in-memory storage");
                    let counters: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
                    let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
                    (counters, events)
                }
            };

        let mut windows = BTreeMap::new();
        for source in SourceId::ALL {
            let window = settings.health.window(source)?;
            info!(%source, window = %format_duration(window), "liveness window");
            windows.insert(source, window);
        }

        let camera_timeout = settings.cameras.timeout()?;
        let camera_urls: BTreeMap<SourceId, String> = settings
            .cameras
            .devices()
            .map(|(id, url)| (id, url.to_string()))
            .collect();

        Self::assemble(
            counters,
            events,
            settings.broadcast.capacity,
            &camera_urls,
            camera_timeout,
            &windows,
        )
    }

    /// In-memory engine with default windows and no camera devices.
    pub fn in_memory() -> Result<Self> {
        let windows: BTreeMap<SourceId, Duration> = SourceId::ALL
            .iter()
            .map(|id| (*id, id.default_window()))
            .collect();
        Self::assemble(
            Arc::new(MemoryCounterStore::new()),
            Arc::new(MemoryEventStore::new()),
            flowwatch_core::DEFAULT_CAPACITY,
            &BTreeMap::new(),
            flowwatch_adapters::camera::DEFAULT_TIMEOUT,
            &windows,
        )
    }

    fn assemble(
        counters: Arc<dyn CounterStore>,
        events: Arc<dyn EventStore>,
        capacity: usize,
        camera_urls: &BTreeMap<SourceId, String>,
        camera_timeout: Duration,
        windows: &BTreeMap<SourceId, Duration>,
    ) -> Result<Self> {
        let broadcaster = Arc::new(Broadcaster::with_capacity(capacity));

        let event_log = Arc::new(EventLog::new(
            events,
            broadcaster.clone(),
            Arc::new(HealthTracker::new()),
        ));
        let kpi = Arc::new(KpiAggregator::new(
            counters,
            broadcaster.clone(),
            event_log.clone(),
        ));
        let environment = Arc::new(EnvironmentMonitor::new(
            broadcaster.clone(),
            Arc::new(HealthTracker::new()),
        ));

        let camera_health: BTreeMap<SourceId, Arc<HealthTracker>> = SourceId::CAMERAS
            .iter()
            .map(|id| (*id, Arc::new(HealthTracker::new())))
            .collect();

        let mut proxy = CameraProxy::builder().timeout(camera_timeout);
        for (id, url) in camera_urls {
            if let Some(health) = camera_health.get(id) {
                proxy = proxy.device(*id, url.clone(), health.clone());
            }
        }
        let cameras = proxy.build().context("failed to set up camera proxy")?;

        let window = |id: SourceId| {
            windows
                .get(&id)
                .copied()
                .unwrap_or_else(|| id.default_window())
        };
        let mut status = SystemStatusAggregator::builder()
            .source_with_window(
                SourceId::Environment,
                environment.clone(),
                window(SourceId::Environment),
            )
            .source_with_window(
                SourceId::EventLog,
                event_log.health().clone(),
                window(SourceId::EventLog),
            )
            .source_with_window(SourceId::Kpi, kpi.clone(), window(SourceId::Kpi));
        for (id, health) in &camera_health {
            status = status.source_with_window(*id, health.clone(), window(*id));
        }

        Ok(Self {
            broadcaster,
            kpi,
            event_log,
            environment,
            cameras,
            camera_health,
            status: status.build(),
            feeds: FeedState::new(),
        })
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("status", &self.status)
            .field("feeds", &self.feeds)
            .finish_non_exhaustive()
    }
}
