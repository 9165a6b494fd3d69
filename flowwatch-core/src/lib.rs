//! # flowwatch-core
//!
//! Health tracking and KPI aggregation engine for production-line
//! monitoring.
//!
//! The engine ingests three kinds of signal (remote call outcomes, sensor
//! pushes and production codes) and keeps a live picture of subsystem health
//! plus derived production metrics. Every change is broadcast to topic
//! subscribers after it has been committed.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use flowwatch_core::{
//!     Broadcaster, EventLog, HealthTracker, KpiAggregator, MemoryCounterStore,
//!     MemoryEventStore,
//! };
//! use flowwatch_types::{EventFilter, ProductionCode};
//!
//! let broadcaster = Arc::new(Broadcaster::new());
//! let events = Arc::new(EventLog::new(
//!     Arc::new(MemoryEventStore::new()),
//!     broadcaster.clone(),
//!     Arc::new(HealthTracker::new()),
//! ));
//! let kpi = KpiAggregator::new(
//!     Arc::new(MemoryCounterStore::new()),
//!     broadcaster.clone(),
//!     events.clone(),
//! );
//!
//! kpi.apply_event(ProductionCode::LineAGood, None).unwrap();
//! kpi.apply_event(ProductionCode::LineADefect, None).unwrap();
//!
//! let summary = kpi.snapshot_summary().unwrap();
//! assert_eq!(summary.total, 2);
//! assert_eq!(summary.defective, 1);
//!
//! // The defect was logged.
//! let page = events.search(&EventFilter::new(), 0, 20).unwrap();
//! assert_eq!(page.total_elements, 1);
//! ```
//!
//! ## Components
//!
//! - [`HealthTracker`]: windowed liveness of one source
//! - [`KpiAggregator`]: production counters and their summary
//! - [`EventLog`]: append-only, searchable record of occurrences
//! - [`EnvironmentMonitor`]: latest temperature and humidity
//! - [`SystemStatusAggregator`]: one health flag per source
//! - [`Broadcaster`]: best-effort topic fan-out

mod broadcast;
mod environment;
mod error;
mod eventlog;
mod feed;
mod health;
mod kpi;
mod status;
mod store;

pub use broadcast::{publish_json, Broadcaster, Message, Publish, Subscription, DEFAULT_CAPACITY};
pub use environment::EnvironmentMonitor;
pub use error::{CoreError, StoreError};
pub use eventlog::EventLog;
pub use feed::FeedState;
pub use health::{HealthTracker, Liveness};
pub use kpi::{KpiAggregator, DEFECT_CONTENT, DEFECT_MODULE};
pub use status::{SystemStatusAggregator, SystemStatusAggregatorBuilder};
pub use store::{
    CounterStore, EventStore, FileCounterStore, JsonlEventStore, MemoryCounterStore,
    MemoryEventStore,
};

// Re-export types for convenience
pub use flowwatch_types as types;
