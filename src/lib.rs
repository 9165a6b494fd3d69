//! # flowwatch
//!
//! A production-line monitor. It counts inspection codes into KPI counters,
//! keeps an append-only event log, tracks the latest environment reading,
//! proxies stream offers to camera devices, and reports per-source health.
//! Every change is broadcast to subscribers by topic.
//!
//! ## Architecture
//!
//! ```text
//!   AMQP feed ──┐                    ┌── kpi-summary ──┐
//!   simulator ──┼──▶ engine (core) ──┼── environment ──┼──▶ subscribers
//!   TCP lines ──┘        │           └── eventlog ─────┘
//!                        ▼
//!                 system status  ◀── camera proxy
//! ```
//!
//! - **[`app`]**: wires the engine components from [`Settings`]
//! - **[`server`]**: the line protocol listener ([`protocol`] has the wire types)
//! - **[`ingest`]**: decoding of raw feed payloads
//! - **[`simulate`]**: a stand-in environment sensor
//! - **[`settings`]**: layered configuration (file, then `FLOWWATCH_*` env)
//!
//! ## Usage
//!
//! ```bash
//! # Listen on the default address with in-memory storage
//! flowwatch
//!
//! # Persist counters and events, consume from a broker
//! FLOWWATCH_AMQP__URI=amqp://localhost:5672/%2f flowwatch --data-dir /var/lib/flowwatch
//! ```
//!
//! ### Embedding
//!
//! ```
//! use flowwatch::App;
//! use flowwatch::types::ProductionCode;
//!
//! let app = App::in_memory().unwrap();
//! app.kpi.apply_event(ProductionCode::LineAGood, None).unwrap();
//!
//! assert_eq!(app.kpi.snapshot_summary().unwrap().line_a, 1);
//! assert!(app.status.get_status().kpi_ok);
//! ```
//!
//! ### Watching a topic
//!
//! ```
//! use flowwatch::App;
//! use flowwatch::types::{topics, ProductionCode};
//!
//! # tokio_test::block_on(async {
//! let app = App::in_memory().unwrap();
//! let mut updates = app.broadcaster.subscribe(topics::KPI_SUMMARY);
//!
//! app.kpi.apply_event(ProductionCode::LineBDefect, None).unwrap();
//!
//! let message = updates.recv().await.unwrap();
//! assert_eq!(message.payload["defective"], 1);
//! # });
//! ```

pub mod app;
pub mod duration;
pub mod ingest;
pub mod protocol;
pub mod server;
pub mod settings;
pub mod simulate;

#[cfg(feature = "amqp")]
pub mod bus;

pub use app::App;
pub use flowwatch_types as types;
pub use settings::Settings;
