//! # flowwatch-types
//!
//! Core types for production-line monitoring. This crate defines the shared
//! schema exchanged between the flowwatch engine, its inbound feeds and the
//! observers that subscribe to its broadcasts.
//!
//! ## Design Goals
//!
//! - **Plain data**: every type is a value with no hidden shared state
//! - **Optional serialization**: enable the `serde` feature for JSON wire formats
//! - **Wire compatible**: field names match the dashboard that consumes them
//!
//! ## Example
//!
//! ```rust
//! use flowwatch_types::{CounterRow, ProductionCode};
//!
//! let mut row = CounterRow::default();
//! row.increment("A0".parse::<ProductionCode>().unwrap());
//! row.increment(ProductionCode::LineBDefect);
//!
//! let summary = row.summary();
//! assert_eq!(summary.line_a, 1);
//! assert_eq!(summary.defective, 1);
//! assert_eq!(summary.total, 2);
//! ```

mod code;
mod counters;
mod environment;
mod eventlog;
mod status;

pub use code::*;
pub use counters::*;
pub use environment::*;
pub use eventlog::*;
pub use status::*;

/// Broadcast topic names.
pub mod topics {
    /// Latest environment reading.
    pub const ENVIRONMENT: &str = "environment";
    /// Each event-log record as it is stored.
    pub const EVENTLOG: &str = "eventlog";
    /// KPI summary after every counter update.
    pub const KPI_SUMMARY: &str = "kpi-summary";
}
