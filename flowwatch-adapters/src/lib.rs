//! # flowwatch-adapters
//!
//! Adapters that turn calls to remote devices into health signals for the
//! flowwatch engine.
//!
//! ## Supported Devices
//!
//! - **Cameras** (`camera` feature) - Forwards stream offers to the camera
//!   devices and records each call's outcome on the camera's tracker

pub mod error;

#[cfg(feature = "camera")]
pub mod camera;

pub use error::AdapterError;

// Re-export types for convenience
pub use flowwatch_types::{CallOutcome, SourceId};
