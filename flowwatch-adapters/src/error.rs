//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when calling a remote device.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// No device is configured under this name.
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// The adapter could not be set up.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(feature = "camera")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}
