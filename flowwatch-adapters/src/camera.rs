//! Camera offer proxy.
//!
//! The dashboard opens a video stream by posting an offer to the backend,
//! which forwards it to the device on the vehicle or conveyor. Every forward
//! is reduced to a success or a failure on that camera's health tracker:
//!
//! - **2xx**: success; the device's answer is returned as-is
//! - **other status**: failure; the device's answer is still returned
//! - **transport error or timeout**: failure, and an [`AdapterError`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowwatch_adapters::camera::CameraProxy;
//! use flowwatch_core::HealthTracker;
//! use flowwatch_types::SourceId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agv1 = Arc::new(HealthTracker::new());
//!     let proxy = CameraProxy::builder()
//!         .device(SourceId::Agv1Camera, "http://10.0.0.21:8080/offer", agv1.clone())
//!         .build()?;
//!
//!     let answer = proxy
//!         .forward(SourceId::Agv1Camera, r#"{"sdp":"...","type":"offer"}"#)
//!         .await?;
//!     println!("device answered {}", answer.status);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use flowwatch_core::HealthTracker;
use flowwatch_types::{CallOutcome, SourceId};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::AdapterError;

/// Default time allowed for a device to answer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct Device {
    url: String,
    health: Arc<HealthTracker>,
}

/// What the device answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: String,
}

impl ProxyResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Forwards offers to camera devices and records the outcome.
#[derive(Debug, Clone)]
pub struct CameraProxy {
    client: Client,
    devices: BTreeMap<SourceId, Device>,
}

impl CameraProxy {
    /// Create a new builder for configuring the proxy.
    pub fn builder() -> CameraProxyBuilder {
        CameraProxyBuilder::default()
    }

    /// Cameras this proxy can reach.
    pub fn cameras(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.devices.keys().copied()
    }

    /// Post `body` to `camera`'s device.
    pub async fn forward(
        &self,
        camera: SourceId,
        body: impl Into<String>,
    ) -> Result<ProxyResponse, AdapterError> {
        let device = self
            .devices
            .get(&camera)
            .ok_or_else(|| AdapterError::UnknownDevice(camera.to_string()))?;

        info!(%camera, url = %device.url, "forwarding offer");
        match self.post(&device.url, body.into()).await {
            Ok(response) => {
                let outcome = CallOutcome::from(response.is_success());
                if outcome == CallOutcome::Failure {
                    warn!(%camera, status = response.status, "device rejected offer");
                }
                device.health.record(outcome);
                Ok(response)
            }
            Err(e) => {
                error!(%camera, url = %device.url, error = %e, "offer call failed");
                device.health.record(CallOutcome::Failure);
                Err(e)
            }
        }
    }

    async fn post(&self, url: &str, body: String) -> Result<ProxyResponse, AdapterError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ProxyResponse { status, body })
    }
}

/// Builder for CameraProxy.
#[derive(Debug, Default)]
pub struct CameraProxyBuilder {
    devices: BTreeMap<SourceId, Device>,
    timeout: Option<Duration>,
}

impl CameraProxyBuilder {
    /// Route offers for `camera` to `url`, recording outcomes on `health`.
    pub fn device(
        mut self,
        camera: SourceId,
        url: impl Into<String>,
        health: Arc<HealthTracker>,
    ) -> Self {
        self.devices.insert(
            camera,
            Device {
                url: url.into(),
                health,
            },
        );
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the proxy. Fails if a non-camera source was registered or the
    /// HTTP client cannot be created.
    pub fn build(self) -> Result<CameraProxy, AdapterError> {
        if let Some(id) = self.devices.keys().find(|id| !id.is_camera()) {
            return Err(AdapterError::Config(format!("{id} is not a camera")));
        }

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| AdapterError::Config(e.to_string()))?;

        Ok(CameraProxy {
            client,
            devices: self.devices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one request, answering with `status` once `expected_body` has
    /// been received.
    async fn one_shot_device(status_line: &'static str, expected_body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.ends_with(expected_body.as_bytes()) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-length: 6\r\nconnection: close\r\n\r\nanswer"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        format!("http://{addr}/offer")
    }

    #[test]
    fn test_builder_defaults() {
        let proxy = CameraProxy::builder().build().unwrap();
        assert_eq!(proxy.cameras().count(), 0);
    }

    #[test]
    fn test_builder_rejects_non_camera() {
        let err = CameraProxy::builder()
            .device(SourceId::Kpi, "http://localhost", Arc::new(HealthTracker::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[tokio::test]
    async fn test_unknown_camera() {
        let proxy = CameraProxy::builder().build().unwrap();
        let err = proxy.forward(SourceId::Agv2Camera, "{}").await.unwrap_err();
        assert!(matches!(err, AdapterError::UnknownDevice(_)));
    }

    #[tokio::test]
    async fn test_success_marks_camera_healthy() {
        let url = one_shot_device("200 OK", "offer-body").await;
        let health = Arc::new(HealthTracker::new());
        let proxy = CameraProxy::builder()
            .device(SourceId::Agv1Camera, url, health.clone())
            .build()
            .unwrap();

        let response = proxy.forward(SourceId::Agv1Camera, "offer-body").await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "answer");
        assert!(health.last_success().is_some());
        assert!(health.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_error_status_marks_failure_but_returns_answer() {
        let url = one_shot_device("503 Service Unavailable", "offer-body").await;
        let health = Arc::new(HealthTracker::new());
        let proxy = CameraProxy::builder()
            .device(SourceId::ConveyorCamera, url, health.clone())
            .build()
            .unwrap();

        let response = proxy
            .forward(SourceId::ConveyorCamera, "offer-body")
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
        assert!(health.last_failure().is_some());
        assert!(health.last_success().is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_marks_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let health = Arc::new(HealthTracker::new());
        let proxy = CameraProxy::builder()
            .device(SourceId::Agv2Camera, format!("http://{addr}/offer"), health.clone())
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = proxy.forward(SourceId::Agv2Camera, "{}").await.unwrap_err();
        assert!(matches!(
            err,
            AdapterError::Connection(_) | AdapterError::Http(_) | AdapterError::Timeout
        ));
        assert!(health.last_failure().is_some());
    }

    #[tokio::test]
    async fn test_unanswered_call_times_out_as_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let health = Arc::new(HealthTracker::new());
        let proxy = CameraProxy::builder()
            .device(SourceId::Agv1Camera, format!("http://{addr}/offer"), health.clone())
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        let err = proxy.forward(SourceId::Agv1Camera, "{}").await.unwrap_err();
        assert!(matches!(err, AdapterError::Timeout));
        assert!(health.last_failure().is_some());
        assert!(health.last_success().is_none());
    }
}
