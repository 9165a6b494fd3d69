//! Stand-in environment sensor.

use std::sync::Arc;
use std::time::Duration;

use flowwatch_core::EnvironmentMonitor;
use flowwatch_types::EnvironmentPayload;
use tracing::{info, warn};

/// Alternates between two fixed readings.
#[derive(Debug, Default)]
pub struct EnvironmentSimulator {
    toggle: bool,
}

impl EnvironmentSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next reading: 24 °C / 68 % and 25 °C / 70 % in turn, starting
    /// with the former.
    pub fn next_payload(&mut self) -> EnvironmentPayload {
        self.toggle = !self.toggle;
        let (temperature, humidity) = if self.toggle {
            (24.0, 68.0)
        } else {
            (25.0, 70.0)
        };
        EnvironmentPayload {
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }
}

/// Push a simulated reading into `monitor` every `period`, starting
/// immediately. Runs until the task is cancelled.
pub async fn run_environment(monitor: Arc<EnvironmentMonitor>, period: Duration) {
    info!(?period, "environment simulator enabled");
    let mut simulator = EnvironmentSimulator::new();
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        if let Err(e) = monitor.apply(&simulator.next_payload()) {
            warn!(error = %e, "simulated reading rejected");
        }
    }
}
