//! Daemon configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `FLOWWATCH_`-prefixed environment variables (nested keys separated by
//! `__`, e.g. `FLOWWATCH_SERVER__LISTEN`). Command-line flags are applied
//! on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use flowwatch_types::SourceId;
use serde::Deserialize;

use crate::duration::parse_duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub cameras: CameraSettings,
    pub amqp: AmqpSettings,
    pub broadcast: BroadcastSettings,
    pub health: HealthSettings,
    pub simulate: SimulateSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the line protocol listens on.
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:7878".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the counter row and event log. Unset keeps everything
    /// in memory.
    pub data_dir: Option<PathBuf>,
}

/// Offer endpoints of the camera devices.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub agv1: Option<String>,
    pub agv2: Option<String>,
    pub conveyor: Option<String>,
    pub timeout: String,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            agv1: None,
            agv2: None,
            conveyor: None,
            timeout: "10s".to_string(),
        }
    }
}

impl CameraSettings {
    /// Configured device URL per camera.
    pub fn devices(&self) -> impl Iterator<Item = (SourceId, &str)> {
        [
            (SourceId::Agv1Camera, &self.agv1),
            (SourceId::Agv2Camera, &self.agv2),
            (SourceId::ConveyorCamera, &self.conveyor),
        ]
        .into_iter()
        .filter_map(|(id, url)| url.as_deref().map(|url| (id, url)))
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(&self.timeout).context("cameras.timeout")
    }
}

/// Subscription to production telemetry on an AMQP topic exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AmqpSettings {
    /// Broker URI. Unset disables the feed.
    pub uri: Option<String>,
    pub exchange: String,
    /// Queue to consume from. Unset declares an exclusive server-named queue.
    pub queue: Option<String>,
    pub kpi_key: String,
    pub environment_key: String,
    pub eventlog_key: String,
    pub reconnect_delay: String,
}

impl Default for AmqpSettings {
    fn default() -> Self {
        Self {
            uri: None,
            exchange: "amq.topic".to_string(),
            queue: None,
            kpi_key: "roboflow.kpi".to_string(),
            environment_key: "roboflow.env".to_string(),
            eventlog_key: "roboflow.eventlog".to_string(),
            reconnect_delay: "5s".to_string(),
        }
    }
}

impl AmqpSettings {
    pub fn reconnect_delay(&self) -> Result<Duration> {
        parse_duration(&self.reconnect_delay).context("amqp.reconnect_delay")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    /// Messages queued per subscriber before new ones are dropped.
    pub capacity: usize,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            capacity: flowwatch_core::DEFAULT_CAPACITY,
        }
    }
}

/// Liveness windows per source kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub environment: String,
    pub eventlog: String,
    pub kpi: String,
    pub camera: String,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            environment: "60s".to_string(),
            eventlog: "60s".to_string(),
            kpi: "60s".to_string(),
            camera: "30s".to_string(),
        }
    }
}

impl HealthSettings {
    pub fn window(&self, source: SourceId) -> Result<Duration> {
        let (key, value) = match source {
            SourceId::Environment => ("health.environment", &self.environment),
            SourceId::EventLog => ("health.eventlog", &self.eventlog),
            SourceId::Kpi => ("health.kpi", &self.kpi),
            SourceId::Agv1Camera | SourceId::Agv2Camera | SourceId::ConveyorCamera => {
                ("health.camera", &self.camera)
            }
        };
        parse_duration(value).context(key)
    }
}

/// Stand-in data generators for running without hardware.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulateSettings {
    pub environment: bool,
    pub interval: String,
}

impl Default for SimulateSettings {
    fn default() -> Self {
        Self {
            environment: false,
            interval: "10s".to_string(),
        }
    }
}

impl SimulateSettings {
    pub fn interval(&self) -> Result<Duration> {
        parse_duration(&self.interval).context("simulate.interval")
    }
}

impl Settings {
    /// Load settings from defaults, `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("FLOWWATCH")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to read configuration")?;

        let settings: Settings = config
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every duration up front so a typo fails at startup.
    pub fn validate(&self) -> Result<()> {
        for source in SourceId::ALL {
            self.health.window(source)?;
        }
        self.cameras.timeout()?;
        self.amqp.reconnect_delay()?;
        self.simulate.interval()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_dashboard_expectations() {
        let settings = Settings::default();
        assert_eq!(settings.server.listen, "127.0.0.1:7878");
        assert!(settings.storage.data_dir.is_none());
        assert!(settings.amqp.uri.is_none());
        assert_eq!(
            settings.health.window(SourceId::Kpi).unwrap(),
            Duration::from_secs(60)
        );
        assert_eq!(
            settings.health.window(SourceId::Agv2Camera).unwrap(),
            Duration::from_secs(30)
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = write_config(
            r#"
            [server]
            listen = "0.0.0.0:9000"

            [storage]
            data_dir = "/var/lib/flowwatch"

            [cameras]
            agv1 = "http://10.0.0.21:8080/offer"
            conveyor = "http://10.0.0.30:8080/offer"

            [health]
            camera = "45s"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.server.listen, "0.0.0.0:9000");
        assert_eq!(
            settings.storage.data_dir,
            Some(PathBuf::from("/var/lib/flowwatch"))
        );
        assert_eq!(
            settings.health.window(SourceId::ConveyorCamera).unwrap(),
            Duration::from_secs(45)
        );
        assert_eq!(
            settings.health.window(SourceId::Environment).unwrap(),
            Duration::from_secs(60)
        );

        let devices: Vec<_> = settings.cameras.devices().collect();
        assert_eq!(
            devices,
            vec![
                (SourceId::Agv1Camera, "http://10.0.0.21:8080/offer"),
                (SourceId::ConveyorCamera, "http://10.0.0.30:8080/offer"),
            ]
        );
    }

    #[test]
    fn bad_duration_fails_at_load() {
        let file = write_config("[health]\nkpi = \"soon\"\n");
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("health.kpi"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/flowwatch.toml"))).is_err());
    }
}
