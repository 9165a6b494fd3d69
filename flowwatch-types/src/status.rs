//! Source identifiers and the consolidated status snapshot.

use core::fmt;
use core::time::Duration;

/// Every monitored source that contributes to the system status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SourceId {
    Environment,
    EventLog,
    Kpi,
    Agv1Camera,
    Agv2Camera,
    ConveyorCamera,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Environment,
        SourceId::EventLog,
        SourceId::Kpi,
        SourceId::Agv1Camera,
        SourceId::Agv2Camera,
        SourceId::ConveyorCamera,
    ];

    pub const CAMERAS: [SourceId; 3] = [
        SourceId::Agv1Camera,
        SourceId::Agv2Camera,
        SourceId::ConveyorCamera,
    ];

    /// Liveness window the source must have reported within.
    ///
    /// Telemetry feeds get a minute; cameras, which are polled by the
    /// dashboard continuously, get thirty seconds.
    pub const fn default_window(&self) -> Duration {
        match self {
            SourceId::Environment | SourceId::EventLog | SourceId::Kpi => Duration::from_secs(60),
            SourceId::Agv1Camera | SourceId::Agv2Camera | SourceId::ConveyorCamera => {
                Duration::from_secs(30)
            }
        }
    }

    pub const fn is_camera(&self) -> bool {
        matches!(
            self,
            SourceId::Agv1Camera | SourceId::Agv2Camera | SourceId::ConveyorCamera
        )
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceId::Environment => "environment",
            SourceId::EventLog => "event_log",
            SourceId::Kpi => "kpi",
            SourceId::Agv1Camera => "agv1_camera",
            SourceId::Agv2Camera => "agv2_camera",
            SourceId::ConveyorCamera => "conveyor_camera",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a call to a remote source.
///
/// Timeouts and transport errors are failures; there is no third state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
}

impl From<bool> for CallOutcome {
    fn from(ok: bool) -> Self {
        if ok {
            CallOutcome::Success
        } else {
            CallOutcome::Failure
        }
    }
}

/// One health flag per monitored source, computed at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SystemStatusSnapshot {
    pub env_ok: bool,
    pub eventlog_ok: bool,
    pub kpi_ok: bool,
    pub agv1_cam_ok: bool,
    pub agv2_cam_ok: bool,
    pub conv_cam_ok: bool,
}

impl SystemStatusSnapshot {
    /// Health flag for one source.
    pub fn get(&self, source: SourceId) -> bool {
        match source {
            SourceId::Environment => self.env_ok,
            SourceId::EventLog => self.eventlog_ok,
            SourceId::Kpi => self.kpi_ok,
            SourceId::Agv1Camera => self.agv1_cam_ok,
            SourceId::Agv2Camera => self.agv2_cam_ok,
            SourceId::ConveyorCamera => self.conv_cam_ok,
        }
    }

    /// Set the health flag for one source.
    pub fn set(&mut self, source: SourceId, ok: bool) {
        let flag = match source {
            SourceId::Environment => &mut self.env_ok,
            SourceId::EventLog => &mut self.eventlog_ok,
            SourceId::Kpi => &mut self.kpi_ok,
            SourceId::Agv1Camera => &mut self.agv1_cam_ok,
            SourceId::Agv2Camera => &mut self.agv2_cam_ok,
            SourceId::ConveyorCamera => &mut self.conv_cam_ok,
        };
        *flag = ok;
    }

    /// True when every source is healthy.
    pub fn all_ok(&self) -> bool {
        SourceId::ALL.iter().all(|s| self.get(*s))
    }
}

/// Connection state of an inbound feed.
///
/// Distinguishes "never configured" from "configured but currently down".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FeedStatus {
    /// Not configured; the feed will not be started.
    #[default]
    Disabled,
    /// Configured, currently connecting or waiting to reconnect.
    Connecting,
    /// Connected and delivering messages.
    Active,
}
