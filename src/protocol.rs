//! Line protocol spoken on the TCP listener.
//!
//! Each request is one JSON object on its own line, tagged by `op`. Each
//! request gets exactly one response line, `{"ok":true,"data":...}` or
//! `{"ok":false,"error":"..."}`. A connection that subscribes to a topic
//! additionally receives `{"topic":...,"payload":...}` lines as changes
//! happen.

use chrono::{DateTime, Utc};
use flowwatch_types::{
    topics, EnvironmentPayload, EventFilter, EventLogInput, KpiEventPayload, SourceId,
};
use serde::{Deserialize, Serialize};

/// Default page size for event-log searches.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Topics a connection may subscribe to.
pub const TOPICS: [&str; 3] = [topics::ENVIRONMENT, topics::EVENTLOG, topics::KPI_SUMMARY];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// A production code from the inspection station.
    KpiEvent(KpiEventPayload),
    /// A temperature/humidity push.
    Environment(EnvironmentPayload),
    EventlogAppend(EventLogInput),
    /// Forward a stream offer to a camera device.
    CameraOffer {
        camera: String,
        body: serde_json::Value,
    },
    KpiSummary,
    /// The latest environment reading, `null` before the first push.
    EnvironmentCurrent,
    EventlogSearch(SearchQuery),
    SystemStatus,
    FeedStatus,
    Subscribe {
        topic: String,
    },
}

/// Event-log search parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub module: Option<String>,
    pub location: Option<String>,
    pub page: i64,
    pub size: i64,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            module: None,
            location: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl SearchQuery {
    pub fn filter(&self) -> EventFilter {
        EventFilter {
            from: self.from,
            to: self.to,
            module: self.module.clone(),
            location: self.location.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self::error(format!("failed to encode response: {e}")),
        }
    }

    pub fn empty() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Map the dashboard's camera names (`agv1`, `agv2`, `conveyor`) to sources.
pub fn camera_source(name: &str) -> Option<SourceId> {
    match name.trim().to_ascii_lowercase().as_str() {
        "agv1" => Some(SourceId::Agv1Camera),
        "agv2" => Some(SourceId::Agv2Camera),
        "conveyor" | "conv" => Some(SourceId::ConveyorCamera),
        _ => None,
    }
}

/// The offer body as sent to the device. String bodies are forwarded
/// verbatim; anything else is re-encoded as JSON.
pub fn offer_body(body: &serde_json::Value) -> String {
    match body {
        serde_json::Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}
