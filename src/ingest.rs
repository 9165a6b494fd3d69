//! Decoding of raw feed payloads.
//!
//! Asynchronous feeds have nobody to answer to, so a payload that fails to
//! decode or apply is logged and dropped by the caller.

use anyhow::{Context, Result};
use flowwatch_types::{EnvironmentPayload, EventLogInput, KpiEventPayload};

use crate::app::App;

/// What kind of payload a feed message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    Kpi,
    Environment,
    EventLog,
}

/// Decode `data` as `kind` and apply it to the engine.
pub fn ingest(app: &App, kind: Inbound, data: &[u8]) -> Result<()> {
    match kind {
        Inbound::Kpi => {
            let payload: KpiEventPayload =
                serde_json::from_slice(data).context("malformed KPI payload")?;
            app.kpi.apply_payload(&payload)?;
        }
        Inbound::Environment => {
            let payload: EnvironmentPayload =
                serde_json::from_slice(data).context("malformed environment payload")?;
            app.environment.apply(&payload)?;
        }
        Inbound::EventLog => {
            let input: EventLogInput =
                serde_json::from_slice(data).context("malformed event-log payload")?;
            app.event_log.append(input)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_each_kind() {
        let app = App::in_memory().unwrap();

        ingest(&app, Inbound::Kpi, br#"{"code":"a1"}"#).unwrap();
        ingest(&app, Inbound::Environment, br#"{"humidity":70.0}"#).unwrap();
        ingest(
            &app,
            Inbound::EventLog,
            br#"{"content":"Low battery","location":"AGV 02","moduleName":"AGV"}"#,
        )
        .unwrap();

        assert_eq!(app.kpi.snapshot_summary().unwrap().defective, 1);
        assert_eq!(app.environment.current().unwrap().humidity_pct, 70.0);
        let page = app
            .event_log
            .search(&flowwatch_types::EventFilter::new(), 0, 20)
            .unwrap();
        // The defect record plus the explicit one.
        assert_eq!(page.total_elements, 2);
    }

    #[test]
    fn malformed_payloads_leave_state_alone() {
        let app = App::in_memory().unwrap();

        assert!(ingest(&app, Inbound::Kpi, b"{not json").is_err());
        assert!(ingest(&app, Inbound::Kpi, br#"{"code":"Q7"}"#).is_err());
        assert!(ingest(&app, Inbound::Environment, b"{}").is_err());
        assert!(ingest(&app, Inbound::EventLog, br#"{"content":""}"#).is_err());

        assert_eq!(app.kpi.snapshot_summary().unwrap().total, 0);
        assert!(app.environment.current().is_none());
        assert!(!app.status.get_status().env_ok);
    }
}
