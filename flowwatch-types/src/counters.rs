//! Production counters and the KPI summary derived from them.

use chrono::{DateTime, Utc};

use crate::ProductionCode;

/// The singleton production-counter row.
///
/// One counter per [`ProductionCode`], plus the time the last valid event
/// arrived. Counters only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CounterRow {
    /// Line A, good units (`A0`).
    pub a0: u64,
    /// Line A, defective units (`A1`).
    pub a1: u64,
    /// Line B, good units (`B0`).
    pub b0: u64,
    /// Line B, defective units (`B1`).
    pub b1: u64,
    /// When the last valid event arrived.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub last_event_at: Option<DateTime<Utc>>,
}

impl CounterRow {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit to the counter matching `code`.
    pub fn increment(&mut self, code: ProductionCode) {
        let counter = match code {
            ProductionCode::LineAGood => &mut self.a0,
            ProductionCode::LineADefect => &mut self.a1,
            ProductionCode::LineBGood => &mut self.b0,
            ProductionCode::LineBDefect => &mut self.b1,
        };
        *counter = counter.saturating_add(1);
    }

    /// Current value of the counter matching `code`.
    pub fn count(&self, code: ProductionCode) -> u64 {
        match code {
            ProductionCode::LineAGood => self.a0,
            ProductionCode::LineADefect => self.a1,
            ProductionCode::LineBGood => self.b0,
            ProductionCode::LineBDefect => self.b1,
        }
    }

    /// Derive the dashboard summary from this row.
    pub fn summary(&self) -> KpiSummary {
        let line_a = self.a0;
        let line_b = self.b0;
        let defective = self.a1.saturating_add(self.b1);
        KpiSummary {
            total: line_a.saturating_add(line_b).saturating_add(defective),
            line_a,
            line_b,
            defective,
        }
    }
}

/// Production KPIs, derived from a [`CounterRow`] and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct KpiSummary {
    /// Every unit processed, good or defective.
    pub total: u64,
    /// Good units from line A.
    pub line_a: u64,
    /// Good units from line B.
    pub line_b: u64,
    /// Defective units from both lines.
    pub defective: u64,
}

/// A production code event as pushed by the inspection station.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KpiEventPayload {
    /// Source encoding, e.g. `"A1"`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub code: String,

    /// Optional event time in epoch milliseconds.
    #[cfg_attr(feature = "serde", serde(default, alias = "timestamp"))]
    pub ts: Option<i64>,
}

impl KpiEventPayload {
    /// The event time, if one was supplied and is representable.
    pub fn at(&self) -> Option<DateTime<Utc>> {
        self.ts.and_then(DateTime::from_timestamp_millis)
    }
}
