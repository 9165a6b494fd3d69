//! Environment sensor readings.

/// Latest temperature and humidity seen on the shop floor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct EnvironmentReading {
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

/// A sensor push. Either field may be absent; absent fields keep their
/// previous value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvironmentPayload {
    #[cfg_attr(feature = "serde", serde(default))]
    pub temperature: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub humidity: Option<f64>,
}

impl EnvironmentPayload {
    /// True when the payload carries no measurement at all.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none()
    }
}

impl EnvironmentReading {
    /// Merge a payload into this reading. Returns false if the payload was empty.
    pub fn apply(&mut self, payload: &EnvironmentPayload) -> bool {
        if let Some(t) = payload.temperature {
            self.temperature_c = t;
        }
        if let Some(h) = payload.humidity {
            self.humidity_pct = h;
        }
        !payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_keeps_absent_fields() {
        let mut reading = EnvironmentReading {
            temperature_c: 24.0,
            humidity_pct: 68.0,
        };

        let applied = reading.apply(&EnvironmentPayload {
            temperature: Some(25.5),
            humidity: None,
        });

        assert!(applied);
        assert_eq!(reading.temperature_c, 25.5);
        assert_eq!(reading.humidity_pct, 68.0);
    }

    #[test]
    fn empty_payload_applies_nothing() {
        let mut reading = EnvironmentReading::default();
        assert!(!reading.apply(&EnvironmentPayload::default()));
        assert_eq!(reading, EnvironmentReading::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn reading_uses_dashboard_keys() {
        let json = serde_json::to_value(EnvironmentReading {
            temperature_c: 24.0,
            humidity_pct: 70.0,
        })
        .unwrap();
        assert_eq!(json["temperatureC"], 24.0);
        assert_eq!(json["humidityPct"], 70.0);
    }
}
