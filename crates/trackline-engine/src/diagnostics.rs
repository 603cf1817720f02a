//! Per-frame diagnostics: timing and counts for the table build and the
//! placement pass.
//!
//! Every call to [`FrameDriver::frame`](crate::driver::FrameDriver::frame)
//! returns diagnostics alongside the placements. Timestamps are captured
//! with the `web-time` crate, which uses `performance.now()` on WASM and
//! `std::time::Instant` on native, so the engine stays usable in a
//! browser worker.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Whether the arc-length table was rebuilt for this frame.
    pub rebuilt: bool,
    /// Wall-clock duration of the table build (zero when cached).
    #[serde(with = "duration_serde")]
    pub table_build: Duration,
    /// Wall-clock duration of the placement pass.
    #[serde(with = "duration_serde")]
    pub placement: Duration,
    /// Number of rows in the arc-length table.
    pub sample_count: usize,
    /// Total curve length `L_total`.
    pub total_length: f64,
    /// Number of placements produced.
    pub placement_count: usize,
    /// Revision of the control-point set the frame was computed for.
    pub revision: u64,
}

impl FrameDiagnostics {
    /// Combined build and placement time.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.table_build + self.placement
    }

    /// Render a human-readable summary.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Frame Diagnostics\n{}", "=".repeat(40)));
        lines.push(format!(
            "Revision: {}  |  Table: {} rows{}",
            self.revision,
            self.sample_count,
            if self.rebuilt { " (rebuilt)" } else { "" },
        ));
        lines.push(format!("Track length: {:.3}", self.total_length));
        lines.push(format!(
            "{:<16} {:>10}",
            "Table build",
            format!("{:.3}ms", duration_ms(self.table_build)),
        ));
        lines.push(format!(
            "{:<16} {:>10}",
            "Placement",
            format!("{:.3}ms", duration_ms(self.placement)),
        ));
        lines.push(format!(
            "{:<16} {:>10}",
            "Total",
            format!("{:.3}ms", duration_ms(self.total_duration())),
        ));
        lines.push(format!("Placements: {}", self.placement_count));

        lines.join("\n")
    }
}

/// Convert a `Duration` to fractional milliseconds.
#[must_use]
pub fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> FrameDiagnostics {
        FrameDiagnostics {
            rebuilt: true,
            table_build: Duration::from_micros(1500),
            placement: Duration::from_micros(250),
            sample_count: 51,
            total_length: 1534.25,
            placement_count: 3,
            revision: 7,
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let ms = duration_ms(Duration::from_millis(1234));
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn total_duration_sums_stages() {
        assert_eq!(sample().total_duration(), Duration::from_micros(1750));
    }

    #[test]
    fn report_mentions_counts() {
        let report = sample().report();
        assert!(report.contains("51 rows (rebuilt)"), "{report}");
        assert!(report.contains("Placements: 3"), "{report}");
        assert!(report.contains("1534.250"), "{report}");
        assert!(report.contains("1.750ms"), "{report}");
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        let secs = json["table_build"].as_f64().unwrap();
        assert!((secs - 0.0015).abs() < 1e-12, "got {secs}");
        let back: FrameDiagnostics = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn negative_duration_rejected() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["placement"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<FrameDiagnostics>(json).is_err());
    }
}
