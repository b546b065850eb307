//! # Record Extractor
//!
//! Turns one entry of the tracker's `starters` array into a
//! [`TelemetrySample`] and appends it to that starter's log.
//!
//! Expected entry layout:
//!
//! ```json
//! {
//!   "id": 860201061315183,
//!   "current": { "time": "2024-09-01T10:00:00Z", "lat": 48.1, "lng": 11.5, "speedRaw": 12.3 },
//!   "device": { "battery": 87, "online": true }
//! }
//! ```
//!
//! `id`, `current`, `current.lat` and `current.lng` are required; anything
//! else may be missing or `null`. A bad `time` is replaced by the current
//! wall-clock time rather than dropping the record.

use chrono::{FixedOffset, Local};
use serde_json::{Map, Number, Value};
use std::io;
use thiserror::Error;
use tracing::warn;

use super::sample::{parse_timestamp, TelemetrySample};
use super::sink::LogSink;
use crate::roster::Identity;

/// Why an entry was not logged
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("skipped unnamed starter")]
    UnnamedStarter,

    #[error("skipped {0}, because there was no 'current' object")]
    NoCurrent(Identity),

    #[error("skipped {0} because it did not contain position")]
    NoPosition(Identity),

    #[error("failed to write log for {identity}: {source}")]
    WriteFailed {
        identity: Identity,
        #[source]
        source: io::Error,
    },
}

/// Validates starter entries and maps them to samples
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    zulu_offset: FixedOffset,
}

impl Extractor {
    /// # Arguments
    ///
    /// * `zulu_offset` - Offset substituted for a trailing `Z` in timestamps
    pub fn new(zulu_offset: FixedOffset) -> Self {
        Self { zulu_offset }
    }

    /// Validate `entry` and build its sample without writing anything
    ///
    /// # Errors
    ///
    /// Returns the first [`SkipReason`] hit, in this order: missing id,
    /// missing `current` object, missing position.
    pub fn extract(&self, entry: &Value) -> Result<(Identity, TelemetrySample), SkipReason> {
        let id = starter_id(entry).ok_or(SkipReason::UnnamedStarter)?;
        let identity = Identity::resolve(id);
        if !identity.is_known() {
            warn!(id, "encountered unmapped key");
        }

        let current = entry
            .get("current")
            .and_then(Value::as_object)
            .ok_or(SkipReason::NoCurrent(identity))?;

        let timestamp = match current
            .get("time")
            .and_then(Value::as_str)
            .and_then(|raw| parse_timestamp(raw, self.zulu_offset))
        {
            Some(ts) => ts,
            None => {
                warn!(starter = %identity, time = ?current.get("time"), "failed to get time, using now");
                Local::now().fixed_offset()
            }
        };

        let speed = number_field(current, "speedRaw");

        let (lat, lng) = match (number_field(current, "lat"), number_field(current, "lng")) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => return Err(SkipReason::NoPosition(identity)),
        };

        // device may be absent or explicitly null
        let device = entry.get("device").and_then(Value::as_object);
        let battery = device.and_then(|d| number_field(d, "battery"));
        let online = device.and_then(|d| d.get("online")).and_then(Value::as_bool);

        Ok((
            identity,
            TelemetrySample { timestamp, speed, lat, lng, battery, online },
        ))
    }

    /// Validate `entry` and append its line to `sink`
    ///
    /// Returns the identity the line was filed under.
    pub fn process<S: LogSink + ?Sized>(
        &self,
        entry: &Value,
        sink: &mut S,
    ) -> Result<Identity, SkipReason> {
        let (identity, sample) = self.extract(entry)?;
        sink.append(&identity, &sample.to_log_line())
            .map_err(|source| SkipReason::WriteFailed { identity, source })?;
        Ok(identity)
    }
}

/// Starter id as an integer, or as a string of digits
fn starter_id(entry: &Value) -> Option<u64> {
    match entry.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Option<Number> {
    match obj.get(key) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sink::mocks::MemorySink;
    use crate::telemetry::sink::FileSink;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn extractor() -> Extractor {
        Extractor::new(FixedOffset::east_opt(3600).unwrap())
    }

    fn flavio_entry() -> Value {
        json!({
            "id": 860201061315183u64,
            "current": {"time": "2024-09-01T10:00:00Z", "lat": 48.1, "lng": 11.5, "speedRaw": 12.3},
            "device": {"battery": 87, "online": true}
        })
    }

    #[test]
    fn test_full_entry_writes_expected_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());

        let identity = extractor().process(&flavio_entry(), &mut sink).unwrap();
        assert_eq!(identity, Identity::Known("Flavio"));

        let contents = std::fs::read_to_string(dir.path().join("Flavio.txt")).unwrap();
        assert_eq!(contents, "2024-09-01T10:00:00+01:00, 12.3, (48.1, 11.5), 87, True\n");
    }

    #[test]
    fn test_same_entry_twice_appends_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::new(dir.path());

        extractor().process(&flavio_entry(), &mut sink).unwrap();
        extractor().process(&flavio_entry(), &mut sink).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("Flavio.txt")).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], lines[1]);
    }

    #[test]
    fn test_unmapped_id_is_logged_under_decimal() {
        let mut sink = MemorySink::new();
        let entry = json!({
            "id": 4242,
            "current": {"time": "2024-09-01T10:00:00Z", "lat": 1.5, "lng": 2.5}
        });

        let identity = extractor().process(&entry, &mut sink).unwrap();
        assert_eq!(identity, Identity::Unknown(4242));
        assert_eq!(
            sink.lines_for("4242"),
            vec!["2024-09-01T10:00:00+01:00, None, (1.5, 2.5), None, None"]
        );
    }

    #[test]
    fn test_string_id_is_accepted() {
        let mut sink = MemorySink::new();
        let entry = json!({
            "id": "860201061337625",
            "current": {"time": "2024-09-01T10:00:00Z", "lat": 1, "lng": 2}
        });

        assert_eq!(extractor().process(&entry, &mut sink).unwrap(), Identity::Known("Ivo"));
    }

    #[test]
    fn test_missing_id_is_unnamed() {
        let mut sink = MemorySink::new();
        let entry = json!({"current": {"time": "2024-09-01T10:00:00Z", "lat": 1, "lng": 2}});

        let err = extractor().process(&entry, &mut sink).unwrap_err();
        assert!(matches!(err, SkipReason::UnnamedStarter));
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_non_integer_id_is_unnamed() {
        for id in [json!(null), json!(-5), json!(1.5), json!("abc")] {
            let entry = json!({"id": id, "current": {"lat": 1, "lng": 2}});
            assert!(matches!(extractor().extract(&entry), Err(SkipReason::UnnamedStarter)));
        }
    }

    #[test]
    fn test_missing_current_writes_nothing() {
        let mut sink = MemorySink::new();
        let entry = json!({"id": 860201061324110u64, "device": {"battery": 50}});

        let err = extractor().process(&entry, &mut sink).unwrap_err();
        match err {
            SkipReason::NoCurrent(identity) => assert_eq!(identity, Identity::Known("Clarissa")),
            other => panic!("Expected NoCurrent, got: {:?}", other),
        }
        assert!(sink.lines.is_empty());
        assert_eq!(
            SkipReason::NoCurrent(Identity::Known("Clarissa")).to_string(),
            "skipped Clarissa, because there was no 'current' object"
        );
    }

    #[test]
    fn test_null_current_writes_nothing() {
        let mut sink = MemorySink::new();
        let entry = json!({"id": 860201061324110u64, "current": null});
        assert!(matches!(
            extractor().process(&entry, &mut sink),
            Err(SkipReason::NoCurrent(_))
        ));
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_missing_lat_or_lng_writes_nothing() {
        let mut sink = MemorySink::new();
        for current in [
            json!({"time": "2024-09-01T10:00:00Z", "lat": 48.1}),
            json!({"time": "2024-09-01T10:00:00Z", "lng": 11.5}),
            json!({"time": "2024-09-01T10:00:00Z"}),
            json!({"time": "2024-09-01T10:00:00Z", "lat": null, "lng": 11.5}),
        ] {
            let entry = json!({"id": 860201061320068u64, "current": current});
            match extractor().process(&entry, &mut sink) {
                Err(SkipReason::NoPosition(identity)) => {
                    assert_eq!(identity, Identity::Known("Takashi"))
                }
                other => panic!("Expected NoPosition, got: {:?}", other),
            }
        }
        assert!(sink.lines.is_empty());
    }

    #[test]
    fn test_bad_time_falls_back_to_now() {
        let mut sink = MemorySink::new();
        let entry = json!({
            "id": 860201061320308u64,
            "current": {"time": "yesterday-ish", "lat": 48.1, "lng": 11.5}
        });

        extractor().process(&entry, &mut sink).unwrap();

        let lines = sink.lines_for("Louis");
        assert_eq!(lines.len(), 1);
        let stamp = lines[0].split(", ").next().unwrap();
        let logged = DateTime::parse_from_rfc3339(stamp).unwrap();
        let drift = (Utc::now() - logged.with_timezone(&Utc)).num_seconds().abs();
        assert!(drift <= 5, "timestamp {} is not close to now", stamp);
        assert!(lines[0].ends_with(", None, (48.1, 11.5), None, None"));
    }

    #[test]
    fn test_missing_time_falls_back_to_now() {
        let entry = json!({"id": 860201061230630u64, "current": {"lat": 0, "lng": 0}});
        let (_, sample) = extractor().extract(&entry).unwrap();
        let drift = (Utc::now() - sample.timestamp.with_timezone(&Utc)).num_seconds().abs();
        assert!(drift <= 5);
    }

    #[test]
    fn test_device_fields_are_independent() {
        let only_battery = json!({
            "id": 860201061159557u64,
            "current": {"time": "2024-09-01T10:00:00Z", "lat": 1, "lng": 2},
            "device": {"battery": 12}
        });
        let (_, sample) = extractor().extract(&only_battery).unwrap();
        assert_eq!(sample.battery, Some(12.into()));
        assert_eq!(sample.online, None);

        let only_online = json!({
            "id": 860201061159557u64,
            "current": {"time": "2024-09-01T10:00:00Z", "lat": 1, "lng": 2},
            "device": {"online": false}
        });
        let (_, sample) = extractor().extract(&only_online).unwrap();
        assert_eq!(sample.battery, None);
        assert_eq!(sample.online, Some(false));
        assert!(sample.to_log_line().ends_with(", None, False"));
    }

    #[test]
    fn test_null_device() {
        let entry = json!({
            "id": 860201062373355u64,
            "current": {"time": "2024-09-01T10:00:00Z", "lat": 1, "lng": 2, "speedRaw": null},
            "device": null
        });
        let (identity, sample) = extractor().extract(&entry).unwrap();
        assert_eq!(identity, Identity::Known("Reserve"));
        assert_eq!(sample.speed, None);
        assert_eq!(sample.battery, None);
        assert_eq!(sample.online, None);
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut sink = MemorySink::failing(io::ErrorKind::PermissionDenied);
        match extractor().process(&flavio_entry(), &mut sink) {
            Err(SkipReason::WriteFailed { identity, source }) => {
                assert_eq!(identity, Identity::Known("Flavio"));
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("Expected WriteFailed, got: {:?}", other),
        }
    }
}
