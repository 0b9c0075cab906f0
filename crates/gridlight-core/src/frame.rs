//! Telemetry frame parser.
//!
//! Decodes one raw inbound message into a typed [`TelemetryEvent`]. This is
//! a pure function: no side effects, no I/O, no logging. Callers decide what
//! to do with a [`GridlightError::Parse`] (the channel task drops the frame
//! and keeps reading).
//!
//! Two frame shapes exist on the wire:
//!
//! - status: `{"power": 12.5, "current": 0.4, "voltage": 230.1, "toggle": 1,
//!   "gps_lat": 10.8, "gps_log": 106.6}` — the GPS pair is optional, the
//!   numeric fields and `toggle` are required. A frame missing a required
//!   field is a parse failure, never defaulted to zero.
//! - liveness: `{"alive": "0"}` — device firmware sends the flag as a
//!   string; bool and integer encodings are accepted as well.

use serde::Deserialize;

use crate::error::{GridlightError, Result};
use crate::status::Position;

/// One decoded inbound message from a unit's telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    /// Periodic status report.
    Status(StatusFrame),
    /// Connectivity signal; `alive: false` means the device went dark.
    Liveness { alive: bool },
}

/// Decoded status frame. Numeric fields are copied verbatim from the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusFrame {
    pub power: f64,
    pub current: f64,
    pub voltage: f64,
    pub toggle: u8,
    pub position: Option<Position>,
}

impl StatusFrame {
    /// The device reports its relay state as `toggle == 1`.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.toggle == 1
    }
}

#[derive(Deserialize)]
struct RawLiveness {
    alive: AliveFlag,
}

#[derive(Deserialize)]
struct RawStatus {
    power: f64,
    current: f64,
    voltage: f64,
    toggle: u8,
    gps_lat: Option<f64>,
    // Longitude; the field name is the device firmware's spelling.
    gps_log: Option<f64>,
}

/// Accepts `"0"`/`"1"`, booleans, and 0/1 integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum AliveFlag {
    Text(String),
    Flag(bool),
    Number(i64),
}

impl AliveFlag {
    fn as_bool(&self) -> Result<bool> {
        match self {
            AliveFlag::Text(s) => match s.as_str() {
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(GridlightError::Parse(format!(
                    "unrecognized alive flag {other:?}"
                ))),
            },
            AliveFlag::Flag(b) => Ok(*b),
            AliveFlag::Number(0) => Ok(false),
            AliveFlag::Number(1) => Ok(true),
            AliveFlag::Number(n) => Err(GridlightError::Parse(format!(
                "unrecognized alive flag {n}"
            ))),
        }
    }
}

/// Decode one raw inbound message.
///
/// # Errors
///
/// Returns [`GridlightError::Parse`] for anything that is not a well-formed
/// status or liveness frame. Missing required numeric fields fail closed.
pub fn parse_frame(raw: &str) -> Result<TelemetryEvent> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| GridlightError::Parse(format!("invalid JSON: {e}")))?;

    let Some(object) = value.as_object() else {
        return Err(GridlightError::Parse("frame is not a JSON object".into()));
    };

    if object.contains_key("alive") {
        let liveness: RawLiveness = serde_json::from_value(value)
            .map_err(|e| GridlightError::Parse(format!("bad liveness frame: {e}")))?;
        let alive = liveness.alive.as_bool()?;
        return Ok(TelemetryEvent::Liveness { alive });
    }

    let status: RawStatus = serde_json::from_value(value)
        .map_err(|e| GridlightError::Parse(format!("bad status frame: {e}")))?;

    // A lone coordinate is useless; carry the fix only when both are present.
    let position = match (status.gps_lat, status.gps_log) {
        (Some(latitude), Some(longitude)) => Some(Position {
            latitude,
            longitude,
        }),
        _ => None,
    };

    Ok(TelemetryEvent::Status(StatusFrame {
        power: status.power,
        current: status.current,
        voltage: status.voltage,
        toggle: status.toggle,
        position,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_status_frame() {
        let raw = r#"{"power": 12.5, "current": 0.4, "voltage": 230.1, "toggle": 1,
                      "gps_lat": 10.82, "gps_log": 106.63}"#;
        let event = parse_frame(raw).unwrap();
        match event {
            TelemetryEvent::Status(frame) => {
                assert_eq!(frame.power, 12.5);
                assert_eq!(frame.voltage, 230.1);
                assert!(frame.is_on());
                let pos = frame.position.unwrap();
                assert_eq!(pos.latitude, 10.82);
                assert_eq!(pos.longitude, 106.63);
            }
            other => panic!("expected status frame, got {other:?}"),
        }
    }

    #[test]
    fn status_frame_without_gps_has_no_position() {
        let raw = r#"{"power": 0.0, "current": 0.0, "voltage": 229.8, "toggle": 0}"#;
        let event = parse_frame(raw).unwrap();
        match event {
            TelemetryEvent::Status(frame) => {
                assert!(!frame.is_on());
                assert!(frame.position.is_none());
            }
            other => panic!("expected status frame, got {other:?}"),
        }
    }

    #[test]
    fn lone_coordinate_is_dropped() {
        let raw = r#"{"power": 1.0, "current": 1.0, "voltage": 1.0, "toggle": 1, "gps_lat": 10.0}"#;
        match parse_frame(raw).unwrap() {
            TelemetryEvent::Status(frame) => assert!(frame.position.is_none()),
            other => panic!("expected status frame, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_field_fails_closed() {
        // No `power` — must not default to zero.
        let raw = r#"{"current": 0.4, "voltage": 230.1, "toggle": 1}"#;
        assert!(matches!(
            parse_frame(raw),
            Err(GridlightError::Parse(_))
        ));
    }

    #[test]
    fn liveness_string_encodings() {
        assert_eq!(
            parse_frame(r#"{"alive": "0"}"#).unwrap(),
            TelemetryEvent::Liveness { alive: false }
        );
        assert_eq!(
            parse_frame(r#"{"alive": "1"}"#).unwrap(),
            TelemetryEvent::Liveness { alive: true }
        );
    }

    #[test]
    fn liveness_bool_and_integer_encodings() {
        assert_eq!(
            parse_frame(r#"{"alive": false}"#).unwrap(),
            TelemetryEvent::Liveness { alive: false }
        );
        assert_eq!(
            parse_frame(r#"{"alive": 1}"#).unwrap(),
            TelemetryEvent::Liveness { alive: true }
        );
    }

    #[test]
    fn garbage_alive_flag_is_rejected() {
        assert!(parse_frame(r#"{"alive": "maybe"}"#).is_err());
        assert!(parse_frame(r#"{"alive": 7}"#).is_err());
    }

    #[test]
    fn non_object_and_invalid_json_are_rejected() {
        assert!(parse_frame("[1, 2, 3]").is_err());
        assert!(parse_frame("not json at all").is_err());
    }
}
