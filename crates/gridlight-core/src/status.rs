//! Per-unit status model.
//!
//! [`UnitStatus`] is the value stored in the status registry for each unit.
//! The invariant that matters lives in [`UnitStatus::apply`]: whenever a unit
//! is not connected, its numeric telemetry is reset to the unknown sentinel
//! (`None`) so stale values can never be displayed as current. `None` is
//! distinct from `Some(0.0)` on purpose — zero is a real reading.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::frame::TelemetryEvent;

/// Stable identifier of a single addressable unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// GPS fix reported by a unit. Only carried while the unit is connected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Last-known status of one unit.
///
/// Entries are created lazily on the first frame (or first optimistic
/// command) and live for the session. Numeric fields are `None` until a
/// status frame has been seen, and are reset to `None` whenever the unit
/// loses connectivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitStatus {
    pub unit_id: UnitId,
    pub is_on: bool,
    pub is_connected: bool,
    pub power: Option<f64>,
    pub current: Option<f64>,
    pub voltage: Option<f64>,
    pub position: Option<Position>,
    pub last_updated: Instant,
}

impl UnitStatus {
    /// A status entry for a unit that has never reported anything.
    #[must_use]
    pub fn unknown(unit_id: UnitId) -> Self {
        Self {
            unit_id,
            is_on: false,
            is_connected: false,
            power: None,
            current: None,
            voltage: None,
            position: None,
            last_updated: Instant::now(),
        }
    }

    /// True if no telemetry has ever been recorded for this unit.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        !self.is_connected && self.power.is_none() && self.current.is_none()
    }

    /// Merge one decoded telemetry event into this status.
    ///
    /// Events for a single unit arrive in order on that unit's channel, so a
    /// plain last-write-wins overwrite is correct here.
    pub fn apply(&mut self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Status(frame) => {
                self.is_connected = true;
                self.is_on = frame.is_on();
                self.power = Some(frame.power);
                self.current = Some(frame.current);
                self.voltage = Some(frame.voltage);
                self.position = frame.position;
            }
            TelemetryEvent::Liveness { alive: true } => {
                self.is_connected = true;
            }
            TelemetryEvent::Liveness { alive: false } => {
                self.is_connected = false;
                self.clear_telemetry();
            }
        }
        self.last_updated = Instant::now();
    }

    fn clear_telemetry(&mut self) {
        self.power = None;
        self.current = None;
        self.voltage = None;
        self.position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StatusFrame;

    fn status_frame(power: f64, toggle: u8) -> TelemetryEvent {
        TelemetryEvent::Status(StatusFrame {
            power,
            current: 1.5,
            voltage: 231.0,
            toggle,
            position: Some(Position {
                latitude: 10.8,
                longitude: 106.7,
            }),
        })
    }

    #[test]
    fn status_frame_marks_connected_and_copies_fields() {
        let mut status = UnitStatus::unknown(UnitId(1));
        status.apply(&status_frame(42.0, 1));

        assert!(status.is_connected);
        assert!(status.is_on);
        assert_eq!(status.power, Some(42.0));
        assert_eq!(status.voltage, Some(231.0));
        assert!(status.position.is_some());
    }

    #[test]
    fn liveness_lost_clears_telemetry() {
        let mut status = UnitStatus::unknown(UnitId(1));
        status.apply(&status_frame(42.0, 1));
        status.apply(&TelemetryEvent::Liveness { alive: false });

        assert!(!status.is_connected);
        assert_eq!(status.power, None);
        assert_eq!(status.current, None);
        assert_eq!(status.voltage, None);
        assert_eq!(status.position, None);
    }

    #[test]
    fn liveness_alive_does_not_invent_telemetry() {
        let mut status = UnitStatus::unknown(UnitId(1));
        status.apply(&TelemetryEvent::Liveness { alive: true });

        assert!(status.is_connected);
        assert_eq!(status.power, None);
    }

    #[test]
    fn zero_power_is_a_real_reading_not_unknown() {
        let mut status = UnitStatus::unknown(UnitId(1));
        status.apply(&status_frame(0.0, 0));

        assert!(status.is_connected);
        assert_eq!(status.power, Some(0.0));
        assert!(!status.is_unknown());
    }

    #[test]
    fn last_write_wins_per_unit() {
        let mut status = UnitStatus::unknown(UnitId(1));
        status.apply(&status_frame(10.0, 1));
        status.apply(&status_frame(20.0, 0));

        assert_eq!(status.power, Some(20.0));
        assert!(!status.is_on);
    }
}
