//! Command model.
//!
//! Commands are fire-and-forget from the core's perspective: the control
//! plane is the system of record for success, the registry only gets an
//! optimistic nudge. Validation happens here, locally, before any network
//! call is attempted.

use serde::{Deserialize, Serialize};

use crate::error::{GridlightError, Result};
use crate::status::UnitId;

/// On/off schedule for a unit, each field range-checked before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePayload {
    pub hour_on: u8,
    pub minute_on: u8,
    pub hour_off: u8,
    pub minute_off: u8,
}

impl SchedulePayload {
    /// Range-check every field (hours 0–23, minutes 0–59).
    ///
    /// # Errors
    ///
    /// Returns [`GridlightError::Validation`] naming the first offending
    /// field. An invalid payload never reaches the network.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("hour_on", self.hour_on, 23),
            ("minute_on", self.minute_on, 59),
            ("hour_off", self.hour_off, 23),
            ("minute_off", self.minute_off, 59),
        ];
        for (field, value, max) in checks {
            if value > max {
                return Err(GridlightError::Validation(format!(
                    "{field} = {value} is out of range 0..={max}"
                )));
            }
        }
        Ok(())
    }
}

/// What a command asks a unit to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Flip the relay.
    Toggle,
    /// Program the on/off schedule.
    Schedule(SchedulePayload),
}

/// A command addressed to one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub unit_id: UnitId,
    pub kind: CommandKind,
}

/// Wire form of a control-plane command call: `{"type": ..., "payload": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum CommandBody {
    Toggle { toggle: u8 },
    Schedule(SchedulePayload),
}

impl CommandBody {
    /// Toggle body carrying the desired relay state.
    #[must_use]
    pub fn toggle(on: bool) -> Self {
        Self::Toggle {
            toggle: u8::from(on),
        }
    }
}
