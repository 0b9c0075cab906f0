//! Core types for the gridlight fleet telemetry subsystem.
//!
//! This crate holds everything that is pure data and pure logic: the
//! telemetry frame parser, the per-unit status model, the cluster roster
//! model, the command model, and the error taxonomy. It performs no I/O and
//! has no async surface, which keeps the runtime layer (`gridlight-fleet`)
//! free to choose how events are delivered.
//!
//! ## Key Types
//!
//! - [`TelemetryEvent`]: decoded form of one inbound frame (status or liveness)
//! - [`UnitStatus`]: last-known state of a single unit, with the
//!   "disconnected means no stale telemetry" invariant enforced in one place
//! - [`Cluster`] / [`UnitRef`]: the externally supplied roster
//! - [`CommandBody`]: wire form of a control-plane command
//! - [`GridlightError`]: error taxonomy shared by every crate in the workspace

pub mod command;
pub mod error;
pub mod frame;
pub mod roster;
pub mod status;

pub use command::{Command, CommandBody, CommandKind, SchedulePayload};
pub use error::{GridlightError, Result};
pub use frame::{parse_frame, StatusFrame, TelemetryEvent};
pub use roster::{roster_unit_ids, Cluster, UnitRef};
pub use status::{Position, UnitId, UnitStatus};
