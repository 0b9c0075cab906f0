//! Error types for the gridlight workspace.
//!
//! A single `thiserror` enum covers the whole subsystem. The taxonomy is
//! deliberately small: every failure in the telemetry/command pipeline is one
//! of parse, connect, not-connected, validation, control-plane, or plain I/O.
//! Nothing here is treated as process-fatal; per-channel failures stay on
//! their channel and command failures are surfaced to the caller.

use thiserror::Error;

use crate::status::UnitId;

/// Convenience alias for results using the workspace error type.
pub type Result<T> = std::result::Result<T, GridlightError>;

/// Primary error type for the telemetry and command subsystem.
#[derive(Error, Debug)]
pub enum GridlightError {
    /// A telemetry frame could not be decoded.
    ///
    /// Malformed frames are dropped and logged by the channel task; they are
    /// never fatal and never silently defaulted (zero means "known and off",
    /// which is not the same thing as "unknown").
    #[error("malformed telemetry frame: {0}")]
    Parse(String),

    /// A channel handshake failed or timed out.
    ///
    /// Triggers backoff on that unit's channel only; other channels are
    /// unaffected.
    #[error("channel handshake failed: {0}")]
    Connect(String),

    /// A command was issued to a unit that is not connected.
    ///
    /// Rejected locally before any network call so the display state cannot
    /// desynchronize from a dark unit.
    #[error("unit {0} is not connected")]
    NotConnected(UnitId),

    /// A schedule payload failed range validation.
    ///
    /// Rejected before any network call.
    #[error("invalid command payload: {0}")]
    Validation(String),

    /// The control plane rejected or failed a command call.
    ///
    /// Surfaced to the caller as-is. There is no automatic retry and no
    /// rollback of optimistic registry state; the next authoritative frame
    /// corrects the display either way.
    #[error("control-plane request failed: {0}")]
    ControlPlane(String),

    /// Configuration could not be loaded or failed semantic validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Standard I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
