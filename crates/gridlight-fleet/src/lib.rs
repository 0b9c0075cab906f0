//! Runtime layer of the gridlight telemetry and command subsystem.
//!
//! One tokio task per unit owns that unit's WebSocket channel and is the
//! sole writer for that unit's key in the shared [`StatusRegistry`]. The
//! [`FleetSupervisor`] reconciles the set of open channels against the
//! externally supplied roster, and the [`CommandDispatcher`] pushes
//! toggle/schedule commands through the control plane while optimistically
//! nudging the registry.
//!
//! ```text
//! FleetSupervisor ──> ConnectionManager ──> channel task (xN)
//!                                               │ parse_frame
//!                                               ▼
//!                     CommandDispatcher ──> StatusRegistry <── UI reads
//! ```
//!
//! Failure is per-channel by construction: a unit's handshake timeouts,
//! malformed frames and backoff cycles never touch another unit's channel
//! or the registry as a whole.

pub mod channel;
pub mod config;
pub mod control;
pub mod dispatcher;
pub mod manager;
pub mod notify;
pub mod reconnect;
pub mod registry;
pub mod supervisor;

pub use channel::{ChannelConfig, ConnectionState};
pub use config::FleetConfig;
pub use control::RestControlPlane;
pub use dispatcher::{CommandDispatcher, ControlPlane};
pub use manager::ConnectionManager;
pub use notify::{Notification, NotificationStream, Severity};
pub use reconnect::ReconnectConfig;
pub use registry::StatusRegistry;
pub use supervisor::{FleetSupervisor, RosterDelta};
