//! Per-unit telemetry channel task.
//!
//! One task owns one unit's WebSocket for its whole lifecycle and is the
//! only writer for that unit's registry key. The lifecycle is an explicit
//! state machine, published through a `tokio::sync::watch` so the manager
//! (and tests) can observe transitions without touching task internals:
//!
//! ```text
//! Idle ──open──> Connecting ──handshake ok──> Open
//!                    ▲                          │
//!                    │                 error / remote close
//!                    │                          ▼
//!                    └───delay expired─────  Backoff
//!
//! any state ──cancel / retry ceiling──> Closed
//! ```
//!
//! Malformed frames are dropped and logged, never fatal. A transport error
//! or remote close marks the unit disconnected in the registry (same path
//! as an `alive: false` liveness frame) so stale telemetry can never be
//! displayed while the channel is down.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gridlight_core::{parse_frame, GridlightError, Result, UnitId};

use crate::reconnect::ReconnectConfig;
use crate::registry::StatusRegistry;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default bound on how long a handshake attempt may take.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle state of one unit's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Channel exists but no connection attempt has started yet.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Frames are flowing.
    Open,
    /// Waiting out the delay before reconnect attempt `attempt`.
    Backoff { attempt: u32 },
    /// Torn down, or parked after the retry ceiling; no further retries.
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Backoff { .. } => "backoff",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Per-channel tuning shared by every unit in a session.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub handshake_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Body of one channel task. Runs until cancelled or the retry ceiling is
/// reached, then publishes `Closed` and returns.
pub(crate) async fn run_channel(
    unit_id: UnitId,
    url: String,
    config: ChannelConfig,
    registry: StatusRegistry,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = state_tx.send(ConnectionState::Connecting);
        let handshake = tokio::select! {
            result = connect(&url, config.handshake_timeout) => result,
            () = cancel.cancelled() => break,
        };

        match handshake {
            Ok(stream) => {
                attempt = 0;
                let _ = state_tx.send(ConnectionState::Open);
                info!(unit = %unit_id, "telemetry channel open");

                read_frames(unit_id, stream, &registry, &cancel).await;
                if cancel.is_cancelled() {
                    break;
                }
                // The device is dark until it proves otherwise.
                registry.mark_disconnected(unit_id);
            }
            Err(error) => {
                warn!(unit = %unit_id, %error, "handshake failed");
            }
        }

        attempt += 1;
        if !config.reconnect.should_retry(attempt) {
            warn!(
                unit = %unit_id,
                attempts = attempt,
                "retry ceiling reached, parking channel until roster refresh"
            );
            break;
        }

        let delay = config.reconnect.delay_for_attempt(attempt);
        let _ = state_tx.send(ConnectionState::Backoff { attempt });
        debug!(
            unit = %unit_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "backing off before reconnect"
        );
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = cancel.cancelled() => break,
        }
    }

    let _ = state_tx.send(ConnectionState::Closed);
    debug!(unit = %unit_id, "channel task finished");
}

/// One bounded handshake attempt.
async fn connect(url: &str, handshake_timeout: Duration) -> Result<WsStream> {
    match timeout(handshake_timeout, connect_async(url)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(error)) => Err(GridlightError::Connect(error.to_string())),
        Err(_elapsed) => Err(GridlightError::Connect(format!(
            "handshake timed out after {handshake_timeout:?}"
        ))),
    }
}

/// Pump inbound frames into the registry until the socket dies or the
/// channel is cancelled.
async fn read_frames(
    unit_id: UnitId,
    mut stream: WsStream,
    registry: &StatusRegistry,
    cancel: &CancellationToken,
) {
    loop {
        let message = tokio::select! {
            message = stream.next() => message,
            () = cancel.cancelled() => {
                // Best-effort goodbye; the remote teardown is fire-and-forget.
                let _ = stream.close(None).await;
                return;
            }
        };

        match message {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(event) => registry.apply_event(unit_id, &event),
                Err(error) => {
                    warn!(unit = %unit_id, %error, "dropping malformed frame");
                }
            },
            Some(Ok(Message::Ping(payload))) => {
                let _ = stream.send(Message::Pong(payload)).await;
            }
            Some(Ok(Message::Close(_))) | None => {
                info!(unit = %unit_id, "telemetry channel closed by remote");
                return;
            }
            Some(Ok(_)) => {
                // Binary and pong frames carry nothing for us.
            }
            Some(Err(error)) => {
                warn!(unit = %unit_id, %error, "telemetry channel error");
                return;
            }
        }
    }
}
