//! Session-scoped notification stream.
//!
//! One shared WebSocket (not per-unit) delivers operator notifications for
//! display. Its lifecycle is independent of the per-unit telemetry
//! channels: it is spawned at session start, reconnects with the same
//! backoff policy as unit channels, and is shut down at logout. The server
//! sends the full pending list as a JSON array; each entry is fanned out to
//! subscribers individually.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::reconnect::ReconnectConfig;

/// Buffered notifications before slow subscribers start lagging.
const FEED_CAPACITY: usize = 64;

/// Display severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// One operator-facing notification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
}

/// Handle to the session's notification listener task.
pub struct NotificationStream {
    events: broadcast::Sender<Notification>,
    cancel: CancellationToken,
}

impl NotificationStream {
    /// Spawn the listener for `{ws_base}/notifications?token={token}`.
    #[must_use]
    pub fn spawn(ws_base: &str, token: &str, reconnect: ReconnectConfig) -> Self {
        let url = format!(
            "{}/notifications?token={token}",
            ws_base.trim_end_matches('/')
        );
        let (events, _) = broadcast::channel(FEED_CAPACITY);
        let cancel = CancellationToken::new();
        tokio::spawn(run_listener(url, events.clone(), reconnect, cancel.clone()));
        Self { events, cancel }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Stop listening (session end). Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn run_listener(
    url: String,
    events: broadcast::Sender<Notification>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let handshake = tokio::select! {
            result = connect_async(url.as_str()) => result,
            () = cancel.cancelled() => break,
        };

        match handshake {
            Ok((mut stream, _response)) => {
                attempt = 0;
                debug!("notification channel open");
                loop {
                    let message = tokio::select! {
                        message = stream.next() => message,
                        () = cancel.cancelled() => {
                            let _ = stream.close(None).await;
                            return;
                        }
                    };
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<Vec<Notification>>(&text) {
                                Ok(batch) => {
                                    for notification in batch {
                                        let _ = events.send(notification);
                                    }
                                }
                                Err(error) => {
                                    warn!(%error, "dropping malformed notification payload");
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            warn!(%error, "notification channel error");
                            break;
                        }
                    }
                }
            }
            Err(error) => {
                warn!(%error, "notification channel handshake failed");
            }
        }

        attempt += 1;
        if !reconnect.should_retry(attempt) {
            warn!(attempts = attempt, "notification channel gave up");
            break;
        }
        tokio::select! {
            () = tokio::time::sleep(reconnect.delay_for_attempt(attempt)) => {}
            () = cancel.cancelled() => break,
        }
    }
    debug!("notification listener finished");
}
