//! Connection manager: one logical channel per unit id.
//!
//! Owns the map of live channel handles and the state machine driving each
//! one (the per-unit task in [`crate::channel`]). `ConnectionState` is never
//! mutated outside the channel task; the manager only observes it through
//! the task's watch.

use std::collections::{HashMap, HashSet};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use gridlight_core::UnitId;

use crate::channel::{run_channel, ChannelConfig, ConnectionState};
use crate::registry::StatusRegistry;

struct ChannelHandle {
    /// Monotonic open counter, so callers can tell a surviving channel from
    /// a closed-and-reopened one.
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    state_rx: watch::Receiver<ConnectionState>,
}

/// Owns exactly one logical telemetry channel per unit id.
pub struct ConnectionManager {
    ws_base: String,
    config: ChannelConfig,
    registry: StatusRegistry,
    channels: HashMap<UnitId, ChannelHandle>,
    next_generation: u64,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(
        ws_base: impl Into<String>,
        config: ChannelConfig,
        registry: StatusRegistry,
    ) -> Self {
        Self {
            ws_base: ws_base.into(),
            config,
            registry,
            channels: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Open a channel for a unit. Idempotent: calling this while a channel
    /// already exists for the id is a no-op, so repeated roster fetches can
    /// never spawn duplicate sockets for the same unit.
    pub fn open(&mut self, unit_id: UnitId) {
        if self.channels.contains_key(&unit_id) {
            debug!(unit = %unit_id, "open ignored, channel already exists");
            return;
        }

        let url = unit_status_url(&self.ws_base, unit_id);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_channel(
            unit_id,
            url,
            self.config.clone(),
            self.registry.clone(),
            state_tx,
            cancel.clone(),
        ));

        self.next_generation += 1;
        self.channels.insert(
            unit_id,
            ChannelHandle {
                generation: self.next_generation,
                cancel,
                task,
                state_rx,
            },
        );
        info!(unit = %unit_id, "channel opened");
    }

    /// Close a unit's channel, cancelling any pending backoff timer or
    /// in-flight handshake. The handle is released immediately; the remote
    /// teardown is fire-and-forget.
    pub fn close(&mut self, unit_id: UnitId) {
        if let Some(handle) = self.channels.remove(&unit_id) {
            handle.cancel.cancel();
            info!(unit = %unit_id, "channel closed");
        }
    }

    /// Close every channel (session teardown).
    pub fn close_all(&mut self) {
        let count = self.channels.len();
        for (_, handle) in self.channels.drain() {
            handle.cancel.cancel();
        }
        if count > 0 {
            info!(channels = count, "all channels closed");
        }
    }

    /// Current lifecycle state of a unit's channel, if one exists.
    #[must_use]
    pub fn state(&self, unit_id: UnitId) -> Option<ConnectionState> {
        self.channels.get(&unit_id).map(|h| *h.state_rx.borrow())
    }

    /// Open counter for a unit's channel; changes only when the channel is
    /// actually rebuilt, so an untouched channel keeps its generation.
    #[must_use]
    pub fn generation(&self, unit_id: UnitId) -> Option<u64> {
        self.channels.get(&unit_id).map(|h| h.generation)
    }

    /// True when a unit's channel task has run out of retries and stopped.
    /// A parked channel keeps its handle (and `Closed` state) until a roster
    /// refresh or explicit close/open cycle revives it.
    #[must_use]
    pub fn is_parked(&self, unit_id: UnitId) -> bool {
        self.channels
            .get(&unit_id)
            .is_some_and(|h| h.task.is_finished())
    }

    #[must_use]
    pub fn is_open(&self, unit_id: UnitId) -> bool {
        self.channels.contains_key(&unit_id)
    }

    /// Ids of every unit that currently has a channel handle.
    #[must_use]
    pub fn open_units(&self) -> HashSet<UnitId> {
        self.channels.keys().copied().collect()
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.channels.len()
    }
}

fn unit_status_url(base: &str, unit_id: UnitId) -> String {
    format!("{}/unit/{}/status", base.trim_end_matches('/'), unit_id)
}
