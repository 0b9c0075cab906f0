//! Shared status registry.
//!
//! The single source of truth mapping unit id to last-known status. Writers
//! are the per-unit channel tasks (exactly one writer per key by
//! construction) plus the dispatcher's optimistic nudge; readers are the UI
//! layer. A `parking_lot::RwLock` around the map is sufficient: individual
//! updates are tiny, access is fast, and no async context is required to
//! read (no lock poisoning either, unlike `std::sync::RwLock`).
//!
//! Readers that want push-style refresh can [`StatusRegistry::subscribe`] to
//! the change feed, which carries the id of each unit whose entry changed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::trace;

use gridlight_core::{TelemetryEvent, UnitId, UnitStatus};

/// Buffered change notifications before slow subscribers start lagging.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Concurrent map of unit id to last-known status.
///
/// Cheap to clone; clones share the same underlying map and change feed.
#[derive(Clone)]
pub struct StatusRegistry {
    inner: Arc<RwLock<HashMap<UnitId, UnitStatus>>>,
    changes: broadcast::Sender<UnitId>,
}

impl StatusRegistry {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Merge one decoded telemetry event into the unit's entry.
    ///
    /// Entries are created lazily on first contact. Per-unit ordering is
    /// guaranteed by the single channel per unit, so this is a plain
    /// last-write-wins overwrite.
    pub fn apply_event(&self, unit_id: UnitId, event: &TelemetryEvent) {
        {
            let mut map = self.inner.write();
            map.entry(unit_id)
                .or_insert_with(|| UnitStatus::unknown(unit_id))
                .apply(event);
        }
        trace!(unit = %unit_id, "status updated");
        // Nobody listening is fine.
        let _ = self.changes.send(unit_id);
    }

    /// Record connectivity loss for a unit, clearing its telemetry.
    ///
    /// Only touches existing entries: a unit that never reported stays in
    /// the "unknown" state rather than acquiring a synthetic disconnected
    /// entry.
    pub fn mark_disconnected(&self, unit_id: UnitId) {
        let changed = {
            let mut map = self.inner.write();
            match map.get_mut(&unit_id) {
                Some(status) => {
                    status.apply(&TelemetryEvent::Liveness { alive: false });
                    true
                }
                None => false,
            }
        };
        if changed {
            let _ = self.changes.send(unit_id);
        }
    }

    /// Flip a unit's `is_on` ahead of control-plane confirmation.
    ///
    /// Purely for perceived latency; the next authoritative frame from the
    /// unit's channel overwrites this guess either way. Creates the entry if
    /// the unit has never reported (optimistic command on a fresh session).
    pub fn apply_optimistic_toggle(&self, unit_id: UnitId, is_on: bool) {
        {
            let mut map = self.inner.write();
            let status = map
                .entry(unit_id)
                .or_insert_with(|| UnitStatus::unknown(unit_id));
            status.is_on = is_on;
            status.last_updated = std::time::Instant::now();
        }
        let _ = self.changes.send(unit_id);
    }

    /// Current snapshot for one unit, or `None` if it has never been seen.
    #[must_use]
    pub fn read(&self, unit_id: UnitId) -> Option<UnitStatus> {
        self.inner.read().get(&unit_id).copied()
    }

    /// Consistent point-in-time copy of the whole table.
    ///
    /// The copy is taken under the read lock, so concurrent writers cannot
    /// tear it; mutations after the call do not show up in the returned map.
    #[must_use]
    pub fn snapshot_all(&self) -> HashMap<UnitId, UnitStatus> {
        self.inner.read().clone()
    }

    /// Drop one unit's entry (roster removal).
    pub fn remove(&self, unit_id: UnitId) {
        self.inner.write().remove(&unit_id);
        let _ = self.changes.send(unit_id);
    }

    /// Drop every entry (session teardown).
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Subscribe to per-unit change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<UnitId> {
        self.changes.subscribe()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::new()
    }
}
