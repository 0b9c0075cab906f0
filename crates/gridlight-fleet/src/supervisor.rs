//! Fleet supervisor: reconciles open channels with the roster.
//!
//! The roster is externally supplied and authoritative. Reconciliation is a
//! delta, not a teardown/rebuild: units present in both the roster and the
//! open set keep their channel (and socket) untouched, which avoids visible
//! flicker and reconnect storms on every roster refresh.

use tracing::info;

use gridlight_core::{roster_unit_ids, Cluster, UnitId};

use crate::manager::ConnectionManager;
use crate::registry::StatusRegistry;

/// Channels touched by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDelta {
    pub opened: Vec<UnitId>,
    pub closed: Vec<UnitId>,
}

/// Matches the set of open channels to the externally supplied roster and
/// tears everything down at session end.
pub struct FleetSupervisor {
    manager: ConnectionManager,
    registry: StatusRegistry,
}

impl FleetSupervisor {
    #[must_use]
    pub fn new(manager: ConnectionManager, registry: StatusRegistry) -> Self {
        Self { manager, registry }
    }

    /// Reconcile channels against a roster fetch.
    ///
    /// Opens `roster − open`, closes `open − roster`, and revives channels
    /// that parked after hitting their retry ceiling (a roster refresh is
    /// the declared way back for an unreachable unit). Statuses of removed
    /// units are dropped along with their channels.
    pub fn sync_roster(&mut self, clusters: &[Cluster]) -> RosterDelta {
        let desired = roster_unit_ids(clusters);
        let open = self.manager.open_units();
        let mut delta = RosterDelta::default();

        for unit_id in open.difference(&desired) {
            self.manager.close(*unit_id);
            self.registry.remove(*unit_id);
            delta.closed.push(*unit_id);
        }

        for unit_id in desired.difference(&open) {
            self.manager.open(*unit_id);
            delta.opened.push(*unit_id);
        }

        for unit_id in desired.intersection(&open) {
            if self.manager.is_parked(*unit_id) {
                self.manager.close(*unit_id);
                self.manager.open(*unit_id);
                delta.opened.push(*unit_id);
            }
        }

        delta.opened.sort_unstable();
        delta.closed.sort_unstable();
        info!(
            opened = delta.opened.len(),
            closed = delta.closed.len(),
            channels = self.manager.open_count(),
            "roster reconciled"
        );
        delta
    }

    /// Session end: close every channel and clear the status table.
    pub fn shutdown(&mut self) {
        self.manager.close_all();
        self.registry.clear();
        info!("fleet supervisor shut down");
    }

    #[must_use]
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    #[must_use]
    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }
}
