//! Cluster roster model.
//!
//! The roster is supplied by the control plane (one fetch per session or
//! explicit refresh) and is the authoritative list of which units must have
//! a live telemetry channel. It is immutable input to the fleet supervisor;
//! nothing in this subsystem ever mutates it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::status::UnitId;

/// Reference to a single unit as it appears in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub mac: String,
}

/// A named group of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub units: Vec<UnitRef>,
}

/// Collect the set of unit ids that should have a live channel.
///
/// A unit listed in more than one cluster still gets exactly one channel.
#[must_use]
pub fn roster_unit_ids(clusters: &[Cluster]) -> HashSet<UnitId> {
    clusters
        .iter()
        .flat_map(|cluster| cluster.units.iter().map(|unit| unit.id))
        .collect()
}
