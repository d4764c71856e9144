// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Read-only projections of the network state for visualization and API
//! clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cable::{self, CableRoute};
use crate::v2g::{V2gDispatcher, Vehicle};
use crate::{Error, GeoPoint, NodeKind, TierCounts, Topology};

/// The state of a single node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeState {
    pub id: u64,
    pub kind: NodeKind,
    pub tier: u8,
    pub label: String,
    pub parent_id: Option<u64>,
    pub position: GeoPoint,
    pub load_kw: f64,
    pub energized: bool,
    pub outage_causes: Vec<u64>,
}

/// A cable from a node to the nodes it supplies.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cable {
    pub from_id: u64,
    pub to_ids: Vec<u64>,
    pub route: CableRoute,
    /// True while the supplying node is energized.
    pub energized: bool,
}

/// Counts over the whole network.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SnapshotSummary {
    pub nodes: TierCounts,
    pub energized: TierCounts,
    pub failed: TierCounts,
    /// Lights that are running on their battery while their supplier is down.
    pub backup_powered_lights: usize,
    pub total_load_kw: f64,
    pub total_load_mw: f64,
    pub vehicles: usize,
    pub grid_connected_vehicles: usize,
    pub v2g_enabled_vehicles: usize,
}

/// The full state of a grid session at one point in time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridSnapshot {
    pub taken_at: DateTime<Utc>,
    pub nodes: Vec<NodeState>,
    pub vehicles: Vec<Vehicle>,
    pub cables: Vec<Cable>,
    pub summary: SnapshotSummary,
}

impl GridSnapshot {
    /// Captures the state of `topology` and `dispatcher`.
    pub fn capture(topology: &Topology, dispatcher: &V2gDispatcher) -> Result<Self, Error> {
        let mut summary = SnapshotSummary {
            total_load_kw: topology.total_load_kw(),
            ..Default::default()
        };
        summary.total_load_mw = summary.total_load_kw / 1000.0;

        let mut nodes = vec![];
        let mut cables = vec![];
        for node in topology.nodes() {
            let kind = node.kind();
            let parent = topology.parent(node.id())?;
            summary.nodes.record(kind);
            if node.is_energized() {
                summary.energized.record(kind);
                if node.has_backup_power() && parent.is_some_and(|p| !p.is_energized()) {
                    summary.backup_powered_lights += 1;
                }
            } else {
                summary.failed.record(kind);
            }

            let (to_ids, to_points): (Vec<u64>, Vec<GeoPoint>) = topology
                .children(node.id())?
                .map(|child| (child.id(), child.position()))
                .unzip();
            if !to_ids.is_empty() {
                cables.push(Cable {
                    from_id: node.id(),
                    to_ids,
                    route: cable::route(node.position(), &to_points),
                    energized: node.is_energized(),
                });
            }

            nodes.push(NodeState {
                id: node.id(),
                kind,
                tier: kind.tier(),
                label: node.label().to_string(),
                parent_id: parent.map(|p| p.id()),
                position: node.position(),
                load_kw: node.load_kw(),
                energized: node.is_energized(),
                outage_causes: node.outage_causes().iter().copied().collect(),
            });
        }

        let vehicles: Vec<Vehicle> = dispatcher.vehicles().cloned().collect();
        summary.vehicles = vehicles.len();
        summary.grid_connected_vehicles = vehicles.iter().filter(|v| v.grid_connected).count();
        summary.v2g_enabled_vehicles = vehicles.iter().filter(|v| v.v2g_enabled).count();

        Ok(Self {
            taken_at: Utc::now(),
            nodes,
            vehicles,
            cables,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_utils::TopologyBuilder;

    #[test]
    fn test_capture() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let sub = builder.substation("Midtown", GeoPoint::new(0.0, 0.0));
        let feeder = builder.feeder(sub, GeoPoint::new(0.0, 1.0));
        let light = builder.light(GeoPoint::new(0.0, 1.1));
        let backup = builder.backup_light(GeoPoint::new(0.1, 1.0));
        let station = builder.ev_station(GeoPoint::new(-0.1, 1.0), 2, 2);
        let mut topology = builder.build()?;
        topology.fail(sub)?;

        let mut dispatcher = V2gDispatcher::default();
        dispatcher.add_vehicle(Vehicle::new(1, 60.0, 40.0, "Midtown").connected())?;

        let snapshot = GridSnapshot::capture(&topology, &dispatcher)?;
        assert_eq!(snapshot.nodes.len(), 5);
        assert_eq!(snapshot.summary.nodes.total(), 5);
        assert_eq!(snapshot.summary.energized.traffic_lights, 1);
        assert_eq!(snapshot.summary.failed.total(), 4);
        assert_eq!(snapshot.summary.backup_powered_lights, 1);
        assert!((snapshot.summary.total_load_kw - 0.3).abs() < 1e-9);
        assert_eq!(snapshot.summary.vehicles, 1);
        assert_eq!(snapshot.summary.grid_connected_vehicles, 1);
        assert_eq!(snapshot.summary.v2g_enabled_vehicles, 0);

        let light_state = &snapshot.nodes[2];
        assert_eq!(light_state.id, light);
        assert_eq!(light_state.parent_id, Some(feeder));
        assert_eq!(light_state.outage_causes, vec![sub]);
        assert!(!light_state.energized);
        assert!(snapshot.nodes[3].energized);

        assert_eq!(snapshot.cables.len(), 2);
        assert_eq!(snapshot.cables[0].from_id, sub);
        assert_eq!(snapshot.cables[0].to_ids, vec![feeder]);
        assert_eq!(snapshot.cables[1].to_ids, vec![light, backup, station]);
        assert!(snapshot.cables.iter().all(|c| !c.energized));
        assert_eq!(snapshot.cables[1].route.branches.len(), 3);

        Ok(())
    }
}
