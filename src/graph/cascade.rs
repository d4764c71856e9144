// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Cascading failure and restoration.
//!
//! Every node keeps the set of failed nodes that currently keep it
//! de-energized.  Failing a node adds the node's id to its own set and to the
//! sets of all its descendants; restoring it removes the id again.  A node is
//! energized iff its set is empty, so independent failures compose: a feeder
//! that was failed on its own stays down when its substation comes back.
//!
//! Traffic lights with battery backup never inherit a failure from above,
//! but can still be failed directly.

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::info;

use crate::node_kind::KindPredicates;
use crate::{Error, NodeKind, Topology};

/// Number of nodes per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub substations: usize,
    pub distribution_nodes: usize,
    pub traffic_lights: usize,
    pub ev_stations: usize,
}

impl TierCounts {
    pub(crate) fn record(&mut self, kind: NodeKind) {
        match kind {
            NodeKind::Substation => self.substations += 1,
            NodeKind::Distribution(_) => self.distribution_nodes += 1,
            NodeKind::TrafficLight => self.traffic_lights += 1,
            NodeKind::EvStation => self.ev_stations += 1,
        }
    }

    /// Returns the total over all kinds.
    pub fn total(&self) -> usize {
        self.substations + self.distribution_nodes + self.traffic_lights + self.ev_stations
    }
}

/// A change in the power state of a traffic signal, for the traffic
/// simulation.  Unpowered signals are expected to go to all-red flashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SignalChange {
    pub signal_id: u64,
    pub powered: bool,
}

/// The impact of failing a node.
///
/// Counts only include nodes that lost power because of this failure; nodes
/// that were already down are not counted again.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImpactReport {
    pub node_id: u64,
    pub affected: TierCounts,
    /// Lights below the failed node that kept running on battery backup.
    pub backup_powered_lights: usize,
    pub load_before_kw: f64,
    pub load_after_kw: f64,
    pub load_lost_kw: f64,
    pub load_lost_mw: f64,
    /// Labels of the first affected consumers, for display.
    pub affected_sample: Vec<String>,
    pub signal_changes: Vec<SignalChange>,
}

impl ImpactReport {
    fn empty(node_id: u64, load_kw: f64) -> Self {
        Self {
            node_id,
            affected: TierCounts::default(),
            backup_powered_lights: 0,
            load_before_kw: load_kw,
            load_after_kw: load_kw,
            load_lost_kw: 0.0,
            load_lost_mw: 0.0,
            affected_sample: vec![],
            signal_changes: vec![],
        }
    }

    /// Returns the number of traffic lights that lost power.
    pub fn affected_lights(&self) -> usize {
        self.affected.traffic_lights
    }

    /// Returns true if the failure didn't change anything.
    pub fn is_noop(&self) -> bool {
        self.affected.total() == 0
    }
}

/// The outcome of restoring a node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RestoreReport {
    pub node_id: u64,
    pub restored: TierCounts,
    /// Nodes this restoration released that are still held down by another
    /// failure.
    pub still_failed: Vec<u64>,
    pub load_before_kw: f64,
    pub load_after_kw: f64,
    pub load_restored_kw: f64,
    pub signal_changes: Vec<SignalChange>,
}

impl RestoreReport {
    fn empty(node_id: u64, load_kw: f64) -> Self {
        Self {
            node_id,
            restored: TierCounts::default(),
            still_failed: vec![],
            load_before_kw: load_kw,
            load_after_kw: load_kw,
            load_restored_kw: 0.0,
            signal_changes: vec![],
        }
    }

    /// Returns true if the restoration didn't change anything.
    pub fn is_noop(&self) -> bool {
        self.restored.total() == 0 && self.still_failed.is_empty()
    }
}

/// Failure and restoration.
impl Topology {
    /// Fails the node with the given `id`, and every node it supplies.
    ///
    /// Failing a node that was already failed directly is a no-op, and
    /// returns a report without impact.
    pub fn fail(&mut self, id: u64) -> Result<ImpactReport, Error> {
        let root = self.index_of(id)?;
        self.recompute_loads();
        let load_before = self.total_load_kw();
        let mut report = ImpactReport::empty(id, load_before);
        if self.graph[root].outage_causes().contains(&id) {
            return Ok(report);
        }

        let sample_limit = self.config.affected_sample_limit;
        for idx in self.cascade_scope(root) {
            let node = &mut self.graph[idx];
            if idx != root && node.has_backup_power() {
                if node.is_energized() {
                    report.backup_powered_lights += 1;
                }
                continue;
            }
            let was_energized = node.is_energized();
            node.outage_causes_mut().insert(id);
            if !was_energized {
                continue;
            }

            report.affected.record(node.kind());
            if node.is_consumer() && report.affected_sample.len() < sample_limit {
                report.affected_sample.push(node.label().to_string());
            }
            if node.is_traffic_light() {
                report.signal_changes.push(SignalChange {
                    signal_id: node.id(),
                    powered: false,
                });
            }
        }

        self.recompute_loads();
        report.load_after_kw = self.total_load_kw();
        report.load_lost_kw = report.load_before_kw - report.load_after_kw;
        report.load_lost_mw = report.load_lost_kw / 1000.0;

        info!(
            node = id,
            affected_lights = report.affected.traffic_lights,
            affected_ev_stations = report.affected.ev_stations,
            affected_distribution_nodes = report.affected.distribution_nodes,
            backup_powered_lights = report.backup_powered_lights,
            load_lost_kw = report.load_lost_kw,
            "Node failed"
        );
        Ok(report)
    }

    /// Restores the node with the given `id`, and every node it supplies,
    /// unless they are also held down by a different failure.
    ///
    /// Restoring a node that wasn't failed directly is a no-op, and returns
    /// a report without impact.
    pub fn restore(&mut self, id: u64) -> Result<RestoreReport, Error> {
        let root = self.index_of(id)?;
        self.recompute_loads();
        let load_before = self.total_load_kw();
        let mut report = RestoreReport::empty(id, load_before);
        if !self.graph[root].outage_causes().contains(&id) {
            return Ok(report);
        }

        for idx in self.cascade_scope(root) {
            let node = &mut self.graph[idx];
            if !node.outage_causes_mut().remove(&id) {
                continue;
            }
            if !node.is_energized() {
                report.still_failed.push(node.id());
                continue;
            }

            report.restored.record(node.kind());
            if node.is_traffic_light() {
                report.signal_changes.push(SignalChange {
                    signal_id: node.id(),
                    powered: true,
                });
            }
        }

        self.recompute_loads();
        report.load_after_kw = self.total_load_kw();
        report.load_restored_kw = report.load_after_kw - report.load_before_kw;

        info!(
            node = id,
            restored_lights = report.restored.traffic_lights,
            restored_ev_stations = report.restored.ev_stations,
            still_failed = report.still_failed.len(),
            load_restored_kw = report.load_restored_kw,
            "Node restored"
        );
        Ok(report)
    }

    /// Returns `root` followed by all its descendants.
    fn cascade_scope(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut scope = vec![root];
        scope.extend(self.descendant_indices(root));
        scope
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::graph::test_utils::TopologyBuilder;
    use crate::{Error, GeoPoint, SignalChange, Topology};

    const EPS: f64 = 1e-9;

    /// One substation, three feeders, three lights per feeder.
    fn nine_light_topology() -> Result<(Topology, u64, Vec<u64>, Vec<u64>), Error> {
        let mut builder = TopologyBuilder::new();
        let sub = builder.substation("Central", GeoPoint::new(0.0, 0.0));
        let feeders = vec![
            builder.feeder(sub, GeoPoint::new(0.0, 1.0)),
            builder.feeder(sub, GeoPoint::new(1.0, 0.0)),
            builder.feeder(sub, GeoPoint::new(-1.0, 0.0)),
        ];
        let mut lights = vec![];
        for offset in [0.01, 0.02, 0.03] {
            lights.push(builder.light(GeoPoint::new(0.0, 1.0 + offset)));
            lights.push(builder.light(GeoPoint::new(1.0 + offset, 0.0)));
            lights.push(builder.light(GeoPoint::new(-1.0 - offset, 0.0)));
        }
        Ok((builder.build()?, sub, feeders, lights))
    }

    fn energized_states(topology: &Topology) -> BTreeMap<u64, bool> {
        topology
            .nodes()
            .map(|n| (n.id(), n.is_energized()))
            .collect()
    }

    #[test]
    fn test_fail_substation() -> Result<(), Error> {
        let (mut topology, sub, feeders, lights) = nine_light_topology()?;

        let report = topology.fail(sub)?;
        assert_eq!(report.affected_lights(), 9);
        assert_eq!(report.affected.substations, 1);
        assert_eq!(report.affected.distribution_nodes, 3);
        assert!((report.load_lost_kw - 2.7).abs() < EPS);
        assert!((report.load_lost_mw - 0.0027).abs() < EPS);
        assert_eq!(report.affected_sample.len(), 9);
        assert_eq!(report.signal_changes.len(), 9);
        assert!(report.signal_changes.iter().all(|c| !c.powered));

        for id in feeders.iter().chain(&lights) {
            assert!(!topology.node(*id)?.is_energized());
        }
        assert_eq!(topology.node(sub)?.load_kw(), 0.0);
        topology.validate()?;

        Ok(())
    }

    #[test]
    fn test_sample_is_bounded() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let sub = builder.substation("Central", GeoPoint::new(0.0, 0.0));
        builder.feeder(sub, GeoPoint::new(0.0, 1.0));
        for i in 0..25 {
            builder.light(GeoPoint::new(i as f64 * 0.01, 1.0));
        }
        let mut topology = builder.build()?;

        let report = topology.fail(sub)?;
        assert_eq!(report.affected_lights(), 25);
        assert_eq!(report.affected_sample.len(), 10);
        assert_eq!(report.affected_sample[0], "Intersection 3");

        Ok(())
    }

    #[test]
    fn test_fail_and_restore_are_idempotent() -> Result<(), Error> {
        let (mut topology, sub, _, _) = nine_light_topology()?;

        let first = topology.fail(sub)?;
        let failed_state = energized_states(&topology);
        let second = topology.fail(sub)?;
        assert!(!first.is_noop());
        assert!(second.is_noop());
        assert_eq!(second.load_lost_kw, 0.0);
        assert!(second.signal_changes.is_empty());
        assert_eq!(energized_states(&topology), failed_state);

        let first = topology.restore(sub)?;
        let restored_state = energized_states(&topology);
        let second = topology.restore(sub)?;
        assert_eq!(first.restored.traffic_lights, 9);
        assert!((first.load_restored_kw - 2.7).abs() < EPS);
        assert!(second.is_noop());
        assert_eq!(energized_states(&topology), restored_state);

        Ok(())
    }

    #[test]
    fn test_round_trip_restores_previous_state() -> Result<(), Error> {
        let (mut topology, sub, _, _) = nine_light_topology()?;
        let before = energized_states(&topology);
        let load_before = topology.total_load_kw();

        topology.fail(sub)?;
        let report = topology.restore(sub)?;
        assert!(report.still_failed.is_empty());
        assert!(report.signal_changes.iter().all(|c| c.powered));
        assert_eq!(energized_states(&topology), before);
        assert!((topology.total_load_kw() - load_before).abs() < EPS);

        Ok(())
    }

    #[test]
    fn test_independent_failures_compose() -> Result<(), Error> {
        let (mut topology, sub, feeders, lights) = nine_light_topology()?;
        let feeder = feeders[0];
        let feeder_lights: Vec<u64> = topology.children(feeder)?.map(|n| n.id()).collect();

        let report = topology.fail(feeder)?;
        assert_eq!(report.affected_lights(), 3);
        assert_eq!(report.affected.distribution_nodes, 1);

        // The feeder and its lights are already down, so they don't count.
        let report = topology.fail(sub)?;
        assert_eq!(report.affected_lights(), 6);
        assert_eq!(report.affected.distribution_nodes, 2);

        let report = topology.restore(sub)?;
        assert_eq!(report.restored.traffic_lights, 6);
        let mut held = vec![feeder];
        held.extend(&feeder_lights);
        held.sort();
        assert_eq!(report.still_failed, held);
        for id in &lights {
            let energized = topology.node(*id)?.is_energized();
            assert_eq!(energized, !feeder_lights.contains(id));
        }

        // Restoring a node that wasn't failed directly changes nothing.
        assert!(topology.restore(feeder_lights[0])?.is_noop());

        let report = topology.restore(feeder)?;
        assert_eq!(report.restored.traffic_lights, 3);
        assert!(topology.nodes().all(|n| n.is_energized()));
        topology.validate()?;

        Ok(())
    }

    #[test]
    fn test_backup_lights_keep_power() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let sub = builder.substation("Central", GeoPoint::new(0.0, 0.0));
        let feeder = builder.feeder(sub, GeoPoint::new(0.0, 1.0));
        let plain = builder.light(GeoPoint::new(0.0, 1.1));
        let backed = builder.backup_light(GeoPoint::new(0.0, 1.2));
        let mut topology = builder.build()?;

        let report = topology.fail(sub)?;
        assert_eq!(report.affected_lights(), 1);
        assert_eq!(report.backup_powered_lights, 1);
        assert_eq!(
            report.signal_changes,
            vec![SignalChange {
                signal_id: plain,
                powered: false
            }]
        );
        assert!(topology.node(backed)?.is_energized());
        assert!(!topology.node(plain)?.is_energized());
        // The backed-up light still draws through its failed feeder.
        assert!((topology.node(feeder)?.load_kw() - 0.3).abs() < EPS);
        assert!((report.load_lost_kw - 0.3).abs() < EPS);

        // A direct failure does turn it off.
        let report = topology.fail(backed)?;
        assert_eq!(report.affected_lights(), 1);
        assert!(!topology.node(backed)?.is_energized());

        topology.restore(sub)?;
        assert!(topology.node(plain)?.is_energized());
        assert!(!topology.node(backed)?.is_energized());

        Ok(())
    }

    #[test]
    fn test_unknown_node() -> Result<(), Error> {
        let (mut topology, _, _, _) = nine_light_topology()?;
        let before = energized_states(&topology);

        assert!(topology
            .fail(404)
            .is_err_and(|e| e == Error::unknown_node("Node with id 404 not found.")));
        assert!(topology
            .restore(404)
            .is_err_and(|e| e == Error::unknown_node("Node with id 404 not found.")));
        assert_eq!(energized_states(&topology), before);

        Ok(())
    }
}
