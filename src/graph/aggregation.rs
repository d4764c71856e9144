// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Load aggregation.
//!
//! A node's load is always derived from the nodes below it and is never set
//! directly: consumers contribute their nominal draw while energized and
//! nothing otherwise, and every other node carries the sum of its children.

use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::node_kind::KindPredicates;
use crate::{Asset, Topology};

/// The aggregated load of one substation, addressed by the bus it feeds in
/// the power-flow model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BusLoad {
    pub bus_id: String,
    pub substation_id: u64,
    pub load_mw: f64,
}

/// Load aggregation.
impl Topology {
    /// Recomputes the load of every node from the consumers up.
    ///
    /// The result only depends on the current state of the graph, so this
    /// can be called after any mutation.
    pub fn recompute_loads(&mut self) {
        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        for &idx in &indices {
            if self.graph[idx].is_consumer() {
                let load = Self::consumer_load(&self.graph[idx]);
                self.graph[idx].set_load_kw(load);
            }
        }
        // Non-consumer nodes always have a lower index than their children,
        // so walking backwards visits every child before its parent.
        for &idx in indices.iter().rev() {
            if !self.graph[idx].is_consumer() {
                let load = self.children_load(idx);
                self.graph[idx].set_load_kw(load);
            }
        }
    }

    /// Recomputes the load of the node at `idx` and of every node above it.
    pub(crate) fn refresh_loads_from(&mut self, idx: NodeIndex) {
        let load = if self.graph[idx].is_consumer() {
            Self::consumer_load(&self.graph[idx])
        } else {
            self.children_load(idx)
        };
        self.graph[idx].set_load_kw(load);

        let mut current = idx;
        while let Some(parent) = self.parent_index(current) {
            let load = self.children_load(parent);
            self.graph[parent].set_load_kw(load);
            current = parent;
        }
    }

    fn consumer_load(node: &crate::GridNode) -> f64 {
        if node.is_energized() {
            node.nominal_draw_kw()
        } else {
            0.0
        }
    }

    fn children_load(&self, idx: NodeIndex) -> f64 {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .map(|child| self.graph[child].load_kw())
            .sum()
    }

    /// Returns the sum of all substation loads, in kW.
    pub fn total_load_kw(&self) -> f64 {
        self.substations().map(|n| n.load_kw()).sum()
    }

    /// Returns the load of every substation, in the order the substations
    /// were added.
    pub fn bus_loads(&self) -> Vec<BusLoad> {
        self.substations()
            .filter_map(|n| match n.asset() {
                Asset::Substation(s) => Some(BusLoad {
                    bus_id: s.bus_id(),
                    substation_id: n.id(),
                    load_mw: n.load_mw(),
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::test_utils::TopologyBuilder;
    use crate::{Error, GeoPoint};

    const EPS: f64 = 1e-9;

    #[test]
    fn test_three_feeders_nine_lights() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let sub = builder.substation("Central", GeoPoint::new(0.0, 0.0));
        let feeders = [
            builder.feeder(sub, GeoPoint::new(0.0, 1.0)),
            builder.feeder(sub, GeoPoint::new(1.0, 0.0)),
            builder.feeder(sub, GeoPoint::new(-1.0, 0.0)),
        ];
        for offset in [0.01, 0.02, 0.03] {
            builder.light(GeoPoint::new(0.0, 1.0 + offset));
            builder.light(GeoPoint::new(1.0 + offset, 0.0));
            builder.light(GeoPoint::new(-1.0 - offset, 0.0));
        }
        let mut topology = builder.build()?;
        topology.recompute_loads();

        assert!((topology.node(sub)?.load_kw() - 2.7).abs() < EPS);
        for feeder in feeders {
            assert_eq!(topology.children(feeder)?.count(), 3);
            assert!((topology.node(feeder)?.load_kw() - 0.9).abs() < EPS);
        }

        let bus_loads = topology.bus_loads();
        assert_eq!(bus_loads.len(), 1);
        assert_eq!(bus_loads[0].bus_id, "Central_13.8kV");
        assert!((bus_loads[0].load_mw - 0.0027).abs() < EPS);

        Ok(())
    }

    #[test]
    fn test_conservation() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let north = builder.substation("North", GeoPoint::new(0.0, 0.0));
        let south = builder.substation("South", GeoPoint::new(-5.0, 0.0));
        let t1 = builder.transformer(north, GeoPoint::new(0.0, 0.5));
        builder.feeder(t1, GeoPoint::new(0.0, 1.0));
        builder.feeder(north, GeoPoint::new(1.0, 0.0));
        builder.feeder(south, GeoPoint::new(-5.0, 1.0));
        for i in 0..12 {
            let step = i as f64 * 0.4;
            builder.light(GeoPoint::new(-5.0 + step, 1.0));
        }
        builder.ev_station(GeoPoint::new(1.0, 0.1), 4, 3);
        builder.ev_station(GeoPoint::new(-5.0, 1.2), 2, 5);
        let mut topology = builder.build()?;
        topology.recompute_loads();

        let consumer_total: f64 = topology
            .consumers()
            .filter(|n| n.is_energized())
            .map(|n| n.nominal_draw_kw())
            .sum();
        // 12 lights, 3 + 2 active chargers at 7.2kW.
        assert!((consumer_total - (12.0 * 0.3 + 5.0 * 7.2)).abs() < EPS);
        assert!((topology.total_load_kw() - consumer_total).abs() < EPS);
        topology.validate()?;

        Ok(())
    }

    #[test]
    fn test_recompute_is_idempotent() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let sub = builder.substation("Central", GeoPoint::new(0.0, 0.0));
        builder.feeder(sub, GeoPoint::new(0.0, 1.0));
        builder.light(GeoPoint::new(0.0, 1.1));
        builder.ev_station(GeoPoint::new(0.0, 0.9), 2, 1);
        let mut topology = builder.build()?;

        let before = topology.total_load_kw();
        topology.recompute_loads();
        topology.recompute_loads();
        assert!((topology.total_load_kw() - before).abs() < EPS);
        assert!((before - 7.5).abs() < EPS);

        Ok(())
    }
}
