// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating the invariants of a [`Topology`].

use petgraph::graph::NodeIndex;

use crate::node_kind::KindPredicates;
use crate::{Error, GridNode, Topology};

const LOAD_TOLERANCE_KW: f64 = 1e-6;

/// Validation.
impl Topology {
    /// Checks that the topology is consistent:
    ///
    /// - Substations have no parent, every other node has exactly one.
    /// - Parents are on a lower tier, except for chained distribution nodes.
    /// - Every node's load matches the sum of its children's loads, and every
    ///   consumer's load matches its draw while energized.
    /// - Every node shares the outages of its parent, unless it has battery
    ///   backup, and has no other outages than those and its own.
    ///
    /// This is cheap enough to run after every mutation in tests.
    pub fn validate(&self) -> Result<(), Error> {
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            self.validate_parent(idx, node)?;
            self.validate_load(idx, node)?;
        }
        Ok(())
    }

    fn validate_parent(&self, idx: NodeIndex, node: &GridNode) -> Result<(), Error> {
        let mut parents = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Incoming);
        let parent = parents.next();
        if parents.next().is_some() {
            return Err(Error::internal(format!(
                "{}:{} has more than one parent.",
                node.kind(),
                node.id()
            )));
        }

        let Some(parent) = parent.map(|p| &self.graph[p]) else {
            if node.is_substation() {
                return Ok(());
            }
            return Err(Error::internal(format!(
                "{}:{} has no parent.",
                node.kind(),
                node.id()
            )));
        };

        let chained = parent.is_distribution() && node.is_distribution();
        if node.is_substation() || (!chained && parent.kind().tier() >= node.kind().tier()) {
            return Err(Error::internal(format!(
                "{}:{} can't be supplied by {}:{}.",
                node.kind(),
                node.id(),
                parent.kind(),
                parent.id()
            )));
        }

        let inherited =
            node.has_backup_power() || parent.outage_causes().is_subset(node.outage_causes());
        let foreign = node
            .outage_causes()
            .iter()
            .any(|c| *c != node.id() && !parent.outage_causes().contains(c));
        if !inherited || foreign {
            return Err(Error::internal(format!(
                "{}:{} has outages {:?}, but its parent {}:{} has {:?}.",
                node.kind(),
                node.id(),
                node.outage_causes(),
                parent.kind(),
                parent.id(),
                parent.outage_causes()
            )));
        }
        Ok(())
    }

    fn validate_load(&self, idx: NodeIndex, node: &GridNode) -> Result<(), Error> {
        let expected = if node.is_consumer() {
            if node.is_energized() {
                node.nominal_draw_kw()
            } else {
                0.0
            }
        } else {
            self.graph
                .neighbors_directed(idx, petgraph::Direction::Outgoing)
                .map(|c| self.graph[c].load_kw())
                .sum()
        };
        if (node.load_kw() - expected).abs() > LOAD_TOLERANCE_KW {
            return Err(Error::internal(format!(
                "{}:{} has a load of {} kW, expected {} kW.",
                node.kind(),
                node.id(),
                node.load_kw(),
                expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::test_utils::TopologyBuilder;
    use crate::{Error, GeoPoint};

    #[test]
    fn test_built_topologies_are_valid() -> Result<(), Error> {
        let mut builder = TopologyBuilder::new();
        let north = builder.substation("North", GeoPoint::new(0.0, 0.0));
        let t1 = builder.transformer(north, GeoPoint::new(0.0, 0.5));
        let f1 = builder.feeder(t1, GeoPoint::new(0.0, 1.0));
        builder.feeder(north, GeoPoint::new(1.0, 0.0));
        builder.light(GeoPoint::new(0.0, 1.1));
        builder.backup_light(GeoPoint::new(1.0, 0.1));
        builder.ev_station(GeoPoint::new(0.1, 1.0), 3, 2);
        let mut topology = builder.build()?;
        topology.validate()?;

        topology.fail(t1)?;
        topology.validate()?;
        topology.fail(f1)?;
        topology.fail(north)?;
        topology.validate()?;
        topology.restore(t1)?;
        topology.validate()?;
        topology.restore(north)?;
        topology.restore(f1)?;
        topology.validate()?;

        Ok(())
    }
}
