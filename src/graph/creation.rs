// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for adding substations and distribution nodes to a [`Topology`].

use petgraph::graph::DiGraph;
use tracing::debug;

use crate::entities::ensure_non_negative;
use crate::node_kind::KindPredicates;
use crate::{Asset, CascadeConfig, DistributionNode, Error, GeoPoint, GridNode, Substation};

use super::{NodeIndexMap, Topology};

/// `Topology` construction.
impl Topology {
    /// Creates a new, empty [`Topology`].
    pub fn new(config: CascadeConfig) -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: NodeIndexMap::new(),
            config,
        }
    }

    /// Returns the cascade options of the topology.
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Adds a substation to the topology.
    ///
    /// Returns an error if a node with the same id already exists.
    pub fn add_substation(
        &mut self,
        id: u64,
        position: GeoPoint,
        substation: Substation,
    ) -> Result<(), Error> {
        self.ensure_new_id(id)?;
        ensure_non_negative("capacity_mva", substation.capacity_mva, &substation.name)?;

        debug!(id, name = %substation.name, "Adding substation");
        let idx = self
            .graph
            .add_node(GridNode::new(id, position, Asset::Substation(substation)));
        self.node_indices.insert(id, idx);
        Ok(())
    }

    /// Adds a distribution node, supplied by the substation or distribution
    /// node with id `parent_id`.
    ///
    /// A new node joins the outages of its parent, so a feeder added below a
    /// failed substation starts out failed as well.
    pub fn add_distribution_node(
        &mut self,
        id: u64,
        parent_id: u64,
        position: GeoPoint,
        node: DistributionNode,
    ) -> Result<(), Error> {
        self.ensure_new_id(id)?;
        ensure_non_negative("capacity_kva", node.capacity_kva, &node.name)?;
        let parent_idx = self.index_of(parent_id)?;
        let parent = &self.graph[parent_idx];
        if parent.is_consumer() {
            return Err(Error::invalid_assignment(format!(
                "Node {id} can't be supplied by {}:{parent_id}.",
                parent.kind()
            )));
        }
        let inherited = parent.outage_causes().clone();

        debug!(id, parent_id, name = %node.name, kind = %node.kind, "Adding distribution node");
        let mut grid_node = GridNode::new(id, position, Asset::Distribution(node));
        *grid_node.outage_causes_mut() = inherited;
        let idx = self.graph.add_node(grid_node);
        self.node_indices.insert(id, idx);
        self.graph.add_edge(parent_idx, idx, ());
        Ok(())
    }

    pub(super) fn ensure_new_id(&self, id: u64) -> Result<(), Error> {
        if self.node_indices.contains_key(&id) {
            return Err(Error::duplicate_id(format!(
                "Duplicate node ID found: {id}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, NodeKind};

    #[test]
    fn test_node_validation() -> Result<(), Error> {
        let mut topology = Topology::default();
        topology.add_substation(
            1,
            GeoPoint::new(0.0, 0.0),
            Substation::new("North", 138.0, 13.8, 50.0),
        )?;

        assert!(topology
            .add_substation(
                1,
                GeoPoint::new(1.0, 0.0),
                Substation::new("South", 138.0, 13.8, 50.0)
            )
            .is_err_and(|e| e == Error::duplicate_id("Duplicate node ID found: 1")));

        assert!(topology
            .add_distribution_node(
                2,
                9,
                GeoPoint::new(0.1, 0.0),
                DistributionNode::feeder("F-2", 500.0)
            )
            .is_err_and(|e| e == Error::unknown_node("Node with id 9 not found.")));

        assert!(topology
            .add_distribution_node(
                2,
                1,
                GeoPoint::new(0.1, 0.0),
                DistributionNode::feeder("F-2", -5.0)
            )
            .is_err_and(|e| e.kind() == ErrorKind::InvalidEntity));

        // Nothing was added by the failed calls.
        assert_eq!(topology.nodes().count(), 1);

        topology.add_distribution_node(
            2,
            1,
            GeoPoint::new(0.1, 0.0),
            DistributionNode::transformer("T-2", 1500.0),
        )?;
        topology.add_distribution_node(
            3,
            2,
            GeoPoint::new(0.1, 0.1),
            DistributionNode::feeder("F-3", 500.0),
        )?;
        assert!(topology
            .add_distribution_node(
                3,
                1,
                GeoPoint::new(0.1, 0.0),
                DistributionNode::feeder("F-3b", 500.0)
            )
            .is_err_and(|e| e.kind() == ErrorKind::DuplicateId));

        assert_eq!(topology.node(3)?.kind().to_string(), "Feeder");
        assert_eq!(topology.parent(3)?.map(|n| n.id()), Some(2));
        assert_eq!(topology.substation_of(3)?.id(), 1);
        assert_eq!(topology.node(1)?.kind(), NodeKind::Substation);

        Ok(())
    }
}
