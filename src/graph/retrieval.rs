// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving nodes and their neighbors from a [`Topology`].

use petgraph::graph::NodeIndex;

use crate::iterators::{Children, Nodes};
use crate::node_kind::KindPredicates;
use crate::{Error, GeoIndex, GridNode, Topology};

/// Node retrieval.
impl Topology {
    pub(crate) fn index_of(&self, id: u64) -> Result<NodeIndex, Error> {
        self.node_indices
            .get(&id)
            .copied()
            .ok_or_else(|| Error::unknown_node(format!("Node with id {} not found.", id)))
    }

    /// Returns the node with the given `id`, if it exists.
    pub fn node(&self, id: u64) -> Result<&GridNode, Error> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Returns true if a node with the given `id` exists.
    pub fn contains(&self, id: u64) -> bool {
        self.node_indices.contains_key(&id)
    }

    /// Returns an iterator over all nodes, in the order they were added.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            iter: self.graph.raw_nodes().iter(),
        }
    }

    /// Returns an iterator over the substations, in the order they were added.
    pub fn substations(&self) -> impl Iterator<Item = &GridNode> {
        self.nodes().filter(|n| n.is_substation())
    }

    /// Returns an iterator over the traffic lights and EV stations.
    pub fn consumers(&self) -> impl Iterator<Item = &GridNode> {
        self.nodes().filter(|n| n.is_consumer())
    }

    /// Returns the first substation with the given name.
    pub fn substation_by_name(&self, name: &str) -> Result<&GridNode, Error> {
        self.substations()
            .find(|n| n.label() == name)
            .ok_or_else(|| Error::unknown_node(format!("Substation '{}' not found.", name)))
    }

    /// Returns the node supplying the node with the given `id`, or `None`
    /// for substations.
    pub fn parent(&self, id: u64) -> Result<Option<&GridNode>, Error> {
        let idx = self.index_of(id)?;
        Ok(self.parent_index(idx).map(|p| &self.graph[p]))
    }

    pub(crate) fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Returns an iterator over the nodes directly supplied by the node with
    /// the given `id`, in the order they were added.
    ///
    /// Returns an error if the given `id` does not exist.
    pub fn children(&self, id: u64) -> Result<Children<'_>, Error> {
        let idx = self.index_of(id)?;
        Ok(Children {
            graph: &self.graph,
            iter: self.child_indices(idx).into_iter(),
        })
    }

    pub(crate) fn child_indices(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<_> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    /// Builds a [`GeoIndex`] over the positions of all nodes matching
    /// `pred`, in the order they were added.
    pub fn geo_index(&self, mut pred: impl FnMut(&GridNode) -> bool) -> GeoIndex {
        GeoIndex::new(
            self.nodes()
                .filter(|n| pred(n))
                .map(|n| (n.id(), n.position())),
        )
    }

    /// Builds a [`GeoIndex`] over all feeders.
    pub fn feeder_index(&self) -> GeoIndex {
        self.geo_index(|n| n.is_feeder())
    }
}
