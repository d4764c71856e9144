// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains methods that help with graph traversal.

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use crate::node_kind::KindPredicates;
use crate::{Error, GridNode, Topology};

/// Traversal methods.
impl Topology {
    /// Returns the indices of all nodes below `from`, excluding `from`
    /// itself, sorted in the order the nodes were added.
    pub(crate) fn descendant_indices(&self, from: NodeIndex) -> Vec<NodeIndex> {
        let mut stack = vec![from];
        let mut found = vec![];

        while let Some(index) = stack.pop() {
            for child in self
                .graph
                .neighbors_directed(index, petgraph::Direction::Outgoing)
            {
                found.push(child);
                stack.push(child);
            }
        }

        found.sort();
        found
    }

    /// Returns the ids of every node and consumer that is supplied, directly
    /// or transitively, by the node with the given `id`.
    pub fn descendants(&self, id: u64) -> Result<BTreeSet<u64>, Error> {
        let idx = self.index_of(id)?;
        Ok(self
            .descendant_indices(idx)
            .into_iter()
            .map(|i| self.graph[i].id())
            .collect())
    }

    /// Returns the path from the node with the given `id` up to its
    /// substation, starting with the node's parent.
    pub fn ancestors(&self, id: u64) -> Result<Vec<&GridNode>, Error> {
        let mut idx = self.index_of(id)?;
        let mut path = vec![];
        while let Some(parent) = self.parent_index(idx) {
            path.push(&self.graph[parent]);
            idx = parent;
        }
        Ok(path)
    }

    /// Returns the substation that the node with the given `id` is supplied
    /// by.  For substations, that is the node itself.
    pub fn substation_of(&self, id: u64) -> Result<&GridNode, Error> {
        let node = self.node(id)?;
        if node.is_substation() {
            return Ok(node);
        }
        self.ancestors(id)?
            .into_iter()
            .find(|n| n.is_substation())
            .ok_or_else(|| {
                Error::internal(format!("Node {} is not supplied by any substation.", id))
            })
    }
}
