// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Iterators over the nodes of a `Topology`.

use petgraph::graph::{DiGraph, NodeIndex};

use crate::GridNode;

/// An iterator over the nodes in a `Topology`.
pub struct Nodes<'a> {
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Node<GridNode>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a GridNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|n| &n.weight)
    }
}

/// An iterator over the nodes directly supplied by a node in a `Topology`.
pub struct Children<'a> {
    pub(crate) graph: &'a DiGraph<GridNode, ()>,
    pub(crate) iter: std::vec::IntoIter<NodeIndex>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a GridNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|i| &self.graph[i])
    }
}
