// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A graph representation of a city's distribution network: substations,
//! the distribution nodes they feed, and the consumers attached to those.

mod aggregation;
mod assignment;
mod cascade;
mod creation;
mod retrieval;
mod validation;

pub mod iterators;
mod traversal;

#[cfg(test)]
pub(crate) mod test_utils;

pub use aggregation::BusLoad;
pub use assignment::Assignment;
pub use cascade::{ImpactReport, RestoreReport, SignalChange, TierCounts};

use crate::{CascadeConfig, GridNode};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// `GridNode`s stored in a `DiGraph` instance can be addressed with
/// `NodeIndex`es.
///
/// `NodeIndexMap` stores the corresponding `NodeIndex` for any node id, so
/// that nodes in the `DiGraph` can be retrieved from their ids.
pub(crate) type NodeIndexMap = HashMap<u64, NodeIndex>;

/// The distribution network as a forest of trees, one per substation.
///
/// Edges always point from the supplying node to the supplied node, so every
/// node other than a substation has exactly one predecessor.
#[derive(Clone, Debug)]
pub struct Topology {
    graph: DiGraph<GridNode, ()>,
    node_indices: NodeIndexMap,
    config: CascadeConfig,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(CascadeConfig::default())
    }
}
