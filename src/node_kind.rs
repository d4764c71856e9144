// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module defines the `NodeKind` enum, which represents the kind of a
//! node in the distribution network, and the tier each kind lives on.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Represents the role of a distribution node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DistributionKind {
    Transformer,
    Feeder,
}

impl Display for DistributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionKind::Transformer => write!(f, "Transformer"),
            DistributionKind::Feeder => write!(f, "Feeder"),
        }
    }
}

/// Represents the kind of a node in the distribution network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NodeKind {
    Substation,
    Distribution(DistributionKind),
    TrafficLight,
    EvStation,
}

impl NodeKind {
    /// Returns the tier of the node kind.  Substations are on tier 0,
    /// distribution nodes on tier 1 and consumers on tier 2.
    ///
    /// A node's parent must always be on a lower tier than the node, with the
    /// exception of distribution nodes, which can be chained.
    pub fn tier(&self) -> u8 {
        match self {
            NodeKind::Substation => 0,
            NodeKind::Distribution(_) => 1,
            NodeKind::TrafficLight | NodeKind::EvStation => 2,
        }
    }

    /// Returns true if nodes of this kind are leaf loads.
    pub fn is_consumer(&self) -> bool {
        self.tier() == 2
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Substation => write!(f, "Substation"),
            NodeKind::Distribution(kind) => write!(f, "{}", kind),
            NodeKind::TrafficLight => write!(f, "TrafficLight"),
            NodeKind::EvStation => write!(f, "EVStation"),
        }
    }
}

/// Predicates for checking the kind of a node.
pub(crate) trait KindPredicates {
    fn kind(&self) -> NodeKind;

    fn is_substation(&self) -> bool {
        self.kind() == NodeKind::Substation
    }

    fn is_distribution(&self) -> bool {
        matches!(self.kind(), NodeKind::Distribution(_))
    }

    fn is_feeder(&self) -> bool {
        self.kind() == NodeKind::Distribution(DistributionKind::Feeder)
    }

    fn is_traffic_light(&self) -> bool {
        self.kind() == NodeKind::TrafficLight
    }

    fn is_ev_station(&self) -> bool {
        self.kind() == NodeKind::EvStation
    }

    fn is_consumer(&self) -> bool {
        self.kind().is_consumer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_and_display() {
        assert_eq!(NodeKind::Substation.tier(), 0);
        assert_eq!(
            NodeKind::Distribution(DistributionKind::Transformer).tier(),
            1
        );
        assert!(NodeKind::TrafficLight.is_consumer());
        assert!(NodeKind::EvStation.is_consumer());
        assert!(!NodeKind::Distribution(DistributionKind::Feeder).is_consumer());

        assert_eq!(
            NodeKind::Distribution(DistributionKind::Feeder).to_string(),
            "Feeder"
        );
        assert_eq!(NodeKind::EvStation.to_string(), "EVStation");
    }
}
