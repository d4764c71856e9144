// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module is only compiled when running unit tests and contains the
//! `TopologyBuilder`, which can declaratively build distribution networks
//! for use in tests.

use crate::{
    Consumer, DistributionNode, Error, EvStation, GeoPoint, Substation, Topology, TrafficLight,
};

enum Pending {
    Substation(u64, GeoPoint, Substation),
    Distribution(u64, u64, GeoPoint, DistributionNode),
    Consumer(u64, GeoPoint, Consumer),
}

/// A builder for creating distribution networks easily, for use in tests.
///
/// Ids are handed out sequentially, starting at 1.  Substations and
/// distribution nodes are added in the order they were declared, then every
/// consumer is assigned to its nearest feeder.
pub(crate) struct TopologyBuilder {
    pending: Vec<Pending>,
    next_id: u64,
}

impl TopologyBuilder {
    /// Creates a new `TopologyBuilder`.
    pub(crate) fn new() -> Self {
        TopologyBuilder {
            pending: Vec::new(),
            next_id: 1,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Adds a substation and returns its id.
    pub(crate) fn substation(&mut self, name: &str, position: GeoPoint) -> u64 {
        let id = self.next_id();
        self.pending.push(Pending::Substation(
            id,
            position,
            Substation::new(name, 138.0, 13.8, 50.0),
        ));
        id
    }

    /// Adds a transformer below `parent` and returns its id.
    pub(crate) fn transformer(&mut self, parent: u64, position: GeoPoint) -> u64 {
        let id = self.next_id();
        self.pending.push(Pending::Distribution(
            id,
            parent,
            position,
            DistributionNode::transformer(format!("T-{id}"), 2000.0),
        ));
        id
    }

    /// Adds a feeder below `parent` and returns its id.
    pub(crate) fn feeder(&mut self, parent: u64, position: GeoPoint) -> u64 {
        let id = self.next_id();
        self.pending.push(Pending::Distribution(
            id,
            parent,
            position,
            DistributionNode::feeder(format!("F-{id}"), 500.0),
        ));
        id
    }

    /// Adds a 0.3kW traffic light and returns its id.
    pub(crate) fn light(&mut self, position: GeoPoint) -> u64 {
        let id = self.next_id();
        let light = TrafficLight::new(format!("Intersection {id}"), 0.3);
        self.pending
            .push(Pending::Consumer(id, position, light.into()));
        id
    }

    /// Adds a 0.3kW traffic light with battery backup and returns its id.
    pub(crate) fn backup_light(&mut self, position: GeoPoint) -> u64 {
        let id = self.next_id();
        let light = TrafficLight::new(format!("Intersection {id}"), 0.3).with_battery_backup();
        self.pending
            .push(Pending::Consumer(id, position, light.into()));
        id
    }

    /// Adds an EV station with 7.2kW chargers and returns its id.
    pub(crate) fn ev_station(&mut self, position: GeoPoint, chargers: u32, charging: u32) -> u64 {
        let id = self.next_id();
        let mut station = EvStation::new(format!("Station {id}"), chargers, 7.2);
        station.vehicles_charging = charging;
        self.pending
            .push(Pending::Consumer(id, position, station.into()));
        id
    }

    /// Builds and returns the topology.
    pub(crate) fn build(self) -> Result<Topology, Error> {
        let mut topology = Topology::default();
        let mut consumers = vec![];
        for pending in self.pending {
            match pending {
                Pending::Substation(id, position, substation) => {
                    topology.add_substation(id, position, substation)?
                }
                Pending::Distribution(id, parent, position, node) => {
                    topology.add_distribution_node(id, parent, position, node)?
                }
                Pending::Consumer(id, position, consumer) => {
                    consumers.push((id, position, consumer))
                }
            }
        }

        let feeders = topology.feeder_index();
        for (id, position, consumer) in consumers {
            topology.assign_consumer(id, position, consumer, &feeders)?;
        }
        Ok(topology)
    }
}
