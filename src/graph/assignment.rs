// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for assigning consumers to the distribution nodes that supply
//! them.

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::debug;

use crate::node_kind::KindPredicates;
use crate::{
    Asset, Consumer, Error, GeoIndex, GeoPoint, GridNode, SignalChange, SignalPhase, Topology,
};

/// The outcome of assigning a consumer to a supplying node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assignment {
    pub consumer_id: u64,
    pub parent_id: u64,
    /// The node that supplied the consumer before, if it was reassigned.
    pub previous_parent_id: Option<u64>,
    /// Set when a traffic light's power state changed because of the move.
    pub signal_change: Option<SignalChange>,
}

/// Consumer assignment.
impl Topology {
    /// Assigns a consumer to the candidate node closest to `position`.
    ///
    /// If a consumer with the same `id` already exists, it is reassigned:
    /// its attributes and position are replaced, and it is detached from its
    /// previous supplier (and that supplier's load) before being attached to
    /// the new one.  The consumer joins the outages of its new supplier,
    /// unless it is a traffic light with battery backup.
    ///
    /// Returns an error, without changing anything, if `id` belongs to a
    /// node that isn't a consumer, if `candidates` is empty, or if it
    /// contains unknown nodes or consumers.
    pub fn assign_consumer(
        &mut self,
        id: u64,
        position: GeoPoint,
        consumer: Consumer,
        candidates: &GeoIndex,
    ) -> Result<Assignment, Error> {
        consumer.validate()?;
        let existing = match self.node_indices.get(&id) {
            Some(&idx) if self.graph[idx].is_consumer() => Some(idx),
            Some(_) => {
                return Err(Error::duplicate_id(format!(
                    "Duplicate node ID found: {id}"
                )))
            }
            None => None,
        };
        let parent_idx = self.nearest_supplier(id, &position, candidates)?;

        let idx = match existing {
            Some(idx) => {
                let node = &mut self.graph[idx];
                *node.asset_mut() = Asset::from(consumer);
                node.set_position(position);
                idx
            }
            None => {
                let idx = self
                    .graph
                    .add_node(GridNode::new(id, position, Asset::from(consumer)));
                self.node_indices.insert(id, idx);
                idx
            }
        };
        Ok(self.attach(idx, parent_idx))
    }

    /// Moves an existing consumer to `position` and reassigns it to the
    /// closest candidate node, keeping its attributes.
    pub fn move_consumer(
        &mut self,
        id: u64,
        position: GeoPoint,
        candidates: &GeoIndex,
    ) -> Result<Assignment, Error> {
        let idx = self.consumer_index(id)?;
        let parent_idx = self.nearest_supplier(id, &position, candidates)?;
        self.graph[idx].set_position(position);
        Ok(self.attach(idx, parent_idx))
    }

    /// Sets the number of vehicles charging at an EV station and updates the
    /// loads above it.
    pub fn set_vehicles_charging(&mut self, id: u64, vehicles: u32) -> Result<(), Error> {
        let idx = self.consumer_index(id)?;
        match self.graph[idx].asset_mut() {
            Asset::EvStation(station) => station.vehicles_charging = vehicles,
            _ => {
                return Err(Error::invalid_entity(format!(
                    "Node {id} is not an EV station."
                )))
            }
        }
        self.refresh_loads_from(idx);
        Ok(())
    }

    /// Records the phase a traffic light is currently showing.
    pub fn set_signal_phase(&mut self, id: u64, phase: Option<SignalPhase>) -> Result<(), Error> {
        let idx = self.consumer_index(id)?;
        match self.graph[idx].asset_mut() {
            Asset::TrafficLight(light) => light.signal_phase = phase,
            _ => {
                return Err(Error::invalid_entity(format!(
                    "Node {id} is not a traffic light."
                )))
            }
        }
        Ok(())
    }

    fn consumer_index(&self, id: u64) -> Result<NodeIndex, Error> {
        let idx = self.index_of(id)?;
        if !self.graph[idx].is_consumer() {
            return Err(Error::invalid_assignment(format!(
                "{}:{id} is not a consumer.",
                self.graph[idx].kind()
            )));
        }
        Ok(idx)
    }

    /// Validates the candidates and returns the index of the one closest to
    /// `position`.
    fn nearest_supplier(
        &self,
        id: u64,
        position: &GeoPoint,
        candidates: &GeoIndex,
    ) -> Result<NodeIndex, Error> {
        if candidates.is_empty() {
            return Err(Error::invalid_assignment(format!(
                "No candidate nodes to assign consumer {id} to."
            )));
        }
        for cid in candidates.ids() {
            let candidate = self.node(cid)?;
            if candidate.is_consumer() {
                return Err(Error::invalid_assignment(format!(
                    "Consumer {id} can't be supplied by {}:{cid}.",
                    candidate.kind()
                )));
            }
        }
        let nearest = candidates.nearest(position).ok_or_else(|| {
            Error::internal(format!("No nearest candidate found for consumer {id}."))
        })?;
        self.index_of(nearest)
    }

    /// Detaches the consumer at `idx` from its current supplier, if any, and
    /// attaches it to `parent_idx`.  Never fails: all checks happen before.
    fn attach(&mut self, idx: NodeIndex, parent_idx: NodeIndex) -> Assignment {
        let was_energized = self.graph[idx].is_energized();
        let previous = self.parent_index(idx);
        if let Some(old) = previous {
            if let Some(edge) = self.graph.find_edge(old, idx) {
                self.graph.remove_edge(edge);
            }
            self.refresh_loads_from(old);
        }
        self.graph.add_edge(parent_idx, idx, ());

        let id = self.graph[idx].id();
        let mut causes = if self.graph[idx].has_backup_power() {
            Default::default()
        } else {
            self.graph[parent_idx].outage_causes().clone()
        };
        // A consumer that was failed on its own stays failed wherever it goes.
        if self.graph[idx].outage_causes().contains(&id) {
            causes.insert(id);
        }
        *self.graph[idx].outage_causes_mut() = causes;
        self.refresh_loads_from(idx);

        let node = &self.graph[idx];
        let parent_id = self.graph[parent_idx].id();
        debug!(
            consumer = id,
            parent = parent_id,
            previous = ?previous.map(|p| self.graph[p].id()),
            "Assigned consumer"
        );

        let signal_change = (node.is_traffic_light()
            && previous.is_some()
            && was_energized != node.is_energized())
        .then(|| SignalChange {
            signal_id: id,
            powered: node.is_energized(),
        });

        Assignment {
            consumer_id: id,
            parent_id,
            previous_parent_id: previous.map(|p| self.graph[p].id()),
            signal_change,
        }
    }
}
