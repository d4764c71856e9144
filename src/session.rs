// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A grid session: one topology and one V2G fleet behind a single lock.
//!
//! Every command holds the write lock until it is done, so a cascade is
//! never observed half-propagated.  Queries share the read lock.  Pushing
//! state to the simulators happens after the lock is released, from data
//! copied out while it was held.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::collaborators::{PowerFlowSink, SignalSink};
use crate::snapshot::GridSnapshot;
use crate::v2g::{
    ActivationResult, DischargeResult, OwnerPreferences, Transaction, V2gDispatcher, V2gStatus,
    Vehicle,
};
use crate::{
    Assignment, BusLoad, Consumer, DistributionNode, Error, EvStation, GeoPoint, GridConfig,
    ImpactReport, RestoreReport, SignalChange, Substation, Topology, TrafficLight,
};

struct GridState {
    topology: Topology,
    dispatcher: V2gDispatcher,
}

/// The owner of a simulated city grid for the lifetime of a simulation.
pub struct GridSession {
    state: RwLock<GridState>,
    config: GridConfig,
}

impl GridSession {
    /// Creates an empty session.  Fails if `config` is out of range.
    pub fn new(config: GridConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(GridState {
                topology: Topology::new(config.cascade.clone()),
                dispatcher: V2gDispatcher::new(config.v2g.clone()),
            }),
            config,
        })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Returns a traffic light drawing the configured power.
    pub fn traffic_light(&self, intersection: impl Into<String>) -> TrafficLight {
        TrafficLight::new(intersection, self.config.loads.traffic_light_kw)
    }

    /// Returns an EV station whose chargers have the configured rating.
    pub fn ev_station(&self, name: impl Into<String>, charger_count: u32) -> EvStation {
        EvStation::new(name, charger_count, self.config.loads.ev_station_kw)
    }

    /// Returns a vehicle with the configured owner preferences.
    pub fn vehicle(
        &self,
        id: u64,
        battery_capacity_kwh: f64,
        current_charge_kwh: f64,
        location: impl Into<String>,
    ) -> Vehicle {
        Vehicle::new(id, battery_capacity_kwh, current_charge_kwh, location)
            .with_preferences(OwnerPreferences::from(&self.config.v2g))
    }

    pub fn add_substation(
        &self,
        id: u64,
        position: GeoPoint,
        substation: Substation,
    ) -> Result<(), Error> {
        self.state
            .write()
            .topology
            .add_substation(id, position, substation)
    }

    pub fn add_distribution_node(
        &self,
        id: u64,
        parent_id: u64,
        position: GeoPoint,
        node: DistributionNode,
    ) -> Result<(), Error> {
        self.state
            .write()
            .topology
            .add_distribution_node(id, parent_id, position, node)
    }

    /// Assigns a consumer to its nearest feeder.
    pub fn assign_consumer(
        &self,
        id: u64,
        position: GeoPoint,
        consumer: impl Into<Consumer>,
    ) -> Result<Assignment, Error> {
        let mut state = self.state.write();
        let feeders = state.topology.feeder_index();
        state
            .topology
            .assign_consumer(id, position, consumer.into(), &feeders)
    }

    /// Moves a consumer and reassigns it to its nearest feeder.
    pub fn move_consumer(&self, id: u64, position: GeoPoint) -> Result<Assignment, Error> {
        let mut state = self.state.write();
        let feeders = state.topology.feeder_index();
        state.topology.move_consumer(id, position, &feeders)
    }

    pub fn set_vehicles_charging(&self, station_id: u64, vehicles: u32) -> Result<(), Error> {
        self.state
            .write()
            .topology
            .set_vehicles_charging(station_id, vehicles)
    }

    /// Fails a node and everything it supplies.
    pub fn fail_node(&self, id: u64) -> Result<ImpactReport, Error> {
        self.state.write().topology.fail(id)
    }

    /// Fails the substation with the given name.
    pub fn fail_substation_by_name(&self, name: &str) -> Result<ImpactReport, Error> {
        let mut state = self.state.write();
        let id = state.topology.substation_by_name(name)?.id();
        state.topology.fail(id)
    }

    /// Restores a failed node.
    pub fn restore_node(&self, id: u64) -> Result<RestoreReport, Error> {
        self.state.write().topology.restore(id)
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) -> Result<(), Error> {
        self.state.write().dispatcher.add_vehicle(vehicle)
    }

    pub fn connect_vehicle(&self, id: u64, location: impl Into<String>) -> Result<(), Error> {
        self.state.write().dispatcher.connect_vehicle(id, location)
    }

    pub fn disconnect_vehicle(&self, id: u64) -> Result<Transaction, Error> {
        self.state.write().dispatcher.disconnect_vehicle(id)
    }

    pub fn charge_vehicle(
        &self,
        id: u64,
        power_kw: f64,
        duration_hours: f64,
    ) -> Result<Transaction, Error> {
        self.state
            .write()
            .dispatcher
            .charge_vehicle(id, power_kw, duration_hours)
    }

    /// Enrolls every eligible vehicle in V2G.
    pub fn activate_v2g(&self) -> ActivationResult {
        self.state.write().dispatcher.activate_eligible()
    }

    /// Discharges V2G vehicles towards `target_power_kw`.
    pub fn discharge_v2g(
        &self,
        target_power_kw: f64,
        duration_hours: f64,
    ) -> Result<DischargeResult, Error> {
        self.state
            .write()
            .dispatcher
            .discharge_to_grid(target_power_kw, duration_hours)
    }

    pub fn v2g_status(&self) -> V2gStatus {
        self.state.read().dispatcher.status()
    }

    pub fn descendants(&self, id: u64) -> Result<BTreeSet<u64>, Error> {
        self.state.read().topology.descendants(id)
    }

    pub fn bus_loads(&self) -> Vec<BusLoad> {
        self.state.read().topology.bus_loads()
    }

    /// Captures the full state of the session.
    pub fn snapshot(&self) -> Result<GridSnapshot, Error> {
        let state = self.state.read();
        GridSnapshot::capture(&state.topology, &state.dispatcher)
    }

    /// Runs `f` against the topology while holding the read lock.
    pub fn with_topology<R>(&self, f: impl FnOnce(&Topology) -> R) -> R {
        f(&self.state.read().topology)
    }

    /// Pushes the load of every substation to the power-flow model, and
    /// returns the number of loads it accepted.
    ///
    /// Loads for buses the model doesn't know are logged and skipped.
    pub fn push_bus_loads(&self, sink: &mut dyn PowerFlowSink) -> usize {
        let loads = self.bus_loads();
        let mut accepted = 0;
        for load in &loads {
            if sink.apply_bus_load(&load.bus_id, load.load_mw) {
                accepted += 1;
            } else {
                warn!(
                    bus = %load.bus_id,
                    load_mw = load.load_mw,
                    "Power-flow model rejected bus load"
                );
            }
        }
        debug!(accepted, total = loads.len(), "Pushed bus loads");
        accepted
    }

    /// Forwards signal power changes to the traffic simulation.
    pub fn push_signal_changes(sink: &mut dyn SignalSink, changes: &[SignalChange]) {
        for change in changes {
            sink.set_signal_power(change.signal_id, change.powered);
        }
        debug!(changes = changes.len(), "Pushed signal changes");
    }
}
