// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Typed records for the entities that make up the distribution network.
//!
//! The attribute structs (`Substation`, `DistributionNode`, `TrafficLight`
//! and `EvStation`) hold what is known about an asset when it is added to
//! the network. A [`GridNode`] wraps one of them together with the state the
//! topology maintains for it: its position, aggregated load, and the set of
//! failures that currently keep it de-energized.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::node_kind::{DistributionKind, KindPredicates, NodeKind};
use crate::{Error, GeoPoint};

/// A substation, stepping transmission voltage down to primary distribution
/// voltage.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Substation {
    pub name: String,
    pub primary_kv: f64,
    pub secondary_kv: f64,
    pub capacity_mva: f64,
}

impl Substation {
    pub fn new(
        name: impl Into<String>,
        primary_kv: f64,
        secondary_kv: f64,
        capacity_mva: f64,
    ) -> Self {
        Self {
            name: name.into(),
            primary_kv,
            secondary_kv,
            capacity_mva,
        }
    }

    /// Returns the identifier of the bus this substation feeds in the
    /// power-flow model, e.g. `"Midtown_13.8kV"`.
    pub fn bus_id(&self) -> String {
        format!("{}_{}kV", self.name, self.secondary_kv)
    }
}

/// A distribution transformer or feeder, serving a cluster of consumers.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DistributionNode {
    pub name: String,
    pub kind: DistributionKind,
    pub primary_kv: f64,
    pub secondary_kv: f64,
    pub capacity_kva: f64,
}

impl DistributionNode {
    /// Creates a feeder stepping 13.8kV down to 480V.
    pub fn feeder(name: impl Into<String>, capacity_kva: f64) -> Self {
        Self {
            name: name.into(),
            kind: DistributionKind::Feeder,
            primary_kv: 13.8,
            secondary_kv: 0.48,
            capacity_kva,
        }
    }

    /// Creates a transformer stepping 13.8kV down to 4.16kV.
    pub fn transformer(name: impl Into<String>, capacity_kva: f64) -> Self {
        Self {
            name: name.into(),
            kind: DistributionKind::Transformer,
            primary_kv: 13.8,
            secondary_kv: 4.16,
            capacity_kva,
        }
    }
}

/// The phase a traffic signal is showing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum SignalPhase {
    Green,
    Yellow,
    Red,
    FlashingRed,
}

/// A traffic light at an intersection.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TrafficLight {
    pub intersection: String,
    pub power_kw: f64,
    /// Lights with a battery backup keep running when their feeder goes down.
    pub battery_backup: bool,
    pub signal_phase: Option<SignalPhase>,
}

impl TrafficLight {
    /// Creates a traffic light drawing `power_kw`, without battery backup.
    pub fn new(intersection: impl Into<String>, power_kw: f64) -> Self {
        Self {
            intersection: intersection.into(),
            power_kw,
            battery_backup: false,
            signal_phase: None,
        }
    }

    pub fn with_battery_backup(mut self) -> Self {
        self.battery_backup = true;
        self
    }
}

/// An EV charging station.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EvStation {
    pub name: String,
    pub charger_count: u32,
    pub rated_power_kw: f64,
    pub vehicles_charging: u32,
}

impl EvStation {
    pub fn new(name: impl Into<String>, charger_count: u32, rated_power_kw: f64) -> Self {
        Self {
            name: name.into(),
            charger_count,
            rated_power_kw,
            vehicles_charging: 0,
        }
    }

    /// Returns the draw of the station: one rated charger per active session,
    /// capped by the number of chargers.
    pub fn demand_kw(&self) -> f64 {
        self.vehicles_charging.min(self.charger_count) as f64 * self.rated_power_kw
    }
}

/// A leaf load that can be assigned to a distribution node.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum Consumer {
    TrafficLight(TrafficLight),
    EvStation(EvStation),
}

impl Consumer {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        match self {
            Consumer::TrafficLight(light) => {
                ensure_non_negative("power_kw", light.power_kw, &light.intersection)
            }
            Consumer::EvStation(station) => ensure_non_negative(
                "rated_power_kw",
                station.rated_power_kw,
                &station.name,
            ),
        }
    }
}

impl From<TrafficLight> for Consumer {
    fn from(light: TrafficLight) -> Self {
        Consumer::TrafficLight(light)
    }
}

impl From<EvStation> for Consumer {
    fn from(station: EvStation) -> Self {
        Consumer::EvStation(station)
    }
}

/// The attributes of any node in the distribution network.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Asset {
    Substation(Substation),
    Distribution(DistributionNode),
    TrafficLight(TrafficLight),
    EvStation(EvStation),
}

impl From<Consumer> for Asset {
    fn from(consumer: Consumer) -> Self {
        match consumer {
            Consumer::TrafficLight(light) => Asset::TrafficLight(light),
            Consumer::EvStation(station) => Asset::EvStation(station),
        }
    }
}

pub(crate) fn ensure_non_negative(field: &str, value: f64, label: &str) -> Result<(), Error> {
    if value.is_nan() || value < 0.0 {
        return Err(Error::invalid_entity(format!(
            "{label}: {field} must be >= 0, got {value}."
        )));
    }
    Ok(())
}

/// A node in the distribution network, together with its operational state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridNode {
    id: u64,
    position: GeoPoint,
    asset: Asset,
    load_kw: f64,
    outage_causes: BTreeSet<u64>,
}

impl GridNode {
    pub(crate) fn new(id: u64, position: GeoPoint, asset: Asset) -> Self {
        Self {
            id,
            position,
            asset,
            load_kw: 0.0,
            outage_causes: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    /// Returns a display label: the substation, feeder or station name, or
    /// the intersection of a traffic light.
    pub fn label(&self) -> &str {
        match &self.asset {
            Asset::Substation(s) => &s.name,
            Asset::Distribution(d) => &d.name,
            Asset::TrafficLight(l) => &l.intersection,
            Asset::EvStation(e) => &e.name,
        }
    }

    /// Returns the aggregated load of the node, in kW.
    ///
    /// For consumers this is the draw they currently put on the network,
    /// which is zero while they are de-energized.
    pub fn load_kw(&self) -> f64 {
        self.load_kw
    }

    pub fn load_mw(&self) -> f64 {
        self.load_kw / 1000.0
    }

    /// Returns the draw of a consumer while it is energized, and zero for
    /// all other nodes.
    pub fn nominal_draw_kw(&self) -> f64 {
        match &self.asset {
            Asset::TrafficLight(l) => l.power_kw,
            Asset::EvStation(e) => e.demand_kw(),
            Asset::Substation(_) | Asset::Distribution(_) => 0.0,
        }
    }

    /// Returns true if the node is operational (or, for consumers, powered).
    pub fn is_energized(&self) -> bool {
        self.outage_causes.is_empty()
    }

    /// Returns the ids of the failed nodes that currently keep this node
    /// de-energized.
    pub fn outage_causes(&self) -> &BTreeSet<u64> {
        &self.outage_causes
    }

    /// Returns true for traffic lights with their own battery backup.
    pub fn has_backup_power(&self) -> bool {
        matches!(&self.asset, Asset::TrafficLight(l) if l.battery_backup)
    }

    pub(crate) fn asset_mut(&mut self) -> &mut Asset {
        &mut self.asset
    }

    pub(crate) fn set_position(&mut self, position: GeoPoint) {
        self.position = position;
    }

    pub(crate) fn set_load_kw(&mut self, load_kw: f64) {
        self.load_kw = load_kw;
    }

    pub(crate) fn outage_causes_mut(&mut self) -> &mut BTreeSet<u64> {
        &mut self.outage_causes
    }
}

impl GridNode {
    /// Returns the kind of the node.
    pub fn kind(&self) -> NodeKind {
        match &self.asset {
            Asset::Substation(_) => NodeKind::Substation,
            Asset::Distribution(d) => NodeKind::Distribution(d.kind),
            Asset::TrafficLight(_) => NodeKind::TrafficLight,
            Asset::EvStation(_) => NodeKind::EvStation,
        }
    }
}

impl KindPredicates for GridNode {
    fn kind(&self) -> NodeKind {
        GridNode::kind(self)
    }
}
