// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

/*!
# City Grid Cascade

This is a library for simulating the electrical distribution network of a
city: substations, the transformers and feeders they supply, and the traffic
lights and EV charging stations at the edge of the network.

The network is held as a forest of trees in a [`Topology`], one tree per
substation, with edges pointing from the supplying node to the supplied node.

## Building a topology

Substations and distribution nodes are added explicitly, with
[`add_substation`][Topology::add_substation] and
[`add_distribution_node`][Topology::add_distribution_node].  Consumers are
assigned to the nearest node of a [`GeoIndex`] with
[`assign_consumer`][Topology::assign_consumer], where nearest means the
smallest Manhattan distance, which follows an orthogonal street grid.

The aggregated load of every node is derived from the consumers below it, and
is kept up to date across every mutation.  [`bus_loads`][Topology::bus_loads]
gives the load of each substation, keyed by its bus id, for a power-flow
model.

## Cascading failures

[`fail`][Topology::fail] takes a node down along with everything it supplies,
except traffic lights with battery backup, and reports the impact.
[`restore`][Topology::restore] brings them back, unless they are still held
down by another failure.  Every node keeps the set of failures it is affected
by, so independent failures compose.

## Vehicle-to-grid

A [`V2gDispatcher`] owns a fleet of vehicles that can be discharged into the
grid to make up for lost supply, first-fit, without ever taking a vehicle below
the minimum charge level its owner set.

## Sessions

A [`GridSession`] puts a topology and a fleet behind a single lock, exposes the
commands and queries that control clients need, and pushes state to the
[`PowerFlowSink`] and [`SignalSink`] simulators.
*/

mod cable;
pub use cable::{orthogonal_path, route, CableRoute};

mod collaborators;
pub use collaborators::{PowerFlowSink, SignalSink};

mod config;
pub use config::{CascadeConfig, GridConfig, LoadConfig, V2gConfig};

mod entities;
pub use entities::{
    Asset, Consumer, DistributionNode, EvStation, GridNode, SignalPhase, Substation, TrafficLight,
};

mod error;
pub use error::{Error, ErrorKind};

mod geo;
pub use geo::{nearest, GeoIndex, GeoPoint};

mod graph;
pub use graph::{
    iterators, Assignment, BusLoad, ImpactReport, RestoreReport, SignalChange, TierCounts,
    Topology,
};

mod node_kind;
pub use node_kind::{DistributionKind, NodeKind};

mod session;
pub use session::GridSession;

mod snapshot;
pub use snapshot::{Cable, GridSnapshot, NodeState, SnapshotSummary};

pub mod v2g;
pub use v2g::{V2gDispatcher, Vehicle};
