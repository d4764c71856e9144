// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Allocation of vehicle discharge capacity against a power deficit.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use super::{OwnerPreferences, Transaction, TransactionKind, Vehicle};
use crate::{Error, V2gConfig};

/// The outcome of enrolling eligible vehicles in V2G.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivationResult {
    pub activated: Vec<u64>,
    /// Sum of the discharge rates of the activated vehicles.
    pub total_discharge_capacity_kw: f64,
    pub transactions: Vec<Transaction>,
}

/// The share one vehicle contributed to a discharge.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VehicleDischarge {
    pub vehicle_id: u64,
    pub power_kw: f64,
    pub energy_kwh: f64,
    pub remaining_charge_kwh: f64,
}

/// The outcome of a discharge request.
///
/// A request that can't be met in full is not an error: the result says
/// how much was delivered, and the caller decides whether that's enough.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DischargeResult {
    pub target_power_kw: f64,
    pub duration_hours: f64,
    pub total_power_discharged_kw: f64,
    pub total_energy_kwh: f64,
    pub vehicles: Vec<VehicleDischarge>,
    /// Vehicles passed over because the allocation would have taken them
    /// below their floor or past their per-dispatch limit.
    pub skipped: Vec<u64>,
    pub transactions: Vec<Transaction>,
}

impl DischargeResult {
    /// Returns true if the full target was delivered.
    pub fn is_fully_met(&self) -> bool {
        self.total_power_discharged_kw >= self.target_power_kw
    }
}

/// V2G figures for one location.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LocationStatus {
    pub vehicles: usize,
    pub grid_connected: usize,
    pub available_energy_kwh: f64,
}

/// A read-only summary of the fleet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct V2gStatus {
    pub total_vehicles: usize,
    pub grid_connected: usize,
    pub v2g_enabled: usize,
    /// Energy above the floor of every vehicle that can discharge now.
    pub available_energy_kwh: f64,
    /// Sum of the discharge rates of every vehicle that can discharge now.
    pub available_power_kw: f64,
    pub average_state_of_charge: f64,
    pub by_location: BTreeMap<String, LocationStatus>,
    pub total_discharged_kwh: f64,
    pub total_revenue: f64,
    /// The latest transactions, oldest first.
    pub recent_transactions: Vec<Transaction>,
}

/// Owns the V2G fleet and its transaction log.
#[derive(Clone, Debug, Default)]
pub struct V2gDispatcher {
    vehicles: Vec<Vehicle>,
    transactions: Vec<Transaction>,
    config: V2gConfig,
}

impl V2gDispatcher {
    /// Creates a dispatcher without vehicles.
    pub fn new(config: V2gConfig) -> Self {
        Self {
            vehicles: Vec::new(),
            transactions: Vec::new(),
            config,
        }
    }

    /// Returns the owner preferences configured as default.
    pub fn default_preferences(&self) -> OwnerPreferences {
        OwnerPreferences::from(&self.config)
    }

    /// Adds a vehicle to the fleet.
    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> Result<(), Error> {
        if self.vehicles.iter().any(|v| v.id == vehicle.id) {
            return Err(Error::duplicate_id(format!(
                "Duplicate vehicle ID found: {}",
                vehicle.id
            )));
        }
        vehicle.validate()?;
        debug!(vehicle = vehicle.id, location = %vehicle.location, "Adding vehicle");
        self.vehicles.push(vehicle);
        Ok(())
    }

    /// Returns the vehicle with the given `id`, if it exists.
    pub fn vehicle(&self, id: u64) -> Result<&Vehicle, Error> {
        self.vehicles
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| Error::unknown_node(format!("Vehicle with id {} not found.", id)))
    }

    fn vehicle_mut(&mut self, id: u64) -> Result<&mut Vehicle, Error> {
        self.vehicles
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| Error::unknown_node(format!("Vehicle with id {} not found.", id)))
    }

    /// Returns an iterator over the vehicles, in the order they were added.
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    /// Returns the full transaction log, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Enables V2G on every connected vehicle with charge above its floor,
    /// and records an activation for each.
    pub fn activate_eligible(&mut self) -> ActivationResult {
        let mut result = ActivationResult {
            activated: vec![],
            total_discharge_capacity_kw: 0.0,
            transactions: vec![],
        };
        for vehicle in self.vehicles.iter_mut().filter(|v| v.is_eligible()) {
            vehicle.v2g_enabled = true;
            result.activated.push(vehicle.id);
            result.total_discharge_capacity_kw += vehicle.discharge_rate_kw;
            result.transactions.push(Transaction::new(
                vehicle.id,
                TransactionKind::Activation,
                0.0,
                0.0,
                0.0,
            ));
        }
        self.transactions.extend(result.transactions.iter().cloned());

        info!(
            activated = result.activated.len(),
            capacity_kw = result.total_discharge_capacity_kw,
            "Activated V2G vehicles"
        );
        result
    }

    /// Discharges enabled vehicles to supply `target_power_kw` for
    /// `duration_hours`.
    ///
    /// Vehicles are used first-fit, in the order they were added, each
    /// giving `min(discharge_rate_kw, remaining power)`.  A vehicle whose
    /// share would take it below its floor, or past its per-dispatch limit,
    /// is skipped entirely.
    ///
    /// Returns a `NoEligibleVehicles` error if no vehicle is enabled,
    /// connected and above its floor.
    pub fn discharge_to_grid(
        &mut self,
        target_power_kw: f64,
        duration_hours: f64,
    ) -> Result<DischargeResult, Error> {
        if target_power_kw.is_nan() || target_power_kw < 0.0 {
            return Err(Error::invalid_entity(format!(
                "target_power_kw must be >= 0, got {target_power_kw}."
            )));
        }
        if duration_hours.is_nan() || duration_hours <= 0.0 {
            return Err(Error::invalid_entity(format!(
                "duration_hours must be > 0, got {duration_hours}."
            )));
        }
        if !self.vehicles.iter().any(|v| v.can_discharge()) {
            return Err(Error::no_eligible_vehicles(format!(
                "No vehicle can discharge {target_power_kw} kW."
            )));
        }

        let price = self.config.premium_price_per_kwh;
        let mut result = DischargeResult {
            target_power_kw,
            duration_hours,
            total_power_discharged_kw: 0.0,
            total_energy_kwh: 0.0,
            vehicles: vec![],
            skipped: vec![],
            transactions: vec![],
        };
        let mut remaining_kw = target_power_kw;

        for vehicle in self.vehicles.iter_mut().filter(|v| v.can_discharge()) {
            if remaining_kw <= 0.0 {
                break;
            }
            let power_kw = vehicle.discharge_rate_kw.min(remaining_kw);
            if power_kw <= 0.0 {
                continue;
            }
            let energy_kwh = power_kw * duration_hours;
            let remaining_charge = vehicle.current_charge_kwh - energy_kwh;
            if remaining_charge < vehicle.floor_kwh() || energy_kwh > vehicle.dispatch_limit_kwh()
            {
                debug!(
                    vehicle = vehicle.id,
                    energy_kwh,
                    available_kwh = vehicle.available_energy_kwh(),
                    "Skipping vehicle"
                );
                result.skipped.push(vehicle.id);
                continue;
            }

            vehicle.current_charge_kwh = remaining_charge;
            remaining_kw -= power_kw;
            result.total_power_discharged_kw += power_kw;
            result.total_energy_kwh += energy_kwh;
            result.vehicles.push(VehicleDischarge {
                vehicle_id: vehicle.id,
                power_kw,
                energy_kwh,
                remaining_charge_kwh: remaining_charge,
            });
            result.transactions.push(Transaction::new(
                vehicle.id,
                TransactionKind::Discharge,
                energy_kwh,
                price,
                power_kw,
            ));
        }
        self.transactions.extend(result.transactions.iter().cloned());

        info!(
            target_kw = target_power_kw,
            discharged_kw = result.total_power_discharged_kw,
            vehicles = result.vehicles.len(),
            skipped = result.skipped.len(),
            "V2G discharge"
        );
        Ok(result)
    }

    /// Charges a connected vehicle from the grid at up to `power_kw`, for
    /// `duration_hours`, without exceeding its capacity.
    pub fn charge_vehicle(
        &mut self,
        id: u64,
        power_kw: f64,
        duration_hours: f64,
    ) -> Result<Transaction, Error> {
        let price = self.config.charge_price_per_kwh;
        let vehicle = self.vehicle_mut(id)?;
        if !vehicle.grid_connected {
            return Err(Error::invalid_entity(format!(
                "Vehicle {id} is not connected to the grid."
            )));
        }
        if power_kw.is_nan() || power_kw < 0.0 || duration_hours.is_nan() || duration_hours < 0.0 {
            return Err(Error::invalid_entity(format!(
                "Vehicle {id}: can't charge at {power_kw} kW for {duration_hours} h."
            )));
        }
        let headroom = vehicle.battery_capacity_kwh - vehicle.current_charge_kwh;
        let energy_kwh = (power_kw.min(vehicle.charge_rate_kw) * duration_hours).min(headroom);
        vehicle.current_charge_kwh += energy_kwh;

        let transaction = Transaction::new(id, TransactionKind::Charge, energy_kwh, price, 0.0);
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    /// Marks a vehicle as connected at `location`.
    pub fn connect_vehicle(&mut self, id: u64, location: impl Into<String>) -> Result<(), Error> {
        let vehicle = self.vehicle_mut(id)?;
        vehicle.grid_connected = true;
        vehicle.location = location.into();
        Ok(())
    }

    /// Disconnects a vehicle, which also withdraws it from V2G.
    pub fn disconnect_vehicle(&mut self, id: u64) -> Result<Transaction, Error> {
        let vehicle = self.vehicle_mut(id)?;
        vehicle.grid_connected = false;
        vehicle.v2g_enabled = false;

        let transaction = Transaction::new(id, TransactionKind::Idle, 0.0, 0.0, 0.0);
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    /// Returns a summary of the fleet.  Doesn't change anything.
    pub fn status(&self) -> V2gStatus {
        let mut by_location: BTreeMap<String, LocationStatus> = BTreeMap::new();
        let mut status = V2gStatus {
            total_vehicles: self.vehicles.len(),
            grid_connected: 0,
            v2g_enabled: 0,
            available_energy_kwh: 0.0,
            available_power_kw: 0.0,
            average_state_of_charge: 0.0,
            by_location: BTreeMap::new(),
            total_discharged_kwh: 0.0,
            total_revenue: 0.0,
            recent_transactions: vec![],
        };

        for vehicle in &self.vehicles {
            let location = by_location.entry(vehicle.location.clone()).or_default();
            location.vehicles += 1;
            if vehicle.grid_connected {
                status.grid_connected += 1;
                location.grid_connected += 1;
            }
            if vehicle.v2g_enabled {
                status.v2g_enabled += 1;
            }
            if vehicle.can_discharge() {
                status.available_energy_kwh += vehicle.available_energy_kwh();
                status.available_power_kw += vehicle.discharge_rate_kw;
                location.available_energy_kwh += vehicle.available_energy_kwh();
            }
            status.average_state_of_charge += vehicle.state_of_charge();
        }
        if !self.vehicles.is_empty() {
            status.average_state_of_charge /= self.vehicles.len() as f64;
        }
        status.by_location = by_location;

        for transaction in &self.transactions {
            if transaction.kind == TransactionKind::Discharge {
                status.total_discharged_kwh += transaction.energy_kwh;
                status.total_revenue += transaction.value();
            }
        }
        let skip = self
            .transactions
            .len()
            .saturating_sub(self.config.recent_transaction_limit);
        status.recent_transactions = self.transactions[skip..].to_vec();

        status
    }
}
