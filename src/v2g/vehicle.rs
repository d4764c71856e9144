// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

use serde::{Deserialize, Serialize};

use crate::entities::ensure_non_negative;
use crate::{Error, V2gConfig};

/// Limits set by a vehicle's owner, in percent of battery capacity.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct OwnerPreferences {
    /// The charge level the vehicle must never be discharged below.
    pub min_charge_level: f64,
    /// The most energy a single dispatch may take from the vehicle.
    pub max_discharge_level: f64,
}

impl Default for OwnerPreferences {
    fn default() -> Self {
        Self::from(&V2gConfig::default())
    }
}

impl From<&V2gConfig> for OwnerPreferences {
    fn from(config: &V2gConfig) -> Self {
        Self {
            min_charge_level: config.default_min_charge_level,
            max_discharge_level: config.default_max_discharge_level,
        }
    }
}

/// An electric vehicle that can take part in vehicle-to-grid dispatch.
///
/// Vehicles aren't part of the distribution network; `location` only ties
/// them to a charging site for reporting.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Vehicle {
    pub id: u64,
    pub battery_capacity_kwh: f64,
    pub current_charge_kwh: f64,
    pub charge_rate_kw: f64,
    pub discharge_rate_kw: f64,
    pub location: String,
    pub grid_connected: bool,
    pub v2g_enabled: bool,
    pub preferences: OwnerPreferences,
}

impl Vehicle {
    /// Creates a disconnected vehicle with 11kW charge and discharge rates
    /// and default owner preferences.
    pub fn new(
        id: u64,
        battery_capacity_kwh: f64,
        current_charge_kwh: f64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id,
            battery_capacity_kwh,
            current_charge_kwh,
            charge_rate_kw: 11.0,
            discharge_rate_kw: 11.0,
            location: location.into(),
            grid_connected: false,
            v2g_enabled: false,
            preferences: OwnerPreferences::default(),
        }
    }

    pub fn with_rates(mut self, charge_rate_kw: f64, discharge_rate_kw: f64) -> Self {
        self.charge_rate_kw = charge_rate_kw;
        self.discharge_rate_kw = discharge_rate_kw;
        self
    }

    pub fn with_preferences(mut self, preferences: OwnerPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn connected(mut self) -> Self {
        self.grid_connected = true;
        self
    }

    /// Returns the charge the vehicle must keep, in kWh.
    pub fn floor_kwh(&self) -> f64 {
        self.battery_capacity_kwh * self.preferences.min_charge_level / 100.0
    }

    /// Returns the most energy a single dispatch may take, in kWh.
    pub fn dispatch_limit_kwh(&self) -> f64 {
        self.battery_capacity_kwh * self.preferences.max_discharge_level / 100.0
    }

    /// Returns the energy above the floor, in kWh.
    pub fn available_energy_kwh(&self) -> f64 {
        (self.current_charge_kwh - self.floor_kwh()).max(0.0)
    }

    /// Returns the state of charge in percent.
    pub fn state_of_charge(&self) -> f64 {
        if self.battery_capacity_kwh > 0.0 {
            self.current_charge_kwh / self.battery_capacity_kwh * 100.0
        } else {
            0.0
        }
    }

    /// Returns true if the vehicle can be enrolled in V2G: it is connected
    /// and has charge above its floor.
    pub fn is_eligible(&self) -> bool {
        self.grid_connected && self.current_charge_kwh > self.floor_kwh()
    }

    /// Returns true if the vehicle can be discharged right now.
    pub fn can_discharge(&self) -> bool {
        self.v2g_enabled && self.is_eligible()
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        let label = format!("Vehicle {}", self.id);
        ensure_non_negative("battery_capacity_kwh", self.battery_capacity_kwh, &label)?;
        ensure_non_negative("current_charge_kwh", self.current_charge_kwh, &label)?;
        ensure_non_negative("charge_rate_kw", self.charge_rate_kw, &label)?;
        ensure_non_negative("discharge_rate_kw", self.discharge_rate_kw, &label)?;
        if self.current_charge_kwh > self.battery_capacity_kwh {
            return Err(Error::invalid_entity(format!(
                "{label}: current_charge_kwh {} exceeds battery_capacity_kwh {}.",
                self.current_charge_kwh, self.battery_capacity_kwh
            )));
        }
        for (field, level) in [
            ("min_charge_level", self.preferences.min_charge_level),
            ("max_discharge_level", self.preferences.max_discharge_level),
        ] {
            if !(0.0..=100.0).contains(&level) {
                return Err(Error::invalid_entity(format!(
                    "{label}: {field} must be between 0 and 100, got {level}."
                )));
            }
        }
        Ok(())
    }
}
