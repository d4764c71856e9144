// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the configuration options for a grid session.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Configuration options for a [`GridSession`][crate::GridSession].
///
/// All fields have defaults. Load from TOML with
/// [`GridConfig::from_toml_str`] or [`GridConfig::from_toml_file`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Nominal consumer draws.
    pub loads: LoadConfig,
    /// Cascade reporting options.
    pub cascade: CascadeConfig,
    /// Vehicle-to-grid pricing and defaults.
    pub v2g: V2gConfig,
}

/// Nominal power draw of consumers, in kW.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Draw of a single traffic light.
    pub traffic_light_kw: f64,
    /// Rated power of a single EV charger.
    pub ev_station_kw: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            traffic_light_kw: 0.3,
            ev_station_kw: 7.2,
        }
    }
}

/// Options for cascade impact reports.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeConfig {
    /// Maximum number of affected consumer labels listed in a report.
    pub affected_sample_limit: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            affected_sample_limit: 10,
        }
    }
}

/// Vehicle-to-grid pricing and owner preference defaults.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct V2gConfig {
    /// Price paid per kWh discharged to the grid.
    pub premium_price_per_kwh: f64,
    /// Price charged per kWh drawn from the grid.
    pub charge_price_per_kwh: f64,
    /// Number of transactions included in a status view.
    pub recent_transaction_limit: usize,
    /// Default minimum state of charge, in percent of capacity.
    pub default_min_charge_level: f64,
    /// Default maximum energy per dispatch, in percent of capacity.
    pub default_max_discharge_level: f64,
}

impl Default for V2gConfig {
    fn default() -> Self {
        Self {
            premium_price_per_kwh: 0.25,
            charge_price_per_kwh: 0.12,
            recent_transaction_limit: 10,
            default_min_charge_level: 20.0,
            default_max_discharge_level: 80.0,
        }
    }
}

impl GridConfig {
    /// Parses and validates a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        let config: GridConfig =
            toml::from_str(s).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_toml_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!("Can't read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that every value is within its allowed range.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("loads.traffic_light_kw", self.loads.traffic_light_kw),
            ("loads.ev_station_kw", self.loads.ev_station_kw),
            ("v2g.premium_price_per_kwh", self.v2g.premium_price_per_kwh),
            ("v2g.charge_price_per_kwh", self.v2g.charge_price_per_kwh),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(Error::invalid_config(format!("{name} must be >= 0.")));
            }
        }
        for (name, level) in [
            ("v2g.default_min_charge_level", self.v2g.default_min_charge_level),
            (
                "v2g.default_max_discharge_level",
                self.v2g.default_max_discharge_level,
            ),
        ] {
            if !(0.0..=100.0).contains(&level) {
                return Err(Error::invalid_config(format!(
                    "{name} must be between 0 and 100, got {level}."
                )));
            }
        }
        Ok(())
    }
}
