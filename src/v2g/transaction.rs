// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What a transaction records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    /// The vehicle was enrolled in V2G.  Carries no energy.
    Activation,
    /// The vehicle drew energy from the grid.
    Charge,
    /// The vehicle supplied energy to the grid.
    Discharge,
    /// The vehicle left the grid.
    Idle,
}

/// An entry in the append-only V2G transaction log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub vehicle_id: u64,
    pub kind: TransactionKind,
    pub energy_kwh: f64,
    pub price_per_kwh: f64,
    pub timestamp: DateTime<Utc>,
    /// The power the transaction made available to the grid, in kW.
    pub grid_benefit_kw: f64,
}

impl Transaction {
    pub(crate) fn new(
        vehicle_id: u64,
        kind: TransactionKind,
        energy_kwh: f64,
        price_per_kwh: f64,
        grid_benefit_kw: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            kind,
            energy_kwh,
            price_per_kwh,
            timestamp: Utc::now(),
            grid_benefit_kw,
        }
    }

    /// Returns the value of the transaction: energy times price.
    pub fn value(&self) -> f64 {
        self.energy_kwh * self.price_per_kwh
    }
}
