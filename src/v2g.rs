// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Vehicle-to-grid dispatch: a fleet of connected vehicles whose batteries
//! can be discharged to make up for lost supply, without ever dropping a
//! vehicle below the charge level its owner wants to keep.

mod dispatcher;
mod transaction;
mod vehicle;

pub use dispatcher::{
    ActivationResult, DischargeResult, LocationStatus, V2gDispatcher, V2gStatus, VehicleDischarge,
};
pub use transaction::{Transaction, TransactionKind};
pub use vehicle::{OwnerPreferences, Vehicle};
