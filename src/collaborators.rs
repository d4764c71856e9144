// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the traits that need to be implemented by the
//! simulators that consume the state of the network.

/**
This trait needs to be implemented by the power-flow model that the
aggregated substation loads are pushed to.

Each substation is addressed by its bus id, built from the substation's name
and secondary voltage, e.g. `"Midtown_13.8kV"`.  The model may not know every
bus; returning `false` for a load makes it get logged and skipped, it never
fails the push.

<details>
<summary>Example implementation over a load table:</summary>

```ignore
struct LoadTable(HashMap<String, f64>);

impl city_grid_cascade::PowerFlowSink for LoadTable {
    fn apply_bus_load(&mut self, bus_id: &str, load_mw: f64) -> bool {
        match self.0.get_mut(bus_id) {
            Some(load) => {
                *load = load_mw;
                true
            }
            None => false,
        }
    }
}
```

</details>
*/
pub trait PowerFlowSink {
    /// Sets the load on `bus_id`, in MW.  Returns `false` if the bus is
    /// unknown to the model.
    fn apply_bus_load(&mut self, bus_id: &str, load_mw: f64) -> bool;
}

/**
This trait needs to be implemented by the traffic simulation that controls the
signals.

An unpowered signal is expected to switch to all-red flashing, and a powered
one to return to its normal program.  Signal timing is left entirely to the
simulation.
*/
pub trait SignalSink {
    /// Sets the power state of the signal with the given id.
    fn set_signal_power(&mut self, signal_id: u64, powered: bool);
}
