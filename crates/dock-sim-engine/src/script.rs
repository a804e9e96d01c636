// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Cooperation scripts.
//!
//! A script is what the master does while it owns a slave: it moves one
//! container per step and tells the master how long that took. The master
//! holds for that time and steps again until the script is exhausted.

use crate::world::World;
use dock_sim_core::{SimVariable, time::TimeDelta};
use dock_sim_model::id::{CraneId, TransporterId, TruckId};
use std::fmt::Debug;

pub trait Cooperation<T: SimVariable>: Debug + Send {
    /// Moves one container. Returns `None` once nothing is left to move.
    fn step(&mut self, world: &mut World<T>) -> Option<TimeDelta<T>>;
}

/// Crane discharges containers from its ship onto a transporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unloading {
    pub crane: CraneId,
    pub transporter: TransporterId,
    pub remaining: u64,
}

impl<T: SimVariable> Cooperation<T> for Unloading {
    fn step(&mut self, world: &mut World<T>) -> Option<TimeDelta<T>> {
        if self.remaining == 0 {
            return None;
        }
        let t = world.transporters.get(self.transporter)?;
        if t.is_full() {
            return None;
        }
        let c = world.cranes.station(self.crane)?.crane();
        if c.to_unload() == 0 {
            return None;
        }
        let d = world.crane_handling.sample();
        world.cranes.station_mut(self.crane)?.crane_mut().unload_unit(d);
        world.transporters.get_mut(self.transporter)?.pick_up();
        world.cranes.record_unload(d);
        self.remaining -= 1;
        Some(d)
    }
}

/// Crane lifts containers from a transporter into its ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loading {
    pub crane: CraneId,
    pub transporter: TransporterId,
}

impl<T: SimVariable> Cooperation<T> for Loading {
    fn step(&mut self, world: &mut World<T>) -> Option<TimeDelta<T>> {
        if world.transporters.get(self.transporter)?.load() == 0 {
            return None;
        }
        if world.cranes.station(self.crane)?.crane().to_load() == 0 {
            return None;
        }
        let d = world.crane_handling.sample();
        world.cranes.station_mut(self.crane)?.crane_mut().load_unit(d);
        world.transporters.get_mut(self.transporter)?.put_down();
        world.cranes.record_load(d);
        Some(d)
    }
}

/// A truck at a lane hands containers to a transporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruckHandOver {
    pub transporter: TransporterId,
    pub truck: TruckId,
    pub remaining: u64,
}

impl<T: SimVariable> Cooperation<T> for TruckHandOver {
    fn step(&mut self, world: &mut World<T>) -> Option<TimeDelta<T>> {
        if self.remaining == 0 || world.transporters.get(self.transporter)?.is_full() {
            return None;
        }
        if world.trucks.get(self.truck.index())?.deliveries() == 0 {
            return None;
        }
        let d = world.truck_handling.sample();
        world.trucks.get_mut(self.truck.index())?.hand_over();
        world.transporters.get_mut(self.transporter)?.pick_up();
        world.ledger.delivered_by_trucks += 1;
        self.remaining -= 1;
        Some(d)
    }
}

/// A transporter puts containers onto a truck at a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruckTakeOver {
    pub transporter: TransporterId,
    pub truck: TruckId,
}

impl<T: SimVariable> Cooperation<T> for TruckTakeOver {
    fn step(&mut self, world: &mut World<T>) -> Option<TimeDelta<T>> {
        if world.transporters.get(self.transporter)?.load() == 0 {
            return None;
        }
        if world.trucks.get(self.truck.index())?.pickups() == 0 {
            return None;
        }
        let d = world.truck_handling.sample();
        world.trucks.get_mut(self.truck.index())?.receive();
        world.transporters.get_mut(self.transporter)?.put_down();
        world.ledger.collected_by_trucks += 1;
        Some(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TerminalConfig, sim::Simulation};
    use dock_sim_model::id::ShipId;

    fn run_script<T: SimVariable>(
        script: &mut dyn Cooperation<T>,
        world: &mut World<T>,
    ) -> Vec<TimeDelta<T>> {
        std::iter::from_fn(|| script.step(world)).collect()
    }

    #[test]
    fn test_unloading_stops_when_transporter_is_full() {
        let mut sim = Simulation::<i64>::new(&TerminalConfig::default()).unwrap();
        let (world, _) = sim.parts_mut();
        let crane = CraneId::new(0);
        let transporter = TransporterId::new(0);
        world
            .cranes
            .station_mut(crane)
            .unwrap()
            .crane_mut()
            .assign(ShipId::new(0), 5, 0);

        let mut script = Unloading {
            crane,
            transporter,
            remaining: 5,
        };
        let steps = run_script(&mut script, world);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|d| (2..=4).contains(&d.value())));
        assert_eq!(world.transporters.get(transporter).unwrap().load(), 2);
        assert_eq!(world.cranes.station(crane).unwrap().crane().to_unload(), 3);
        assert_eq!(world.cranes.unloaded(), 2);
        assert_eq!(script.remaining, 3);
    }

    #[test]
    fn test_loading_stops_when_ship_is_complete() {
        let mut sim = Simulation::<i64>::new(&TerminalConfig::default()).unwrap();
        let (world, _) = sim.parts_mut();
        let crane = CraneId::new(1);
        let transporter = TransporterId::new(1);
        world
            .cranes
            .station_mut(crane)
            .unwrap()
            .crane_mut()
            .assign(ShipId::new(0), 0, 1);
        world.transporters.get_mut(transporter).unwrap().pick_up_many(2);

        let steps = run_script(&mut Loading { crane, transporter }, world);
        assert_eq!(steps.len(), 1);
        assert_eq!(world.transporters.get(transporter).unwrap().load(), 1);
        assert_eq!(world.cranes.loaded(), 1);
    }

    #[test]
    fn test_truck_exchange_counts_containers() {
        let mut sim = Simulation::<i64>::new(&TerminalConfig::default()).unwrap();
        let (world, _) = sim.parts_mut();
        let truck = TruckId::new(0);
        let transporter = TransporterId::new(2);

        let mut hand_over = TruckHandOver {
            transporter,
            truck,
            remaining: 3,
        };
        let steps = run_script(&mut hand_over, world);
        assert_eq!(steps, vec![TimeDelta::new(2); 2]);
        assert_eq!(world.trucks[0].deliveries(), 2);
        assert_eq!(world.ledger.delivered_by_trucks, 2);

        let steps = run_script(&mut TruckTakeOver { transporter, truck }, world);
        assert_eq!(steps.len(), 2);
        assert_eq!(world.trucks[0].pickups(), 1);
        assert_eq!(world.transporters.get(transporter).unwrap().load(), 0);
        assert_eq!(world.ledger.collected_by_trucks, 2);
    }
}
