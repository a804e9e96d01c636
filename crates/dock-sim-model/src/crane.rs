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

use crate::id::{CraneId, ShipId};
use dock_sim_core::{SimVariable, kernel::ProcessId, time::TimeDelta};

/// What a crane did for one ship, handed back when the assignment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CraneShift {
    pub ship: ShipId,
    pub unloaded: u64,
    pub loaded: u64,
}

/// A quay crane moving containers between a ship and transporters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crane<T: SimVariable> {
    id: CraneId,
    process: ProcessId,
    ship: Option<ShipId>,
    to_unload: u64,
    to_load: u64,
    unloaded: u64,
    loaded: u64,
    unload_time: TimeDelta<T>,
    load_time: TimeDelta<T>,
}

impl<T: SimVariable> Crane<T> {
    pub fn new(id: CraneId, process: ProcessId) -> Self {
        Self {
            id,
            process,
            ship: None,
            to_unload: 0,
            to_load: 0,
            unloaded: 0,
            loaded: 0,
            unload_time: TimeDelta::zero(),
            load_time: TimeDelta::zero(),
        }
    }

    #[inline]
    pub fn id(&self) -> CraneId {
        self.id
    }

    #[inline]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    pub fn ship(&self) -> Option<ShipId> {
        self.ship
    }

    #[inline]
    pub fn to_unload(&self) -> u64 {
        self.to_unload
    }

    #[inline]
    pub fn to_load(&self) -> u64 {
        self.to_load
    }

    #[inline]
    pub fn unloaded(&self) -> u64 {
        self.unloaded
    }

    #[inline]
    pub fn loaded(&self) -> u64 {
        self.loaded
    }

    /// Time spent discharging since the crane was created.
    #[inline]
    pub fn unload_time(&self) -> TimeDelta<T> {
        self.unload_time
    }

    #[inline]
    pub fn load_time(&self) -> TimeDelta<T> {
        self.load_time
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.ship.is_some()
    }

    /// Starts serving `ship` with the given share of its workload.
    pub fn assign(&mut self, ship: ShipId, to_unload: u64, to_load: u64) {
        self.ship = Some(ship);
        self.to_unload = to_unload;
        self.to_load = to_load;
        self.unloaded = 0;
        self.loaded = 0;
    }

    /// Discharges one container that took `duration`.
    pub fn unload_unit(&mut self, duration: TimeDelta<T>) -> bool {
        if self.to_unload == 0 {
            return false;
        }
        self.to_unload -= 1;
        self.unloaded += 1;
        self.unload_time = self.unload_time.saturating_add(duration);
        true
    }

    /// Loads one container that took `duration`.
    pub fn load_unit(&mut self, duration: TimeDelta<T>) -> bool {
        if self.to_load == 0 {
            return false;
        }
        self.to_load -= 1;
        self.loaded += 1;
        self.load_time = self.load_time.saturating_add(duration);
        true
    }

    /// Gives up loading more units than the terminal can supply.
    pub fn limit_load(&mut self, available: u64) {
        self.to_load = self.to_load.min(available);
    }

    pub fn limit_unload(&mut self, available: u64) {
        self.to_unload = self.to_unload.min(available);
    }

    /// Ends the current assignment and resets the per-ship counters.
    pub fn release(&mut self) -> Option<CraneShift> {
        let ship = self.ship.take()?;
        let shift = CraneShift {
            ship,
            unloaded: self.unloaded,
            loaded: self.loaded,
        };
        self.to_unload = 0;
        self.to_load = 0;
        self.unloaded = 0;
        self.loaded = 0;
        Some(shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_cycle() {
        let mut c: Crane<i64> = Crane::new(CraneId::new(0), ProcessId::new(3));
        assert!(c.release().is_none());
        c.assign(ShipId::new(9), 2, 1);
        assert!(c.unload_unit(TimeDelta::new(3)));
        assert!(c.unload_unit(TimeDelta::new(3)));
        assert!(!c.unload_unit(TimeDelta::new(3)));
        assert!(c.load_unit(TimeDelta::new(4)));
        assert_eq!(c.unload_time(), TimeDelta::new(6));
        let shift = c.release().unwrap();
        assert_eq!(
            shift,
            CraneShift {
                ship: ShipId::new(9),
                unloaded: 2,
                loaded: 1
            }
        );
        assert!(!c.is_assigned());
        assert_eq!(c.unloaded(), 0);
        assert_eq!(c.load_time(), TimeDelta::new(4));
    }

    #[test]
    fn test_limits_only_lower_the_share() {
        let mut c: Crane<i64> = Crane::new(CraneId::new(0), ProcessId::new(3));
        c.assign(ShipId::new(1), 4, 3);
        c.limit_unload(6);
        c.limit_load(1);
        assert_eq!((c.to_unload(), c.to_load()), (4, 1));
        c.limit_unload(0);
        assert!(!c.unload_unit(TimeDelta::new(1)));
    }
}
