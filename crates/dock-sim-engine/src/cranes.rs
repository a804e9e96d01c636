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

//! The quay crane system: crane stations, the crane pool and the record of
//! which ship each working crane serves.

use crate::{
    assign::ShipDemand,
    coop::RendezvousQueue,
    pool::AssignablePool,
};
use dock_sim_core::{SimVariable, kernel::ProcessId, time::TimeDelta, time::TimePoint};
use dock_sim_model::{
    crane::Crane,
    id::{CraneId, ShipId, TransporterId},
};
use std::collections::HashMap;

/// One crane and the two queues transporters meet it in.
#[derive(Debug, Clone)]
pub struct CraneStation<T: SimVariable> {
    crane: Crane<T>,
    unload: RendezvousQueue<CraneId, TransporterId, T>,
    load: RendezvousQueue<CraneId, TransporterId, T>,
}

impl<T: SimVariable> CraneStation<T> {
    pub fn new(
        crane: Crane<T>,
        unload: RendezvousQueue<CraneId, TransporterId, T>,
        load: RendezvousQueue<CraneId, TransporterId, T>,
    ) -> Self {
        Self {
            crane,
            unload,
            load,
        }
    }

    #[inline]
    pub fn crane(&self) -> &Crane<T> {
        &self.crane
    }

    #[inline]
    pub fn crane_mut(&mut self) -> &mut Crane<T> {
        &mut self.crane
    }

    /// Transporters waiting to receive discharged containers.
    #[inline]
    pub fn unload_queue(&self) -> &RendezvousQueue<CraneId, TransporterId, T> {
        &self.unload
    }

    #[inline]
    pub fn unload_queue_mut(&mut self) -> &mut RendezvousQueue<CraneId, TransporterId, T> {
        &mut self.unload
    }

    /// Transporters waiting to hand over containers for loading.
    #[inline]
    pub fn load_queue(&self) -> &RendezvousQueue<CraneId, TransporterId, T> {
        &self.load
    }

    #[inline]
    pub fn load_queue_mut(&mut self) -> &mut RendezvousQueue<CraneId, TransporterId, T> {
        &mut self.load
    }
}

#[derive(Debug, Clone)]
pub struct CranesSystem<T: SimVariable> {
    stations: Vec<CraneStation<T>>,
    pool: AssignablePool<CraneId, ShipDemand>,
    control: ProcessId,
    serving: HashMap<ShipId, usize>,
    unloaded: u64,
    loaded: u64,
    unload_time: TimeDelta<T>,
    load_time: TimeDelta<T>,
    reset_at: TimePoint<T>,
}

impl<T: SimVariable> CranesSystem<T> {
    /// `pool` should admit every station's crane.
    pub fn new(
        stations: Vec<CraneStation<T>>,
        pool: AssignablePool<CraneId, ShipDemand>,
        control: ProcessId,
    ) -> Self {
        Self {
            stations,
            pool,
            control,
            serving: HashMap::new(),
            unloaded: 0,
            loaded: 0,
            unload_time: TimeDelta::zero(),
            load_time: TimeDelta::zero(),
            reset_at: TimePoint::zero(),
        }
    }

    /// The controller process dispatching cranes.
    #[inline]
    pub fn control(&self) -> ProcessId {
        self.control
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    #[inline]
    pub fn station(&self, id: CraneId) -> Option<&CraneStation<T>> {
        self.stations.get(id.index())
    }

    #[inline]
    pub fn station_mut(&mut self, id: CraneId) -> Option<&mut CraneStation<T>> {
        self.stations.get_mut(id.index())
    }

    #[inline]
    pub fn stations(&self) -> &[CraneStation<T>] {
        &self.stations
    }

    #[inline]
    pub fn pool(&self) -> &AssignablePool<CraneId, ShipDemand> {
        &self.pool
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut AssignablePool<CraneId, ShipDemand> {
        &mut self.pool
    }

    /// Whether the ship still waits for cranes or is being worked on.
    pub fn is_serving(&self, ship: ShipId) -> bool {
        self.serving.contains_key(&ship) || self.pool.demand().any(|d| d.ship == ship)
    }

    /// Cranes currently working on `ship`.
    #[inline]
    pub fn active_for(&self, ship: ShipId) -> usize {
        self.serving.get(&ship).copied().unwrap_or(0)
    }

    pub(crate) fn start_service(&mut self, ship: ShipId, cranes: usize) {
        self.serving.insert(ship, cranes);
    }

    /// Counts one crane off `ship`. Returns `true` when it was the last one.
    pub(crate) fn end_service(&mut self, ship: ShipId) -> bool {
        match self.serving.get_mut(&ship) {
            Some(n) if *n > 1 => {
                *n -= 1;
                false
            }
            Some(_) => {
                self.serving.remove(&ship);
                true
            }
            None => false,
        }
    }

    pub(crate) fn record_unload(&mut self, duration: TimeDelta<T>) {
        self.unloaded += 1;
        self.unload_time = self.unload_time.saturating_add(duration);
    }

    pub(crate) fn record_load(&mut self, duration: TimeDelta<T>) {
        self.loaded += 1;
        self.load_time = self.load_time.saturating_add(duration);
    }

    #[inline]
    pub fn unloaded(&self) -> u64 {
        self.unloaded
    }

    #[inline]
    pub fn loaded(&self) -> u64 {
        self.loaded
    }

    #[inline]
    pub fn unload_time(&self) -> TimeDelta<T> {
        self.unload_time
    }

    #[inline]
    pub fn load_time(&self) -> TimeDelta<T> {
        self.load_time
    }

    /// Share of the available crane time spent handling containers.
    pub fn avg_usage(&self, now: TimePoint<T>) -> Option<f64> {
        let elapsed = now.elapsed_since(self.reset_at).to_f64();
        if elapsed <= 0.0 || self.stations.is_empty() {
            return None;
        }
        let busy = self.unload_time.saturating_add(self.load_time).to_f64();
        Some(busy / (self.stations.len() as f64 * elapsed))
    }

    pub fn reset(&mut self, now: TimePoint<T>) {
        self.unloaded = 0;
        self.loaded = 0;
        self.unload_time = TimeDelta::zero();
        self.load_time = TimeDelta::zero();
        self.reset_at = now;
        for s in &mut self.stations {
            s.unload.reset();
            s.load.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(n: u64) -> CranesSystem<i64> {
        let stations = (0..n)
            .map(|i| {
                CraneStation::new(
                    Crane::new(CraneId::new(i), ProcessId::new(10 + i)),
                    RendezvousQueue::default(),
                    RendezvousQueue::default(),
                )
            })
            .collect();
        CranesSystem::new(stations, AssignablePool::fifo(n as usize), ProcessId::new(0))
    }

    #[test]
    fn test_service_counting() {
        let mut s = system(2);
        let ship = ShipId::new(4);
        assert!(!s.is_serving(ship));
        s.pool_mut()
            .add_demand(ShipDemand { ship, cranes: 2 })
            .unwrap();
        assert!(s.is_serving(ship));
        s.pool_mut().remove_demand_where(|d| d.ship == ship);
        s.start_service(ship, 2);
        assert_eq!(s.active_for(ship), 2);
        assert!(!s.end_service(ship));
        assert!(s.end_service(ship));
        assert!(!s.is_serving(ship));
        assert!(!s.end_service(ship));
    }

    #[test]
    fn test_avg_usage() {
        let mut s = system(2);
        assert_eq!(s.avg_usage(TimePoint::new(0)), None);
        s.record_unload(TimeDelta::new(6));
        s.record_load(TimeDelta::new(4));
        assert_eq!(s.unloaded(), 1);
        assert_eq!(s.avg_usage(TimePoint::new(10)), Some(0.5));
        s.reset(TimePoint::new(10));
        assert_eq!(s.avg_usage(TimePoint::new(20)), Some(0.0));
    }

    #[test]
    fn test_station_lookup() {
        let s = system(3);
        assert_eq!(s.len(), 3);
        assert_eq!(
            s.station(CraneId::new(2)).map(|st| st.crane().process()),
            Some(ProcessId::new(12))
        );
        assert!(s.station(CraneId::new(3)).is_none());
    }
}
