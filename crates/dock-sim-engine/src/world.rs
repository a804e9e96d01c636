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

//! The simulated terminal: every shared resource and entity, owned in one
//! place and addressed by id.

use crate::{
    berth::Berth,
    block::BlockKind,
    cranes::CranesSystem,
    holding::HoldingArea,
    transport::TransporterSystem,
    yard::{Yard, YardError},
};
use dock_sim_core::{SimVariable, sample::DurationSampler, time::TimePoint};
use dock_sim_model::{
    distance::DistanceMatrix,
    id::{BerthId, HoldingAreaId, ShipId, TruckId},
    job::{Job, JobKind, Location},
    ship::Ship,
    truck::Truck,
};
use tracing::{debug, warn};

/// Node numbers of the terminal layout.
///
/// Cranes come first, then blocks, then holding areas, then the overflow
/// area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    cranes: usize,
    blocks: usize,
    holding_areas: usize,
}

impl Layout {
    pub fn new(cranes: usize, blocks: usize, holding_areas: usize) -> Self {
        Self {
            cranes,
            blocks,
            holding_areas,
        }
    }

    /// Number of nodes a distance matrix must cover.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.cranes + self.blocks + self.holding_areas + 1
    }

    pub fn node(&self, location: Location) -> usize {
        match location {
            Location::Crane(c) => c.index(),
            Location::Block(b) => self.cranes + b.index(),
            Location::Lane(h, _) => self.cranes + self.blocks + h.index(),
            Location::Overflow => self.cranes + self.blocks + self.holding_areas,
        }
    }
}

/// Outcomes the run is judged by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub ship_turnarounds: Vec<f64>,
    pub truck_turnarounds: Vec<f64>,
    pub unserved_load: u64,
    pub unserved_unload: u64,
    pub unserved_pickups: u64,
    pub delivered_by_trucks: u64,
    pub collected_by_trucks: u64,
    pub unserved_deliveries: u64,
    /// Ships turned away because a berth or crane queue was full.
    pub refused_ships: u64,
    /// Trucks turned away because a lane queue was full.
    pub refused_trucks: u64,
}

#[derive(Debug)]
pub struct World<T: SimVariable> {
    pub(crate) berths: Vec<Berth<T>>,
    pub(crate) yard: Yard<T>,
    pub(crate) holding_areas: Vec<HoldingArea<T>>,
    pub(crate) cranes: CranesSystem<T>,
    pub(crate) transporters: TransporterSystem<T>,
    pub(crate) ships: Vec<Ship>,
    pub(crate) trucks: Vec<Truck<T>>,
    pub(crate) distances: DistanceMatrix,
    pub(crate) layout: Layout,
    pub(crate) gate_distance: f64,
    pub(crate) crane_handling: Box<dyn DurationSampler<T>>,
    pub(crate) truck_handling: Box<dyn DurationSampler<T>>,
    pub(crate) ledger: Ledger,
}

impl<T: SimVariable> World<T> {
    #[inline]
    pub fn berths(&self) -> &[Berth<T>] {
        &self.berths
    }

    #[inline]
    pub fn berth(&self, id: BerthId) -> Option<&Berth<T>> {
        self.berths.get(id.index())
    }

    #[inline]
    pub fn yard(&self) -> &Yard<T> {
        &self.yard
    }

    #[inline]
    pub fn holding_areas(&self) -> &[HoldingArea<T>] {
        &self.holding_areas
    }

    #[inline]
    pub fn holding_area(&self, id: HoldingAreaId) -> Option<&HoldingArea<T>> {
        self.holding_areas.get(id.index())
    }

    #[inline]
    pub fn cranes(&self) -> &CranesSystem<T> {
        &self.cranes
    }

    #[inline]
    pub fn transporters(&self) -> &TransporterSystem<T> {
        &self.transporters
    }

    #[inline]
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    #[inline]
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(id.index())
    }

    #[inline]
    pub fn trucks(&self) -> &[Truck<T>] {
        &self.trucks
    }

    #[inline]
    pub fn truck(&self, id: TruckId) -> Option<&Truck<T>> {
        self.trucks.get(id.index())
    }

    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[inline]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Distance between two locations. Unknown nodes count as zero.
    pub fn distance(&self, from: usize, to: Location) -> f64 {
        let to = self.layout.node(to);
        self.distances.distance(from, to).unwrap_or_else(|| {
            warn!(from, to, "distance outside the matrix");
            0.0
        })
    }

    pub(crate) fn new_job(
        &mut self,
        kind: JobKind,
        origin: Location,
        destination: Location,
        units: u64,
    ) -> Job {
        let id = self.transporters.next_job_id();
        let job = Job::new(id, kind, origin, destination, units);
        debug!(job = %job, "job created");
        job
    }

    /// Reserves room for `units` containers of the given flow and returns
    /// where they should go. Falls back to the overflow area.
    pub(crate) fn reserve_storage(
        &mut self,
        now: TimePoint<T>,
        flow: BlockKind,
        units: u64,
    ) -> Result<Location, YardError> {
        let candidates = self
            .yard
            .candidates(|b| b.kind().serves(flow) && b.is_free(units));
        match self.yard.choose_block(&candidates) {
            Some(block) => {
                self.yard.reserve(now, block, units)?;
                Ok(Location::Block(block))
            }
            None => {
                warn!(units, flow = ?flow, "no block has room, using overflow");
                Ok(Location::Overflow)
            }
        }
    }

    /// Plans the retrieval of up to `wanted` containers of the given flow.
    /// Prefers a block that can supply everything, then the best partial
    /// block, then the overflow area.
    pub(crate) fn plan_supply(
        &mut self,
        now: TimePoint<T>,
        flow: BlockKind,
        wanted: u64,
    ) -> Result<Option<(Location, u64)>, YardError> {
        if wanted == 0 {
            return Ok(None);
        }
        let full = self
            .yard
            .candidates(|b| b.kind().serves(flow) && b.plannable() >= wanted);
        if let Some(block) = self.yard.choose_block(&full) {
            self.yard.plan(now, block, wanted)?;
            return Ok(Some((Location::Block(block), wanted)));
        }
        let partial = self
            .yard
            .candidates(|b| b.kind().serves(flow) && b.plannable() > 0);
        if let Some(block) = self.yard.choose_block(&partial) {
            let units = self
                .yard
                .block(block)
                .map_or(0, |b| b.plannable())
                .min(wanted);
            self.yard.plan(now, block, units)?;
            return Ok(Some((Location::Block(block), units)));
        }
        let units = self.yard.overflow_plannable().min(wanted);
        if units > 0 {
            self.yard.plan_overflow(units)?;
            return Ok(Some((Location::Overflow, units)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_sim_model::id::{BlockId, CraneId, LaneNumber};

    #[test]
    fn test_layout_numbers_nodes_in_order() {
        let l = Layout::new(2, 3, 1);
        assert_eq!(l.nodes(), 7);
        assert_eq!(l.node(Location::Crane(CraneId::new(1))), 1);
        assert_eq!(l.node(Location::Block(BlockId::new(0))), 2);
        assert_eq!(
            l.node(Location::Lane(HoldingAreaId::new(0), LaneNumber::new(3))),
            5
        );
        assert_eq!(l.node(Location::Overflow), 6);
    }
}
