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

use super::{Context, Process, Step};
use crate::{block::BlockKind, control, err::SimError, holding::ParkedTruck};
use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    time::TimePoint,
};
use dock_sim_model::{
    id::TruckId,
    job::{JobKind, Location},
    lane::Lane,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Arriving,
    DrivingIn,
    WaitingForLane,
    Parked(Lane),
    DrivingOut,
}

/// Drives in through the gate, parks at a lane, exchanges containers with
/// the transporters and drives out again.
#[derive(Debug, Clone)]
pub struct TruckProcess<T: SimVariable> {
    truck: TruckId,
    arrived: TimePoint<T>,
    phase: Phase,
}

impl<T: SimVariable> TruckProcess<T> {
    pub fn new(truck: TruckId) -> Self {
        Self {
            truck,
            arrived: TimePoint::zero(),
            phase: Phase::Arriving,
        }
    }

    fn unknown(&self) -> SimError {
        SimError::UnknownEntity {
            kind: "truck",
            id: self.truck.value(),
        }
    }

    fn drive(&mut self, ctx: &mut Context<'_, T>, next: Phase) -> Result<(), SimError> {
        let distance = ctx.world.gate_distance;
        let time = ctx
            .world
            .trucks
            .get_mut(self.truck.index())
            .ok_or_else(|| self.unknown())?
            .drive(distance);
        ctx.kernel.hold(ctx.pid, time);
        self.phase = next;
        Ok(())
    }

    fn request_lane(&mut self, ctx: &mut Context<'_, T>, first: bool) -> Result<Step, SimError> {
        let area = ctx
            .world
            .trucks
            .get(self.truck.index())
            .ok_or_else(|| self.unknown())?
            .holding_area();
        let lanes = ctx
            .world
            .holding_areas
            .get_mut(area.index())
            .ok_or(SimError::UnknownEntity {
                kind: "holding area",
                id: area.value(),
            })?
            .lanes_mut();
        let lane = if first {
            lanes.acquire(&mut *ctx.kernel, ctx.pid)
        } else {
            lanes.resume(&mut *ctx.kernel, ctx.pid)
        };
        match lane {
            Ok(Some(lane)) => self.park(ctx, lane)?,
            Ok(None) => self.phase = Phase::WaitingForLane,
            Err(e) if e.kind() == ErrorKind::QueueFull => {
                self.turned_away(ctx)?;
                return Ok(Step::Finished);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Step::Continue)
    }

    /// Leaves without a lane; nothing is delivered or collected.
    fn turned_away(&mut self, ctx: &mut Context<'_, T>) -> Result<(), SimError> {
        let truck = ctx
            .world
            .trucks
            .get_mut(self.truck.index())
            .ok_or_else(|| self.unknown())?;
        let (deliveries, pickups) = (truck.deliveries(), truck.pickups());
        truck.limit_deliveries(0);
        truck.limit_pickups(0);
        let ledger = &mut ctx.world.ledger;
        ledger.refused_trucks += 1;
        ledger.unserved_deliveries += deliveries;
        ledger.unserved_pickups += pickups;
        warn!(truck = %self.truck, deliveries, pickups, "turned away, lane queue full");
        Ok(())
    }

    /// Publishes one job per transporter load in each direction.
    fn park(&mut self, ctx: &mut Context<'_, T>, lane: Lane) -> Result<(), SimError> {
        let now = ctx.kernel.now();
        let job_units = ctx.world.transporters.job_units();
        let truck = ctx
            .world
            .trucks
            .get_mut(self.truck.index())
            .ok_or_else(|| self.unknown())?;
        truck.park(lane.number());
        let (mut deliveries, mut pickups) = (truck.deliveries(), truck.pickups());
        let at_lane = Location::Lane(lane.holding_area(), lane.number());

        let mut published = 0;
        while deliveries > 0 {
            if ctx.world.transporters.pool().demand_is_full() {
                warn!(truck = %self.truck, missing = deliveries, "job queue full, deliveries dropped");
                break;
            }
            let units = deliveries.min(job_units);
            let destination = ctx.world.reserve_storage(now, BlockKind::Export, units)?;
            let job = ctx
                .world
                .new_job(JobKind::Export, at_lane, destination, units);
            control::add_job(ctx.world, &mut *ctx.kernel, job)?;
            published += units;
            deliveries -= units;
        }
        if deliveries > 0 {
            if let Some(truck) = ctx.world.trucks.get_mut(self.truck.index()) {
                truck.limit_deliveries(published);
            }
            ctx.world.ledger.unserved_deliveries += deliveries;
        }

        let mut planned = 0;
        while pickups > 0 {
            if ctx.world.transporters.pool().demand_is_full() {
                warn!(truck = %self.truck, missing = pickups, "job queue full, pickups dropped");
                break;
            }
            let wanted = pickups.min(job_units);
            let Some((origin, units)) = ctx.world.plan_supply(now, BlockKind::Import, wanted)?
            else {
                warn!(truck = %self.truck, missing = pickups, "not enough import containers");
                break;
            };
            let job = ctx.world.new_job(JobKind::Import, origin, at_lane, units);
            control::add_job(ctx.world, &mut *ctx.kernel, job)?;
            planned += units;
            pickups -= units;
        }
        if pickups > 0 {
            let truck = ctx
                .world
                .trucks
                .get_mut(self.truck.index())
                .ok_or_else(|| self.unknown())?;
            ctx.world.ledger.unserved_pickups += pickups;
            truck.limit_pickups(planned);
        }

        self.phase = Phase::Parked(lane);
        self.wait_or_leave(ctx, lane)
    }

    fn wait_or_leave(&mut self, ctx: &mut Context<'_, T>, lane: Lane) -> Result<(), SimError> {
        let done = ctx
            .world
            .trucks
            .get(self.truck.index())
            .ok_or_else(|| self.unknown())?
            .is_done();
        let area = ctx
            .world
            .holding_areas
            .get_mut(lane.holding_area().index())
            .ok_or(SimError::UnknownEntity {
                kind: "holding area",
                id: lane.holding_area().value(),
            })?;
        if !done {
            let parked = ParkedTruck {
                truck: self.truck,
                lane: lane.number(),
            };
            area.trucks_mut()
                .wait_on_coop(&mut *ctx.kernel, ctx.pid, parked)?;
            return Ok(());
        }
        area.lanes_mut().release(&mut *ctx.kernel, lane)?;
        if let Some(truck) = ctx.world.trucks.get_mut(self.truck.index()) {
            truck.leave_lane();
        }
        self.drive(ctx, Phase::DrivingOut)
    }
}

impl<T: SimVariable> Process<T> for TruckProcess<T> {
    fn name(&self) -> String {
        self.truck.to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        match self.phase {
            Phase::Arriving => {
                self.arrived = ctx.kernel.now();
                self.drive(ctx, Phase::DrivingIn)?;
            }
            Phase::DrivingIn => return self.request_lane(ctx, true),
            Phase::WaitingForLane => return self.request_lane(ctx, false),
            Phase::Parked(lane) => {
                let waiting = ctx
                    .world
                    .holding_areas
                    .get(lane.holding_area().index())
                    .is_some_and(|a| a.trucks().is_slave_waiting(ctx.pid));
                if waiting {
                    ctx.kernel.passivate(ctx.pid);
                } else {
                    self.wait_or_leave(ctx, lane)?;
                }
            }
            Phase::DrivingOut => {
                let turnaround = ctx.kernel.now().elapsed_since(self.arrived).to_f64();
                ctx.world.ledger.truck_turnarounds.push(turnaround);
                info!(truck = %self.truck, turnaround, "truck left the terminal");
                return Ok(Step::Finished);
            }
        }
        Ok(Step::Continue)
    }
}
