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
use crate::{
    control,
    coop::{Rendezvous, Waiter},
    err::SimError,
    holding::ParkedTruck,
    script::{Cooperation, TruckHandOver, TruckTakeOver},
};
use dock_sim_core::{SimVariable, time::TimePoint};
use dock_sim_model::{
    id::{CraneId, HoldingAreaId, TransporterId},
    job::{Job, Location},
};
use tracing::{debug, warn};

/// Which end of the trip the transporter is at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Origin,
    Destination,
}

#[derive(Debug)]
enum Phase<T: SimVariable> {
    Starting,
    Idle,
    Driving(End),
    AtCrane(CraneId, End),
    AwaitingTruck(HoldingAreaId, End),
    Handling {
        holding_area: HoldingAreaId,
        end: End,
        script: Box<dyn Cooperation<T>>,
        partner: Waiter<ParkedTruck, T>,
        started: TimePoint<T>,
    },
}

/// Carries out the jobs the transport controller hands it.
///
/// At a crane the transporter is the passive side; at a truck lane it is
/// the one doing the work.
#[derive(Debug)]
pub struct TransporterProcess<T: SimVariable> {
    transporter: TransporterId,
    phase: Phase<T>,
}

impl<T: SimVariable> TransporterProcess<T> {
    pub fn new(transporter: TransporterId) -> Self {
        Self {
            transporter,
            phase: Phase::Starting,
        }
    }

    fn unknown(&self) -> SimError {
        SimError::UnknownEntity {
            kind: "transporter",
            id: self.transporter.value(),
        }
    }

    fn job(&self, ctx: &Context<'_, T>) -> Result<Job, SimError> {
        ctx.world
            .transporters
            .get(self.transporter)
            .ok_or_else(|| self.unknown())?
            .job()
            .copied()
            .ok_or(SimError::MissingJob(self.transporter))
    }

    fn drive_to(&mut self, ctx: &mut Context<'_, T>, end: End) -> Result<(), SimError> {
        let job = self.job(ctx)?;
        let target = match end {
            End::Origin => job.origin(),
            End::Destination => job.destination(),
        };
        let t = ctx
            .world
            .transporters
            .get(self.transporter)
            .ok_or_else(|| self.unknown())?;
        let distance = ctx.world.distance(t.node(), target);
        let time = t.drive_time(distance);
        let loaded = t.load() > 0;
        ctx.world.transporters.record_drive(distance, time, loaded);
        ctx.kernel.hold(ctx.pid, time);
        self.phase = Phase::Driving(end);
        Ok(())
    }

    fn arrive(&mut self, ctx: &mut Context<'_, T>, end: End) -> Result<(), SimError> {
        let job = self.job(ctx)?;
        let here = match end {
            End::Origin => job.origin(),
            End::Destination => job.destination(),
        };
        let node = ctx.world.layout().node(here);
        let now = ctx.kernel.now();
        ctx.world
            .transporters
            .get_mut(self.transporter)
            .ok_or_else(|| self.unknown())?
            .arrive_at(node);
        debug!(transporter = %self.transporter, at = %here, "arrived");

        match (here, end) {
            (Location::Crane(crane), end) => {
                let station = ctx
                    .world
                    .cranes
                    .station_mut(crane)
                    .ok_or(SimError::UnknownEntity {
                        kind: "crane",
                        id: crane.value(),
                    })?;
                let queue = match end {
                    End::Origin => station.unload_queue_mut(),
                    End::Destination => station.load_queue_mut(),
                };
                queue.wait_on_coop(&mut *ctx.kernel, ctx.pid, self.transporter)?;
                self.phase = Phase::AtCrane(crane, end);
                Ok(())
            }
            (Location::Lane(holding_area, lane), end) => {
                let area = ctx
                    .world
                    .holding_areas
                    .get_mut(holding_area.index())
                    .ok_or(SimError::UnknownEntity {
                        kind: "holding area",
                        id: holding_area.value(),
                    })?;
                match area.trucks_mut().cooperate(
                    &mut *ctx.kernel,
                    ctx.pid,
                    self.transporter,
                    Some(lane),
                )? {
                    Rendezvous::Paired(partner) => {
                        self.start_handling(ctx, holding_area, end, partner)
                    }
                    Rendezvous::Waiting => {
                        self.phase = Phase::AwaitingTruck(holding_area, end);
                        Ok(())
                    }
                }
            }
            (Location::Block(block), End::Origin) => {
                ctx.world.yard.retrieve(now, block, job.units())?;
                self.picked_up(ctx, job.units())
            }
            (Location::Overflow, End::Origin) => {
                ctx.world.yard.retrieve_from_overflow(job.units())?;
                self.picked_up(ctx, job.units())
            }
            (Location::Block(block), End::Destination) => {
                let units = self.unload_all(ctx)?;
                ctx.world.yard.store(now, block, units)?;
                self.done(ctx)
            }
            (Location::Overflow, End::Destination) => {
                let units = self.unload_all(ctx)?;
                ctx.world.yard.store_in_overflow(units);
                self.done(ctx)
            }
        }
    }

    fn picked_up(&mut self, ctx: &mut Context<'_, T>, units: u64) -> Result<(), SimError> {
        ctx.world
            .transporters
            .get_mut(self.transporter)
            .ok_or_else(|| self.unknown())?
            .pick_up_many(units);
        self.drive_to(ctx, End::Destination)
    }

    fn unload_all(&self, ctx: &mut Context<'_, T>) -> Result<u64, SimError> {
        Ok(ctx
            .world
            .transporters
            .get_mut(self.transporter)
            .ok_or_else(|| self.unknown())?
            .unload_all())
    }

    fn done(&mut self, ctx: &mut Context<'_, T>) -> Result<(), SimError> {
        control::transporter_idle(ctx.world, &mut *ctx.kernel, self.transporter)?;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn start_handling(
        &mut self,
        ctx: &mut Context<'_, T>,
        holding_area: HoldingAreaId,
        end: End,
        partner: Waiter<ParkedTruck, T>,
    ) -> Result<(), SimError> {
        let truck = partner.who().truck;
        let script: Box<dyn Cooperation<T>> = match end {
            End::Origin => Box::new(TruckHandOver {
                transporter: self.transporter,
                truck,
                remaining: self.job(ctx)?.units(),
            }),
            End::Destination => Box::new(TruckTakeOver {
                transporter: self.transporter,
                truck,
            }),
        };
        self.phase = Phase::Handling {
            holding_area,
            end,
            script,
            partner,
            started: ctx.kernel.now(),
        };
        self.handle(ctx)
    }

    fn handle(&mut self, ctx: &mut Context<'_, T>) -> Result<(), SimError> {
        let Phase::Handling {
            holding_area,
            end,
            script,
            partner,
            started,
        } = &mut self.phase
        else {
            return Ok(());
        };
        if let Some(d) = script.step(ctx.world) {
            ctx.kernel.hold(ctx.pid, d);
            return Ok(());
        }
        let (holding_area, end, partner, started) = (*holding_area, *end, *partner, *started);
        if let Some(area) = ctx.world.holding_areas.get_mut(holding_area.index()) {
            area.trucks_mut()
                .finish(&mut *ctx.kernel, ctx.pid, &partner, started);
        }
        match end {
            End::Origin => self.drive_to(ctx, End::Destination),
            End::Destination => self.done(ctx),
        }
    }
}

impl<T: SimVariable> Process<T> for TransporterProcess<T> {
    fn name(&self) -> String {
        self.transporter.to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        match &self.phase {
            Phase::Starting => self.done(ctx)?,
            Phase::Idle => {
                let has_job = ctx
                    .world
                    .transporters
                    .get(self.transporter)
                    .is_some_and(|t| t.job().is_some());
                if has_job {
                    self.drive_to(ctx, End::Origin)?;
                } else {
                    ctx.kernel.passivate(ctx.pid);
                }
            }
            Phase::Driving(end) => {
                let end = *end;
                self.arrive(ctx, end)?;
            }
            Phase::AtCrane(crane, end) => {
                let (crane, end) = (*crane, *end);
                let waiting = ctx.world.cranes.station(crane).is_some_and(|s| match end {
                    End::Origin => s.unload_queue().is_slave_waiting(ctx.pid),
                    End::Destination => s.load_queue().is_slave_waiting(ctx.pid),
                });
                if waiting {
                    ctx.kernel.passivate(ctx.pid);
                } else {
                    match end {
                        End::Origin => self.drive_to(ctx, End::Destination)?,
                        End::Destination => {
                            let left = self.unload_all(ctx)?;
                            if left > 0 {
                                warn!(transporter = %self.transporter, units = left,
                                    "crane took less than delivered");
                                ctx.world.yard.store_in_overflow(left);
                            }
                            self.done(ctx)?;
                        }
                    }
                }
            }
            Phase::AwaitingTruck(holding_area, end) => {
                let (holding_area, end) = (*holding_area, *end);
                let area = ctx
                    .world
                    .holding_areas
                    .get_mut(holding_area.index())
                    .ok_or(SimError::UnknownEntity {
                        kind: "holding area",
                        id: holding_area.value(),
                    })?;
                if let Rendezvous::Paired(partner) =
                    area.trucks_mut().resume_master(&mut *ctx.kernel, ctx.pid)?
                {
                    self.start_handling(ctx, holding_area, end, partner)?;
                }
            }
            Phase::Handling { .. } => self.handle(ctx)?,
        }
        Ok(Step::Continue)
    }
}
