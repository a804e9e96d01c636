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
    block::BlockKind,
    control,
    coop::{Rendezvous, Waiter},
    err::SimError,
    script::{Cooperation, Loading, Unloading},
};
use dock_sim_core::{SimVariable, time::TimePoint};
use dock_sim_model::{
    id::{CraneId, TransporterId},
    job::{JobKind, Location},
};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Unload,
    Load,
}

#[derive(Debug)]
enum Phase<T: SimVariable> {
    Starting,
    Idle,
    AwaitingTransporter(Direction),
    Handling {
        direction: Direction,
        script: Box<dyn Cooperation<T>>,
        partner: Waiter<TransporterId, T>,
        started: TimePoint<T>,
    },
}

/// Works through its share of a ship, one transporter load at a time.
///
/// For every load the crane first publishes the matching job, then waits
/// at its station for the transporter the job was given to.
#[derive(Debug)]
pub struct CraneProcess<T: SimVariable> {
    crane: CraneId,
    phase: Phase<T>,
}

impl<T: SimVariable> CraneProcess<T> {
    pub fn new(crane: CraneId) -> Self {
        Self {
            crane,
            phase: Phase::Starting,
        }
    }

    fn unknown(&self) -> SimError {
        SimError::UnknownEntity {
            kind: "crane",
            id: self.crane.value(),
        }
    }

    fn next_move(&mut self, ctx: &mut Context<'_, T>) -> Result<(), SimError> {
        let now = ctx.kernel.now();
        let job_units = ctx.world.transporters.job_units();
        let crane = ctx
            .world
            .cranes
            .station(self.crane)
            .ok_or_else(|| self.unknown())?
            .crane();
        let (to_unload, to_load) = (crane.to_unload(), crane.to_load());

        if (to_unload > 0 || to_load > 0) && ctx.world.transporters.pool().demand_is_full() {
            warn!(crane = %self.crane, unserved_unload = to_unload, unserved_load = to_load,
                "job queue full, crane stops");
            if let Some(s) = ctx.world.cranes.station_mut(self.crane) {
                s.crane_mut().limit_unload(0);
                s.crane_mut().limit_load(0);
            }
            return self.go_idle(ctx);
        }

        let direction = if to_unload > 0 {
            let units = to_unload.min(job_units);
            let destination = ctx.world.reserve_storage(now, BlockKind::Import, units)?;
            let job = ctx.world.new_job(
                JobKind::Import,
                Location::Crane(self.crane),
                destination,
                units,
            );
            control::add_job(ctx.world, &mut *ctx.kernel, job)?;
            Direction::Unload
        } else if to_load > 0 {
            let wanted = to_load.min(job_units);
            match ctx.world.plan_supply(now, BlockKind::Export, wanted)? {
                Some((origin, units)) => {
                    let job = ctx.world.new_job(
                        JobKind::Export,
                        origin,
                        Location::Crane(self.crane),
                        units,
                    );
                    control::add_job(ctx.world, &mut *ctx.kernel, job)?;
                    Direction::Load
                }
                None => {
                    warn!(crane = %self.crane, missing = to_load, "no export containers left, loading stops");
                    if let Some(s) = ctx.world.cranes.station_mut(self.crane) {
                        s.crane_mut().limit_load(0);
                    }
                    return self.go_idle(ctx);
                }
            }
        } else {
            return self.go_idle(ctx);
        };
        self.cooperate(ctx, direction)
    }

    fn go_idle(&mut self, ctx: &mut Context<'_, T>) -> Result<(), SimError> {
        control::crane_idle(ctx.world, &mut *ctx.kernel, self.crane)?;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn cooperate(&mut self, ctx: &mut Context<'_, T>, direction: Direction) -> Result<(), SimError> {
        let station = ctx
            .world
            .cranes
            .station_mut(self.crane)
            .ok_or_else(|| self.unknown())?;
        let queue = match direction {
            Direction::Unload => station.unload_queue_mut(),
            Direction::Load => station.load_queue_mut(),
        };
        match queue.cooperate(&mut *ctx.kernel, ctx.pid, self.crane, None)? {
            Rendezvous::Paired(partner) => self.start_handling(ctx, direction, partner),
            Rendezvous::Waiting => {
                self.phase = Phase::AwaitingTransporter(direction);
                Ok(())
            }
        }
    }

    fn start_handling(
        &mut self,
        ctx: &mut Context<'_, T>,
        direction: Direction,
        partner: Waiter<TransporterId, T>,
    ) -> Result<(), SimError> {
        let transporter = partner.who();
        let script: Box<dyn Cooperation<T>> = match direction {
            Direction::Unload => {
                let remaining = ctx
                    .world
                    .transporters
                    .get(transporter)
                    .and_then(|t| t.job())
                    .map_or(0, |j| j.units());
                Box::new(Unloading {
                    crane: self.crane,
                    transporter,
                    remaining,
                })
            }
            Direction::Load => Box::new(Loading {
                crane: self.crane,
                transporter,
            }),
        };
        debug!(crane = %self.crane, transporter = %transporter, "handling starts");
        self.phase = Phase::Handling {
            direction,
            script,
            partner,
            started: ctx.kernel.now(),
        };
        self.handle(ctx)
    }

    fn handle(&mut self, ctx: &mut Context<'_, T>) -> Result<(), SimError> {
        let Phase::Handling {
            direction,
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
        let (direction, partner, started) = (*direction, *partner, *started);
        let station = ctx
            .world
            .cranes
            .station_mut(self.crane)
            .ok_or_else(|| self.unknown())?;
        let queue = match direction {
            Direction::Unload => station.unload_queue_mut(),
            Direction::Load => station.load_queue_mut(),
        };
        queue.finish(&mut *ctx.kernel, ctx.pid, &partner, started);
        self.next_move(ctx)
    }
}

impl<T: SimVariable> Process<T> for CraneProcess<T> {
    fn name(&self) -> String {
        self.crane.to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        match &self.phase {
            Phase::Starting => self.go_idle(ctx)?,
            Phase::Idle => {
                let assigned = ctx
                    .world
                    .cranes
                    .station(self.crane)
                    .is_some_and(|s| s.crane().is_assigned());
                if assigned {
                    self.next_move(ctx)?;
                } else {
                    ctx.kernel.passivate(ctx.pid);
                }
            }
            Phase::AwaitingTransporter(direction) => {
                let direction = *direction;
                let station = ctx
                    .world
                    .cranes
                    .station_mut(self.crane)
                    .ok_or_else(|| self.unknown())?;
                let queue = match direction {
                    Direction::Unload => station.unload_queue_mut(),
                    Direction::Load => station.load_queue_mut(),
                };
                if let Rendezvous::Paired(partner) = queue.resume_master(&mut *ctx.kernel, ctx.pid)? {
                    self.start_handling(ctx, direction, partner)?;
                }
            }
            Phase::Handling { .. } => self.handle(ctx)?,
        }
        Ok(Step::Continue)
    }
}
