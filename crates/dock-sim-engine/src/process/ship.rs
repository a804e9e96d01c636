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
    berth::{Acquire, Berth},
    control,
    err::SimError,
    world::World,
};
use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    time::TimePoint,
};
use dock_sim_model::id::{BerthId, ShipId};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Arriving,
    WaitingForBerth,
    InService,
}

/// Arrives, takes berth length, waits for its cranes and leaves.
#[derive(Debug, Clone)]
pub struct ShipProcess<T: SimVariable> {
    ship: ShipId,
    berth: BerthId,
    arrived: TimePoint<T>,
    phase: Phase,
}

impl<T: SimVariable> ShipProcess<T> {
    pub fn new(ship: ShipId, berth: BerthId) -> Self {
        Self {
            ship,
            berth,
            arrived: TimePoint::zero(),
            phase: Phase::Arriving,
        }
    }

    fn moored(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        let ship = ship_mut(ctx, self.ship)?;
        ship.moor(self.berth);
        info!(ship = %self.ship, berth = %self.berth, "moored");
        match control::ship_arrival(ctx.world, &mut *ctx.kernel, self.ship) {
            Ok(()) => {
                self.phase = Phase::InService;
                Ok(Step::Continue)
            }
            Err(e) if e.kind() == ErrorKind::QueueFull => {
                berth_mut(ctx.world, self.berth)?.release(&mut *ctx.kernel, ctx.pid)?;
                ship_mut(ctx, self.ship)?.unmoor();
                self.turned_away(ctx, "crane queue full")?;
                Ok(Step::Finished)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Leaves without service; all of its cargo stays unserved.
    fn turned_away(&mut self, ctx: &mut Context<'_, T>, reason: &str) -> Result<(), SimError> {
        let ship = ship_mut(ctx, self.ship)?;
        let unserved_unload = ship.to_unload();
        let unserved_load = ship.to_load();
        let ledger = &mut ctx.world.ledger;
        ledger.refused_ships += 1;
        ledger.unserved_unload += unserved_unload;
        ledger.unserved_load += unserved_load;
        warn!(ship = %self.ship, berth = %self.berth, unserved_unload, unserved_load,
            reason, "turned away");
        Ok(())
    }
}

fn berth_mut<T: SimVariable>(
    world: &mut World<T>,
    id: BerthId,
) -> Result<&mut Berth<T>, SimError> {
    world
        .berths
        .get_mut(id.index())
        .ok_or(SimError::UnknownEntity {
            kind: "berth",
            id: id.value(),
        })
}

fn ship_mut<'w, T: SimVariable>(
    ctx: &'w mut Context<'_, T>,
    id: ShipId,
) -> Result<&'w mut dock_sim_model::ship::Ship, SimError> {
    ctx.world
        .ships
        .get_mut(id.index())
        .ok_or(SimError::UnknownEntity {
            kind: "ship",
            id: id.value(),
        })
}

impl<T: SimVariable> Process<T> for ShipProcess<T> {
    fn name(&self) -> String {
        self.ship.to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        match self.phase {
            Phase::Arriving => {
                self.arrived = ctx.kernel.now();
                let length = ship_mut(ctx, self.ship)?.length();
                let berth = berth_mut(ctx.world, self.berth)?;
                match berth.take(&mut *ctx.kernel, ctx.pid, length) {
                    Ok(Acquire::Granted) => return self.moored(ctx),
                    Ok(Acquire::Blocked) => self.phase = Phase::WaitingForBerth,
                    Err(e) if e.kind() == ErrorKind::QueueFull => {
                        self.turned_away(ctx, "berth queue full")?;
                        return Ok(Step::Finished);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Phase::WaitingForBerth => {
                let berth = berth_mut(ctx.world, self.berth)?;
                if berth.resume(&mut *ctx.kernel, ctx.pid)? == Acquire::Granted {
                    return self.moored(ctx);
                }
            }
            Phase::InService => {
                if ctx.world.cranes.is_serving(self.ship) {
                    ctx.kernel.passivate(ctx.pid);
                    return Ok(Step::Continue);
                }
                berth_mut(ctx.world, self.berth)?.release(&mut *ctx.kernel, ctx.pid)?;
                let now = ctx.kernel.now();
                let ship = ship_mut(ctx, self.ship)?;
                ship.unmoor();
                let unserved_unload = ship.to_unload();
                let unserved_load = ship.to_load();
                let turnaround = now.elapsed_since(self.arrived).to_f64();
                let ledger = &mut ctx.world.ledger;
                ledger.ship_turnarounds.push(turnaround);
                ledger.unserved_unload += unserved_unload;
                ledger.unserved_load += unserved_load;
                info!(ship = %self.ship, turnaround, "departed");
                return Ok(Step::Finished);
            }
        }
        Ok(Step::Continue)
    }
}
