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

//! # Dispatch Controllers
//!
//! The crane controller matches idle cranes with berthed ships, the
//! transport controller matches idle transporters with open jobs. Both are
//! processes that sleep until they are interrupted by one of the signal
//! functions below, then run their strategy once over the current pools.
//!
//! Signals only queue the demand or resource and interrupt the controller;
//! the decision is always taken by the controller itself so that several
//! signals raised at the same instant are handled in one pass.

use crate::{
    assign::{AssignmentStrategy, ShipDemand, TransporterView, split_workload},
    pool::PoolError,
    world::World,
};
use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    kernel::{InterruptCode, Kernel},
};
use dock_sim_model::{
    id::{CraneId, ShipId, TransporterId},
    job::{Job, TransporterJob},
};
use std::fmt::Display;
use tracing::{debug, info, warn};

pub const SHIP_ARRIVED: InterruptCode = InterruptCode::new(1);
pub const CRANE_IDLE: InterruptCode = InterruptCode::new(2);
pub const JOB_ADDED: InterruptCode = InterruptCode::new(3);
pub const TRANSPORTER_IDLE: InterruptCode = InterruptCode::new(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    UnknownShip(ShipId),
    UnknownCrane(CraneId),
    UnknownTransporter(TransporterId),
    Pool(PoolError),
}

impl Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::UnknownShip(s) => write!(f, "{} is not known to the terminal", s),
            ControlError::UnknownCrane(c) => write!(f, "{} is not known to the terminal", c),
            ControlError::UnknownTransporter(t) => {
                write!(f, "{} is not known to the terminal", t)
            }
            ControlError::Pool(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControlError::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl Refusal for ControlError {
    fn kind(&self) -> ErrorKind {
        match self {
            ControlError::Pool(e) => e.kind(),
            _ => ErrorKind::WrongParticipant,
        }
    }
}

impl From<PoolError> for ControlError {
    fn from(e: PoolError) -> Self {
        ControlError::Pool(e)
    }
}


/// A berthed ship asks for cranes. The ship process is passivated until
/// its last crane is done.
pub fn ship_arrival<T, K>(
    world: &mut World<T>,
    kernel: &mut K,
    ship: ShipId,
) -> Result<(), ControlError>
where
    T: SimVariable,
    K: Kernel<T> + ?Sized,
{
    let s = world
        .ships
        .get(ship.index())
        .ok_or(ControlError::UnknownShip(ship))?;
    let demand = ShipDemand {
        ship,
        cranes: s.cranes_required(),
    };
    let process = s.process();
    world.cranes.pool_mut().add_demand(demand)?;
    kernel.interrupt(world.cranes.control(), SHIP_ARRIVED);
    kernel.passivate(process);
    Ok(())
}

/// A crane finished its share. Closes its shift, wakes the ship if this
/// was its last crane and returns the crane to the idle pool.
pub fn crane_idle<T, K>(
    world: &mut World<T>,
    kernel: &mut K,
    crane: CraneId,
) -> Result<(), ControlError>
where
    T: SimVariable,
    K: Kernel<T> + ?Sized,
{
    let station = world
        .cranes
        .station_mut(crane)
        .ok_or(ControlError::UnknownCrane(crane))?;
    let process = station.crane().process();
    if let Some(shift) = station.crane_mut().release() {
        world.cranes.pool_mut().finish(crane);
        let ship = world
            .ships
            .get_mut(shift.ship.index())
            .ok_or(ControlError::UnknownShip(shift.ship))?;
        ship.record_service(shift.unloaded, shift.loaded);
        let ship_process = ship.process();
        if world.cranes.end_service(shift.ship) {
            debug!(ship = %shift.ship, "last crane done");
            kernel.reactivate(ship_process);
        }
    }
    world.cranes.pool_mut().add_idle(crane)?;
    kernel.interrupt(world.cranes.control(), CRANE_IDLE);
    kernel.passivate(process);
    Ok(())
}

/// Publishes a new job for the transport controller.
pub fn add_job<T, K>(
    world: &mut World<T>,
    kernel: &mut K,
    job: Job,
) -> Result<(), ControlError>
where
    T: SimVariable,
    K: Kernel<T> + ?Sized,
{
    world.transporters.pool_mut().add_demand(job)?;
    kernel.interrupt(world.transporters.control(), JOB_ADDED);
    Ok(())
}

/// A transporter finished its trip and becomes available again.
pub fn transporter_idle<T, K>(
    world: &mut World<T>,
    kernel: &mut K,
    transporter: TransporterId,
) -> Result<(), ControlError>
where
    T: SimVariable,
    K: Kernel<T> + ?Sized,
{
    let t = world
        .transporters
        .get_mut(transporter)
        .ok_or(ControlError::UnknownTransporter(transporter))?;
    let process = t.process();
    if t.finish_job().is_some() {
        world.transporters.record_job_done();
    }
    world.transporters.pool_mut().finish(transporter);
    world.transporters.pool_mut().add_idle(transporter)?;
    kernel.interrupt(world.transporters.control(), TRANSPORTER_IDLE);
    kernel.passivate(process);
    Ok(())
}

#[derive(Debug)]
pub struct CraneControl {
    strategy: Box<dyn AssignmentStrategy<CraneId, ShipDemand>>,
    dispatched: u64,
}

impl CraneControl {
    pub fn new(strategy: Box<dyn AssignmentStrategy<CraneId, ShipDemand>>) -> Self {
        Self {
            strategy,
            dispatched: 0,
        }
    }

    /// Ships handed to cranes so far.
    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Runs the strategy once and starts every crane it assigns. Returns the
    /// number of ships served.
    pub fn dispatch<T, K>(
        &mut self,
        world: &mut World<T>,
        kernel: &mut K,
    ) -> Result<usize, ControlError>
    where
        T: SimVariable,
        K: Kernel<T> + ?Sized,
    {
        let pool = world.cranes.pool();
        if pool.idle_len() == 0 || pool.demand_len() == 0 {
            return Ok(0);
        }
        let idle: Vec<CraneId> = pool.idle().copied().collect();
        let demand: Vec<ShipDemand> = pool.demand().copied().collect();
        let mut served = 0;
        for pairing in self.strategy.assign(&idle, &demand) {
            let Some(request) = demand.get(pairing.demand) else {
                warn!(index = pairing.demand, "strategy named an unknown ship");
                continue;
            };
            let chosen: Option<Vec<CraneId>> =
                pairing.resources.iter().map(|i| idle.get(*i).copied()).collect();
            let Some(chosen) = chosen else {
                warn!(ship = %request.ship, "strategy named an unknown crane");
                continue;
            };
            if chosen.len() != request.cranes {
                warn!(ship = %request.ship, "strategy offered the wrong number of cranes");
                continue;
            }
            let Some(cranes) = world.cranes.pool_mut().take(&chosen) else {
                continue;
            };
            world
                .cranes
                .pool_mut()
                .remove_demand_where(|d| d.ship == request.ship);
            let ship = world
                .ships
                .get(request.ship.index())
                .ok_or(ControlError::UnknownShip(request.ship))?;
            let unload = split_workload(ship.to_unload(), cranes.len());
            let load = split_workload(ship.to_load(), cranes.len());
            world.cranes.start_service(request.ship, cranes.len());
            for (k, crane) in cranes.iter().enumerate() {
                let station = world
                    .cranes
                    .station_mut(*crane)
                    .ok_or(ControlError::UnknownCrane(*crane))?;
                station.crane_mut().assign(request.ship, unload[k], load[k]);
                kernel.activate(station.crane().process());
            }
            info!(ship = %request.ship, cranes = cranes.len(), "cranes assigned");
            served += 1;
        }
        self.dispatched += served as u64;
        Ok(served)
    }
}

#[derive(Debug)]
pub struct TransporterControl {
    strategy: Box<dyn AssignmentStrategy<TransporterView, Job>>,
    dispatched: u64,
}

impl TransporterControl {
    pub fn new(strategy: Box<dyn AssignmentStrategy<TransporterView, Job>>) -> Self {
        Self {
            strategy,
            dispatched: 0,
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    #[inline]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Runs the strategy once and sends every assigned transporter on its
    /// trip. Returns the number of jobs handed out.
    pub fn dispatch<T, K>(
        &mut self,
        world: &mut World<T>,
        kernel: &mut K,
    ) -> Result<usize, ControlError>
    where
        T: SimVariable,
        K: Kernel<T> + ?Sized,
    {
        let pool = world.transporters.pool();
        if pool.idle_len() == 0 || pool.demand_len() == 0 {
            return Ok(0);
        }
        let idle = world.transporters.idle_views();
        let demand: Vec<Job> = world.transporters.pool().demand().copied().collect();
        let mut handed_out = 0;
        for pairing in self.strategy.assign(&idle, &demand) {
            let (Some(view), Some(job), 1) = (
                pairing.resources.first().and_then(|i| idle.get(*i)),
                demand.get(pairing.demand),
                pairing.resources.len(),
            ) else {
                warn!(pairing = ?pairing, "strategy returned an unusable pairing");
                continue;
            };
            let mut claimed = *job;
            if let Err(e) = claimed.claim() {
                warn!(error = %e, "claimed job dropped from the queue");
                world
                    .transporters
                    .pool_mut()
                    .remove_demand_where(|j| j.id() == claimed.id());
                continue;
            }
            let pool = world.transporters.pool_mut();
            if !pool.is_idle(view.id) {
                continue;
            }
            let Some(queued) = pool.remove_demand_where(|j| j.id() == claimed.id()) else {
                continue;
            };
            if pool.take(&[view.id]).is_none() {
                pool.add_demand(queued)?;
                continue;
            }
            let (id, job) = TransporterJob::new(view.id, claimed).into_parts();
            let t = world
                .transporters
                .get_mut(id)
                .ok_or(ControlError::UnknownTransporter(id))?;
            debug!(transporter = %id, job = %job, "job dispatched");
            t.set_job(job);
            kernel.activate(t.process());
            handed_out += 1;
        }
        self.dispatched += handed_out as u64;
        Ok(handed_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assign::FifoCraneAssignment, config::TerminalConfig, sim::Simulation};
    use dock_sim_core::kernel::Kernel;

    fn sim() -> Simulation<i64> {
        Simulation::new(&TerminalConfig::default()).unwrap()
    }

    #[test]
    fn test_dispatch_splits_workload() {
        let mut sim = sim();
        let (world, cal) = sim.parts_mut();
        let cranes: Vec<CraneId> = (0..world.cranes.len() as u64).map(CraneId::new).collect();
        for c in &cranes {
            world.cranes.pool_mut().add_idle(*c).unwrap();
        }
        let ship = ShipId::new(0);
        ship_arrival(world, cal, ship).unwrap();
        assert!(world.cranes.is_serving(ship));
        let needed = world.ships[0].cranes_required();

        let mut control = CraneControl::new(Box::new(FifoCraneAssignment));
        assert_eq!(control.dispatch(world, cal).unwrap(), 1);
        assert_eq!(world.cranes.active_for(ship), needed);
        let total: u64 = world
            .cranes
            .stations()
            .iter()
            .filter(|s| s.crane().ship() == Some(ship))
            .map(|s| s.crane().to_unload())
            .sum();
        assert_eq!(total, world.ships[0].to_unload());
        assert!(cal.is_scheduled(world.cranes.stations()[0].crane().process()));
    }

    #[test]
    fn test_last_idle_crane_wakes_ship() {
        let mut sim = sim();
        let (world, cal) = sim.parts_mut();
        for c in 0..world.cranes.len() as u64 {
            world.cranes.pool_mut().add_idle(CraneId::new(c)).unwrap();
        }
        let ship = ShipId::new(0);
        let ship_pid = world.ships[0].process();
        ship_arrival(world, cal, ship).unwrap();
        CraneControl::new(Box::new(FifoCraneAssignment))
            .dispatch(world, cal)
            .unwrap();
        let working: Vec<CraneId> = world.cranes.pool().working().to_vec();
        cal.cancel(ship_pid);
        for (i, c) in working.iter().enumerate() {
            crane_idle(world, cal, *c).unwrap();
            assert_eq!(cal.is_scheduled(ship_pid), i + 1 == working.len());
        }
        assert!(!world.cranes.is_serving(ship));
        assert_eq!(world.cranes.pool().idle_len(), world.cranes.len());
    }

    #[test]
    fn test_job_dispatch_claims_once() {
        let mut sim = sim();
        let (world, cal) = sim.parts_mut();
        let t = TransporterId::new(0);
        world.transporters.pool_mut().add_idle(t).unwrap();
        let job = world.new_job(
            dock_sim_model::job::JobKind::Import,
            dock_sim_model::job::Location::Overflow,
            dock_sim_model::job::Location::Overflow,
            1,
        );
        add_job(world, cal, job).unwrap();
        assert!(cal.is_scheduled(world.transporters.control()));
        let mut control = TransporterControl::new(crate::assign::JobAssignment::Fifo.build());
        assert_eq!(control.dispatch(world, cal).unwrap(), 1);
        let assigned = world.transporters.get(t).and_then(|t| t.job().copied());
        assert!(assigned.is_some_and(|j| j.is_claimed() && j.id() == job.id()));
        assert_eq!(world.transporters.pool().demand_len(), 0);
        assert_eq!(control.dispatch(world, cal).unwrap(), 0);

        transporter_idle(world, cal, t).unwrap();
        assert_eq!(world.transporters.jobs_done(), 1);
        assert!(world.transporters.pool().is_idle(t));
    }

    #[test]
    fn test_stale_claimed_job_leaves_transporter_idle() {
        let mut sim = sim();
        let (world, cal) = sim.parts_mut();
        let t = TransporterId::new(0);
        world.transporters.pool_mut().add_idle(t).unwrap();
        let mut job = world.new_job(
            dock_sim_model::job::JobKind::Export,
            dock_sim_model::job::Location::Overflow,
            dock_sim_model::job::Location::Overflow,
            1,
        );
        job.claim().unwrap();
        add_job(world, cal, job).unwrap();

        let mut control = TransporterControl::new(crate::assign::JobAssignment::Fifo.build());
        assert_eq!(control.dispatch(world, cal).unwrap(), 0);
        assert!(world.transporters.pool().is_idle(t));
        assert!(world.transporters.pool().working().is_empty());
        assert_eq!(world.transporters.pool().demand_len(), 0);
        assert!(world.transporters.get(t).is_some_and(|t| t.job().is_none()));
    }
}
