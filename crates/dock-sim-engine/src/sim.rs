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

//! # Simulation Driver
//!
//! Builds a [`World`] from a [`TerminalConfig`], spawns one process per
//! ship, truck, crane and transporter plus the two controllers, and runs
//! the event calendar until no activation is left.

use crate::{
    assign::FifoCraneAssignment,
    berth::Berth,
    config::{PoolConfig, RendezvousConfig, TerminalConfig, to_time},
    control::{CraneControl, TransporterControl},
    coop::{Keyed, RendezvousQueue},
    cranes::{CraneStation, CranesSystem},
    err::SimError,
    holding::{HoldingArea, LanePool},
    pool::AssignablePool,
    process::{
        Context, CraneControlProcess, CraneProcess, Process, ShipProcess, Step,
        TransporterControlProcess, TransporterProcess, TruckProcess,
    },
    report::TerminalReport,
    transport::TransporterSystem,
    world::{Layout, Ledger, World},
    yard::Yard,
};
use dock_sim_core::{
    SimVariable,
    calendar::EventCalendar,
    kernel::{Kernel, ProcessId},
    queue::{QueueCapacity, WaitQueue},
    space::SpaceLength,
    time::TimePoint,
};
use dock_sim_model::{
    crane::Crane,
    id::{BerthId, CraneId, HoldingAreaId, ShipId, TransporterId, TruckId},
    job::Location,
    ship::Ship,
    transporter::InternalTransporter,
    truck::Truck,
};
use std::{collections::HashMap, fmt::Debug};
use tracing::{debug, info, instrument};

const CRANE_CONTROL: ProcessId = ProcessId::new(0);
const TRANSPORTER_CONTROL: ProcessId = ProcessId::new(1);

fn build_pool<R, D>(limit: usize, config: &PoolConfig, seed: u64) -> AssignablePool<R, D>
where
    R: Copy + PartialEq + Debug,
{
    AssignablePool::new(
        limit,
        config.idle.discipline,
        config.idle.queue_capacity(),
        config.demand.discipline,
        config.demand.queue_capacity(),
        seed,
    )
}

fn build_rendezvous<M, S, T>(config: &RendezvousConfig, seed: u64) -> RendezvousQueue<M, S, T>
where
    M: Copy + PartialEq + Debug,
    S: Keyed + Copy + Debug,
    T: SimVariable,
{
    RendezvousQueue::new(
        config.masters.discipline,
        config.masters.queue_capacity(),
        config.slaves.discipline,
        config.slaves.queue_capacity(),
        seed,
    )
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary<T: SimVariable> {
    pub end: TimePoint<T>,
    pub activations: u64,
    pub finished: usize,
    pub alive: usize,
}

#[derive(Debug)]
pub struct Simulation<T: SimVariable> {
    world: World<T>,
    calendar: EventCalendar<T>,
    processes: HashMap<ProcessId, Box<dyn Process<T>>>,
    horizon: Option<TimePoint<T>>,
    finished: usize,
    next_pid: u64,
}

impl<T: SimVariable> Simulation<T> {
    /// Validates `config`, builds the terminal and schedules every process.
    #[instrument(level = "info", skip_all)]
    pub fn new(config: &TerminalConfig) -> Result<Self, SimError> {
        config.validate()?;
        let seed = config.seed;
        let mut next_pid = 2u64;
        let mut pid = || {
            let p = ProcessId::new(next_pid);
            next_pid += 1;
            p
        };

        let berths = config
            .berths
            .iter()
            .enumerate()
            .map(|(i, b)| {
                Berth::new(
                    BerthId::new(i as u64),
                    SpaceLength::new(b.length),
                    b.discipline,
                    QueueCapacity::limited(b.queue_capacity),
                    seed.wrapping_add(i as u64),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut yard = Yard::new(config.block_selection.build(seed.wrapping_add(101)));
        for spec in &config.blocks {
            yard.add_block(spec)?;
        }

        let mut holding_areas = Vec::with_capacity(config.holding_areas.len());
        for (i, h) in config.holding_areas.iter().enumerate() {
            let id = HoldingAreaId::new(i as u64);
            let area_seed = seed.wrapping_add(707 + 4 * i as u64);
            let waiting = WaitQueue::new(
                h.trucks.discipline,
                h.trucks.queue_capacity(),
                area_seed,
            );
            // Parked trucks never outnumber the lanes.
            let trucks = RendezvousQueue::new(
                h.transporters.discipline,
                h.transporters.queue_capacity(),
                h.trucks.discipline,
                QueueCapacity::unlimited(),
                area_seed.wrapping_add(1),
            );
            holding_areas.push(HoldingArea::new(id, LanePool::new(id, h.lanes, waiting)?, trucks));
        }

        let mut spawns: Vec<(ProcessId, Box<dyn Process<T>>, TimePoint<T>)> = Vec::new();

        let mut stations = Vec::with_capacity(config.cranes);
        for i in 0..config.cranes as u64 {
            let p = pid();
            let station_seed = seed.wrapping_add(606 + 4 * i);
            stations.push(CraneStation::new(
                Crane::new(CraneId::new(i), p),
                build_rendezvous(&config.crane_stations, station_seed),
                build_rendezvous(&config.crane_stations, station_seed.wrapping_add(2)),
            ));
            spawns.push((p, Box::new(CraneProcess::new(CraneId::new(i))), TimePoint::zero()));
        }
        let cranes = CranesSystem::new(
            stations,
            build_pool(config.cranes, &config.crane_pool, seed.wrapping_add(404)),
            CRANE_CONTROL,
        );

        let layout = Layout::new(config.cranes, config.blocks.len(), config.holding_areas.len());
        let mut fleet = Vec::with_capacity(config.transporters.len());
        for (i, t) in config.transporters.iter().enumerate() {
            let p = pid();
            let id = TransporterId::new(i as u64);
            let start = layout.node(Location::Overflow);
            let mut transporter =
                InternalTransporter::new(id, p, t.capacity, t.speed_loaded, t.speed_empty, start)?;
            if let Some(crane) = t.pinned_crane {
                transporter = transporter.pinned_to(CraneId::new(crane));
            }
            fleet.push(transporter);
            spawns.push((p, Box::new(TransporterProcess::new(id)), TimePoint::zero()));
        }
        let transporters = TransporterSystem::new(
            fleet,
            build_pool(
                config.transporters.len(),
                &config.transporter_pool,
                seed.wrapping_add(505),
            ),
            TRANSPORTER_CONTROL,
        );

        let mut ships = Vec::with_capacity(config.ships.len());
        for (i, s) in config.ships.iter().enumerate() {
            let p = pid();
            let id = ShipId::new(i as u64);
            ships.push(Ship::new(
                id,
                p,
                SpaceLength::new(s.length),
                s.cranes,
                s.unload,
                s.load,
            )?);
            let arrival = TimePoint::new(to_time::<T>(s.arrival)?);
            spawns.push((
                p,
                Box::new(ShipProcess::new(id, BerthId::new(s.berth as u64))),
                arrival,
            ));
        }

        let mut trucks = Vec::with_capacity(config.trucks.len());
        for (i, t) in config.trucks.iter().enumerate() {
            let p = pid();
            let id = TruckId::new(i as u64);
            trucks.push(Truck::new(
                id,
                p,
                HoldingAreaId::new(t.holding_area as u64),
                t.speed,
                t.deliveries,
                t.pickups,
            )?);
            let arrival = TimePoint::new(to_time::<T>(t.arrival)?);
            spawns.push((p, Box::new(TruckProcess::new(id)), arrival));
        }

        let world = World {
            berths,
            yard,
            holding_areas,
            cranes,
            transporters,
            ships,
            trucks,
            distances: config.distance_matrix()?,
            layout,
            gate_distance: config.gate_distance,
            crane_handling: config.crane_handling.build(seed.wrapping_add(202))?,
            truck_handling: config.truck_handling.build(seed.wrapping_add(303))?,
            ledger: Ledger::default(),
        };

        let mut sim = Self {
            world,
            calendar: EventCalendar::default(),
            processes: HashMap::new(),
            horizon: config.horizon::<T>()?,
            finished: 0,
            next_pid,
        };
        sim.spawn_at(
            CRANE_CONTROL,
            Box::new(CraneControlProcess::new(CraneControl::new(Box::new(
                FifoCraneAssignment,
            )))),
            TimePoint::zero(),
        );
        sim.spawn_at(
            TRANSPORTER_CONTROL,
            Box::new(TransporterControlProcess::new(TransporterControl::new(
                config.job_assignment.build(),
            ))),
            TimePoint::zero(),
        );
        for (p, process, at) in spawns {
            sim.spawn_at(p, process, at);
        }
        info!(
            processes = sim.processes.len(),
            cranes = config.cranes,
            transporters = config.transporters.len(),
            ships = config.ships.len(),
            trucks = config.trucks.len(),
            "terminal built"
        );
        Ok(sim)
    }

    fn spawn_at(&mut self, pid: ProcessId, process: Box<dyn Process<T>>, at: TimePoint<T>) {
        debug!(process = %pid, name = %process.name(), time = %at, "spawned");
        self.processes.insert(pid, process);
        self.calendar.activate_at(pid, at);
    }

    /// Adds a process after construction and schedules it at `at`.
    pub fn spawn(&mut self, process: Box<dyn Process<T>>, at: TimePoint<T>) -> ProcessId {
        let pid = ProcessId::new(self.next_pid);
        self.next_pid += 1;
        self.spawn_at(pid, process, at);
        pid
    }

    #[inline]
    pub fn world(&self) -> &World<T> {
        &self.world
    }

    #[inline]
    pub fn now(&self) -> TimePoint<T> {
        self.calendar.now()
    }

    #[inline]
    pub fn alive(&self) -> usize {
        self.processes.len()
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut World<T>, &mut EventCalendar<T>) {
        (&mut self.world, &mut self.calendar)
    }

    /// Executes one activation. Returns `false` when the calendar is empty.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(activation) = self.calendar.next() else {
            return Ok(false);
        };
        let pid = activation.pid();
        let Some(process) = self.processes.get_mut(&pid) else {
            return Err(SimError::UnknownProcess(pid));
        };
        let mut ctx = Context {
            pid,
            world: &mut self.world,
            kernel: &mut self.calendar,
        };
        let step = process.resume(&mut ctx)?;
        self.calendar.finish_current();
        if step == Step::Finished {
            self.calendar.forget(pid);
            self.processes.remove(&pid);
            self.finished += 1;
        }
        Ok(true)
    }

    /// Runs until nothing is scheduled or the configured horizon is reached.
    #[instrument(level = "info", skip_all)]
    pub fn run(&mut self) -> Result<RunSummary<T>, SimError> {
        match self.horizon {
            Some(h) => self.run_until(h),
            None => {
                while self.step()? {}
                Ok(self.summary())
            }
        }
    }

    /// Runs every activation scheduled up to and including `horizon`.
    pub fn run_until(&mut self, horizon: TimePoint<T>) -> Result<RunSummary<T>, SimError> {
        while self.calendar.peek_time().is_some_and(|t| t <= horizon) {
            self.step()?;
        }
        Ok(self.summary())
    }

    fn summary(&self) -> RunSummary<T> {
        let summary = RunSummary {
            end: self.calendar.now(),
            activations: self.calendar.activations(),
            finished: self.finished,
            alive: self.processes.len(),
        };
        info!(end = %summary.end, activations = summary.activations,
            finished = summary.finished, alive = summary.alive, "run finished");
        summary
    }

    pub fn report(&self) -> TerminalReport {
        TerminalReport::collect(&self.world, self.calendar.now())
    }
}
