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
    control::{
        CRANE_IDLE, CraneControl, JOB_ADDED, SHIP_ARRIVED, TRANSPORTER_IDLE, TransporterControl,
    },
    err::SimError,
};
use dock_sim_core::{
    SimVariable,
    kernel::{InterruptCode, Kernel, ProcessId},
};
use tracing::{trace, warn};

/// Interrupts drained in one activation, split by the side of the pool
/// they announce.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Signals {
    demand: usize,
    idle: usize,
}

impl Signals {
    /// New demand only pairs with an idle resource, a freed resource only
    /// with queued demand.
    fn can_pair(&self, idle_len: usize, demand_len: usize) -> bool {
        (self.demand > 0 && idle_len > 0) || (self.idle > 0 && demand_len > 0)
    }
}

fn drain<T: SimVariable, K: Kernel<T> + ?Sized>(
    kernel: &mut K,
    pid: ProcessId,
    demand: InterruptCode,
    idle: InterruptCode,
) -> Signals {
    let mut signals = Signals::default();
    while let Some(code) = kernel.take_interrupt(pid) {
        if code == demand {
            signals.demand += 1;
        } else if code == idle {
            signals.idle += 1;
        } else {
            warn!(process = %pid, code = %code, "unexpected interrupt");
        }
    }
    signals
}

/// Sleeps until interrupted, then hands idle cranes to waiting ships.
#[derive(Debug)]
pub struct CraneControlProcess {
    control: CraneControl,
}

impl CraneControlProcess {
    pub fn new(control: CraneControl) -> Self {
        Self { control }
    }
}

impl<T: SimVariable> Process<T> for CraneControlProcess {
    fn name(&self) -> String {
        "CraneControl".to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        let signals = drain(&mut *ctx.kernel, ctx.pid, SHIP_ARRIVED, CRANE_IDLE);
        let pool = ctx.world.cranes.pool();
        if signals.can_pair(pool.idle_len(), pool.demand_len()) {
            let served = self.control.dispatch(ctx.world, &mut *ctx.kernel)?;
            trace!(?signals, served, "crane dispatch");
        }
        ctx.kernel.passivate(ctx.pid);
        Ok(Step::Continue)
    }
}

/// Sleeps until interrupted, then hands open jobs to idle transporters.
#[derive(Debug)]
pub struct TransporterControlProcess {
    control: TransporterControl,
}

impl TransporterControlProcess {
    pub fn new(control: TransporterControl) -> Self {
        Self { control }
    }
}

impl<T: SimVariable> Process<T> for TransporterControlProcess {
    fn name(&self) -> String {
        "TransporterControl".to_string()
    }

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError> {
        let signals = drain(&mut *ctx.kernel, ctx.pid, JOB_ADDED, TRANSPORTER_IDLE);
        let pool = ctx.world.transporters.pool();
        if signals.can_pair(pool.idle_len(), pool.demand_len()) {
            let handed_out = self.control.dispatch(ctx.world, &mut *ctx.kernel)?;
            trace!(?signals, handed_out, strategy = self.control.strategy_name(), "job dispatch");
        }
        ctx.kernel.passivate(ctx.pid);
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_sim_core::{calendar::EventCalendar, time::TimePoint};

    const UNKNOWN: InterruptCode = InterruptCode::new(99);

    #[test]
    fn test_drain_splits_codes_by_side() {
        let mut cal = EventCalendar::<i64>::new(TimePoint::zero());
        let pid = ProcessId::new(0);
        cal.interrupt(pid, CRANE_IDLE);
        cal.interrupt(pid, UNKNOWN);
        cal.interrupt(pid, SHIP_ARRIVED);
        cal.interrupt(pid, CRANE_IDLE);
        let signals = drain(&mut cal, pid, SHIP_ARRIVED, CRANE_IDLE);
        assert_eq!(signals, Signals { demand: 1, idle: 2 });
        assert_eq!(cal.take_interrupt(pid), None);
    }

    #[test]
    fn test_idle_signal_without_demand_skips_dispatch() {
        let idle_only = Signals { demand: 0, idle: 1 };
        assert!(!idle_only.can_pair(3, 0));
        assert!(idle_only.can_pair(3, 1));

        let demand_only = Signals { demand: 1, idle: 0 };
        assert!(!demand_only.can_pair(0, 4));
        assert!(demand_only.can_pair(1, 4));

        assert!(!Signals::default().can_pair(5, 5));
    }
}
