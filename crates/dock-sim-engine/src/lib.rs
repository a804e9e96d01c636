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

pub mod assign;
pub mod berth;
pub mod block;
pub mod config;
pub mod control;
pub mod coop;
pub mod cranes;
pub mod err;
pub mod holding;
pub mod pool;
pub mod process;
pub mod report;
pub mod script;
pub mod select;
pub mod sim;
pub mod transport;
pub mod world;
pub mod yard;

pub mod prelude {
    pub use crate::assign::{
        AssignmentStrategy, FifoCraneAssignment, FifoJobAssignment, FixedCraneJobAssignment,
        JobAssignment, Pairing, ShipDemand, TransporterView, split_workload,
    };
    pub use crate::berth::{Acquire, Berth, BerthError};
    pub use crate::block::{Block, BlockError, BlockKind, BlockSpec, ContainerClass, LedgerOp};
    pub use crate::config::{
        BerthConfig, ConfigError, DurationConfig, HoldingAreaConfig, PoolConfig, QueueConfig,
        RendezvousConfig, ShipConfig, TerminalConfig, TerminalConfigBuilder, TransporterConfig,
        TruckConfig,
    };
    pub use crate::control::{ControlError, CraneControl, TransporterControl};
    pub use crate::coop::{CoopError, Keyed, Rendezvous, RendezvousQueue, Side, Waiter};
    pub use crate::cranes::{CraneStation, CranesSystem};
    pub use crate::err::SimError;
    pub use crate::holding::{HoldingArea, LaneError, LanePool, ParkedTruck};
    pub use crate::pool::{AssignablePool, PoolError};
    pub use crate::process::{Context, Process, Step};
    pub use crate::report::TerminalReport;
    pub use crate::script::Cooperation;
    pub use crate::select::{BlockSelection, BlockSelectionStrategy};
    pub use crate::sim::{RunSummary, Simulation};
    pub use crate::transport::TransporterSystem;
    pub use crate::world::{Layout, Ledger, World};
    pub use crate::yard::{Yard, YardError};
}
