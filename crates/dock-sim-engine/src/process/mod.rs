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

//! Simulation processes.
//!
//! A process is a state machine. Every activation resumes it in the state it
//! left off; blocking calls on shared resources either succeed at once or
//! passivate the process, which then re-checks its request when woken.

mod control;
mod crane;
mod ship;
mod transporter;
mod truck;

pub use control::{CraneControlProcess, TransporterControlProcess};
pub use crane::CraneProcess;
pub use ship::ShipProcess;
pub use transporter::TransporterProcess;
pub use truck::TruckProcess;

use crate::{err::SimError, world::World};
use dock_sim_core::{
    SimVariable,
    kernel::{Kernel, ProcessId},
};
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The process lives on; its next activation is whatever it scheduled.
    Continue,
    /// The process has terminated and can be dropped.
    Finished,
}

/// What an activation sees of the simulation.
pub struct Context<'a, T: SimVariable> {
    pub pid: ProcessId,
    pub world: &'a mut World<T>,
    pub kernel: &'a mut dyn Kernel<T>,
}

pub trait Process<T: SimVariable>: Debug + Send {
    fn name(&self) -> String;

    fn resume(&mut self, ctx: &mut Context<'_, T>) -> Result<Step, SimError>;
}
