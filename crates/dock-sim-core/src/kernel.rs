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

//! The process runtime every resource is written against.
//!
//! Resources never look up "the current process"; every call names the
//! process it acts on explicitly.

use crate::{
    SimVariable,
    time::{TimeDelta, TimePoint},
};
use std::fmt::Display;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        ProcessId(id)
    }

    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProcessId({})", self.0)
    }
}

impl From<u64> for ProcessId {
    fn from(value: u64) -> Self {
        ProcessId(value)
    }
}

/// Distinguishes an interrupt from an ordinary wake-up.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterruptCode(u32);

impl InterruptCode {
    #[inline]
    pub const fn new(code: u32) -> Self {
        InterruptCode(code)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for InterruptCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InterruptCode({})", self.0)
    }
}

pub trait Kernel<T: SimVariable> {
    /// The current simulation time.
    fn now(&self) -> TimePoint<T>;

    /// The process whose activation is being executed, if any.
    fn current(&self) -> Option<ProcessId>;

    /// Re-activates `pid` after `duration`, replacing a pending activation.
    fn hold(&mut self, pid: ProcessId, duration: TimeDelta<T>);

    /// Leaves `pid` without a pending activation until someone wakes it.
    fn passivate(&mut self, pid: ProcessId);

    /// Activates `pid` now unless it already has a pending activation.
    fn activate(&mut self, pid: ProcessId);

    /// Activates `pid` at `at`, replacing a pending activation.
    fn activate_at(&mut self, pid: ProcessId, at: TimePoint<T>);

    /// Activates `pid` directly after `after` in the calendar.
    fn activate_after(&mut self, pid: ProcessId, after: ProcessId);

    /// Delivers `code` to `pid` and activates it now.
    fn interrupt(&mut self, pid: ProcessId, code: InterruptCode);

    /// Pops the oldest undelivered interrupt of `pid`.
    fn take_interrupt(&mut self, pid: ProcessId) -> Option<InterruptCode>;

    /// Removes the pending activation of `pid`, if any.
    fn cancel(&mut self, pid: ProcessId);

    fn is_scheduled(&self, pid: ProcessId) -> bool;

    /// Replaces any pending activation of `pid` by one right after the
    /// current process.
    fn reactivate(&mut self, pid: ProcessId) {
        self.cancel(pid);
        match self.current() {
            Some(current) if current != pid => self.activate_after(pid, current),
            _ => self.activate(pid),
        }
    }
}
