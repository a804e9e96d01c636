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

//! A deterministic event calendar implementing [`Kernel`].
//!
//! Activations are kept in a single list ordered by time and, within the
//! same instant, by scheduling order. Activations placed "after the current
//! process" go to the front of the list in the order they were requested.

use crate::{
    SimVariable,
    kernel::{InterruptCode, Kernel, ProcessId},
    time::{TimeDelta, TimePoint},
};
use std::collections::{HashMap, VecDeque};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry<T: SimVariable> {
    pid: ProcessId,
    time: TimePoint<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation<T: SimVariable> {
    pid: ProcessId,
    time: TimePoint<T>,
}

impl<T: SimVariable> Activation<T> {
    #[inline]
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    #[inline]
    pub fn time(&self) -> TimePoint<T> {
        self.time
    }
}

#[derive(Debug, Clone)]
pub struct EventCalendar<T: SimVariable> {
    now: TimePoint<T>,
    entries: VecDeque<Entry<T>>,
    // Number of entries at the front that were placed after the current process.
    urgent: usize,
    current: Option<ProcessId>,
    inbox: HashMap<ProcessId, VecDeque<InterruptCode>>,
    activations: u64,
}

impl<T: SimVariable> Default for EventCalendar<T> {
    fn default() -> Self {
        Self::new(TimePoint::zero())
    }
}

impl<T: SimVariable> EventCalendar<T> {
    pub fn new(start: TimePoint<T>) -> Self {
        Self {
            now: start,
            entries: VecDeque::new(),
            urgent: 0,
            current: None,
            inbox: HashMap::new(),
            activations: 0,
        }
    }

    /// Pops the next activation and advances the clock to it.
    pub fn next(&mut self) -> Option<Activation<T>> {
        let entry = self.entries.pop_front()?;
        self.urgent = 0;
        if entry.time > self.now {
            self.now = entry.time;
        }
        self.current = Some(entry.pid);
        self.activations += 1;
        trace!(pid = %entry.pid, time = %self.now, "activation");
        Some(Activation {
            pid: entry.pid,
            time: self.now,
        })
    }

    /// Time of the next pending activation.
    #[inline]
    pub fn peek_time(&self) -> Option<TimePoint<T>> {
        self.entries.front().map(|e| e.time)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Marks the end of the current activation.
    #[inline]
    pub fn finish_current(&mut self) {
        self.current = None;
    }

    /// Drops the pending activation and all undelivered interrupts of `pid`.
    pub fn forget(&mut self, pid: ProcessId) {
        self.remove(pid);
        self.inbox.remove(&pid);
    }

    fn index_of(&self, pid: ProcessId) -> Option<usize> {
        self.entries.iter().position(|e| e.pid == pid)
    }

    fn remove(&mut self, pid: ProcessId) -> Option<Entry<T>> {
        let index = self.index_of(pid)?;
        if index < self.urgent {
            self.urgent -= 1;
        }
        self.entries.remove(index)
    }

    fn schedule(&mut self, pid: ProcessId, at: TimePoint<T>) {
        let at = if at < self.now { self.now } else { at };
        let index = self
            .entries
            .iter()
            .position(|e| e.time > at)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, Entry { pid, time: at });
    }
}

impl<T: SimVariable> Kernel<T> for EventCalendar<T> {
    #[inline]
    fn now(&self) -> TimePoint<T> {
        self.now
    }

    #[inline]
    fn current(&self) -> Option<ProcessId> {
        self.current
    }

    fn hold(&mut self, pid: ProcessId, duration: TimeDelta<T>) {
        let duration = if duration.is_negative() {
            warn!(pid = %pid, duration = %duration, "negative hold treated as zero");
            TimeDelta::zero()
        } else {
            duration
        };
        self.remove(pid);
        let at = self.now.saturating_add(duration);
        self.schedule(pid, at);
    }

    fn passivate(&mut self, pid: ProcessId) {
        self.remove(pid);
    }

    fn activate(&mut self, pid: ProcessId) {
        if self.is_scheduled(pid) {
            trace!(pid = %pid, "already scheduled, activate ignored");
            return;
        }
        self.schedule(pid, self.now);
    }

    fn activate_at(&mut self, pid: ProcessId, at: TimePoint<T>) {
        self.remove(pid);
        self.schedule(pid, at);
    }

    fn activate_after(&mut self, pid: ProcessId, after: ProcessId) {
        if pid == after {
            self.activate(pid);
            return;
        }
        self.remove(pid);
        if let Some(index) = self.index_of(after) {
            let time = self.entries[index].time;
            if index < self.urgent {
                self.urgent += 1;
            }
            self.entries.insert(index + 1, Entry { pid, time });
        } else if self.current == Some(after) {
            let now = self.now;
            self.entries.insert(self.urgent, Entry { pid, time: now });
            self.urgent += 1;
        } else {
            warn!(pid = %pid, after = %after, "activate_after target is not scheduled");
            self.schedule(pid, self.now);
        }
    }

    fn interrupt(&mut self, pid: ProcessId, code: InterruptCode) {
        self.inbox.entry(pid).or_default().push_back(code);
        if let Some(index) = self.index_of(pid) {
            if self.entries[index].time > self.now {
                self.remove(pid);
                self.schedule(pid, self.now);
            }
        } else if self.current != Some(pid) {
            self.schedule(pid, self.now);
        }
    }

    fn take_interrupt(&mut self, pid: ProcessId) -> Option<InterruptCode> {
        let queue = self.inbox.get_mut(&pid)?;
        let code = queue.pop_front();
        if queue.is_empty() {
            self.inbox.remove(&pid);
        }
        code
    }

    fn cancel(&mut self, pid: ProcessId) {
        self.remove(pid);
    }

    fn is_scheduled(&self, pid: ProcessId) -> bool {
        self.index_of(pid).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    fn drain(cal: &mut EventCalendar<i64>) -> Vec<(u64, i64)> {
        let mut out = Vec::new();
        while let Some(a) = cal.next() {
            out.push((a.pid().value(), a.time().value()));
            cal.finish_current();
        }
        out
    }

    #[test]
    fn test_orders_by_time_then_insertion() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate_at(pid(1), TimePoint::new(5));
        cal.activate_at(pid(2), TimePoint::new(3));
        cal.activate_at(pid(3), TimePoint::new(5));
        cal.activate(pid(4));
        assert_eq!(drain(&mut cal), vec![(4, 0), (2, 3), (1, 5), (3, 5)]);
    }

    #[test]
    fn test_hold_replaces_pending_activation() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate_at(pid(1), TimePoint::new(10));
        cal.hold(pid(1), TimeDelta::new(2));
        assert_eq!(cal.len(), 1);
        assert_eq!(cal.peek_time(), Some(TimePoint::new(2)));
    }

    #[test]
    fn test_activate_ignores_already_scheduled() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate_at(pid(1), TimePoint::new(7));
        cal.activate(pid(1));
        assert_eq!(drain(&mut cal), vec![(1, 7)]);
    }

    #[test]
    fn test_activate_after_current_runs_next_in_request_order() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate(pid(1));
        cal.activate(pid(2));
        let a = cal.next().unwrap();
        assert_eq!(a.pid(), pid(1));
        cal.activate_after(pid(3), pid(1));
        cal.activate_after(pid(4), pid(1));
        cal.finish_current();
        let order: Vec<u64> = drain(&mut cal).into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![3, 4, 2]);
    }

    #[test]
    fn test_activate_after_scheduled_process() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate_at(pid(1), TimePoint::new(4));
        cal.activate_at(pid(2), TimePoint::new(4));
        cal.activate_after(pid(3), pid(1));
        assert_eq!(drain(&mut cal), vec![(1, 4), (3, 4), (2, 4)]);
    }

    #[test]
    fn test_interrupt_queues_codes_and_preempts_hold() {
        let mut cal = EventCalendar::<i64>::default();
        cal.hold(pid(1), TimeDelta::new(100));
        cal.interrupt(pid(1), InterruptCode::new(7));
        cal.interrupt(pid(1), InterruptCode::new(8));
        assert_eq!(cal.len(), 1);
        assert_eq!(cal.peek_time(), Some(TimePoint::new(0)));
        assert_eq!(cal.take_interrupt(pid(1)), Some(InterruptCode::new(7)));
        assert_eq!(cal.take_interrupt(pid(1)), Some(InterruptCode::new(8)));
        assert_eq!(cal.take_interrupt(pid(1)), None);
    }

    #[test]
    fn test_reactivate_moves_pending_wakeup_forward() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate(pid(9));
        cal.activate_at(pid(2), TimePoint::new(50));
        let _ = cal.next();
        cal.reactivate(pid(2));
        assert_eq!(cal.peek_time(), Some(TimePoint::new(0)));
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut cal = EventCalendar::<i64>::default();
        cal.activate_at(pid(1), TimePoint::new(10));
        let _ = cal.next();
        cal.activate_at(pid(2), TimePoint::new(3));
        let a = cal.next().unwrap();
        assert_eq!(a.time(), TimePoint::new(10));
    }
}
