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

//! # Rendezvous Queue
//!
//! Master/slave cooperation. Masters (cranes, transporters) wait in one
//! queue, slaves (transporters, trucks) in another. A master is paired with
//! a slave as soon as one is available for it; it then runs the interaction
//! while the slave stays passive, and `finish` hands control back to the
//! slave.
//!
//! Masters may ask for a particular slave by key (for example the truck
//! parked at a given lane). Pairing is decided greedily in master-queue
//! order: every master, in turn, gets the first still unclaimed slave it
//! accepts. A later master therefore never takes a slave an earlier master
//! would take.

use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    kernel::{Kernel, ProcessId},
    queue::{QueueCapacity, QueueDiscipline, WaitQueue},
    time::{TimeDelta, TimePoint},
};
use dock_sim_model::id::TransporterId;
use std::fmt::{Debug, Display};
use tracing::{debug, warn};

/// A slave that can be asked for by key.
pub trait Keyed {
    type Key: Copy + PartialEq + Debug;

    fn key(&self) -> Self::Key;
}

impl Keyed for TransporterId {
    type Key = TransporterId;

    #[inline]
    fn key(&self) -> Self::Key {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Master,
    Slave,
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Master => f.write_str("master"),
            Side::Slave => f.write_str("slave"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoopError {
    QueueFull {
        side: Side,
        process: ProcessId,
        capacity: usize,
    },
    AlreadyQueued {
        process: ProcessId,
    },
    NotQueued {
        process: ProcessId,
    },
}

impl Display for CoopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoopError::QueueFull {
                side,
                process,
                capacity,
            } => write!(
                f,
                "{} refused: {} queue full ({} waiting)",
                process, side, capacity
            ),
            CoopError::AlreadyQueued { process } => {
                write!(f, "{} is already waiting for cooperation", process)
            }
            CoopError::NotQueued { process } => {
                write!(f, "{} is not waiting as master", process)
            }
        }
    }
}

impl std::error::Error for CoopError {}

impl Refusal for CoopError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoopError::QueueFull { .. } => ErrorKind::QueueFull,
            CoopError::AlreadyQueued { .. } | CoopError::NotQueued { .. } => {
                ErrorKind::WrongParticipant
            }
        }
    }
}

/// A queued participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter<E, T: SimVariable> {
    pid: ProcessId,
    who: E,
    since: TimePoint<T>,
}

impl<E: Copy, T: SimVariable> Waiter<E, T> {
    #[inline]
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    #[inline]
    pub fn who(&self) -> E {
        self.who
    }

    #[inline]
    pub fn since(&self) -> TimePoint<T> {
        self.since
    }
}

#[derive(Debug, Clone, Copy)]
struct MasterEntry<M, K, T: SimVariable> {
    waiter: Waiter<M, T>,
    target: Option<K>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendezvous<S, T: SimVariable> {
    /// The master owns this slave until it calls `finish`.
    Paired(Waiter<S, T>),
    /// The master was passivated and must call `resume_master` when woken.
    Waiting,
}

#[derive(Debug, Clone)]
pub struct RendezvousQueue<M, S: Keyed, T: SimVariable> {
    masters: WaitQueue<MasterEntry<M, S::Key, T>>,
    slaves: WaitQueue<Waiter<S, T>>,
    completed: u64,
    cancelled: u64,
    master_wait: TimeDelta<T>,
    slave_wait: TimeDelta<T>,
    cooperation_time: TimeDelta<T>,
}

impl<M, S, T> Default for RendezvousQueue<M, S, T>
where
    M: Copy + PartialEq + Debug,
    S: Keyed + Copy + Debug,
    T: SimVariable,
{
    fn default() -> Self {
        Self::new(
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            0,
        )
    }
}

impl<M, S, T> RendezvousQueue<M, S, T>
where
    M: Copy + PartialEq + Debug,
    S: Keyed + Copy + Debug,
    T: SimVariable,
{
    pub fn new(
        master_discipline: QueueDiscipline,
        master_capacity: QueueCapacity,
        slave_discipline: QueueDiscipline,
        slave_capacity: QueueCapacity,
        seed: u64,
    ) -> Self {
        Self {
            masters: WaitQueue::new(master_discipline, master_capacity, seed),
            slaves: WaitQueue::new(slave_discipline, slave_capacity, seed.wrapping_add(1)),
            completed: 0,
            cancelled: 0,
            master_wait: TimeDelta::zero(),
            slave_wait: TimeDelta::zero(),
            cooperation_time: TimeDelta::zero(),
        }
    }

    #[inline]
    pub fn masters_waiting(&self) -> usize {
        self.masters.len()
    }

    #[inline]
    pub fn slaves_waiting(&self) -> usize {
        self.slaves.len()
    }

    #[inline]
    pub fn is_master_waiting(&self, pid: ProcessId) -> bool {
        self.masters.iter().any(|m| m.waiter.pid == pid)
    }

    #[inline]
    pub fn is_slave_waiting(&self, pid: ProcessId) -> bool {
        self.slaves.iter().any(|s| s.pid == pid)
    }

    /// Cooperations finished since the last reset.
    #[inline]
    pub fn completed(&self) -> u64 {
        self.completed
    }

    #[inline]
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    #[inline]
    pub fn master_refused(&self) -> u64 {
        self.masters.refused()
    }

    #[inline]
    pub fn slave_refused(&self) -> u64 {
        self.slaves.refused()
    }

    #[inline]
    pub fn cooperation_time(&self) -> TimeDelta<T> {
        self.cooperation_time
    }

    /// Mean time a slave waited before a master claimed it.
    pub fn avg_slave_wait(&self) -> Option<f64> {
        if self.completed == 0 {
            return None;
        }
        Some(self.slave_wait.to_f64() / self.completed as f64)
    }

    pub fn avg_master_wait(&self) -> Option<f64> {
        if self.completed == 0 {
            return None;
        }
        Some(self.master_wait.to_f64() / self.completed as f64)
    }

    // (master index, slave index) pairs in master-queue order.
    fn pairings(&self) -> Vec<(usize, usize)> {
        let mut claimed = vec![false; self.slaves.len()];
        let mut out = Vec::new();
        for (mi, m) in self.masters.iter().enumerate() {
            let found = self.slaves.iter().enumerate().position(|(si, s)| {
                !claimed[si] && m.target.is_none_or(|k| s.who.key() == k)
            });
            if let Some(si) = found {
                claimed[si] = true;
                out.push((mi, si));
            }
        }
        out
    }

    fn wake_pairable_masters<K: Kernel<T> + ?Sized>(&self, kernel: &mut K, except: ProcessId) {
        for (mi, _) in self.pairings() {
            if let Some(m) = self.masters.get(mi) {
                if m.waiter.pid != except {
                    kernel.reactivate(m.waiter.pid);
                }
            }
        }
    }

    /// A master asks for a slave, optionally a specific one.
    pub fn cooperate<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        pid: ProcessId,
        master: M,
        target: Option<S::Key>,
    ) -> Result<Rendezvous<S, T>, CoopError> {
        if self.is_master_waiting(pid) || self.is_slave_waiting(pid) {
            return Err(CoopError::AlreadyQueued { process: pid });
        }
        let entry = MasterEntry {
            waiter: Waiter {
                pid,
                who: master,
                since: kernel.now(),
            },
            target,
        };
        if let Err(e) = self.masters.insert(entry) {
            warn!(process = %pid, "master queue full");
            return Err(CoopError::QueueFull {
                side: Side::Master,
                process: pid,
                capacity: e.capacity(),
            });
        }
        Ok(self.try_pair(kernel, pid))
    }

    /// Re-checks a woken master.
    pub fn resume_master<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        pid: ProcessId,
    ) -> Result<Rendezvous<S, T>, CoopError> {
        if !self.is_master_waiting(pid) {
            return Err(CoopError::NotQueued { process: pid });
        }
        Ok(self.try_pair(kernel, pid))
    }

    fn try_pair<K: Kernel<T> + ?Sized>(&mut self, kernel: &mut K, pid: ProcessId) -> Rendezvous<S, T> {
        let mine = self
            .pairings()
            .into_iter()
            .find(|(mi, _)| self.masters.get(*mi).is_some_and(|m| m.waiter.pid == pid));
        let Some((mi, si)) = mine else {
            kernel.passivate(pid);
            return Rendezvous::Waiting;
        };
        let (Some(master), Some(slave)) = (self.masters.remove_at(mi), self.slaves.remove_at(si))
        else {
            kernel.passivate(pid);
            return Rendezvous::Waiting;
        };
        let now = kernel.now();
        self.master_wait = self
            .master_wait
            .saturating_add(now.elapsed_since(master.waiter.since));
        self.slave_wait = self.slave_wait.saturating_add(now.elapsed_since(slave.since));
        debug!(master = %pid, slave = %slave.pid, "rendezvous");
        self.wake_pairable_masters(kernel, pid);
        Rendezvous::Paired(slave)
    }

    /// A slave offers itself and is passivated until a master is done with it.
    pub fn wait_on_coop<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        pid: ProcessId,
        slave: S,
    ) -> Result<(), CoopError> {
        if self.is_slave_waiting(pid) || self.is_master_waiting(pid) {
            return Err(CoopError::AlreadyQueued { process: pid });
        }
        let waiter = Waiter {
            pid,
            who: slave,
            since: kernel.now(),
        };
        if let Err(e) = self.slaves.insert(waiter) {
            warn!(process = %pid, "slave queue full");
            return Err(CoopError::QueueFull {
                side: Side::Slave,
                process: pid,
                capacity: e.capacity(),
            });
        }
        kernel.passivate(pid);
        self.wake_pairable_masters(kernel, pid);
        Ok(())
    }

    /// Ends a cooperation started at `started` and resumes the slave right
    /// after the master.
    pub fn finish<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        master: ProcessId,
        slave: &Waiter<S, T>,
        started: TimePoint<T>,
    ) {
        let now = kernel.now();
        self.cooperation_time = self
            .cooperation_time
            .saturating_add(now.elapsed_since(started));
        self.completed += 1;
        kernel.activate_after(slave.pid, master);
    }

    /// Withdraws a waiting master or slave. Returns whether it was queued.
    pub fn cancel<K: Kernel<T> + ?Sized>(&mut self, kernel: &mut K, pid: ProcessId) -> bool {
        let removed = self.masters.remove_where(|m| m.waiter.pid == pid).is_some()
            || self.slaves.remove_where(|s| s.pid == pid).is_some();
        if removed {
            self.cancelled += 1;
            self.wake_pairable_masters(kernel, pid);
        }
        removed
    }

    pub fn reset(&mut self) {
        self.completed = 0;
        self.cancelled = 0;
        self.master_wait = TimeDelta::zero();
        self.slave_wait = TimeDelta::zero();
        self.cooperation_time = TimeDelta::zero();
        self.masters.reset_statistics();
        self.slaves.reset_statistics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_sim_core::calendar::EventCalendar;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Parked(u64);

    impl Keyed for Parked {
        type Key = u64;

        fn key(&self) -> u64 {
            self.0
        }
    }

    type Queue = RendezvousQueue<u64, Parked, i64>;

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    #[test]
    fn test_master_first_waits_for_slave() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::default();
        assert_eq!(q.cooperate(&mut cal, pid(1), 1, None), Ok(Rendezvous::Waiting));
        q.wait_on_coop(&mut cal, pid(10), Parked(1)).unwrap();
        assert!(cal.is_scheduled(pid(1)));
        assert!(!cal.is_scheduled(pid(10)));
        match q.resume_master(&mut cal, pid(1)).unwrap() {
            Rendezvous::Paired(s) => assert_eq!(s.pid(), pid(10)),
            Rendezvous::Waiting => panic!("master should be paired"),
        }
        assert_eq!(q.slaves_waiting(), 0);
        assert_eq!(q.masters_waiting(), 0);
    }

    #[test]
    fn test_slave_first_is_claimed_immediately() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::default();
        q.wait_on_coop(&mut cal, pid(10), Parked(1)).unwrap();
        let r = q.cooperate(&mut cal, pid(1), 1, None).unwrap();
        let Rendezvous::Paired(slave) = r else {
            panic!("expected pairing");
        };
        q.finish(&mut cal, pid(1), &slave, TimePoint::new(0));
        assert!(cal.is_scheduled(pid(10)));
        assert_eq!(q.completed(), 1);
    }

    #[test]
    fn test_target_selects_matching_slave() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::default();
        q.wait_on_coop(&mut cal, pid(10), Parked(1)).unwrap();
        q.wait_on_coop(&mut cal, pid(11), Parked(2)).unwrap();
        let Rendezvous::Paired(s) = q.cooperate(&mut cal, pid(1), 1, Some(2)).unwrap() else {
            panic!("lane 2 is waiting");
        };
        assert_eq!(s.who(), Parked(2));
        assert_eq!(q.cooperate(&mut cal, pid(2), 2, Some(3)), Ok(Rendezvous::Waiting));
        assert!(q.is_slave_waiting(pid(10)));
    }

    #[test]
    fn test_blocked_target_does_not_block_others() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::default();
        assert_eq!(q.cooperate(&mut cal, pid(1), 1, Some(5)), Ok(Rendezvous::Waiting));
        assert_eq!(q.cooperate(&mut cal, pid(2), 2, Some(6)), Ok(Rendezvous::Waiting));
        q.wait_on_coop(&mut cal, pid(20), Parked(6)).unwrap();
        // Only the master asking for lane 6 is woken.
        assert!(!cal.is_scheduled(pid(1)));
        assert!(cal.is_scheduled(pid(2)));
        assert_eq!(q.resume_master(&mut cal, pid(1)), Ok(Rendezvous::Waiting));
        assert!(matches!(
            q.resume_master(&mut cal, pid(2)),
            Ok(Rendezvous::Paired(_))
        ));
    }

    #[test]
    fn test_earlier_master_keeps_priority() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::default();
        q.cooperate(&mut cal, pid(1), 1, None).unwrap();
        q.cooperate(&mut cal, pid(2), 2, None).unwrap();
        q.wait_on_coop(&mut cal, pid(20), Parked(0)).unwrap();
        assert!(cal.is_scheduled(pid(1)));
        assert!(!cal.is_scheduled(pid(2)));
        // The second master cannot jump ahead.
        assert_eq!(q.resume_master(&mut cal, pid(2)), Ok(Rendezvous::Waiting));
    }

    #[test]
    fn test_queue_limits_and_duplicates() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::new(
            QueueDiscipline::Fifo,
            QueueCapacity::limited(1),
            QueueDiscipline::Fifo,
            QueueCapacity::limited(1),
            0,
        );
        q.cooperate(&mut cal, pid(1), 1, Some(9)).unwrap();
        let err = q.cooperate(&mut cal, pid(2), 2, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueFull);
        assert_eq!(q.master_refused(), 1);
        q.wait_on_coop(&mut cal, pid(10), Parked(1)).unwrap();
        let err = q.wait_on_coop(&mut cal, pid(10), Parked(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongParticipant);
        let err = q.wait_on_coop(&mut cal, pid(11), Parked(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueFull);
        assert_eq!(q.slave_refused(), 1);
    }

    #[test]
    fn test_cancel_removes_waiters() {
        let mut cal = EventCalendar::<i64>::default();
        let mut q = Queue::default();
        q.cooperate(&mut cal, pid(1), 1, None).unwrap();
        assert!(q.cancel(&mut cal, pid(1)));
        assert!(!q.cancel(&mut cal, pid(1)));
        q.wait_on_coop(&mut cal, pid(10), Parked(1)).unwrap();
        assert!(q.cancel(&mut cal, pid(10)));
        assert_eq!(q.cancelled(), 2);
        assert_eq!(
            q.resume_master(&mut cal, pid(1)),
            Err(CoopError::NotQueued { process: pid(1) })
        );
    }
}
