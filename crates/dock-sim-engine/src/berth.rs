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

//! # Berth
//!
//! A quay section of fixed length shared by the ships moored along it.
//!
//! A ship asking for `amount` of quay is queued and served only when it is
//! the head of the queue *and* enough length is free. The queue discipline
//! decides who becomes head; the gate itself never lets a later, smaller
//! request overtake the head. Whenever the head changes or length is freed
//! the new head is woken and re-checks the gate.
//!
//! Occupancy statistics count overlapping stays once: the berth is "in use"
//! from the moment the first ship of a group of overlapping stays moors
//! until the last ship of the group leaves.

use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    kernel::{Kernel, ProcessId},
    queue::{QueueCapacity, QueueDiscipline, WaitQueue},
    space::SpaceLength,
    time::{TimeDelta, TimePoint},
};
use dock_sim_model::id::BerthId;
use std::fmt::Display;
use tracing::{debug, warn};

/// Outcome of a request that was not refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Granted,
    /// The requester was passivated and must call `resume` when woken.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BerthError {
    ZeroLength(BerthId),
    ExceedsLength {
        berth: BerthId,
        requester: ProcessId,
        requested: SpaceLength,
        length: SpaceLength,
    },
    QueueFull {
        berth: BerthId,
        requester: ProcessId,
        capacity: usize,
    },
    AlreadyQueued {
        berth: BerthId,
        requester: ProcessId,
    },
    NotQueued {
        berth: BerthId,
        requester: ProcessId,
    },
    NotHolding {
        berth: BerthId,
        requester: ProcessId,
    },
    InUse(BerthId),
}

impl Display for BerthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BerthError::ZeroLength(b) => write!(f, "{} must have a positive length", b),
            BerthError::ExceedsLength {
                berth,
                requester,
                requested,
                length,
            } => write!(
                f,
                "{} requests {} at {} which is only {} long",
                requester, requested, berth, length
            ),
            BerthError::QueueFull {
                berth,
                requester,
                capacity,
            } => write!(
                f,
                "{} refused at {}: queue full ({} waiting)",
                requester, berth, capacity
            ),
            BerthError::AlreadyQueued { berth, requester } => {
                write!(f, "{} is already waiting at or moored at {}", requester, berth)
            }
            BerthError::NotQueued { berth, requester } => {
                write!(f, "{} is not waiting at {}", requester, berth)
            }
            BerthError::NotHolding { berth, requester } => {
                write!(f, "{} holds no length at {}", requester, berth)
            }
            BerthError::InUse(b) => write!(f, "{} has already been used", b),
        }
    }
}

impl std::error::Error for BerthError {}

impl Refusal for BerthError {
    fn kind(&self) -> ErrorKind {
        match self {
            BerthError::ZeroLength(_) | BerthError::InUse(_) => ErrorKind::Construction,
            BerthError::ExceedsLength { .. } => ErrorKind::CapacityViolation,
            BerthError::QueueFull { .. } => ErrorKind::QueueFull,
            BerthError::AlreadyQueued { .. }
            | BerthError::NotQueued { .. }
            | BerthError::NotHolding { .. } => ErrorKind::WrongParticipant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Claim {
    requester: ProcessId,
    amount: SpaceLength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Holding<T: SimVariable> {
    requester: ProcessId,
    amount: SpaceLength,
    since: TimePoint<T>,
    // Holders present when this one was granted.
    predecessors: Vec<ProcessId>,
}

#[derive(Debug, Clone)]
pub struct Berth<T: SimVariable> {
    id: BerthId,
    length: SpaceLength,
    avail: SpaceLength,
    queue: WaitQueue<Claim>,
    holdings: Vec<Holding<T>>,
    users: u64,
    service_time: TimeDelta<T>,
    usage_time: TimeDelta<T>,
    busy_since: Option<TimePoint<T>>,
    reset_at: TimePoint<T>,
    used: bool,
}

impl<T: SimVariable> Berth<T> {
    pub fn new(
        id: BerthId,
        length: SpaceLength,
        discipline: QueueDiscipline,
        capacity: QueueCapacity,
        seed: u64,
    ) -> Result<Self, BerthError> {
        if length.is_zero() {
            warn!(berth = %id, "berth without length");
            return Err(BerthError::ZeroLength(id));
        }
        Ok(Self {
            id,
            length,
            avail: length,
            queue: WaitQueue::new(discipline, capacity, seed),
            holdings: Vec::new(),
            users: 0,
            service_time: TimeDelta::zero(),
            usage_time: TimeDelta::zero(),
            busy_since: None,
            reset_at: TimePoint::zero(),
            used: false,
        })
    }

    #[inline]
    pub fn id(&self) -> BerthId {
        self.id
    }

    #[inline]
    pub fn length(&self) -> SpaceLength {
        self.length
    }

    #[inline]
    pub fn available(&self) -> SpaceLength {
        self.avail
    }

    /// Ships that have left the berth since the last reset.
    #[inline]
    pub fn users(&self) -> u64 {
        self.users
    }

    #[inline]
    pub fn refused(&self) -> u64 {
        self.queue.refused()
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn max_queue_len(&self) -> usize {
        self.queue.max_len()
    }

    #[inline]
    pub fn discipline(&self) -> QueueDiscipline {
        self.queue.discipline()
    }

    #[inline]
    pub fn holders(&self) -> usize {
        self.holdings.len()
    }

    #[inline]
    pub fn is_waiting(&self, requester: ProcessId) -> bool {
        self.queue.iter().any(|c| c.requester == requester)
    }

    #[inline]
    pub fn is_holding(&self, requester: ProcessId) -> bool {
        self.holdings.iter().any(|h| h.requester == requester)
    }

    /// Changes the quay length. Only allowed before the first request.
    pub fn change_length(&mut self, length: SpaceLength) -> Result<(), BerthError> {
        if self.used || !self.holdings.is_empty() {
            warn!(berth = %self.id, "length change after first use refused");
            return Err(BerthError::InUse(self.id));
        }
        if length.is_zero() {
            return Err(BerthError::ZeroLength(self.id));
        }
        self.length = length;
        self.avail = length;
        Ok(())
    }

    /// Queues `requester` for `amount` of quay and tries to moor it.
    pub fn take<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        requester: ProcessId,
        amount: SpaceLength,
    ) -> Result<Acquire, BerthError> {
        if amount > self.length {
            warn!(berth = %self.id, requester = %requester, requested = amount.value(),
                length = self.length.value(), "request longer than the berth");
            return Err(BerthError::ExceedsLength {
                berth: self.id,
                requester,
                requested: amount,
                length: self.length,
            });
        }
        if self.is_waiting(requester) || self.is_holding(requester) {
            warn!(berth = %self.id, requester = %requester, "duplicate berth request");
            return Err(BerthError::AlreadyQueued {
                berth: self.id,
                requester,
            });
        }
        if let Err(e) = self.queue.insert(Claim { requester, amount }) {
            warn!(berth = %self.id, requester = %requester, "berth queue full");
            return Err(BerthError::QueueFull {
                berth: self.id,
                requester,
                capacity: e.capacity(),
            });
        }
        self.used = true;
        debug!(berth = %self.id, requester = %requester, requested = amount.value(),
            available = self.avail.value(), "berth requested");
        Ok(self.try_grant(kernel, requester))
    }

    /// Re-checks the gate for a woken requester.
    pub fn resume<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        requester: ProcessId,
    ) -> Result<Acquire, BerthError> {
        if !self.is_waiting(requester) {
            return Err(BerthError::NotQueued {
                berth: self.id,
                requester,
            });
        }
        Ok(self.try_grant(kernel, requester))
    }

    fn try_grant<K: Kernel<T> + ?Sized>(&mut self, kernel: &mut K, requester: ProcessId) -> Acquire {
        let head = self.queue.first().copied();
        match head {
            Some(claim) if claim.requester == requester && claim.amount <= self.avail => {
                self.queue.pop_first();
                let now = kernel.now();
                if self.holdings.is_empty() {
                    self.busy_since = Some(now);
                }
                let predecessors = self.holdings.iter().map(|h| h.requester).collect();
                self.holdings.push(Holding {
                    requester,
                    amount: claim.amount,
                    since: now,
                    predecessors,
                });
                self.avail = self.avail - claim.amount;
                debug!(berth = %self.id, requester = %requester,
                    available = self.avail.value(), "berth granted");
                if let Some(next) = self.queue.first() {
                    kernel.reactivate(next.requester);
                }
                Acquire::Granted
            }
            _ => {
                kernel.passivate(requester);
                Acquire::Blocked
            }
        }
    }

    /// Frees the length held by `requester` and wakes the queue head.
    pub fn release<K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        requester: ProcessId,
    ) -> Result<SpaceLength, BerthError> {
        let Some(index) = self.holdings.iter().position(|h| h.requester == requester) else {
            warn!(berth = %self.id, requester = %requester, "release without holding");
            return Err(BerthError::NotHolding {
                berth: self.id,
                requester,
            });
        };
        let holding = self.holdings.remove(index);
        let now = kernel.now();
        self.avail = self.avail + holding.amount;
        self.users += 1;
        let since = holding.since.max(self.reset_at);
        self.service_time = self.service_time.saturating_add(now.elapsed_since(since));

        let is_predecessor = self
            .holdings
            .iter()
            .any(|h| h.predecessors.contains(&requester));
        let predecessor_holds = holding
            .predecessors
            .iter()
            .any(|p| self.holdings.iter().any(|h| h.requester == *p));
        if !is_predecessor && !predecessor_holds {
            debug_assert!(self.holdings.is_empty());
            if let Some(start) = self.busy_since.take() {
                let start = start.max(self.reset_at);
                self.usage_time = self.usage_time.saturating_add(now.elapsed_since(start));
            }
        }

        debug!(berth = %self.id, requester = %requester,
            available = self.avail.value(), "berth released");
        if let Some(next) = self.queue.first() {
            kernel.reactivate(next.requester);
        }
        Ok(holding.amount)
    }

    /// Mean time a ship stayed moored, `None` before the first departure.
    pub fn avg_service_time(&self) -> Option<f64> {
        if self.users == 0 {
            return None;
        }
        Some(self.service_time.to_f64() / self.users as f64)
    }

    /// Share of the time since the last reset in which at least one ship was
    /// moored, `None` when no time has passed.
    pub fn avg_usage(&self, now: TimePoint<T>) -> Option<f64> {
        let elapsed = now.elapsed_since(self.reset_at);
        if elapsed.is_zero() {
            return None;
        }
        let open = self
            .busy_since
            .map(|start| now.elapsed_since(start.max(self.reset_at)))
            .unwrap_or_default();
        Some(self.usage_time.saturating_add(open).to_f64() / elapsed.to_f64())
    }

    /// Zeroes the statistics. Moored and waiting ships are kept.
    pub fn reset(&mut self, now: TimePoint<T>) {
        self.users = 0;
        self.service_time = TimeDelta::zero();
        self.usage_time = TimeDelta::zero();
        self.reset_at = now;
        self.queue.reset_statistics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_sim_core::calendar::EventCalendar;

    const CLOCK: ProcessId = ProcessId::new(999);

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    fn len(n: usize) -> SpaceLength {
        SpaceLength::new(n)
    }

    fn berth(length: usize, discipline: QueueDiscipline, capacity: usize) -> Berth<i64> {
        Berth::new(
            BerthId::new(0),
            len(length),
            discipline,
            QueueCapacity::limited(capacity),
            1,
        )
        .unwrap()
    }

    fn advance(cal: &mut EventCalendar<i64>, to: i64) {
        cal.activate_at(CLOCK, TimePoint::new(to));
        while let Some(a) = cal.next() {
            if a.pid() == CLOCK {
                break;
            }
        }
    }

    #[test]
    fn test_zero_length_rejected() {
        let err = Berth::<i64>::new(
            BerthId::new(3),
            len(0),
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            0,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_head_of_line_blocks_smaller_request() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 0);
        let (x, y, z) = (pid(1), pid(2), pid(3));

        assert_eq!(b.take(&mut cal, x, len(300)), Ok(Acquire::Granted));
        assert_eq!(b.available(), len(200));
        assert_eq!(b.take(&mut cal, y, len(300)), Ok(Acquire::Blocked));
        // Z would fit, but Y is the head.
        assert_eq!(b.take(&mut cal, z, len(150)), Ok(Acquire::Blocked));
        assert_eq!(b.available(), len(200));

        b.release(&mut cal, x).unwrap();
        assert_eq!(b.available(), len(500));
        assert!(cal.is_scheduled(y));
        assert!(!cal.is_scheduled(z));

        assert_eq!(b.resume(&mut cal, y), Ok(Acquire::Granted));
        assert_eq!(b.available(), len(200));
        assert!(cal.is_scheduled(z));
        assert_eq!(b.resume(&mut cal, z), Ok(Acquire::Granted));
        assert_eq!(b.available(), len(50));
        assert_eq!(b.queue_len(), 0);
    }

    #[test]
    fn test_woken_head_rechecks_capacity() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 0);
        b.take(&mut cal, pid(1), len(300)).unwrap();
        b.take(&mut cal, pid(2), len(150)).unwrap();
        assert!(b.is_holding(pid(2)));
        assert_eq!(b.take(&mut cal, pid(3), len(400)), Ok(Acquire::Blocked));
        b.release(&mut cal, pid(2)).unwrap();
        // Only 200 free, the head goes back to sleep.
        assert_eq!(b.resume(&mut cal, pid(3)), Ok(Acquire::Blocked));
        assert!(!cal.is_scheduled(pid(3)));
        b.release(&mut cal, pid(1)).unwrap();
        assert_eq!(b.resume(&mut cal, pid(3)), Ok(Acquire::Granted));
    }

    #[test]
    fn test_lifo_changes_candidacy_not_the_gate() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Lifo, 0);
        b.take(&mut cal, pid(1), len(300)).unwrap();
        assert_eq!(b.take(&mut cal, pid(2), len(300)), Ok(Acquire::Blocked));
        // The latest arrival becomes head and fits.
        assert_eq!(b.take(&mut cal, pid(3), len(150)), Ok(Acquire::Granted));
        assert!(b.is_waiting(pid(2)));
    }

    #[test]
    fn test_refusals_leave_state_untouched() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 1);
        let err = b.take(&mut cal, pid(1), len(501)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityViolation);

        b.take(&mut cal, pid(1), len(400)).unwrap();
        assert_eq!(
            b.take(&mut cal, pid(1), len(10)).unwrap_err().kind(),
            ErrorKind::WrongParticipant
        );
        assert_eq!(b.take(&mut cal, pid(2), len(400)), Ok(Acquire::Blocked));
        let err = b.take(&mut cal, pid(3), len(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueFull);
        assert_eq!(b.refused(), 1);
        assert_eq!(
            b.release(&mut cal, pid(2)).unwrap_err().kind(),
            ErrorKind::WrongParticipant
        );
        assert_eq!(b.available(), len(100));
        assert_eq!(b.queue_len(), 1);
    }

    #[test]
    fn test_change_length_only_before_use() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 0);
        assert!(b.change_length(len(0)).is_err());
        b.change_length(len(800)).unwrap();
        assert_eq!(b.available(), len(800));
        b.take(&mut cal, pid(1), len(100)).unwrap();
        assert_eq!(b.change_length(len(900)), Err(BerthError::InUse(BerthId::new(0))));
    }

    #[test]
    fn test_overlapping_stays_counted_once() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 0);
        // A [0, 10), B [4, 16): union is [0, 16).
        b.take(&mut cal, pid(1), len(100)).unwrap();
        advance(&mut cal, 4);
        b.take(&mut cal, pid(2), len(100)).unwrap();
        advance(&mut cal, 10);
        b.release(&mut cal, pid(1)).unwrap();
        advance(&mut cal, 16);
        b.release(&mut cal, pid(2)).unwrap();
        // Idle [16, 20).
        advance(&mut cal, 20);
        assert_eq!(b.avg_usage(cal.now()), Some(16.0 / 20.0));
        assert_eq!(b.avg_service_time(), Some((10.0 + 12.0) / 2.0));
        assert_eq!(b.users(), 2);
    }

    #[test]
    fn test_chained_overlap_and_open_interval() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 0);
        // A [0, 5), B [3, 8), C [6, ...) still moored at 10.
        b.take(&mut cal, pid(1), len(100)).unwrap();
        advance(&mut cal, 3);
        b.take(&mut cal, pid(2), len(100)).unwrap();
        advance(&mut cal, 5);
        b.release(&mut cal, pid(1)).unwrap();
        advance(&mut cal, 6);
        b.take(&mut cal, pid(3), len(100)).unwrap();
        advance(&mut cal, 8);
        b.release(&mut cal, pid(2)).unwrap();
        advance(&mut cal, 10);
        assert_eq!(b.avg_usage(cal.now()), Some(1.0));
    }

    #[test]
    fn test_reset_zeroes_statistics_only() {
        let mut cal = EventCalendar::<i64>::default();
        let mut b = berth(500, QueueDiscipline::Fifo, 0);
        b.take(&mut cal, pid(1), len(100)).unwrap();
        advance(&mut cal, 10);
        b.reset(cal.now());
        assert_eq!(b.avg_usage(cal.now()), None);
        advance(&mut cal, 14);
        b.release(&mut cal, pid(1)).unwrap();
        assert_eq!(b.avg_service_time(), Some(4.0));
        assert_eq!(b.available(), len(500));
    }
}
