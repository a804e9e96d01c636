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

//! Truck holding areas.
//!
//! A holding area owns a fixed set of numbered lanes. A truck first obtains
//! a lane (in the order of the lane queue) and then waits there as the
//! slave of a rendezvous until transporters have emptied and filled it.

use crate::coop::{Keyed, RendezvousQueue};
use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    kernel::{Kernel, ProcessId},
    queue::{QueueCapacity, QueueDiscipline, WaitQueue},
};
use dock_sim_model::{
    id::{HoldingAreaId, LaneNumber, TransporterId, TruckId},
    lane::Lane,
};
use std::fmt::Display;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneError {
    NoLanes(HoldingAreaId),
    QueueFull {
        holding_area: HoldingAreaId,
        process: ProcessId,
        capacity: usize,
    },
    AlreadyWaiting(ProcessId),
    NotWaiting(ProcessId),
    ForeignLane { holding_area: HoldingAreaId, lane: Lane },
    NotHandedOut(Lane),
}

impl Display for LaneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaneError::NoLanes(h) => write!(f, "{} must have at least one lane", h),
            LaneError::QueueFull {
                holding_area,
                process,
                capacity,
            } => write!(
                f,
                "{} refused at {}: lane queue full ({} waiting)",
                process, holding_area, capacity
            ),
            LaneError::AlreadyWaiting(p) => write!(f, "{} is already waiting for a lane", p),
            LaneError::NotWaiting(p) => write!(f, "{} is not waiting for a lane", p),
            LaneError::ForeignLane { holding_area, lane } => {
                write!(f, "{} does not belong to {}", lane, holding_area)
            }
            LaneError::NotHandedOut(lane) => write!(f, "{} is not in use", lane),
        }
    }
}

impl std::error::Error for LaneError {}

impl Refusal for LaneError {
    fn kind(&self) -> ErrorKind {
        match self {
            LaneError::NoLanes(_) => ErrorKind::Construction,
            LaneError::QueueFull { .. } => ErrorKind::QueueFull,
            _ => ErrorKind::WrongParticipant,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanePool {
    holding_area: HoldingAreaId,
    lanes: usize,
    free: WaitQueue<Lane>,
    waiting: WaitQueue<ProcessId>,
    handed_out: u64,
}

impl LanePool {
    /// `lanes` numbered lanes; trucks queue for them per `waiting`.
    pub fn new(
        holding_area: HoldingAreaId,
        lanes: usize,
        waiting: WaitQueue<ProcessId>,
    ) -> Result<Self, LaneError> {
        if lanes == 0 {
            return Err(LaneError::NoLanes(holding_area));
        }
        let mut free = WaitQueue::new(QueueDiscipline::Fifo, QueueCapacity::limited(lanes), 0);
        for n in 1..=lanes {
            let lane = Lane::new(holding_area, LaneNumber::new(n as u64));
            free.insert(lane).map_err(|_| LaneError::NotHandedOut(lane))?;
        }
        Ok(Self {
            holding_area,
            lanes,
            free,
            waiting,
            handed_out: 0,
        })
    }

    /// First-come, first-served lanes with an unbounded queue.
    pub fn fifo(holding_area: HoldingAreaId, lanes: usize) -> Result<Self, LaneError> {
        Self::new(holding_area, lanes, WaitQueue::fifo())
    }

    #[inline]
    pub fn refused(&self) -> u64 {
        self.waiting.refused()
    }

    #[inline]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    #[inline]
    pub fn free_lanes(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    #[inline]
    pub fn max_waiting(&self) -> usize {
        self.waiting.max_len()
    }

    #[inline]
    pub fn handed_out(&self) -> u64 {
        self.handed_out
    }

    /// Hands out a lane, or queues and passivates `pid`. A full lane queue
    /// refuses the truck and leaves it running.
    pub fn acquire<T: SimVariable, K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        pid: ProcessId,
    ) -> Result<Option<Lane>, LaneError> {
        if self.waiting.iter().any(|p| *p == pid) {
            return Err(LaneError::AlreadyWaiting(pid));
        }
        if self.waiting.is_empty() {
            if let Some(lane) = self.free.pop_first() {
                self.handed_out += 1;
                return Ok(Some(lane));
            }
        }
        if let Err(e) = self.waiting.insert(pid) {
            warn!(process = %pid, holding_area = %self.holding_area, "lane queue full");
            return Err(LaneError::QueueFull {
                holding_area: self.holding_area,
                process: pid,
                capacity: e.capacity(),
            });
        }
        kernel.passivate(pid);
        debug!(process = %pid, holding_area = %self.holding_area, "waiting for a lane");
        Ok(None)
    }

    /// Re-checks a woken waiter.
    pub fn resume<T: SimVariable, K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        pid: ProcessId,
    ) -> Result<Option<Lane>, LaneError> {
        if !self.waiting.iter().any(|p| *p == pid) {
            return Err(LaneError::NotWaiting(pid));
        }
        if self.waiting.first() == Some(&pid) && !self.free.is_empty() {
            self.waiting.pop_first();
            let lane = self.free.pop_first();
            if lane.is_some() {
                self.handed_out += 1;
            }
            self.wake_head(kernel);
            return Ok(lane);
        }
        kernel.passivate(pid);
        Ok(None)
    }

    pub fn release<T: SimVariable, K: Kernel<T> + ?Sized>(
        &mut self,
        kernel: &mut K,
        lane: Lane,
    ) -> Result<(), LaneError> {
        let number = lane.number().value() as usize;
        if lane.holding_area() != self.holding_area || number == 0 || number > self.lanes {
            warn!(lane = %lane, "lane released to the wrong holding area");
            return Err(LaneError::ForeignLane {
                holding_area: self.holding_area,
                lane,
            });
        }
        if self.free.iter().any(|l| *l == lane) {
            return Err(LaneError::NotHandedOut(lane));
        }
        self.free
            .insert(lane)
            .map_err(|_| LaneError::NotHandedOut(lane))?;
        self.wake_head(kernel);
        Ok(())
    }

    fn wake_head<T: SimVariable, K: Kernel<T> + ?Sized>(&self, kernel: &mut K) {
        if self.free.is_empty() {
            return;
        }
        if let Some(&head) = self.waiting.first() {
            kernel.reactivate(head);
        }
    }
}

/// A truck parked at a lane, waiting for transporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParkedTruck {
    pub truck: TruckId,
    pub lane: LaneNumber,
}

impl Keyed for ParkedTruck {
    type Key = LaneNumber;

    #[inline]
    fn key(&self) -> LaneNumber {
        self.lane
    }
}

#[derive(Debug, Clone)]
pub struct HoldingArea<T: SimVariable> {
    id: HoldingAreaId,
    lanes: LanePool,
    trucks: RendezvousQueue<TransporterId, ParkedTruck, T>,
}

impl<T: SimVariable> HoldingArea<T> {
    pub fn new(
        id: HoldingAreaId,
        lanes: LanePool,
        trucks: RendezvousQueue<TransporterId, ParkedTruck, T>,
    ) -> Self {
        Self { id, lanes, trucks }
    }

    #[inline]
    pub fn id(&self) -> HoldingAreaId {
        self.id
    }

    #[inline]
    pub fn lanes(&self) -> &LanePool {
        &self.lanes
    }

    #[inline]
    pub fn lanes_mut(&mut self) -> &mut LanePool {
        &mut self.lanes
    }

    #[inline]
    pub fn trucks(&self) -> &RendezvousQueue<TransporterId, ParkedTruck, T> {
        &self.trucks
    }

    #[inline]
    pub fn trucks_mut(&mut self) -> &mut RendezvousQueue<TransporterId, ParkedTruck, T> {
        &mut self.trucks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_sim_core::calendar::EventCalendar;

    fn pid(n: u64) -> ProcessId {
        ProcessId::new(n)
    }

    #[test]
    fn test_zero_lanes_is_rejected() {
        let err = LanePool::fifo(HoldingAreaId::new(0), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_lanes_are_numbered_from_one() {
        let mut cal = EventCalendar::<i64>::default();
        let mut pool = LanePool::fifo(HoldingAreaId::new(2), 2).unwrap();
        let a = pool.acquire(&mut cal, pid(1)).unwrap().unwrap();
        let b = pool.acquire(&mut cal, pid(2)).unwrap().unwrap();
        assert_eq!(a.number(), LaneNumber::new(1));
        assert_eq!(b.number(), LaneNumber::new(2));
        assert_eq!(a.holding_area(), HoldingAreaId::new(2));
        assert_eq!(pool.free_lanes(), 0);
    }

    #[test]
    fn test_waiters_are_served_in_arrival_order() {
        let mut cal = EventCalendar::<i64>::default();
        let mut pool = LanePool::fifo(HoldingAreaId::new(0), 1).unwrap();
        let lane = pool.acquire(&mut cal, pid(1)).unwrap().unwrap();
        assert_eq!(pool.acquire(&mut cal, pid(2)).unwrap(), None);
        assert_eq!(pool.acquire(&mut cal, pid(3)).unwrap(), None);
        assert!(pool.acquire(&mut cal, pid(3)).is_err());

        pool.release(&mut cal, lane).unwrap();
        assert!(cal.is_scheduled(pid(2)));
        assert!(!cal.is_scheduled(pid(3)));
        assert_eq!(pool.resume(&mut cal, pid(3)).unwrap(), None);
        assert_eq!(pool.resume(&mut cal, pid(2)).unwrap(), Some(lane));
        assert_eq!(pool.waiting(), 1);
        assert_eq!(pool.handed_out(), 2);
    }

    #[test]
    fn test_release_checks_the_lane() {
        let mut cal = EventCalendar::<i64>::default();
        let mut pool = LanePool::fifo(HoldingAreaId::new(0), 2).unwrap();
        let free = Lane::new(HoldingAreaId::new(0), LaneNumber::new(1));
        assert_eq!(
            pool.release(&mut cal, free),
            Err(LaneError::NotHandedOut(free))
        );
        let foreign = Lane::new(HoldingAreaId::new(1), LaneNumber::new(1));
        assert!(matches!(
            pool.release(&mut cal, foreign),
            Err(LaneError::ForeignLane { .. })
        ));
        let out_of_range = Lane::new(HoldingAreaId::new(0), LaneNumber::new(3));
        assert!(pool.release(&mut cal, out_of_range).is_err());
        assert_eq!(
            pool.resume(&mut cal, pid(9)),
            Err(LaneError::NotWaiting(pid(9)))
        );
    }

    #[test]
    fn test_full_lane_queue_refuses_without_passivating() {
        let mut cal = EventCalendar::<i64>::default();
        let waiting = WaitQueue::new(QueueDiscipline::Fifo, QueueCapacity::limited(1), 0);
        let mut pool = LanePool::new(HoldingAreaId::new(0), 1, waiting).unwrap();
        let lane = pool.acquire(&mut cal, pid(1)).unwrap().unwrap();
        assert_eq!(pool.acquire(&mut cal, pid(2)).unwrap(), None);
        let err = pool.acquire(&mut cal, pid(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueFull);
        assert_eq!(pool.refused(), 1);
        assert_eq!(pool.waiting(), 1);

        pool.release(&mut cal, lane).unwrap();
        assert!(cal.is_scheduled(pid(2)));
        assert!(!cal.is_scheduled(pid(3)));
        assert_eq!(pool.resume(&mut cal, pid(2)).unwrap(), Some(lane));
    }
}
