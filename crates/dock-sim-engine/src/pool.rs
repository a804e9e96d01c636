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

//! A pool of interchangeable resources and the demands competing for them.
//!
//! Idle resources and pending demands wait in their own queues. A
//! controller inspects both and moves resources from idle to working with
//! `take`; the resource comes back through `finish` and `add_idle`.

use dock_sim_core::{
    err::{ErrorKind, Refusal},
    queue::{QueueCapacity, QueueDiscipline, WaitQueue},
};
use std::fmt::{Debug, Display};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    DemandQueueFull { capacity: usize },
    IdleQueueFull { capacity: usize },
    AlreadyIdle,
}

impl Display for PoolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolError::DemandQueueFull { capacity } => {
                write!(f, "Demand queue is full ({} waiting)", capacity)
            }
            PoolError::IdleQueueFull { capacity } => {
                write!(f, "Idle queue is full ({} waiting)", capacity)
            }
            PoolError::AlreadyIdle => write!(f, "Resource is already idle"),
        }
    }
}

impl std::error::Error for PoolError {}

impl Refusal for PoolError {
    fn kind(&self) -> ErrorKind {
        match self {
            PoolError::DemandQueueFull { .. } | PoolError::IdleQueueFull { .. } => {
                ErrorKind::QueueFull
            }
            PoolError::AlreadyIdle => ErrorKind::WrongParticipant,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignablePool<R, D> {
    idle: WaitQueue<R>,
    working: Vec<R>,
    demand: WaitQueue<D>,
    limit: usize,
    taken: u64,
}

impl<R, D> AssignablePool<R, D>
where
    R: Copy + PartialEq + Debug,
{
    /// A pool of at most `limit` resources.
    pub fn new(
        limit: usize,
        idle_discipline: QueueDiscipline,
        idle_capacity: QueueCapacity,
        demand_discipline: QueueDiscipline,
        demand_capacity: QueueCapacity,
        seed: u64,
    ) -> Self {
        Self {
            idle: WaitQueue::new(idle_discipline, idle_capacity, seed),
            working: Vec::new(),
            demand: WaitQueue::new(demand_discipline, demand_capacity, seed.wrapping_add(1)),
            limit,
            taken: 0,
        }
    }

    pub fn fifo(limit: usize) -> Self {
        Self::new(
            limit,
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            0,
        )
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn idle(&self) -> impl Iterator<Item = &R> {
        self.idle.iter()
    }

    #[inline]
    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }

    #[inline]
    pub fn working(&self) -> &[R] {
        &self.working
    }

    #[inline]
    pub fn demand(&self) -> impl Iterator<Item = &D> {
        self.demand.iter()
    }

    #[inline]
    pub fn demand_len(&self) -> usize {
        self.demand.len()
    }

    #[inline]
    pub fn max_demand_len(&self) -> usize {
        self.demand.max_len()
    }

    /// Whether the next demand would be refused.
    #[inline]
    pub fn demand_is_full(&self) -> bool {
        self.demand.is_full()
    }

    #[inline]
    pub fn demand_refused(&self) -> u64 {
        self.demand.refused()
    }

    /// Number of resources handed out since construction.
    #[inline]
    pub fn taken(&self) -> u64 {
        self.taken
    }

    #[inline]
    pub fn is_idle(&self, r: R) -> bool {
        self.idle.iter().any(|x| *x == r)
    }

    #[inline]
    pub fn is_working(&self, r: R) -> bool {
        self.working.contains(&r)
    }

    pub fn add_idle(&mut self, r: R) -> Result<(), PoolError> {
        if self.is_idle(r) {
            return Err(PoolError::AlreadyIdle);
        }
        self.idle
            .insert(r)
            .map(|_| ())
            .map_err(|e| {
                warn!(resource = ?r, "idle queue full");
                PoolError::IdleQueueFull {
                    capacity: e.capacity(),
                }
            })
    }

    pub fn add_demand(&mut self, d: D) -> Result<(), PoolError> {
        self.demand
            .insert(d)
            .map(|_| ())
            .map_err(|e| PoolError::DemandQueueFull {
                capacity: e.capacity(),
            })
    }

    pub fn remove_demand_where<P: FnMut(&D) -> bool>(&mut self, pred: P) -> Option<D> {
        self.demand.remove_where(pred)
    }

    /// Moves exactly the given idle resources to working.
    ///
    /// Returns `None` without changing anything when the request is empty,
    /// exceeds the pool size or names a resource that is not idle.
    pub fn take(&mut self, resources: &[R]) -> Option<Vec<R>> {
        if resources.is_empty() {
            warn!("request for zero resources ignored");
            return None;
        }
        if resources.len() > self.limit {
            warn!(
                requested = resources.len(),
                limit = self.limit,
                "request exceeds the pool size"
            );
            return None;
        }
        for (i, r) in resources.iter().enumerate() {
            if !self.is_idle(*r) || resources[..i].contains(r) {
                return None;
            }
        }
        for r in resources {
            self.idle.remove_where(|x| x == r);
            self.working.push(*r);
        }
        self.taken += resources.len() as u64;
        Some(resources.to_vec())
    }

    /// Takes the first `n` idle resources.
    pub fn take_idle(&mut self, n: usize) -> Option<Vec<R>> {
        if n > self.idle.len() {
            return None;
        }
        let first: Vec<R> = self.idle.iter().take(n).copied().collect();
        self.take(&first)
    }

    /// Removes `r` from the working set. Returns whether it was working.
    pub fn finish(&mut self, r: R) -> bool {
        match self.working.iter().position(|x| *x == r) {
            Some(i) => {
                self.working.swap_remove(i);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> AssignablePool<u32, &'static str> {
        let mut p = AssignablePool::fifo(3);
        for r in [1, 2, 3] {
            p.add_idle(r).unwrap();
        }
        p
    }

    #[test]
    fn test_take_moves_to_working() {
        let mut p = pool();
        assert_eq!(p.take(&[3, 1]), Some(vec![3, 1]));
        assert_eq!(p.idle().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(p.working(), &[3, 1]);
        assert_eq!(p.taken(), 2);
        assert!(p.finish(3));
        assert!(!p.finish(3));
        p.add_idle(3).unwrap();
        assert_eq!(p.idle_len(), 2);
    }

    #[test]
    fn test_invalid_requests_change_nothing() {
        let mut p = pool();
        assert_eq!(p.take(&[]), None);
        assert_eq!(p.take(&[1, 2, 3, 1]), None);
        assert_eq!(p.take(&[1, 1]), None);
        assert_eq!(p.take(&[7]), None);
        assert_eq!(p.take_idle(4), None);
        assert_eq!(p.idle_len(), 3);
        assert!(p.working().is_empty());
        assert_eq!(p.add_idle(1), Err(PoolError::AlreadyIdle));
    }

    #[test]
    fn test_take_idle_uses_queue_order() {
        let mut p = pool();
        assert_eq!(p.take_idle(2), Some(vec![1, 2]));
        assert_eq!(p.take_idle(2), None);
        assert_eq!(p.take_idle(1), Some(vec![3]));
    }

    #[test]
    fn test_demand_queue_limit() {
        let mut p: AssignablePool<u32, &str> = AssignablePool::new(
            1,
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            QueueDiscipline::Fifo,
            QueueCapacity::limited(1),
            0,
        );
        assert!(!p.demand_is_full());
        p.add_demand("a").unwrap();
        assert!(p.demand_is_full());
        let err = p.add_demand("b").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::QueueFull);
        assert_eq!(p.demand_refused(), 1);
        assert_eq!(p.remove_demand_where(|d| *d == "a"), Some("a"));
        assert_eq!(p.demand_len(), 0);
    }

    #[test]
    fn test_idle_queue_order_and_limit() {
        let mut p: AssignablePool<u32, &str> = AssignablePool::new(
            2,
            QueueDiscipline::Lifo,
            QueueCapacity::limited(2),
            QueueDiscipline::Fifo,
            QueueCapacity::unlimited(),
            0,
        );
        p.add_idle(1).unwrap();
        p.add_idle(2).unwrap();
        let err = p.add_idle(3).unwrap_err();
        assert_eq!(err, PoolError::IdleQueueFull { capacity: 2 });
        assert_eq!(err.kind(), ErrorKind::QueueFull);
        assert_eq!(p.idle_len(), 2);
        // The last resource back is the first one out.
        assert_eq!(p.take_idle(1), Some(vec![2]));
    }
}
