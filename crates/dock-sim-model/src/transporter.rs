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

use crate::{
    err::EntityError,
    id::{CraneId, TransporterId},
    job::Job,
};
use dock_sim_core::{SimVariable, kernel::ProcessId, time::TimeDelta};
use std::marker::PhantomData;

/// A terminal vehicle carrying containers between cranes, the yard and the
/// holding areas.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalTransporter<T: SimVariable> {
    id: TransporterId,
    process: ProcessId,
    capacity: u64,
    load: u64,
    speed_loaded: f64,
    speed_empty: f64,
    job: Option<Job>,
    pinned: Option<CraneId>,
    node: usize,
    _phantom: PhantomData<T>,
}

impl<T: SimVariable> InternalTransporter<T> {
    pub fn new(
        id: TransporterId,
        process: ProcessId,
        capacity: u64,
        speed_loaded: f64,
        speed_empty: f64,
        node: usize,
    ) -> Result<Self, EntityError> {
        if capacity == 0 {
            return Err(EntityError::ZeroTransporterCapacity(id));
        }
        for speed in [speed_loaded, speed_empty] {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(EntityError::NonPositiveTransporterSpeed {
                    transporter: id,
                    speed,
                });
            }
        }
        Ok(Self {
            id,
            process,
            capacity,
            load: 0,
            speed_loaded,
            speed_empty,
            job: None,
            pinned: None,
            node,
            _phantom: PhantomData,
        })
    }

    /// Restricts the transporter to the jobs of one crane.
    pub fn pinned_to(mut self, crane: CraneId) -> Self {
        self.pinned = Some(crane);
        self
    }

    #[inline]
    pub fn id(&self) -> TransporterId {
        self.id
    }

    #[inline]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    pub fn load(&self) -> u64 {
        self.load
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.load >= self.capacity
    }

    #[inline]
    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    #[inline]
    pub fn pinned(&self) -> Option<CraneId> {
        self.pinned
    }

    /// Layout node the transporter is standing at.
    #[inline]
    pub fn node(&self) -> usize {
        self.node
    }

    #[inline]
    pub fn set_job(&mut self, job: Job) {
        self.job = Some(job);
    }

    #[inline]
    pub fn finish_job(&mut self) -> Option<Job> {
        self.job.take()
    }

    /// Takes one container on board. Returns `false` when full.
    pub fn pick_up(&mut self) -> bool {
        if self.is_full() {
            return false;
        }
        self.load += 1;
        true
    }

    /// Puts one container down. Returns `false` when empty.
    pub fn put_down(&mut self) -> bool {
        if self.load == 0 {
            return false;
        }
        self.load -= 1;
        true
    }

    /// Takes `n` containers on board at once, up to the remaining capacity.
    pub fn pick_up_many(&mut self, n: u64) -> u64 {
        let taken = n.min(self.capacity - self.load);
        self.load += taken;
        taken
    }

    /// Unloads everything and returns the number of containers.
    pub fn unload_all(&mut self) -> u64 {
        std::mem::take(&mut self.load)
    }

    /// Travel time for `distance`, depending on whether the vehicle is loaded.
    pub fn drive_time(&self, distance: f64) -> TimeDelta<T> {
        let speed = if self.load > 0 {
            self.speed_loaded
        } else {
            self.speed_empty
        };
        TimeDelta::from_f64_ceil(distance / speed).unwrap_or_default()
    }

    #[inline]
    pub fn arrive_at(&mut self, node: usize) {
        self.node = node;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transporter() -> InternalTransporter<i64> {
        InternalTransporter::new(TransporterId::new(0), ProcessId::new(1), 2, 2.0, 5.0, 0).unwrap()
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let id = TransporterId::new(4);
        assert_eq!(
            InternalTransporter::<i64>::new(id, ProcessId::new(1), 0, 1.0, 1.0, 0).unwrap_err(),
            EntityError::ZeroTransporterCapacity(id)
        );
        assert!(InternalTransporter::<i64>::new(id, ProcessId::new(1), 1, 0.0, 1.0, 0).is_err());
    }

    #[test]
    fn test_load_is_bounded_by_capacity() {
        let mut t = transporter();
        assert!(t.pick_up());
        assert!(t.pick_up());
        assert!(!t.pick_up());
        assert!(t.put_down());
        assert_eq!(t.pick_up_many(5), 1);
        assert_eq!(t.unload_all(), 2);
        assert!(!t.put_down());
    }

    #[test]
    fn test_drive_time_depends_on_load() {
        let mut t = transporter();
        assert_eq!(t.drive_time(20.0), TimeDelta::new(4));
        t.pick_up();
        assert_eq!(t.drive_time(20.0), TimeDelta::new(10));
    }
}
