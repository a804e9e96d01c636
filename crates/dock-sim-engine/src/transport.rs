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

//! The internal transport system: the transporter fleet, the pool of open
//! jobs and the driving statistics.

use crate::{assign::TransporterView, pool::AssignablePool};
use dock_sim_core::{
    SimVariable,
    kernel::ProcessId,
    time::{TimeDelta, TimePoint},
};
use dock_sim_model::{
    id::{CraneId, JobId, TransporterId},
    job::Job,
    transporter::InternalTransporter,
};

#[derive(Debug, Clone)]
pub struct TransporterSystem<T: SimVariable> {
    transporters: Vec<InternalTransporter<T>>,
    pool: AssignablePool<TransporterId, Job>,
    control: ProcessId,
    next_job: u64,
    jobs_done: u64,
    empty_drives: u64,
    loaded_drives: u64,
    empty_time: TimeDelta<T>,
    loaded_time: TimeDelta<T>,
    empty_distance: f64,
    loaded_distance: f64,
    reset_at: TimePoint<T>,
}

impl<T: SimVariable> TransporterSystem<T> {
    pub fn new(
        transporters: Vec<InternalTransporter<T>>,
        pool: AssignablePool<TransporterId, Job>,
        control: ProcessId,
    ) -> Self {
        Self {
            transporters,
            pool,
            control,
            next_job: 0,
            jobs_done: 0,
            empty_drives: 0,
            loaded_drives: 0,
            empty_time: TimeDelta::zero(),
            loaded_time: TimeDelta::zero(),
            empty_distance: 0.0,
            loaded_distance: 0.0,
            reset_at: TimePoint::zero(),
        }
    }

    #[inline]
    pub fn control(&self) -> ProcessId {
        self.control
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transporters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transporters.is_empty()
    }

    #[inline]
    pub fn get(&self, id: TransporterId) -> Option<&InternalTransporter<T>> {
        self.transporters.get(id.index())
    }

    #[inline]
    pub fn get_mut(&mut self, id: TransporterId) -> Option<&mut InternalTransporter<T>> {
        self.transporters.get_mut(id.index())
    }

    #[inline]
    pub fn transporters(&self) -> &[InternalTransporter<T>] {
        &self.transporters
    }

    #[inline]
    pub fn pool(&self) -> &AssignablePool<TransporterId, Job> {
        &self.pool
    }

    #[inline]
    pub fn pool_mut(&mut self) -> &mut AssignablePool<TransporterId, Job> {
        &mut self.pool
    }

    /// Smallest capacity in the fleet; no job is larger than this.
    pub fn job_units(&self) -> u64 {
        self.transporters
            .iter()
            .map(InternalTransporter::capacity)
            .min()
            .unwrap_or(1)
    }

    pub(crate) fn next_job_id(&mut self) -> JobId {
        let id = JobId::new(self.next_job);
        self.next_job += 1;
        id
    }

    #[inline]
    pub fn jobs_created(&self) -> u64 {
        self.next_job
    }

    #[inline]
    pub fn jobs_done(&self) -> u64 {
        self.jobs_done
    }

    pub(crate) fn record_job_done(&mut self) {
        self.jobs_done += 1;
    }

    /// Snapshot of the idle fleet for an assignment strategy.
    pub fn idle_views(&self) -> Vec<TransporterView> {
        self.pool
            .idle()
            .filter_map(|id| self.get(*id))
            .map(|t| TransporterView {
                id: t.id(),
                pinned: t.pinned(),
            })
            .collect()
    }

    /// All idle transporters not pinned to a crane, provided there are at
    /// least `n` of them.
    pub fn free_transporters(&self, n: usize) -> Option<Vec<TransporterId>> {
        let free: Vec<TransporterId> = self
            .pool
            .idle()
            .filter(|id| self.get(**id).is_some_and(|t| t.pinned().is_none()))
            .copied()
            .collect();
        (free.len() >= n).then_some(free)
    }

    /// Transporters pinned to `crane`, idle or not.
    pub fn assigned_transporters(&self, crane: CraneId) -> Vec<TransporterId> {
        self.transporters
            .iter()
            .filter(|t| t.pinned() == Some(crane))
            .map(InternalTransporter::id)
            .collect()
    }

    pub(crate) fn record_drive(&mut self, distance: f64, time: TimeDelta<T>, loaded: bool) {
        if loaded {
            self.loaded_drives += 1;
            self.loaded_time = self.loaded_time.saturating_add(time);
            self.loaded_distance += distance;
        } else {
            self.empty_drives += 1;
            self.empty_time = self.empty_time.saturating_add(time);
            self.empty_distance += distance;
        }
    }

    #[inline]
    pub fn empty_drives(&self) -> u64 {
        self.empty_drives
    }

    #[inline]
    pub fn loaded_drives(&self) -> u64 {
        self.loaded_drives
    }

    #[inline]
    pub fn empty_time(&self) -> TimeDelta<T> {
        self.empty_time
    }

    #[inline]
    pub fn loaded_time(&self) -> TimeDelta<T> {
        self.loaded_time
    }

    #[inline]
    pub fn empty_distance(&self) -> f64 {
        self.empty_distance
    }

    #[inline]
    pub fn loaded_distance(&self) -> f64 {
        self.loaded_distance
    }

    /// Share of fleet time spent driving.
    pub fn avg_usage(&self, now: TimePoint<T>) -> Option<f64> {
        let elapsed = now.elapsed_since(self.reset_at).to_f64();
        if elapsed <= 0.0 || self.transporters.is_empty() {
            return None;
        }
        let busy = self.empty_time.saturating_add(self.loaded_time).to_f64();
        Some(busy / (self.transporters.len() as f64 * elapsed))
    }

    pub fn reset(&mut self, now: TimePoint<T>) {
        self.jobs_done = 0;
        self.empty_drives = 0;
        self.loaded_drives = 0;
        self.empty_time = TimeDelta::zero();
        self.loaded_time = TimeDelta::zero();
        self.empty_distance = 0.0;
        self.loaded_distance = 0.0;
        self.reset_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> TransporterSystem<i64> {
        let mk = |i: u64, cap: u64| {
            InternalTransporter::new(TransporterId::new(i), ProcessId::new(i), cap, 2.0, 4.0, 0)
                .unwrap()
        };
        let ts = vec![
            mk(0, 2).pinned_to(CraneId::new(0)),
            mk(1, 3),
            mk(2, 2),
            mk(3, 4).pinned_to(CraneId::new(0)),
        ];
        let mut sys = TransporterSystem::new(ts, AssignablePool::fifo(4), ProcessId::new(99));
        for i in 0..4 {
            sys.pool_mut().add_idle(TransporterId::new(i)).unwrap();
        }
        sys
    }

    #[test]
    fn test_free_and_assigned() {
        let sys = fleet();
        assert_eq!(
            sys.free_transporters(2),
            Some(vec![TransporterId::new(1), TransporterId::new(2)])
        );
        assert_eq!(sys.free_transporters(3), None);
        assert_eq!(
            sys.assigned_transporters(CraneId::new(0)),
            vec![TransporterId::new(0), TransporterId::new(3)]
        );
        assert!(sys.assigned_transporters(CraneId::new(1)).is_empty());
    }

    #[test]
    fn test_job_units_is_smallest_capacity() {
        assert_eq!(fleet().job_units(), 2);
    }

    #[test]
    fn test_drive_statistics() {
        let mut sys = fleet();
        sys.record_drive(10.0, TimeDelta::new(3), false);
        sys.record_drive(8.0, TimeDelta::new(4), true);
        assert_eq!(sys.empty_drives(), 1);
        assert_eq!(sys.loaded_distance(), 8.0);
        assert_eq!(sys.avg_usage(TimePoint::new(7)), Some(0.25));
    }

    #[test]
    fn test_job_ids_are_sequential() {
        let mut sys = fleet();
        assert_eq!(sys.next_job_id(), JobId::new(0));
        assert_eq!(sys.next_job_id(), JobId::new(1));
        assert_eq!(sys.jobs_created(), 2);
    }

    #[test]
    fn test_idle_views_follow_pool() {
        let mut sys = fleet();
        sys.pool_mut().take(&[TransporterId::new(1)]).unwrap();
        let views = sys.idle_views();
        assert_eq!(views.len(), 3);
        assert_eq!(views[0].pinned, Some(CraneId::new(0)));
    }
}
