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
    id::{HoldingAreaId, LaneNumber, TruckId},
};
use dock_sim_core::{SimVariable, kernel::ProcessId, time::TimeDelta};

/// An external road vehicle that drops off and collects containers at a
/// holding area lane.
#[derive(Debug, Clone, PartialEq)]
pub struct Truck<T: SimVariable> {
    id: TruckId,
    process: ProcessId,
    holding_area: HoldingAreaId,
    speed: f64,
    deliveries: u64,
    pickups: u64,
    lane: Option<LaneNumber>,
    drive_time: TimeDelta<T>,
    distance: f64,
}

impl<T: SimVariable> Truck<T> {
    pub fn new(
        id: TruckId,
        process: ProcessId,
        holding_area: HoldingAreaId,
        speed: f64,
        deliveries: u64,
        pickups: u64,
    ) -> Result<Self, EntityError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(EntityError::NonPositiveTruckSpeed { truck: id, speed });
        }
        Ok(Self {
            id,
            process,
            holding_area,
            speed,
            deliveries,
            pickups,
            lane: None,
            drive_time: TimeDelta::zero(),
            distance: 0.0,
        })
    }

    #[inline]
    pub fn id(&self) -> TruckId {
        self.id
    }

    #[inline]
    pub fn process(&self) -> ProcessId {
        self.process
    }

    #[inline]
    pub fn holding_area(&self) -> HoldingAreaId {
        self.holding_area
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Containers the truck still has to hand over.
    #[inline]
    pub fn deliveries(&self) -> u64 {
        self.deliveries
    }

    /// Containers the truck still has to collect.
    #[inline]
    pub fn pickups(&self) -> u64 {
        self.pickups
    }

    #[inline]
    pub fn lane(&self) -> Option<LaneNumber> {
        self.lane
    }

    #[inline]
    pub fn drive_time(&self) -> TimeDelta<T> {
        self.drive_time
    }

    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    #[inline]
    pub fn park(&mut self, lane: LaneNumber) {
        self.lane = Some(lane);
    }

    #[inline]
    pub fn leave_lane(&mut self) -> Option<LaneNumber> {
        self.lane.take()
    }

    /// Drives `distance` and returns how long it takes.
    pub fn drive(&mut self, distance: f64) -> TimeDelta<T> {
        let time = TimeDelta::from_f64_ceil(distance / self.speed).unwrap_or_default();
        self.drive_time = self.drive_time.saturating_add(time);
        self.distance += distance;
        time
    }

    /// Hands one container over. Returns `false` if none is left.
    pub fn hand_over(&mut self) -> bool {
        if self.deliveries == 0 {
            return false;
        }
        self.deliveries -= 1;
        true
    }

    /// Takes one container on board. Returns `false` if nothing is expected.
    pub fn receive(&mut self) -> bool {
        if self.pickups == 0 {
            return false;
        }
        self.pickups -= 1;
        true
    }

    /// Lowers the number of containers to collect, e.g. when the yard holds fewer.
    pub fn limit_pickups(&mut self, available: u64) {
        self.pickups = self.pickups.min(available);
    }

    pub fn limit_deliveries(&mut self, available: u64) {
        self.deliveries = self.deliveries.min(available);
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.deliveries == 0 && self.pickups == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truck(speed: f64) -> Result<Truck<i64>, EntityError> {
        Truck::new(
            TruckId::new(1),
            ProcessId::new(1),
            HoldingAreaId::new(0),
            speed,
            2,
            1,
        )
    }

    #[test]
    fn test_non_positive_speed_rejected() {
        assert!(truck(0.0).is_err());
        assert!(truck(-3.0).is_err());
        assert!(truck(f64::NAN).is_err());
    }

    #[test]
    fn test_drive_accumulates() {
        let mut t = truck(4.0).unwrap();
        assert_eq!(t.drive(10.0), TimeDelta::new(3));
        assert_eq!(t.drive(8.0), TimeDelta::new(2));
        assert_eq!(t.drive_time(), TimeDelta::new(5));
        assert_eq!(t.distance(), 18.0);
    }

    #[test]
    fn test_hand_over_and_receive() {
        let mut t = truck(1.0).unwrap();
        assert!(t.hand_over());
        assert!(t.hand_over());
        assert!(!t.hand_over());
        assert!(t.receive());
        assert!(!t.receive());
        assert!(t.is_done());
    }

    #[test]
    fn test_refused_work_is_dropped() {
        let mut t = truck(1.0).unwrap();
        t.limit_deliveries(5);
        assert_eq!(t.deliveries(), 2);
        t.limit_deliveries(0);
        t.limit_pickups(0);
        assert!(t.is_done());
    }
}
