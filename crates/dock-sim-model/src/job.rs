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

use crate::id::{BlockId, CraneId, HoldingAreaId, JobId, LaneNumber, TransporterId};
use serde::Serialize;
use std::fmt::Display;

/// Direction of a container move as seen from the quay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobKind {
    /// Towards the yard or the gate, i.e. away from the ship side.
    Import,
    /// Towards the quay, i.e. coming from the gate or the yard.
    Export,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Location {
    Crane(CraneId),
    Block(BlockId),
    Overflow,
    Lane(HoldingAreaId, LaneNumber),
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Crane(c) => write!(f, "{}", c),
            Location::Block(b) => write!(f, "{}", b),
            Location::Overflow => f.write_str("Overflow"),
            Location::Lane(h, l) => write!(f, "{}/{}", h, l),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobAlreadyClaimedError(JobId);

impl JobAlreadyClaimedError {
    #[inline]
    pub fn job(&self) -> JobId {
        self.0
    }
}

impl Display for JobAlreadyClaimedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} has already been claimed", self.0)
    }
}

impl std::error::Error for JobAlreadyClaimedError {}

/// A single transporter trip from `origin` to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    id: JobId,
    kind: JobKind,
    origin: Location,
    destination: Location,
    units: u64,
    claimed: bool,
}

impl Job {
    #[inline]
    pub fn new(
        id: JobId,
        kind: JobKind,
        origin: Location,
        destination: Location,
        units: u64,
    ) -> Self {
        Self {
            id,
            kind,
            origin,
            destination,
            units,
            claimed: false,
        }
    }

    #[inline]
    pub fn id(&self) -> JobId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    #[inline]
    pub fn origin(&self) -> Location {
        self.origin
    }

    #[inline]
    pub fn destination(&self) -> Location {
        self.destination
    }

    /// Number of units the trip moves.
    #[inline]
    pub fn units(&self) -> u64 {
        self.units
    }

    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Marks the job as taken. A job can be claimed once.
    pub fn claim(&mut self) -> Result<(), JobAlreadyClaimedError> {
        if self.claimed {
            return Err(JobAlreadyClaimedError(self.id));
        }
        self.claimed = true;
        Ok(())
    }

    /// Whether the crane is either end of the trip.
    #[inline]
    pub fn serves_crane(&self, crane: CraneId) -> bool {
        self.origin == Location::Crane(crane) || self.destination == Location::Crane(crane)
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{:?} {} -> {} x{}]",
            self.id, self.kind, self.origin, self.destination, self.units
        )
    }
}

/// A transporter paired with the job it has to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransporterJob {
    transporter: TransporterId,
    job: Job,
}

impl TransporterJob {
    #[inline]
    pub fn new(transporter: TransporterId, job: Job) -> Self {
        Self { transporter, job }
    }

    #[inline]
    pub fn transporter(&self) -> TransporterId {
        self.transporter
    }

    #[inline]
    pub fn job(&self) -> &Job {
        &self.job
    }

    #[inline]
    pub fn into_parts(self) -> (TransporterId, Job) {
        (self.transporter, self.job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(Job: Send, Sync, Copy);
    static_assertions::assert_impl_all!(TransporterJob: Send, Sync);

    fn job() -> Job {
        Job::new(
            JobId::new(1),
            JobKind::Import,
            Location::Crane(CraneId::new(2)),
            Location::Block(BlockId::new(0)),
            4,
        )
    }

    #[test]
    fn test_claim_is_one_shot() {
        let mut j = job();
        assert!(!j.is_claimed());
        assert!(j.claim().is_ok());
        assert_eq!(j.claim().unwrap_err().job(), JobId::new(1));
    }

    #[test]
    fn test_serves_crane_checks_both_ends() {
        let j = job();
        assert!(j.serves_crane(CraneId::new(2)));
        assert!(!j.serves_crane(CraneId::new(3)));
        let back = Job::new(
            JobId::new(2),
            JobKind::Export,
            Location::Block(BlockId::new(0)),
            Location::Crane(CraneId::new(3)),
            1,
        );
        assert!(back.serves_crane(CraneId::new(3)));
    }
}
