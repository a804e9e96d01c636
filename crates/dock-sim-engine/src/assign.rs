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

//! Assignment strategies.
//!
//! A strategy receives read-only snapshots of the idle resources and of the
//! pending demands and answers which resources should serve which demand.
//! It never mutates the pools itself; the controller applies its answer.

use dock_sim_model::{
    id::{CraneId, ShipId, TransporterId},
    job::Job,
};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Resources (by snapshot index) chosen to serve one demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub resources: Vec<usize>,
    pub demand: usize,
}

pub trait AssignmentStrategy<R, D>: Debug + Send {
    fn name(&self) -> &'static str;

    fn assign(&mut self, idle: &[R], demand: &[D]) -> Vec<Pairing>;
}

/// A berthed ship waiting for cranes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipDemand {
    pub ship: ShipId,
    pub cranes: usize,
}

/// An idle transporter as seen by a job strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransporterView {
    pub id: TransporterId,
    pub pinned: Option<CraneId>,
}

/// Serves ships in arrival order. A ship that cannot get all its cranes
/// blocks the ships behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoCraneAssignment;

impl AssignmentStrategy<CraneId, ShipDemand> for FifoCraneAssignment {
    fn name(&self) -> &'static str {
        "FifoCraneAssignment"
    }

    fn assign(&mut self, idle: &[CraneId], demand: &[ShipDemand]) -> Vec<Pairing> {
        let mut next = 0;
        let mut out = Vec::new();
        for (d, ship) in demand.iter().enumerate() {
            if ship.cranes == 0 || next + ship.cranes > idle.len() {
                break;
            }
            out.push(Pairing {
                resources: (next..next + ship.cranes).collect(),
                demand: d,
            });
            next += ship.cranes;
        }
        out
    }
}

/// Hands out unclaimed jobs in order to idle transporters in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoJobAssignment;

impl AssignmentStrategy<TransporterView, Job> for FifoJobAssignment {
    fn name(&self) -> &'static str {
        "FifoJobAssignment"
    }

    fn assign(&mut self, idle: &[TransporterView], demand: &[Job]) -> Vec<Pairing> {
        demand
            .iter()
            .enumerate()
            .filter(|(_, j)| !j.is_claimed())
            .zip(0..idle.len())
            .map(|((d, _), t)| Pairing {
                resources: vec![t],
                demand: d,
            })
            .collect()
    }
}

/// Pinned transporters only take jobs of their own crane. Unpinned ones
/// take whatever is left, in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCraneJobAssignment;

impl AssignmentStrategy<TransporterView, Job> for FixedCraneJobAssignment {
    fn name(&self) -> &'static str {
        "FixedCraneJobAssignment"
    }

    fn assign(&mut self, idle: &[TransporterView], demand: &[Job]) -> Vec<Pairing> {
        let mut selected = vec![false; demand.len()];
        let mut out = Vec::new();
        let mut pick = |t: usize, ok: &dyn Fn(&Job) -> bool, out: &mut Vec<Pairing>| {
            let found = demand
                .iter()
                .enumerate()
                .position(|(d, j)| !selected[d] && !j.is_claimed() && ok(j));
            if let Some(d) = found {
                selected[d] = true;
                out.push(Pairing {
                    resources: vec![t],
                    demand: d,
                });
            }
        };
        for (t, view) in idle.iter().enumerate() {
            if let Some(crane) = view.pinned {
                pick(t, &|j: &Job| j.serves_crane(crane), &mut out);
            }
        }
        for (t, view) in idle.iter().enumerate() {
            if view.pinned.is_none() {
                pick(t, &|_: &Job| true, &mut out);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAssignment {
    #[default]
    Fifo,
    FixedCrane,
}

impl JobAssignment {
    pub fn build(self) -> Box<dyn AssignmentStrategy<TransporterView, Job>> {
        match self {
            JobAssignment::Fifo => Box::new(FifoJobAssignment),
            JobAssignment::FixedCrane => Box::new(FixedCraneJobAssignment),
        }
    }
}

/// Splits `total` units over `n` workers: everybody gets `total / n`, the
/// first `total % n` workers one more.
pub fn split_workload(total: u64, n: usize) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    let n64 = n as u64;
    let base = total / n64;
    let remainder = (total % n64) as usize;
    (0..n).map(|i| base + u64::from(i < remainder)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dock_sim_model::{
        id::{BlockId, JobId},
        job::{JobKind, Location},
    };

    static_assertions::assert_obj_safe!(AssignmentStrategy<CraneId, ShipDemand>);

    fn cranes(n: u64) -> Vec<CraneId> {
        (0..n).map(CraneId::new).collect()
    }

    fn ship(id: u64, cranes: usize) -> ShipDemand {
        ShipDemand {
            ship: ShipId::new(id),
            cranes,
        }
    }

    fn job(id: u64, origin: Location) -> Job {
        Job::new(
            JobId::new(id),
            JobKind::Import,
            origin,
            Location::Block(BlockId::new(0)),
            1,
        )
    }

    fn view(id: u64, pinned: Option<u64>) -> TransporterView {
        TransporterView {
            id: TransporterId::new(id),
            pinned: pinned.map(CraneId::new),
        }
    }

    #[test]
    fn test_split_workload() {
        assert_eq!(split_workload(7, 3), vec![3, 2, 2]);
        assert_eq!(split_workload(6, 3), vec![2, 2, 2]);
        assert_eq!(split_workload(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(split_workload(0, 2), vec![0, 0]);
        assert!(split_workload(5, 0).is_empty());
        assert_eq!(split_workload(1_000_003, 7).iter().sum::<u64>(), 1_000_003);
    }

    #[test]
    fn test_fifo_cranes_in_ship_order() {
        let p = FifoCraneAssignment.assign(&cranes(3), &[ship(0, 2), ship(1, 1)]);
        assert_eq!(
            p,
            vec![
                Pairing {
                    resources: vec![0, 1],
                    demand: 0
                },
                Pairing {
                    resources: vec![2],
                    demand: 1
                },
            ]
        );
    }

    #[test]
    fn test_fifo_cranes_no_overtaking() {
        // The head ship needs 3 cranes; the second would fit but must wait.
        let p = FifoCraneAssignment.assign(&cranes(2), &[ship(0, 3), ship(1, 1)]);
        assert!(p.is_empty());
        assert!(FifoCraneAssignment.assign(&[], &[ship(0, 1)]).is_empty());
    }

    #[test]
    fn test_fifo_jobs_skip_claimed() {
        let mut claimed = job(0, Location::Overflow);
        claimed.claim().unwrap();
        let jobs = [claimed, job(1, Location::Overflow), job(2, Location::Overflow)];
        let p = FifoJobAssignment.assign(&[view(0, None)], &jobs);
        assert_eq!(
            p,
            vec![Pairing {
                resources: vec![0],
                demand: 1
            }]
        );
    }

    #[test]
    fn test_pinned_transporter_takes_own_crane_only() {
        let jobs = [
            job(0, Location::Crane(CraneId::new(1))),
            job(1, Location::Crane(CraneId::new(0))),
            job(2, Location::Block(BlockId::new(3))),
        ];
        let idle = [view(0, Some(0)), view(1, Some(0)), view(2, None)];
        let p = FixedCraneJobAssignment.assign(&idle, &jobs);
        assert_eq!(
            p,
            vec![
                Pairing {
                    resources: vec![0],
                    demand: 1
                },
                Pairing {
                    resources: vec![2],
                    demand: 0
                },
            ]
        );
    }

    #[test]
    fn test_build_from_config_name() {
        assert_eq!(JobAssignment::Fifo.build().name(), "FifoJobAssignment");
        assert_eq!(
            JobAssignment::FixedCrane.build().name(),
            "FixedCraneJobAssignment"
        );
    }
}
