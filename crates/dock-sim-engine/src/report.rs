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

//! Serializable snapshot of the statistics a run collected.

use crate::{
    block::BlockKind,
    coop::{Keyed, RendezvousQueue},
    world::World,
};
use dock_sim_core::{SimVariable, time::TimePoint};
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics};
use std::fmt::Debug;

/// Quantile `p` of the finite values in `data`, `None` when there are none.
fn percentile(data: &[f64], p: f64) -> Option<f64> {
    let vals: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    if vals.is_empty() {
        return None;
    }
    let mut d = Data::new(vals);
    Some(d.quantile(p.clamp(0.0, 1.0)))
}

fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnaroundReport {
    pub count: usize,
    pub mean: Option<f64>,
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub max: Option<f64>,
}

impl TurnaroundReport {
    fn from_samples(samples: &[f64]) -> Self {
        Self {
            count: samples.len(),
            mean: mean(samples),
            p50: percentile(samples, 0.5),
            p90: percentile(samples, 0.9),
            max: samples.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BerthReport {
    pub id: u64,
    pub length: usize,
    pub users: u64,
    pub refused: u64,
    pub max_queue_len: usize,
    pub avg_service_time: Option<f64>,
    pub avg_usage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockReport {
    pub id: u64,
    pub kind: BlockKind,
    pub capacity: u64,
    pub initial: u64,
    pub current: u64,
    pub min_current: u64,
    pub max_current: u64,
    pub producers: u64,
    pub consumers: u64,
    pub avg_occupancy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YardReport {
    pub strategy: &'static str,
    pub capacity: u64,
    pub current: u64,
    pub overflow: u64,
    pub overflow_stored: u64,
    pub overflow_retrieved: u64,
    pub avg_occupancy: Option<f64>,
    pub blocks: Vec<BlockReport>,
}

/// Statistics of one rendezvous point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoopReport {
    pub completed: u64,
    pub cancelled: u64,
    pub master_refused: u64,
    pub slave_refused: u64,
    pub cooperation_time: f64,
    pub avg_master_wait: Option<f64>,
    pub avg_slave_wait: Option<f64>,
}

impl CoopReport {
    fn collect<M, S, T>(queue: &RendezvousQueue<M, S, T>) -> Self
    where
        M: Copy + PartialEq + Debug,
        S: Keyed + Copy + Debug,
        T: SimVariable,
    {
        Self {
            completed: queue.completed(),
            cancelled: queue.cancelled(),
            master_refused: queue.master_refused(),
            slave_refused: queue.slave_refused(),
            cooperation_time: queue.cooperation_time().to_f64(),
            avg_master_wait: queue.avg_master_wait(),
            avg_slave_wait: queue.avg_slave_wait(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CraneReport {
    pub id: u64,
    pub unload: CoopReport,
    pub load: CoopReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CranesReport {
    pub unloaded: u64,
    pub loaded: u64,
    pub unload_time: f64,
    pub load_time: f64,
    pub avg_usage: Option<f64>,
    pub max_ships_waiting: usize,
    pub ships_refused: u64,
    pub cranes: Vec<CraneReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportReport {
    pub transporters: usize,
    pub jobs_created: u64,
    pub jobs_done: u64,
    pub max_jobs_waiting: usize,
    pub jobs_refused: u64,
    pub empty_drives: u64,
    pub loaded_drives: u64,
    pub empty_distance: f64,
    pub loaded_distance: f64,
    pub empty_time: f64,
    pub loaded_time: f64,
    pub avg_usage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingAreaReport {
    pub id: u64,
    pub lanes: usize,
    pub handed_out: u64,
    pub refused_trucks: u64,
    pub max_trucks_waiting: usize,
    pub exchanges: CoopReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalReport {
    pub end: f64,
    pub ships: TurnaroundReport,
    pub trucks: TurnaroundReport,
    pub unserved_unload: u64,
    pub unserved_load: u64,
    pub unserved_pickups: u64,
    pub unserved_deliveries: u64,
    pub delivered_by_trucks: u64,
    pub collected_by_trucks: u64,
    pub refused_ships: u64,
    pub refused_trucks: u64,
    pub berths: Vec<BerthReport>,
    pub yard: YardReport,
    pub cranes: CranesReport,
    pub transport: TransportReport,
    pub holding_areas: Vec<HoldingAreaReport>,
}

impl TerminalReport {
    pub fn collect<T: SimVariable>(world: &World<T>, now: TimePoint<T>) -> Self {
        let ledger = world.ledger();
        let yard = world.yard();
        let cranes = world.cranes();
        let transport = world.transporters();
        Self {
            end: now.to_f64(),
            ships: TurnaroundReport::from_samples(&ledger.ship_turnarounds),
            trucks: TurnaroundReport::from_samples(&ledger.truck_turnarounds),
            unserved_unload: ledger.unserved_unload,
            unserved_load: ledger.unserved_load,
            unserved_pickups: ledger.unserved_pickups,
            unserved_deliveries: ledger.unserved_deliveries,
            delivered_by_trucks: ledger.delivered_by_trucks,
            collected_by_trucks: ledger.collected_by_trucks,
            refused_ships: ledger.refused_ships,
            refused_trucks: ledger.refused_trucks,
            berths: world
                .berths()
                .iter()
                .map(|b| BerthReport {
                    id: b.id().value(),
                    length: b.length().value(),
                    users: b.users(),
                    refused: b.refused(),
                    max_queue_len: b.max_queue_len(),
                    avg_service_time: b.avg_service_time(),
                    avg_usage: b.avg_usage(now),
                })
                .collect(),
            yard: YardReport {
                strategy: yard.strategy_name(),
                capacity: yard.capacity(),
                current: yard.current(),
                overflow: yard.overflow(),
                overflow_stored: yard.overflow_stored(),
                overflow_retrieved: yard.overflow_retrieved(),
                avg_occupancy: yard.avg_occupancy(now),
                blocks: yard
                    .blocks()
                    .iter()
                    .map(|b| BlockReport {
                        id: b.id().value(),
                        kind: b.kind(),
                        capacity: b.capacity(),
                        initial: b.initial(),
                        current: b.current(),
                        min_current: b.min_current(),
                        max_current: b.max_current(),
                        producers: b.producers(),
                        consumers: b.consumers(),
                        avg_occupancy: b.avg_occupancy(now),
                    })
                    .collect(),
            },
            cranes: CranesReport {
                unloaded: cranes.unloaded(),
                loaded: cranes.loaded(),
                unload_time: cranes.unload_time().to_f64(),
                load_time: cranes.load_time().to_f64(),
                avg_usage: cranes.avg_usage(now),
                max_ships_waiting: cranes.pool().max_demand_len(),
                ships_refused: cranes.pool().demand_refused(),
                cranes: cranes
                    .stations()
                    .iter()
                    .map(|s| CraneReport {
                        id: s.crane().id().value(),
                        unload: CoopReport::collect(s.unload_queue()),
                        load: CoopReport::collect(s.load_queue()),
                    })
                    .collect(),
            },
            transport: TransportReport {
                transporters: transport.len(),
                jobs_created: transport.jobs_created(),
                jobs_done: transport.jobs_done(),
                max_jobs_waiting: transport.pool().max_demand_len(),
                jobs_refused: transport.pool().demand_refused(),
                empty_drives: transport.empty_drives(),
                loaded_drives: transport.loaded_drives(),
                empty_distance: transport.empty_distance(),
                loaded_distance: transport.loaded_distance(),
                empty_time: transport.empty_time().to_f64(),
                loaded_time: transport.loaded_time().to_f64(),
                avg_usage: transport.avg_usage(now),
            },
            holding_areas: world
                .holding_areas()
                .iter()
                .map(|h| HoldingAreaReport {
                    id: h.id().value(),
                    lanes: h.lanes().lanes(),
                    handed_out: h.lanes().handed_out(),
                    refused_trucks: h.lanes().refused(),
                    max_trucks_waiting: h.lanes().max_waiting(),
                    exchanges: CoopReport::collect(h.trucks()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TerminalConfig, sim::Simulation};

    #[test]
    fn test_percentile_ignores_non_finite() {
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[f64::NAN, 4.0], 0.5), Some(4.0));
        let p = percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5).unwrap();
        assert!((p - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_turnaround_summary() {
        let r = TurnaroundReport::from_samples(&[10.0, 30.0, 20.0]);
        assert_eq!(r.count, 3);
        assert_eq!(r.mean, Some(20.0));
        assert_eq!(r.max, Some(30.0));
        assert_eq!(TurnaroundReport::from_samples(&[]).mean, None);
    }

    #[test]
    fn test_report_matches_world() {
        let config = TerminalConfig::default();
        let mut sim = Simulation::<i64>::new(&config).unwrap();
        sim.run().unwrap();
        let report = sim.report();
        assert_eq!(report.ships.count, config.ships.len());
        assert_eq!(report.berths.len(), config.berths.len());
        assert_eq!(report.yard.blocks.len(), config.blocks.len());
        assert_eq!(report.cranes.cranes.len(), config.cranes);
        assert_eq!(report.transport.jobs_created, report.transport.jobs_done);
        let exchanges: u64 = report.cranes.cranes.iter().map(|c| c.unload.completed).sum();
        assert!(exchanges > 0);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["berths"][0]["users"], config.ships.len() as u64);
    }
}
