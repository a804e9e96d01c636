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

//! Terminal configuration.
//!
//! A configuration is plain data. It can be deserialized from JSON or put
//! together with [`TerminalConfigBuilder`]; either way `validate` decides
//! whether a simulation can be built from it.

use crate::{assign::JobAssignment, block::BlockSpec, select::BlockSelection};
use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    queue::{QueueCapacity, QueueDiscipline},
    sample::{
        ConstantSampler, DurationSampler, ExponentialSampler, SamplerError, UniformSampler,
    },
    time::{TimeDelta, TimePoint},
};
use dock_sim_model::{distance::DistanceMatrix, err::DistanceMatrixError};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoBerths,
    ZeroBerthLength { berth: usize },
    NoCranes,
    NoTransporters,
    ZeroTransporterCapacity { transporter: usize },
    NonPositiveSpeed { what: &'static str, index: usize, speed: f64 },
    PinnedToUnknownCrane { transporter: usize, crane: u64 },
    UnservedCrane { crane: u64 },
    NoLanes { holding_area: usize },
    QueueTooSmall { queue: &'static str, capacity: usize, required: usize },
    UnknownBerth { ship: usize, berth: usize },
    UnknownHoldingArea { what: &'static str, index: usize, holding_area: usize },
    ShipTooLong { ship: usize, length: usize, berth_length: usize },
    ZeroShipLength { ship: usize },
    TooManyCranes { ship: usize, requested: usize, available: usize },
    InitialExceedsCapacity { block: usize },
    TimeOutOfRange { value: i64 },
    Sampler(SamplerError),
    Distances(DistanceMatrixError),
    MatrixTooSmall { size: usize, required: usize },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoBerths => write!(f, "At least one berth is required"),
            ConfigError::ZeroBerthLength { berth } => write!(f, "Berth {} has no length", berth),
            ConfigError::NoCranes => write!(f, "At least one crane is required"),
            ConfigError::NoTransporters => write!(f, "At least one transporter is required"),
            ConfigError::ZeroTransporterCapacity { transporter } => {
                write!(f, "Transporter {} cannot carry anything", transporter)
            }
            ConfigError::NonPositiveSpeed { what, index, speed } => {
                write!(f, "{} {} has non-positive speed {}", what, index, speed)
            }
            ConfigError::PinnedToUnknownCrane { transporter, crane } => {
                write!(f, "Transporter {} is pinned to missing crane {}", transporter, crane)
            }
            ConfigError::UnservedCrane { crane } => write!(
                f,
                "Crane {} has no pinned transporter and no transporter is free",
                crane
            ),
            ConfigError::NoLanes { holding_area } => {
                write!(f, "Holding area {} has no lanes", holding_area)
            }
            ConfigError::QueueTooSmall {
                queue,
                capacity,
                required,
            } => write!(
                f,
                "The {} queue holds {} but must take {}",
                queue, capacity, required
            ),
            ConfigError::UnknownBerth { ship, berth } => {
                write!(f, "Ship {} calls at missing berth {}", ship, berth)
            }
            ConfigError::UnknownHoldingArea {
                what,
                index,
                holding_area,
            } => write!(
                f,
                "{} {} refers to missing holding area {}",
                what, index, holding_area
            ),
            ConfigError::ShipTooLong {
                ship,
                length,
                berth_length,
            } => write!(
                f,
                "Ship {} of length {} does not fit a berth of length {}",
                ship, length, berth_length
            ),
            ConfigError::ZeroShipLength { ship } => write!(f, "Ship {} has no length", ship),
            ConfigError::TooManyCranes {
                ship,
                requested,
                available,
            } => write!(
                f,
                "Ship {} needs {} cranes but the terminal has {}",
                ship, requested, available
            ),
            ConfigError::InitialExceedsCapacity { block } => {
                write!(f, "Block {} starts with more containers than it holds", block)
            }
            ConfigError::TimeOutOfRange { value } => {
                write!(f, "Time {} does not fit the time type", value)
            }
            ConfigError::Sampler(e) => write!(f, "{}", e),
            ConfigError::Distances(e) => write!(f, "{}", e),
            ConfigError::MatrixTooSmall { size, required } => write!(
                f,
                "Distance matrix covers {} nodes, the layout has {}",
                size, required
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Sampler(e) => Some(e),
            ConfigError::Distances(e) => Some(e),
            _ => None,
        }
    }
}

impl Refusal for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Construction
    }
}

impl From<SamplerError> for ConfigError {
    fn from(e: SamplerError) -> Self {
        ConfigError::Sampler(e)
    }
}

impl From<DistanceMatrixError> for ConfigError {
    fn from(e: DistanceMatrixError) -> Self {
        ConfigError::Distances(e)
    }
}

pub(crate) fn to_time<T: SimVariable>(value: i64) -> Result<T, ConfigError> {
    <T as num_traits::NumCast>::from(value).ok_or(ConfigError::TimeOutOfRange { value })
}

/// How long handling one container takes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DurationConfig {
    Constant { value: i64 },
    Uniform { min: f64, max: f64 },
    Exponential { mean: f64 },
}

impl DurationConfig {
    pub fn build<T: SimVariable>(
        self,
        seed: u64,
    ) -> Result<Box<dyn DurationSampler<T>>, ConfigError> {
        let sampler: Box<dyn DurationSampler<T>> = match self {
            DurationConfig::Constant { value } => Box::new(ConstantSampler::new(TimeDelta::new(
                to_time::<T>(value)?,
            ))?),
            DurationConfig::Uniform { min, max } => {
                Box::new(UniformSampler::<T>::new(min, max, seed)?)
            }
            DurationConfig::Exponential { mean } => {
                Box::new(ExponentialSampler::<T>::new(mean, seed)?)
            }
        };
        Ok(sampler)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    pub length: usize,
    pub discipline: QueueDiscipline,
    /// Maximum number of waiting ships; `0` means unlimited.
    pub queue_capacity: usize,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            length: 600,
            discipline: QueueDiscipline::Fifo,
            queue_capacity: 0,
        }
    }
}

/// Order and bound of one waiting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub discipline: QueueDiscipline,
    /// Maximum number of entries; `0` means unlimited.
    pub capacity: usize,
}

impl QueueConfig {
    #[inline]
    pub fn queue_capacity(&self) -> QueueCapacity {
        QueueCapacity::limited(self.capacity)
    }

    /// Whether `n` entries always fit.
    #[inline]
    pub fn holds(&self, n: usize) -> bool {
        self.capacity == 0 || self.capacity >= n
    }
}

/// Queues of a crane or transporter pool: idle resources and the requests
/// waiting for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub idle: QueueConfig,
    pub demand: QueueConfig,
}

/// Master and slave queues of a rendezvous point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    pub masters: QueueConfig,
    pub slaves: QueueConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldingAreaConfig {
    pub lanes: usize,
    /// Transporters waiting for a parked truck.
    pub transporters: QueueConfig,
    /// Trucks waiting for a lane and, once parked, for transporters.
    pub trucks: QueueConfig,
}

impl Default for HoldingAreaConfig {
    fn default() -> Self {
        Self {
            lanes: 3,
            transporters: QueueConfig::default(),
            trucks: QueueConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransporterConfig {
    pub capacity: u64,
    pub speed_loaded: f64,
    pub speed_empty: f64,
    pub pinned_crane: Option<u64>,
}

impl Default for TransporterConfig {
    fn default() -> Self {
        Self {
            capacity: 2,
            speed_loaded: 4.0,
            speed_empty: 6.0,
            pinned_crane: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipConfig {
    pub arrival: i64,
    pub berth: usize,
    pub length: usize,
    pub cranes: usize,
    pub unload: u64,
    pub load: u64,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            arrival: 0,
            berth: 0,
            length: 200,
            cranes: 1,
            unload: 10,
            load: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruckConfig {
    pub arrival: i64,
    pub holding_area: usize,
    pub speed: f64,
    pub deliveries: u64,
    pub pickups: u64,
}

impl Default for TruckConfig {
    fn default() -> Self {
        Self {
            arrival: 0,
            holding_area: 0,
            speed: 10.0,
            deliveries: 2,
            pickups: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub seed: u64,
    pub berths: Vec<BerthConfig>,
    pub blocks: Vec<BlockSpec>,
    pub block_selection: BlockSelection,
    pub holding_areas: Vec<HoldingAreaConfig>,
    pub cranes: usize,
    /// Idle cranes and ships waiting for cranes.
    pub crane_pool: PoolConfig,
    /// Queues at every crane; the crane is the master.
    pub crane_stations: RendezvousConfig,
    pub crane_handling: DurationConfig,
    pub truck_handling: DurationConfig,
    pub transporters: Vec<TransporterConfig>,
    /// Idle transporters and open jobs.
    pub transporter_pool: PoolConfig,
    pub job_assignment: JobAssignment,
    pub ships: Vec<ShipConfig>,
    pub trucks: Vec<TruckConfig>,
    /// Row-major distance matrix; a line layout is used when absent.
    pub distances: Option<String>,
    pub node_spacing: f64,
    pub gate_distance: f64,
    /// Stop the run at this time even if processes are still active.
    pub horizon: Option<i64>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        use crate::block::BlockKind;

        let block = |kind, capacity, initial| BlockSpec {
            kind,
            capacity,
            initial,
            ..BlockSpec::default()
        };
        let ship = |arrival, length, cranes, unload, load| ShipConfig {
            arrival,
            berth: 0,
            length,
            cranes,
            unload,
            load,
        };
        Self {
            seed: 0x00C0_FFEE,
            berths: vec![BerthConfig::default()],
            blocks: vec![
                block(BlockKind::Import, 200, 0),
                block(BlockKind::Export, 200, 120),
                block(BlockKind::Mixed, 150, 20),
            ],
            block_selection: BlockSelection::MostFreeSpace,
            holding_areas: vec![HoldingAreaConfig::default()],
            cranes: 3,
            crane_pool: PoolConfig::default(),
            crane_stations: RendezvousConfig::default(),
            crane_handling: DurationConfig::Uniform { min: 2.0, max: 4.0 },
            truck_handling: DurationConfig::Constant { value: 2 },
            transporters: vec![TransporterConfig::default(); 6],
            transporter_pool: PoolConfig::default(),
            job_assignment: JobAssignment::Fifo,
            ships: vec![
                ship(0, 300, 2, 20, 14),
                ship(10, 250, 1, 12, 10),
                ship(25, 200, 2, 16, 12),
                ship(60, 350, 3, 24, 18),
            ],
            trucks: (0..6)
                .map(|i| TruckConfig {
                    arrival: 5 + 15 * i,
                    deliveries: 4,
                    pickups: 3,
                    ..TruckConfig::default()
                })
                .collect(),
            distances: None,
            node_spacing: 20.0,
            gate_distance: 100.0,
            horizon: None,
        }
    }
}

impl TerminalConfig {
    /// Number of layout nodes: cranes, blocks, holding areas and overflow.
    #[inline]
    pub fn nodes(&self) -> usize {
        self.cranes + self.blocks.len() + self.holding_areas.len() + 1
    }

    pub fn distance_matrix(&self) -> Result<DistanceMatrix, ConfigError> {
        let required = self.nodes();
        let matrix = match &self.distances {
            Some(text) => text.parse::<DistanceMatrix>()?,
            None => DistanceMatrix::linear(required, self.node_spacing),
        };
        if matrix.size() < required {
            return Err(ConfigError::MatrixTooSmall {
                size: matrix.size(),
                required,
            });
        }
        Ok(matrix)
    }

    pub fn horizon<T: SimVariable>(&self) -> Result<Option<TimePoint<T>>, ConfigError> {
        self.horizon
            .map(|h| to_time::<T>(h).map(TimePoint::new))
            .transpose()
    }

    /// Checks everything that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.berths.is_empty() {
            return Err(ConfigError::NoBerths);
        }
        if let Some(berth) = self.berths.iter().position(|b| b.length == 0) {
            return Err(ConfigError::ZeroBerthLength { berth });
        }
        if self.cranes == 0 {
            return Err(ConfigError::NoCranes);
        }
        if self.transporters.is_empty() {
            return Err(ConfigError::NoTransporters);
        }
        for (i, t) in self.transporters.iter().enumerate() {
            if t.capacity == 0 {
                return Err(ConfigError::ZeroTransporterCapacity { transporter: i });
            }
            for speed in [t.speed_loaded, t.speed_empty] {
                if !(speed.is_finite() && speed > 0.0) {
                    return Err(ConfigError::NonPositiveSpeed {
                        what: "Transporter",
                        index: i,
                        speed,
                    });
                }
            }
            if let Some(crane) = t.pinned_crane {
                if crane as usize >= self.cranes {
                    return Err(ConfigError::PinnedToUnknownCrane {
                        transporter: i,
                        crane,
                    });
                }
            }
        }
        if self.job_assignment == JobAssignment::FixedCrane
            && self.transporters.iter().all(|t| t.pinned_crane.is_some())
        {
            for crane in 0..self.cranes as u64 {
                if !self
                    .transporters
                    .iter()
                    .any(|t| t.pinned_crane == Some(crane))
                {
                    return Err(ConfigError::UnservedCrane { crane });
                }
            }
        }
        if let Some(holding_area) = self.holding_areas.iter().position(|h| h.lanes == 0) {
            return Err(ConfigError::NoLanes { holding_area });
        }
        // A resource coming back from work and a transporter arriving at a
        // lane have nowhere else to go.
        let must_hold = [
            ("idle crane", self.crane_pool.idle, self.cranes),
            ("idle transporter", self.transporter_pool.idle, self.transporters.len()),
        ]
        .into_iter()
        .chain(
            self.holding_areas
                .iter()
                .map(|h| ("holding area transporter", h.transporters, self.transporters.len())),
        );
        for (queue, q, required) in must_hold {
            if !q.holds(required) {
                return Err(ConfigError::QueueTooSmall {
                    queue,
                    capacity: q.capacity,
                    required,
                });
            }
        }
        for (i, b) in self.blocks.iter().enumerate() {
            if b.initial > b.effective_capacity() {
                return Err(ConfigError::InitialExceedsCapacity { block: i });
            }
            if let Some(h) = b.holding_area {
                if h.index() >= self.holding_areas.len() {
                    return Err(ConfigError::UnknownHoldingArea {
                        what: "Block",
                        index: i,
                        holding_area: h.index(),
                    });
                }
            }
        }
        for (i, s) in self.ships.iter().enumerate() {
            let berth = self
                .berths
                .get(s.berth)
                .ok_or(ConfigError::UnknownBerth {
                    ship: i,
                    berth: s.berth,
                })?;
            if s.length == 0 {
                return Err(ConfigError::ZeroShipLength { ship: i });
            }
            if s.length > berth.length {
                return Err(ConfigError::ShipTooLong {
                    ship: i,
                    length: s.length,
                    berth_length: berth.length,
                });
            }
            if s.cranes > self.cranes {
                return Err(ConfigError::TooManyCranes {
                    ship: i,
                    requested: s.cranes,
                    available: self.cranes,
                });
            }
            if s.arrival < 0 {
                return Err(ConfigError::TimeOutOfRange { value: s.arrival });
            }
        }
        for (i, t) in self.trucks.iter().enumerate() {
            if t.holding_area >= self.holding_areas.len() {
                return Err(ConfigError::UnknownHoldingArea {
                    what: "Truck",
                    index: i,
                    holding_area: t.holding_area,
                });
            }
            if !(t.speed.is_finite() && t.speed > 0.0) {
                return Err(ConfigError::NonPositiveSpeed {
                    what: "Truck",
                    index: i,
                    speed: t.speed,
                });
            }
            if t.arrival < 0 {
                return Err(ConfigError::TimeOutOfRange { value: t.arrival });
            }
        }
        self.distance_matrix()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TerminalConfigBuilder {
    config: TerminalConfig,
}

impl Default for TerminalConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalConfigBuilder {
    /// Starts from an empty terminal: one default berth, no blocks, ships or
    /// trucks.
    pub fn new() -> Self {
        Self {
            config: TerminalConfig {
                blocks: Vec::new(),
                ships: Vec::new(),
                trucks: Vec::new(),
                ..TerminalConfig::default()
            },
        }
    }

    pub fn seed(mut self, v: u64) -> Self {
        self.config.seed = v;
        self
    }

    pub fn berths(mut self, v: Vec<BerthConfig>) -> Self {
        self.config.berths = v;
        self
    }

    pub fn block(mut self, v: BlockSpec) -> Self {
        self.config.blocks.push(v);
        self
    }

    pub fn block_selection(mut self, v: BlockSelection) -> Self {
        self.config.block_selection = v;
        self
    }

    pub fn holding_areas(mut self, v: Vec<HoldingAreaConfig>) -> Self {
        self.config.holding_areas = v;
        self
    }

    pub fn cranes(mut self, v: usize) -> Self {
        self.config.cranes = v;
        self
    }

    pub fn crane_pool(mut self, v: PoolConfig) -> Self {
        self.config.crane_pool = v;
        self
    }

    pub fn crane_stations(mut self, v: RendezvousConfig) -> Self {
        self.config.crane_stations = v;
        self
    }

    pub fn crane_handling(mut self, v: DurationConfig) -> Self {
        self.config.crane_handling = v;
        self
    }

    pub fn truck_handling(mut self, v: DurationConfig) -> Self {
        self.config.truck_handling = v;
        self
    }

    pub fn transporters(mut self, v: Vec<TransporterConfig>) -> Self {
        self.config.transporters = v;
        self
    }

    pub fn transporter_pool(mut self, v: PoolConfig) -> Self {
        self.config.transporter_pool = v;
        self
    }

    pub fn job_assignment(mut self, v: JobAssignment) -> Self {
        self.config.job_assignment = v;
        self
    }

    pub fn ship(mut self, v: ShipConfig) -> Self {
        self.config.ships.push(v);
        self
    }

    pub fn truck(mut self, v: TruckConfig) -> Self {
        self.config.trucks.push(v);
        self
    }

    pub fn distances(mut self, v: impl Into<String>) -> Self {
        self.config.distances = Some(v.into());
        self
    }

    pub fn node_spacing(mut self, v: f64) -> Self {
        self.config.node_spacing = v;
        self
    }

    pub fn gate_distance(mut self, v: f64) -> Self {
        self.config.gate_distance = v;
        self
    }

    pub fn horizon(mut self, v: i64) -> Self {
        self.config.horizon = Some(v);
        self
    }

    pub fn build(self) -> Result<TerminalConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(TerminalConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_builder_rejects_bad_terminals() {
        let err = TerminalConfigBuilder::new()
            .ship(ShipConfig {
                cranes: 4,
                ..ShipConfig::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::TooManyCranes { requested: 4, .. }));
        assert_eq!(err.kind(), ErrorKind::Construction);

        let err = TerminalConfigBuilder::new()
            .holding_areas(vec![HoldingAreaConfig {
                lanes: 0,
                ..HoldingAreaConfig::default()
            }])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::NoLanes { holding_area: 0 });

        let err = TerminalConfigBuilder::new()
            .berths(vec![BerthConfig {
                length: 100,
                ..BerthConfig::default()
            }])
            .ship(ShipConfig::default())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ShipTooLong { .. }));

        let err = TerminalConfigBuilder::new()
            .transporters(vec![TransporterConfig {
                speed_empty: 0.0,
                ..TransporterConfig::default()
            }])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveSpeed { .. }));
    }

    #[test]
    fn test_fixed_assignment_needs_a_transporter_per_crane() {
        let pinned = |crane| TransporterConfig {
            pinned_crane: Some(crane),
            ..TransporterConfig::default()
        };
        let err = TerminalConfigBuilder::new()
            .cranes(2)
            .job_assignment(JobAssignment::FixedCrane)
            .transporters(vec![pinned(0)])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnservedCrane { crane: 1 });
        assert!(TerminalConfigBuilder::new()
            .cranes(2)
            .job_assignment(JobAssignment::FixedCrane)
            .transporters(vec![pinned(0), TransporterConfig::default()])
            .build()
            .is_ok());
    }

    #[test]
    fn test_queues_that_cannot_refuse_must_fit_everyone() {
        let bounded = |capacity| QueueConfig {
            discipline: QueueDiscipline::Lifo,
            capacity,
        };
        let err = TerminalConfigBuilder::new()
            .cranes(3)
            .crane_pool(PoolConfig {
                idle: bounded(2),
                ..PoolConfig::default()
            })
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::QueueTooSmall {
                queue: "idle crane",
                capacity: 2,
                required: 3
            }
        );

        let err = TerminalConfigBuilder::new()
            .holding_areas(vec![HoldingAreaConfig {
                transporters: bounded(1),
                ..HoldingAreaConfig::default()
            }])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::QueueTooSmall { required: 6, .. }));

        // Demand and lane queues may refuse; any bound is accepted.
        let config = TerminalConfigBuilder::new()
            .crane_pool(PoolConfig {
                idle: bounded(3),
                demand: bounded(1),
            })
            .transporter_pool(PoolConfig {
                demand: bounded(1),
                ..PoolConfig::default()
            })
            .holding_areas(vec![HoldingAreaConfig {
                trucks: bounded(1),
                ..HoldingAreaConfig::default()
            }])
            .build()
            .unwrap();
        assert_eq!(config.crane_pool.demand.queue_capacity(), QueueCapacity::limited(1));
        assert_eq!(bounded(0).queue_capacity(), QueueCapacity::unlimited());
    }

    #[test]
    fn test_distance_matrix_must_cover_layout() {
        let err = TerminalConfigBuilder::new()
            .cranes(1)
            .distances("0 1 1 0")
            .build()
            .unwrap_err();
        // One crane, one holding area and the overflow make three nodes.
        assert_eq!(err, ConfigError::MatrixTooSmall { size: 2, required: 3 });
        let config = TerminalConfigBuilder::new()
            .cranes(1)
            .distances("0 1 2  1 0 1  2 1 0")
            .build()
            .unwrap();
        assert_eq!(config.distance_matrix().map(|m| m.size()), Ok(3));
    }

    #[test]
    fn test_samplers_from_config() {
        let mut s = DurationConfig::Constant { value: 3 }.build::<i64>(0).unwrap();
        assert_eq!(s.sample(), TimeDelta::new(3));
        assert!(DurationConfig::Uniform { min: 5.0, max: 1.0 }
            .build::<i64>(0)
            .is_err());
        assert!(DurationConfig::Exponential { mean: 0.0 }.build::<i64>(0).is_err());
    }

    #[test]
    fn test_json_uses_defaults_for_missing_fields() {
        let config: TerminalConfig =
            serde_json::from_str(r#"{ "cranes": 2, "ships": [], "trucks": [] }"#).unwrap();
        assert_eq!(config.cranes, 2);
        assert_eq!(config.berths, vec![BerthConfig::default()]);
        assert!(config.validate().is_ok());
        assert_eq!(config.transporter_pool, PoolConfig::default());
        let json = r#"{ "crane_handling": { "type": "exponential", "mean": 3.0 } }"#;
        let config: TerminalConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.crane_handling,
            DurationConfig::Exponential { mean: 3.0 }
        );
    }
}
