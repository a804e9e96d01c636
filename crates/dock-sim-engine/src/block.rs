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

//! # Storage Blocks
//!
//! A block is a capacity ledger with four counters:
//!
//! - `capacity`: the number of slots (`u64::MAX` when unlimited),
//! - `current`: the slots occupied right now,
//! - `reservable`: free slots not yet promised to an incoming container,
//! - `plannable`: stored containers not yet promised to an outgoing move.
//!
//! `reserve` and `plan` book future moves ahead of time, `store` and
//! `retrieve` execute them. Every operation either succeeds completely or
//! leaves all counters untouched.

use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    time::TimePoint,
};
use dock_sim_model::id::{BlockId, HoldingAreaId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Export,
    Import,
    #[default]
    Mixed,
}

impl BlockKind {
    /// Maps a numeric block type. Unknown codes become `Mixed`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => BlockKind::Export,
            1 => BlockKind::Import,
            2 => BlockKind::Mixed,
            other => {
                warn!(code = other, "unknown block type, using mixed");
                BlockKind::Mixed
            }
        }
    }

    /// Whether a block of this kind takes containers of the `flow` direction.
    #[inline]
    pub fn serves(self, flow: BlockKind) -> bool {
        self == BlockKind::Mixed || self == flow
    }
}

/// Container class tag, e.g. standard, reefer or dangerous goods.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContainerClass(u8);

impl ContainerClass {
    #[inline]
    pub const fn new(class: u8) -> Self {
        ContainerClass(class)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LedgerOp {
    Store,
    Retrieve,
    Reserve,
    Plan,
}

impl Display for LedgerOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LedgerOp::Store => "store",
            LedgerOp::Retrieve => "retrieve",
            LedgerOp::Reserve => "reserve",
            LedgerOp::Plan => "plan",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    Insufficient {
        block: BlockId,
        op: LedgerOp,
        requested: u64,
        available: u64,
    },
    InitialExceedsCapacity {
        block: BlockId,
        initial: u64,
        capacity: u64,
    },
}

impl Display for BlockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockError::Insufficient {
                block,
                op,
                requested,
                available,
            } => write!(
                f,
                "Cannot {} {} units at {}: only {} available",
                op, requested, block, available
            ),
            BlockError::InitialExceedsCapacity {
                block,
                initial,
                capacity,
            } => write!(
                f,
                "{} starts with {} units but holds only {}",
                block, initial, capacity
            ),
        }
    }
}

impl std::error::Error for BlockError {}

impl Refusal for BlockError {
    fn kind(&self) -> ErrorKind {
        match self {
            BlockError::Insufficient { .. } => ErrorKind::CapacityViolation,
            BlockError::InitialExceedsCapacity { .. } => ErrorKind::Construction,
        }
    }
}

/// Construction parameters of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSpec {
    pub kind: BlockKind,
    pub class: ContainerClass,
    /// `0` means unlimited, negative values are taken by magnitude.
    pub capacity: i64,
    pub initial: u64,
    pub holding_area: Option<HoldingAreaId>,
}

impl Default for BlockSpec {
    fn default() -> Self {
        Self {
            kind: BlockKind::Mixed,
            class: ContainerClass::default(),
            capacity: 100,
            initial: 0,
            holding_area: None,
        }
    }
}

impl BlockSpec {
    /// The slot count after clamping invalid values.
    pub fn effective_capacity(&self) -> u64 {
        match self.capacity {
            0 => {
                warn!("block capacity 0 means unlimited");
                u64::MAX
            }
            c if c < 0 => {
                warn!(capacity = c, "negative block capacity, using its magnitude");
                c.unsigned_abs()
            }
            c => c as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block<T: SimVariable> {
    id: BlockId,
    kind: BlockKind,
    class: ContainerClass,
    holding_area: Option<HoldingAreaId>,
    capacity: u64,
    initial: u64,
    current: u64,
    reservable: u64,
    plannable: u64,
    min_current: u64,
    max_current: u64,
    producers: u64,
    consumers: u64,
    weighted_sum: f64,
    last_update: TimePoint<T>,
    reset_at: TimePoint<T>,
}

impl<T: SimVariable> Block<T> {
    pub fn new(id: BlockId, spec: &BlockSpec) -> Result<Self, BlockError> {
        let capacity = spec.effective_capacity();
        if spec.initial > capacity {
            return Err(BlockError::InitialExceedsCapacity {
                block: id,
                initial: spec.initial,
                capacity,
            });
        }
        Ok(Self {
            id,
            kind: spec.kind,
            class: spec.class,
            holding_area: spec.holding_area,
            capacity,
            initial: spec.initial,
            current: spec.initial,
            reservable: capacity - spec.initial,
            plannable: spec.initial,
            min_current: spec.initial,
            max_current: spec.initial,
            producers: 0,
            consumers: 0,
            weighted_sum: 0.0,
            last_update: TimePoint::zero(),
            reset_at: TimePoint::zero(),
        })
    }

    #[inline]
    pub fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    #[inline]
    pub fn class(&self) -> ContainerClass {
        self.class
    }

    #[inline]
    pub fn holding_area(&self) -> Option<HoldingAreaId> {
        self.holding_area
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[inline]
    pub fn is_unlimited(&self) -> bool {
        self.capacity == u64::MAX
    }

    #[inline]
    pub fn initial(&self) -> u64 {
        self.initial
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.current
    }

    #[inline]
    pub fn reservable(&self) -> u64 {
        self.reservable
    }

    #[inline]
    pub fn plannable(&self) -> u64 {
        self.plannable
    }

    #[inline]
    pub fn min_current(&self) -> u64 {
        self.min_current
    }

    #[inline]
    pub fn max_current(&self) -> u64 {
        self.max_current
    }

    /// Number of successful stores since the last reset.
    #[inline]
    pub fn producers(&self) -> u64 {
        self.producers
    }

    /// Number of successful retrievals since the last reset.
    #[inline]
    pub fn consumers(&self) -> u64 {
        self.consumers
    }

    /// Whether `n` more units can still be reserved.
    #[inline]
    pub fn is_free(&self, n: u64) -> bool {
        self.reservable >= n
    }

    #[inline]
    pub fn occupancy_rate(&self) -> f64 {
        if self.is_unlimited() || self.capacity == 0 {
            0.0
        } else {
            self.current as f64 / self.capacity as f64
        }
    }

    /// Validates `op` without applying it.
    pub fn check(&self, op: LedgerOp, n: u64) -> Result<(), BlockError> {
        let available = match op {
            LedgerOp::Store => self.capacity - self.current,
            LedgerOp::Retrieve => self.current,
            LedgerOp::Reserve => self.reservable,
            LedgerOp::Plan => self.plannable,
        };
        if n > available {
            return Err(BlockError::Insufficient {
                block: self.id,
                op,
                requested: n,
                available,
            });
        }
        Ok(())
    }

    pub fn apply(&mut self, now: TimePoint<T>, op: LedgerOp, n: u64) -> Result<(), BlockError> {
        if let Err(e) = self.check(op, n) {
            warn!(block = %self.id, %op, requested = n, "block refused");
            return Err(e);
        }
        match op {
            LedgerOp::Store | LedgerOp::Retrieve => self.accumulate(now),
            LedgerOp::Reserve | LedgerOp::Plan => {}
        }
        match op {
            LedgerOp::Store => {
                self.current += n;
                self.plannable = self.plannable.saturating_add(n);
                self.producers += 1;
            }
            LedgerOp::Retrieve => {
                self.current -= n;
                self.reservable = self.reservable.saturating_add(n);
                self.consumers += 1;
            }
            LedgerOp::Reserve => self.reservable -= n,
            LedgerOp::Plan => self.plannable -= n,
        }
        self.min_current = self.min_current.min(self.current);
        self.max_current = self.max_current.max(self.current);
        trace!(block = %self.id, %op, n, current = self.current,
            reservable = self.reservable, plannable = self.plannable, "block updated");
        Ok(())
    }

    #[inline]
    pub fn store(&mut self, now: TimePoint<T>, n: u64) -> Result<(), BlockError> {
        self.apply(now, LedgerOp::Store, n)
    }

    #[inline]
    pub fn retrieve(&mut self, now: TimePoint<T>, n: u64) -> Result<(), BlockError> {
        self.apply(now, LedgerOp::Retrieve, n)
    }

    #[inline]
    pub fn reserve(&mut self, now: TimePoint<T>, n: u64) -> Result<(), BlockError> {
        self.apply(now, LedgerOp::Reserve, n)
    }

    #[inline]
    pub fn plan(&mut self, now: TimePoint<T>, n: u64) -> Result<(), BlockError> {
        self.apply(now, LedgerOp::Plan, n)
    }

    // Adds the area under `current` since the last update.
    fn accumulate(&mut self, now: TimePoint<T>) {
        let dt = now.elapsed_since(self.last_update).to_f64();
        self.weighted_sum += dt * self.current as f64;
        if now > self.last_update {
            self.last_update = now;
        }
    }

    /// Time-weighted average of `current` since the last reset.
    pub fn avg_occupancy(&self, now: TimePoint<T>) -> Option<f64> {
        let elapsed = now.elapsed_since(self.reset_at).to_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let open = now.elapsed_since(self.last_update).to_f64() * self.current as f64;
        Some((self.weighted_sum + open) / elapsed)
    }

    /// Area under `current` since the last reset, up to `now`.
    pub(crate) fn weighted_area(&self, now: TimePoint<T>) -> f64 {
        self.weighted_sum + now.elapsed_since(self.last_update).to_f64() * self.current as f64
    }

    /// Zeroes the statistics. The stored containers stay.
    pub fn reset(&mut self, now: TimePoint<T>) {
        self.producers = 0;
        self.consumers = 0;
        self.min_current = self.current;
        self.max_current = self.current;
        self.weighted_sum = 0.0;
        self.last_update = now;
        self.reset_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(v: i64) -> TimePoint<i64> {
        TimePoint::new(v)
    }

    fn block(capacity: i64, initial: u64) -> Block<i64> {
        Block::new(
            BlockId::new(0),
            &BlockSpec {
                capacity,
                initial,
                ..BlockSpec::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_reserve_store_retrieve_scenario() {
        let mut b = block(100, 0);
        b.reserve(t(0), 60).unwrap();
        assert_eq!(b.reservable(), 40);
        b.store(t(0), 60).unwrap();
        assert_eq!(b.current(), 60);
        assert_eq!(b.plannable(), 60);
        let err = b.retrieve(t(0), 70).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityViolation);
        assert_eq!(b.current(), 60);
        b.retrieve(t(0), 60).unwrap();
        assert_eq!(b.current(), 0);
        assert_eq!(b.reservable(), 100);
    }

    #[test]
    fn test_plan_limits_future_retrievals() {
        let mut b = block(10, 8);
        assert_eq!(b.plannable(), 8);
        assert_eq!(b.reservable(), 2);
        b.plan(t(0), 5).unwrap();
        assert!(b.plan(t(0), 4).is_err());
        assert_eq!(b.plannable(), 3);
        assert!(b.is_free(2));
        assert!(!b.is_free(3));
    }

    #[test]
    fn test_store_respects_capacity() {
        let mut b = block(10, 8);
        assert!(b.store(t(0), 3).is_err());
        b.store(t(0), 2).unwrap();
        assert_eq!(b.occupancy_rate(), 1.0);
        assert_eq!(b.producers(), 1);
    }

    #[test]
    fn test_capacity_conservation_under_mixed_ops() {
        let mut b = block(50, 10);
        let ops = [
            (LedgerOp::Store, 15),
            (LedgerOp::Retrieve, 30),
            (LedgerOp::Reserve, 20),
            (LedgerOp::Store, 20),
            (LedgerOp::Plan, 40),
            (LedgerOp::Retrieve, 5),
            (LedgerOp::Store, 100),
        ];
        let (mut stored, mut retrieved) = (0u64, 0u64);
        for (i, (op, n)) in ops.into_iter().enumerate() {
            if b.apply(t(i as i64), op, n).is_ok() {
                match op {
                    LedgerOp::Store => stored += n,
                    LedgerOp::Retrieve => retrieved += n,
                    _ => {}
                }
            }
            assert_eq!(b.current(), 10 + stored - retrieved);
            assert!(b.current() <= b.capacity());
        }
    }

    #[test]
    fn test_unlimited_and_negative_capacity() {
        let b = block(0, 5);
        assert!(b.is_unlimited());
        assert_eq!(b.occupancy_rate(), 0.0);
        let b = block(-20, 0);
        assert_eq!(b.capacity(), 20);
    }

    #[test]
    fn test_initial_above_capacity_rejected() {
        let spec = BlockSpec {
            capacity: 5,
            initial: 6,
            ..BlockSpec::default()
        };
        let err = Block::<i64>::new(BlockId::new(1), &spec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_time_weighted_occupancy_uses_value_before_change() {
        let mut b = block(100, 10);
        // 10 units for [0, 4), 30 units for [4, 10).
        b.store(t(4), 20).unwrap();
        assert_eq!(b.avg_occupancy(t(10)), Some((10.0 * 4.0 + 30.0 * 6.0) / 10.0));
        b.reset(t(10));
        assert_eq!(b.avg_occupancy(t(10)), None);
        assert_eq!(b.avg_occupancy(t(12)), Some(30.0));
    }

    #[test]
    fn test_kind_serves_flow() {
        assert!(BlockKind::Mixed.serves(BlockKind::Import));
        assert!(BlockKind::Import.serves(BlockKind::Import));
        assert!(!BlockKind::Export.serves(BlockKind::Import));
        assert_eq!(BlockKind::from_code(9), BlockKind::Mixed);
    }
}
