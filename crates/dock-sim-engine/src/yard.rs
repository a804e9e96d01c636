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

//! # Yard
//!
//! The container yard is a composite of storage blocks. Its counters are the
//! sums of the counters of its blocks, so every change goes through exactly
//! one block and the totals can never drift from the parts. Blocks are
//! added while the yard is being built; once it has been used the set is
//! sealed.

use crate::{
    block::{Block, BlockError, BlockKind, BlockSpec, ContainerClass, LedgerOp},
    select::BlockSelectionStrategy,
};
use dock_sim_core::{
    SimVariable,
    err::{ErrorKind, Refusal},
    time::TimePoint,
};
use dock_sim_model::id::{BlockId, HoldingAreaId};
use std::fmt::Display;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YardError {
    UnknownBlock(BlockId),
    Sealed,
    Block(BlockError),
    OverflowShort { requested: u64, available: u64 },
}

impl Display for YardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YardError::UnknownBlock(b) => write!(f, "{} is not part of the yard", b),
            YardError::Sealed => write!(f, "Blocks cannot be added after the yard was used"),
            YardError::Block(e) => write!(f, "{}", e),
            YardError::OverflowShort {
                requested,
                available,
            } => write!(
                f,
                "Cannot take {} units from the overflow area holding {}",
                requested, available
            ),
        }
    }
}

impl std::error::Error for YardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            YardError::Block(e) => Some(e),
            _ => None,
        }
    }
}

impl Refusal for YardError {
    fn kind(&self) -> ErrorKind {
        match self {
            YardError::UnknownBlock(_) => ErrorKind::WrongParticipant,
            YardError::Sealed => ErrorKind::Construction,
            YardError::Block(e) => e.kind(),
            YardError::OverflowShort { .. } => ErrorKind::CapacityViolation,
        }
    }
}

impl From<BlockError> for YardError {
    fn from(e: BlockError) -> Self {
        YardError::Block(e)
    }
}

#[derive(Debug)]
pub struct Yard<T: SimVariable> {
    blocks: Vec<Block<T>>,
    overflow: u64,
    overflow_plannable: u64,
    overflow_stored: u64,
    overflow_retrieved: u64,
    used: bool,
    reset_at: TimePoint<T>,
    strategy: Box<dyn BlockSelectionStrategy<T>>,
}

impl<T: SimVariable> Yard<T> {
    pub fn new(strategy: Box<dyn BlockSelectionStrategy<T>>) -> Self {
        Self {
            blocks: Vec::new(),
            overflow: 0,
            overflow_plannable: 0,
            overflow_stored: 0,
            overflow_retrieved: 0,
            used: false,
            reset_at: TimePoint::zero(),
            strategy,
        }
    }

    pub fn add_block(&mut self, spec: &BlockSpec) -> Result<BlockId, YardError> {
        if self.used {
            warn!("block added to a yard in use");
            return Err(YardError::Sealed);
        }
        let id = BlockId::new(self.blocks.len() as u64);
        self.blocks.push(Block::new(id, spec)?);
        Ok(id)
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> Option<&Block<T>> {
        self.blocks.get(id.index())
    }

    #[inline]
    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    #[inline]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn total(&self, f: impl Fn(&Block<T>) -> u64) -> u64 {
        self.blocks.iter().fold(0u64, |acc, b| acc.saturating_add(f(b)))
    }

    #[inline]
    pub fn capacity(&self) -> u64 {
        self.total(Block::capacity)
    }

    #[inline]
    pub fn initial(&self) -> u64 {
        self.total(Block::initial)
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.total(Block::current)
    }

    #[inline]
    pub fn reservable(&self) -> u64 {
        self.total(Block::reservable)
    }

    #[inline]
    pub fn plannable(&self) -> u64 {
        self.total(Block::plannable)
    }

    /// Whether any block can still take `n` reserved units.
    #[inline]
    pub fn is_free(&self, n: u64) -> bool {
        self.blocks.iter().any(|b| b.is_free(n))
    }

    /// Applies `op` to one block. A refusal leaves block and totals untouched.
    pub fn apply(
        &mut self,
        now: TimePoint<T>,
        block: BlockId,
        op: LedgerOp,
        n: u64,
    ) -> Result<(), YardError> {
        let Some(b) = self.blocks.get_mut(block.index()) else {
            warn!(block = %block, %op, "unknown block");
            return Err(YardError::UnknownBlock(block));
        };
        self.used = true;
        b.apply(now, op, n)?;
        Ok(())
    }

    #[inline]
    pub fn store(&mut self, now: TimePoint<T>, block: BlockId, n: u64) -> Result<(), YardError> {
        self.apply(now, block, LedgerOp::Store, n)
    }

    #[inline]
    pub fn retrieve(
        &mut self,
        now: TimePoint<T>,
        block: BlockId,
        n: u64,
    ) -> Result<(), YardError> {
        self.apply(now, block, LedgerOp::Retrieve, n)
    }

    #[inline]
    pub fn reserve(&mut self, now: TimePoint<T>, block: BlockId, n: u64) -> Result<(), YardError> {
        self.apply(now, block, LedgerOp::Reserve, n)
    }

    #[inline]
    pub fn plan(&mut self, now: TimePoint<T>, block: BlockId, n: u64) -> Result<(), YardError> {
        self.apply(now, block, LedgerOp::Plan, n)
    }

    /// Ids of the blocks accepted by `filter`, in yard order.
    pub fn candidates(&self, filter: impl Fn(&Block<T>) -> bool) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| filter(b))
            .map(|b| b.id())
            .collect()
    }

    pub fn blocks_of_kind(&self, kind: BlockKind) -> Vec<BlockId> {
        self.candidates(|b| b.kind() == kind)
    }

    pub fn blocks_of_class(&self, class: ContainerClass) -> Vec<BlockId> {
        self.candidates(|b| b.class() == class)
    }

    pub fn blocks_of_holding_area(&self, holding_area: HoldingAreaId) -> Vec<BlockId> {
        self.candidates(|b| b.holding_area() == Some(holding_area))
    }

    /// Blocks that can still reserve `n` slots.
    pub fn free_blocks(&self, n: u64) -> Vec<BlockId> {
        self.candidates(|b| b.is_free(n))
    }

    /// Blocks holding at least `n` containers not yet planned for removal.
    pub fn stocked_blocks(&self, n: u64) -> Vec<BlockId> {
        self.candidates(|b| b.plannable() >= n)
    }

    /// Lets the selection policy pick one of `candidates`. Unknown ids are
    /// ignored.
    pub fn choose_block(&mut self, candidates: &[BlockId]) -> Option<BlockId> {
        let refs: Vec<&Block<T>> = candidates
            .iter()
            .filter_map(|id| self.blocks.get(id.index()))
            .collect();
        let choice = self.strategy.select(&refs);
        debug!(candidates = refs.len(), choice = ?choice, strategy = self.strategy.name(),
            "block chosen");
        choice
    }

    #[inline]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    #[inline]
    pub fn overflow_stored(&self) -> u64 {
        self.overflow_stored
    }

    #[inline]
    pub fn overflow_retrieved(&self) -> u64 {
        self.overflow_retrieved
    }

    /// Puts containers into the unbounded overflow area next to the yard.
    pub fn store_in_overflow(&mut self, n: u64) {
        self.used = true;
        self.overflow = self.overflow.saturating_add(n);
        self.overflow_plannable = self.overflow_plannable.saturating_add(n);
        self.overflow_stored = self.overflow_stored.saturating_add(n);
        warn!(units = n, overflow = self.overflow, "containers put into overflow");
    }

    /// Overflow containers not yet promised to a retrieval.
    #[inline]
    pub fn overflow_plannable(&self) -> u64 {
        self.overflow_plannable
    }

    pub fn plan_overflow(&mut self, n: u64) -> Result<(), YardError> {
        if n > self.overflow_plannable {
            return Err(YardError::OverflowShort {
                requested: n,
                available: self.overflow_plannable,
            });
        }
        self.used = true;
        self.overflow_plannable -= n;
        Ok(())
    }

    pub fn retrieve_from_overflow(&mut self, n: u64) -> Result<(), YardError> {
        if n > self.overflow {
            return Err(YardError::OverflowShort {
                requested: n,
                available: self.overflow,
            });
        }
        self.used = true;
        self.overflow -= n;
        // Planned units leave first; an unplanned retrieval eats into the rest.
        self.overflow_plannable = self.overflow_plannable.min(self.overflow);
        self.overflow_retrieved = self.overflow_retrieved.saturating_add(n);
        Ok(())
    }

    /// Time-weighted average of the total stock since the last reset.
    pub fn avg_occupancy(&self, now: TimePoint<T>) -> Option<f64> {
        let elapsed = now.elapsed_since(self.reset_at).to_f64();
        if elapsed <= 0.0 {
            return None;
        }
        let area: f64 = self.blocks.iter().map(|b| b.weighted_area(now)).sum();
        Some(area / elapsed)
    }

    pub fn reset(&mut self, now: TimePoint<T>) {
        for b in &mut self.blocks {
            b.reset(now);
        }
        self.overflow_stored = 0;
        self.overflow_retrieved = 0;
        self.reset_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::{FirstFit, MostFreeSpace};

    fn t(v: i64) -> TimePoint<i64> {
        TimePoint::new(v)
    }

    fn spec(kind: BlockKind, capacity: i64, initial: u64) -> BlockSpec {
        BlockSpec {
            kind,
            capacity,
            initial,
            ..BlockSpec::default()
        }
    }

    fn yard() -> Yard<i64> {
        let mut y = Yard::new(Box::new(MostFreeSpace));
        y.add_block(&spec(BlockKind::Import, 100, 10)).unwrap();
        y.add_block(&spec(BlockKind::Export, 50, 40)).unwrap();
        y.add_block(&BlockSpec {
            class: ContainerClass::new(2),
            holding_area: Some(HoldingAreaId::new(0)),
            ..spec(BlockKind::Mixed, 80, 0)
        })
        .unwrap();
        y
    }

    fn assert_sums(y: &Yard<i64>) {
        let b = y.blocks();
        assert_eq!(y.capacity(), b.iter().map(|b| b.capacity()).sum::<u64>());
        assert_eq!(y.current(), b.iter().map(|b| b.current()).sum::<u64>());
        assert_eq!(y.reservable(), b.iter().map(|b| b.reservable()).sum::<u64>());
        assert_eq!(y.plannable(), b.iter().map(|b| b.plannable()).sum::<u64>());
    }

    #[test]
    fn test_totals_follow_block_mutations() {
        let mut y = yard();
        assert_eq!(y.capacity(), 230);
        assert_eq!(y.current(), 50);
        let ops = [
            (0, LedgerOp::Reserve, 30),
            (0, LedgerOp::Store, 30),
            (1, LedgerOp::Plan, 25),
            (1, LedgerOp::Retrieve, 25),
            (2, LedgerOp::Store, 90),
            (2, LedgerOp::Store, 80),
            (0, LedgerOp::Retrieve, 500),
        ];
        for (block, op, n) in ops {
            let _ = y.apply(t(1), BlockId::new(block), op, n);
            assert_sums(&y);
        }
        assert_eq!(y.current(), 50 + 30 - 25 + 80);
    }

    #[test]
    fn test_refusal_changes_nothing() {
        let mut y = yard();
        let before = (y.current(), y.reservable(), y.plannable());
        let err = y.retrieve(t(0), BlockId::new(1), 41).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityViolation);
        assert_eq!((y.current(), y.reservable(), y.plannable()), before);
        let err = y.store(t(0), BlockId::new(9), 1).unwrap_err();
        assert_eq!(err, YardError::UnknownBlock(BlockId::new(9)));
    }

    #[test]
    fn test_sealed_after_first_use() {
        let mut y = yard();
        y.reserve(t(0), BlockId::new(0), 1).unwrap();
        assert_eq!(y.add_block(&BlockSpec::default()), Err(YardError::Sealed));
        assert_eq!(y.blocks().len(), 3);
    }

    #[test]
    fn test_queries() {
        let y = yard();
        assert_eq!(y.blocks_of_kind(BlockKind::Export), vec![BlockId::new(1)]);
        assert_eq!(y.blocks_of_class(ContainerClass::new(2)), vec![BlockId::new(2)]);
        assert_eq!(
            y.blocks_of_holding_area(HoldingAreaId::new(0)),
            vec![BlockId::new(2)]
        );
        assert_eq!(y.free_blocks(60), vec![BlockId::new(0), BlockId::new(2)]);
        assert_eq!(y.stocked_blocks(20), vec![BlockId::new(1)]);
        assert!(y.is_free(90));
        assert!(!y.is_free(91));
    }

    #[test]
    fn test_choose_block_delegates_to_policy() {
        let mut y = yard();
        let all = y.candidates(|_| true);
        assert_eq!(y.choose_block(&all), Some(BlockId::new(0)));
        let mut y2 = Yard::<i64>::new(Box::new(FirstFit));
        y2.add_block(&BlockSpec::default()).unwrap();
        assert_eq!(y2.choose_block(&[BlockId::new(7)]), None);
        assert_eq!(y2.choose_block(&[BlockId::new(0)]), Some(BlockId::new(0)));
    }

    #[test]
    fn test_overflow_area() {
        let mut y = yard();
        y.store_in_overflow(5);
        assert_eq!(y.overflow(), 5);
        assert!(y.retrieve_from_overflow(6).is_err());
        y.retrieve_from_overflow(2).unwrap();
        assert_eq!(y.overflow(), 3);
        assert_eq!(y.overflow_retrieved(), 2);
        assert_eq!(y.overflow_plannable(), 3);
        assert!(y.plan_overflow(4).is_err());
        y.plan_overflow(2).unwrap();
        assert_eq!(y.overflow_plannable(), 1);
    }

    #[test]
    fn test_overflow_never_plans_more_than_it_holds() {
        let mut y = yard();
        y.store_in_overflow(5);
        y.retrieve_from_overflow(5).unwrap();
        assert_eq!(y.overflow(), 0);
        assert_eq!(y.overflow_plannable(), 0);
        assert!(y.plan_overflow(5).is_err());

        // A planned retrieval leaves the unplanned stock untouched.
        y.store_in_overflow(4);
        y.plan_overflow(3).unwrap();
        y.retrieve_from_overflow(3).unwrap();
        assert_eq!(y.overflow(), 1);
        assert_eq!(y.overflow_plannable(), 1);
    }

    #[test]
    fn test_avg_occupancy_is_sum_of_blocks() {
        let mut y = yard();
        y.store(t(5), BlockId::new(2), 10).unwrap();
        // 50 units over [0, 5), 60 over [5, 10).
        assert_eq!(y.avg_occupancy(t(10)), Some((50.0 * 5.0 + 60.0 * 5.0) / 10.0));
    }
}
