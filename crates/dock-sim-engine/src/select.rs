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

//! Policies picking one block out of a candidate set.
//!
//! A policy only looks at the candidates it is given and never changes
//! them; its own random stream is the only state it may advance.

use crate::block::Block;
use dock_sim_core::SimVariable;
use dock_sim_model::id::BlockId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub trait BlockSelectionStrategy<T: SimVariable>: std::fmt::Debug + Send {
    fn name(&self) -> &'static str;

    fn select(&mut self, candidates: &[&Block<T>]) -> Option<BlockId>;
}

/// The first candidate in the order given.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl<T: SimVariable> BlockSelectionStrategy<T> for FirstFit {
    fn name(&self) -> &'static str {
        "FirstFit"
    }

    fn select(&mut self, candidates: &[&Block<T>]) -> Option<BlockId> {
        candidates.first().map(|b| b.id())
    }
}

/// The candidate with the most reservable slots; ties go to the earlier one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MostFreeSpace;

impl<T: SimVariable> BlockSelectionStrategy<T> for MostFreeSpace {
    fn name(&self) -> &'static str {
        "MostFreeSpace"
    }

    fn select(&mut self, candidates: &[&Block<T>]) -> Option<BlockId> {
        let mut best: Option<&Block<T>> = None;
        for &b in candidates {
            if best.is_none_or(|cur| b.reservable() > cur.reservable()) {
                best = Some(b);
            }
        }
        best.map(|b| b.id())
    }
}

/// The candidate with the lowest occupancy rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastOccupied;

impl<T: SimVariable> BlockSelectionStrategy<T> for LeastOccupied {
    fn name(&self) -> &'static str {
        "LeastOccupied"
    }

    fn select(&mut self, candidates: &[&Block<T>]) -> Option<BlockId> {
        let mut best: Option<&Block<T>> = None;
        for &b in candidates {
            if best.is_none_or(|cur| b.occupancy_rate() < cur.occupancy_rate()) {
                best = Some(b);
            }
        }
        best.map(|b| b.id())
    }
}

#[derive(Debug, Clone)]
pub struct UniformRandom {
    rng: ChaCha8Rng,
}

impl UniformRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<T: SimVariable> BlockSelectionStrategy<T> for UniformRandom {
    fn name(&self) -> &'static str {
        "UniformRandom"
    }

    fn select(&mut self, candidates: &[&Block<T>]) -> Option<BlockId> {
        if candidates.is_empty() {
            return None;
        }
        let i = self.rng.random_range(0..candidates.len());
        Some(candidates[i].id())
    }
}

/// Configuration name of a selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSelection {
    FirstFit,
    #[default]
    MostFreeSpace,
    LeastOccupied,
    UniformRandom,
}

impl BlockSelection {
    pub fn build<T: SimVariable>(self, seed: u64) -> Box<dyn BlockSelectionStrategy<T>> {
        match self {
            BlockSelection::FirstFit => Box::new(FirstFit),
            BlockSelection::MostFreeSpace => Box::new(MostFreeSpace),
            BlockSelection::LeastOccupied => Box::new(LeastOccupied),
            BlockSelection::UniformRandom => Box::new(UniformRandom::new(seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockSpec;
    use dock_sim_core::time::TimePoint;

    static_assertions::assert_obj_safe!(BlockSelectionStrategy<i64>);

    fn blocks() -> Vec<Block<i64>> {
        let specs = [(100, 90), (100, 20), (50, 0), (200, 100)];
        specs
            .iter()
            .enumerate()
            .map(|(i, (capacity, initial))| {
                Block::new(
                    BlockId::new(i as u64),
                    &BlockSpec {
                        capacity: *capacity,
                        initial: *initial,
                        ..BlockSpec::default()
                    },
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_first_fit() {
        let b = blocks();
        let refs: Vec<&Block<i64>> = b.iter().skip(1).collect();
        assert_eq!(FirstFit.select(&refs[..]), Some(BlockId::new(1)));
        assert_eq!(BlockSelectionStrategy::<i64>::select(&mut FirstFit, &[]), None);
    }

    #[test]
    fn test_most_free_space() {
        let b = blocks();
        let refs: Vec<&Block<i64>> = b.iter().collect();
        // reservable: 10, 80, 50, 100
        assert_eq!(MostFreeSpace.select(&refs[..]), Some(BlockId::new(3)));
    }

    #[test]
    fn test_least_occupied() {
        let mut b = blocks();
        b[2].store(TimePoint::new(0), 40).unwrap();
        let refs: Vec<&Block<i64>> = b.iter().collect();
        // rates: 0.9, 0.2, 0.8, 0.5
        assert_eq!(LeastOccupied.select(&refs[..]), Some(BlockId::new(1)));
    }

    #[test]
    fn test_uniform_random_is_seeded_and_picks_candidates() {
        let b = blocks();
        let refs: Vec<&Block<i64>> = b.iter().collect();
        let mut s1 = UniformRandom::new(5);
        let mut s2 = UniformRandom::new(5);
        for _ in 0..20 {
            let pick = s1.select(&refs[..]);
            assert_eq!(pick, s2.select(&refs[..]));
            assert!(pick.is_some_and(|id| id.index() < 4));
        }
        assert_eq!(BlockSelectionStrategy::<i64>::select(&mut s1, &[]), None);
    }

    #[test]
    fn test_selection_does_not_touch_candidates() {
        let b = blocks();
        let before = b.clone();
        let refs: Vec<&Block<i64>> = b.iter().collect();
        let mut s = BlockSelection::UniformRandom.build::<i64>(1);
        let _ = s.select(&refs[..]);
        assert_eq!(b, before);
    }
}
