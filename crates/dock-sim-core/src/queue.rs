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

//! Wait queues with a configurable discipline and an optional length limit.
//!
//! The discipline only decides where an arriving entry is placed. Removal
//! is always explicit (`pop_first`, `remove_at`, ...), so the owner decides
//! which entry is actually served.

use crate::err::QueueFullError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt::Display};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueDiscipline {
    #[default]
    Fifo,
    Lifo,
    Random,
}

impl QueueDiscipline {
    /// Maps a numeric discipline code. Unknown codes fall back to FIFO.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => QueueDiscipline::Fifo,
            1 => QueueDiscipline::Lifo,
            2 => QueueDiscipline::Random,
            other => {
                warn!(code = other, "unknown queue discipline, falling back to FIFO");
                QueueDiscipline::Fifo
            }
        }
    }
}

impl Display for QueueDiscipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueDiscipline::Fifo => f.write_str("FIFO"),
            QueueDiscipline::Lifo => f.write_str("LIFO"),
            QueueDiscipline::Random => f.write_str("RANDOM"),
        }
    }
}

/// Maximum number of entries a queue admits. A limit of `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QueueCapacity(Option<usize>);

impl QueueCapacity {
    #[inline]
    pub const fn unlimited() -> Self {
        QueueCapacity(None)
    }

    #[inline]
    pub const fn limited(limit: usize) -> Self {
        if limit == 0 {
            QueueCapacity(None)
        } else {
            QueueCapacity(Some(limit))
        }
    }

    #[inline]
    pub const fn limit(self) -> Option<usize> {
        self.0
    }

    #[inline]
    pub const fn admits(self, len: usize) -> bool {
        match self.0 {
            Some(limit) => len < limit,
            None => true,
        }
    }
}

impl From<usize> for QueueCapacity {
    #[inline]
    fn from(limit: usize) -> Self {
        QueueCapacity::limited(limit)
    }
}

impl Display for QueueCapacity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(limit) => write!(f, "{}", limit),
            None => f.write_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaitQueue<E> {
    entries: VecDeque<E>,
    discipline: QueueDiscipline,
    capacity: QueueCapacity,
    rng: ChaCha8Rng,
    refused: u64,
    max_len: usize,
}

impl<E> WaitQueue<E> {
    pub fn new(discipline: QueueDiscipline, capacity: QueueCapacity, seed: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            discipline,
            capacity,
            rng: ChaCha8Rng::seed_from_u64(seed),
            refused: 0,
            max_len: 0,
        }
    }

    /// An unlimited FIFO queue.
    #[inline]
    pub fn fifo() -> Self {
        Self::new(QueueDiscipline::Fifo, QueueCapacity::unlimited(), 0)
    }

    /// Places `entry` according to the discipline and returns its position.
    ///
    /// A full queue refuses the entry and counts the refusal.
    pub fn insert(&mut self, entry: E) -> Result<usize, QueueFullError> {
        if !self.capacity.admits(self.entries.len()) {
            self.refused += 1;
            return Err(QueueFullError::new(self.capacity.limit().unwrap_or(0)));
        }
        let position = match self.discipline {
            QueueDiscipline::Fifo => self.entries.len(),
            QueueDiscipline::Lifo => 0,
            QueueDiscipline::Random => self.rng.random_range(0..=self.entries.len()),
        };
        self.entries.insert(position, entry);
        self.max_len = self.max_len.max(self.entries.len());
        Ok(position)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        !self.capacity.admits(self.entries.len())
    }

    #[inline]
    pub fn first(&self) -> Option<&E> {
        self.entries.front()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.entries.get_mut(index)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.iter()
    }

    #[inline]
    pub fn position<P: FnMut(&E) -> bool>(&self, pred: P) -> Option<usize> {
        self.entries.iter().position(pred)
    }

    /// First entry satisfying `pred`, in queue order.
    #[inline]
    pub fn first_matching<P: FnMut(&&E) -> bool>(&self, pred: P) -> Option<&E> {
        self.entries.iter().find(pred)
    }

    #[inline]
    pub fn remove_at(&mut self, index: usize) -> Option<E> {
        self.entries.remove(index)
    }

    pub fn remove_where<P: FnMut(&E) -> bool>(&mut self, pred: P) -> Option<E> {
        let index = self.position(pred)?;
        self.entries.remove(index)
    }

    #[inline]
    pub fn pop_first(&mut self) -> Option<E> {
        self.entries.pop_front()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    #[inline]
    pub fn capacity(&self) -> QueueCapacity {
        self.capacity
    }

    #[inline]
    pub fn refused(&self) -> u64 {
        self.refused
    }

    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Zeroes the statistics. Entries stay queued.
    pub fn reset_statistics(&mut self) {
        self.refused = 0;
        self.max_len = self.entries.len();
    }
}

impl<E> Default for WaitQueue<E> {
    fn default() -> Self {
        Self::fifo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(q: &WaitQueue<u32>) -> Vec<u32> {
        q.iter().copied().collect()
    }

    #[test]
    fn test_fifo_appends() {
        let mut q = WaitQueue::fifo();
        q.insert(1).unwrap();
        q.insert(2).unwrap();
        q.insert(3).unwrap();
        assert_eq!(contents(&q), vec![1, 2, 3]);
        assert_eq!(q.pop_first(), Some(1));
    }

    #[test]
    fn test_lifo_prepends() {
        let mut q = WaitQueue::new(QueueDiscipline::Lifo, QueueCapacity::unlimited(), 0);
        q.insert(1).unwrap();
        q.insert(2).unwrap();
        q.insert(3).unwrap();
        assert_eq!(contents(&q), vec![3, 2, 1]);
    }

    #[test]
    fn test_random_keeps_all_entries_and_is_seeded() {
        let build = || {
            let mut q = WaitQueue::new(QueueDiscipline::Random, QueueCapacity::unlimited(), 42);
            for i in 0..20 {
                q.insert(i).unwrap();
            }
            contents(&q)
        };
        let a = build();
        let b = build();
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_capacity_refuses_and_counts() {
        let mut q = WaitQueue::new(QueueDiscipline::Fifo, QueueCapacity::limited(2), 0);
        q.insert(1).unwrap();
        q.insert(2).unwrap();
        assert!(q.is_full());
        let err = q.insert(3).unwrap_err();
        assert_eq!(err.capacity(), 2);
        assert_eq!(q.refused(), 1);
        assert_eq!(contents(&q), vec![1, 2]);
    }

    #[test]
    fn test_zero_capacity_is_unlimited() {
        assert_eq!(QueueCapacity::limited(0), QueueCapacity::unlimited());
        assert!(QueueCapacity::from(0).admits(usize::MAX - 1));
    }

    #[test]
    fn test_unknown_code_falls_back_to_fifo() {
        assert_eq!(QueueDiscipline::from_code(1), QueueDiscipline::Lifo);
        assert_eq!(QueueDiscipline::from_code(17), QueueDiscipline::Fifo);
    }

    #[test]
    fn test_remove_where_and_first_matching() {
        let mut q = WaitQueue::fifo();
        for i in 1..=5 {
            q.insert(i).unwrap();
        }
        assert_eq!(q.first_matching(|e| **e % 2 == 0), Some(&2));
        assert_eq!(q.remove_where(|e| *e == 4), Some(4));
        assert_eq!(contents(&q), vec![1, 2, 3, 5]);
        assert_eq!(q.max_len(), 5);
    }
}
