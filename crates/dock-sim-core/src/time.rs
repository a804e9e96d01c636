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

//! # Simulated Time
//!
//! Logical time is an integer clock. Two newtypes keep instants and
//! durations apart so that, for example, two instants cannot be added:
//!
//! - `TimePoint<T>`: an instant on the simulation clock.
//! - `TimeDelta<T>`: a (possibly negative) duration between two instants.
//!
//! Checked and saturating variants are provided for every operation that
//! can overflow; the operator impls panic on overflow.

use num_traits::{PrimInt, Signed, ToPrimitive};
use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
};

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePoint<T: PrimInt>(T);

impl<T: PrimInt> TimePoint<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        TimePoint(value)
    }

    #[inline]
    pub fn zero() -> Self {
        TimePoint(T::zero())
    }

    #[inline]
    pub const fn value(self) -> T {
        self.0
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl<T: PrimInt + Signed> TimePoint<T> {
    #[inline]
    pub fn checked_add(self, rhs: TimeDelta<T>) -> Option<Self> {
        self.0.checked_add(&rhs.0).map(TimePoint)
    }

    #[inline]
    pub fn checked_sub(self, rhs: TimeDelta<T>) -> Option<Self> {
        self.0.checked_sub(&rhs.0).map(TimePoint)
    }

    #[inline]
    pub fn saturating_add(self, rhs: TimeDelta<T>) -> Self {
        TimePoint(self.0.saturating_add(rhs.0))
    }

    /// Duration from `earlier` to `self`, clamped at zero.
    #[inline]
    pub fn elapsed_since(self, earlier: TimePoint<T>) -> TimeDelta<T> {
        if self.0 <= earlier.0 {
            TimeDelta::zero()
        } else {
            TimeDelta(self.0.saturating_sub(earlier.0))
        }
    }
}

impl<T: PrimInt> Default for TimePoint<T> {
    #[inline]
    fn default() -> Self {
        TimePoint(T::zero())
    }
}

impl<T: PrimInt + Display> Display for TimePoint<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimePoint({})", self.0)
    }
}

impl<T: PrimInt> From<T> for TimePoint<T> {
    #[inline]
    fn from(value: T) -> Self {
        TimePoint(value)
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeDelta<T: PrimInt + Signed>(T);

impl<T: PrimInt + Signed> TimeDelta<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        TimeDelta(value)
    }

    #[inline]
    pub fn zero() -> Self {
        TimeDelta(T::zero())
    }

    #[inline]
    pub const fn value(self) -> T {
        self.0
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0.is_negative()
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0.is_positive()
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }

    /// Converts a non-negative floating point duration, rounding up.
    /// Returns `None` for NaN, negative or unrepresentable values.
    #[inline]
    pub fn from_f64_ceil(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        <T as num_traits::NumCast>::from(value.ceil()).map(TimeDelta)
    }

    #[inline]
    pub fn checked_add(self, rhs: TimeDelta<T>) -> Option<Self> {
        self.0.checked_add(&rhs.0).map(TimeDelta)
    }

    #[inline]
    pub fn checked_sub(self, rhs: TimeDelta<T>) -> Option<Self> {
        self.0.checked_sub(&rhs.0).map(TimeDelta)
    }

    #[inline]
    pub fn saturating_add(self, rhs: TimeDelta<T>) -> Self {
        TimeDelta(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: TimeDelta<T>) -> Self {
        TimeDelta(self.0.saturating_sub(rhs.0))
    }
}

impl<T: PrimInt + Signed> Default for TimeDelta<T> {
    #[inline]
    fn default() -> Self {
        TimeDelta::zero()
    }
}

impl<T: PrimInt + Signed + Display> Display for TimeDelta<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimeDelta({})", self.0)
    }
}

impl<T: PrimInt + Signed> From<T> for TimeDelta<T> {
    #[inline]
    fn from(value: T) -> Self {
        TimeDelta(value)
    }
}

impl<T: PrimInt + Signed> Add<TimeDelta<T>> for TimePoint<T> {
    type Output = TimePoint<T>;

    #[inline]
    fn add(self, rhs: TimeDelta<T>) -> Self::Output {
        self.checked_add(rhs)
            .expect("overflow in TimePoint + TimeDelta")
    }
}

impl<T: PrimInt + Signed> AddAssign<TimeDelta<T>> for TimePoint<T> {
    #[inline]
    fn add_assign(&mut self, rhs: TimeDelta<T>) {
        *self = *self + rhs;
    }
}

impl<T: PrimInt + Signed> Sub<TimeDelta<T>> for TimePoint<T> {
    type Output = TimePoint<T>;

    #[inline]
    fn sub(self, rhs: TimeDelta<T>) -> Self::Output {
        self.checked_sub(rhs)
            .expect("overflow in TimePoint - TimeDelta")
    }
}

impl<T: PrimInt + Signed> Sub for TimePoint<T> {
    type Output = TimeDelta<T>;

    #[inline]
    fn sub(self, rhs: TimePoint<T>) -> Self::Output {
        TimeDelta(
            self.0
                .checked_sub(&rhs.0)
                .expect("overflow in TimePoint - TimePoint"),
        )
    }
}

impl<T: PrimInt + Signed> Add for TimeDelta<T> {
    type Output = TimeDelta<T>;

    #[inline]
    fn add(self, rhs: TimeDelta<T>) -> Self::Output {
        self.checked_add(rhs)
            .expect("overflow in TimeDelta + TimeDelta")
    }
}

impl<T: PrimInt + Signed> AddAssign for TimeDelta<T> {
    #[inline]
    fn add_assign(&mut self, rhs: TimeDelta<T>) {
        *self = *self + rhs;
    }
}

impl<T: PrimInt + Signed> Sub for TimeDelta<T> {
    type Output = TimeDelta<T>;

    #[inline]
    fn sub(self, rhs: TimeDelta<T>) -> Self::Output {
        self.checked_sub(rhs)
            .expect("overflow in TimeDelta - TimeDelta")
    }
}

impl<T: PrimInt + Signed> SubAssign for TimeDelta<T> {
    #[inline]
    fn sub_assign(&mut self, rhs: TimeDelta<T>) {
        *self = *self - rhs;
    }
}

impl<T: PrimInt + Signed> Sum for TimeDelta<T> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(TimeDelta::zero(), |acc, d| acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_plus_delta() {
        let t = TimePoint::new(10i64) + TimeDelta::new(5);
        assert_eq!(t, TimePoint::new(15));
    }

    #[test]
    fn test_point_difference_is_delta() {
        let d = TimePoint::new(3i64) - TimePoint::new(10);
        assert_eq!(d, TimeDelta::new(-7));
        assert!(d.is_negative());
    }

    #[test]
    fn test_elapsed_since_clamps_at_zero() {
        let a = TimePoint::new(4i64);
        let b = TimePoint::new(9i64);
        assert_eq!(b.elapsed_since(a), TimeDelta::new(5));
        assert_eq!(a.elapsed_since(b), TimeDelta::zero());
    }

    #[test]
    fn test_checked_add_overflow() {
        let t = TimePoint::new(i32::MAX);
        assert_eq!(t.checked_add(TimeDelta::new(1)), None);
        assert_eq!(t.saturating_add(TimeDelta::new(1)), TimePoint::new(i32::MAX));
    }

    #[test]
    fn test_from_f64_ceil() {
        assert_eq!(TimeDelta::<i64>::from_f64_ceil(2.1), Some(TimeDelta::new(3)));
        assert_eq!(TimeDelta::<i64>::from_f64_ceil(2.0), Some(TimeDelta::new(2)));
        assert_eq!(TimeDelta::<i64>::from_f64_ceil(-1.0), None);
        assert_eq!(TimeDelta::<i64>::from_f64_ceil(f64::NAN), None);
    }

    #[test]
    fn test_sum_of_deltas() {
        let total: TimeDelta<i64> = [1, 2, 3].into_iter().map(TimeDelta::new).sum();
        assert_eq!(total, TimeDelta::new(6));
    }

    #[test]
    #[should_panic(expected = "overflow in TimeDelta + TimeDelta")]
    fn test_delta_add_panics_on_overflow() {
        let _ = TimeDelta::new(i8::MAX) + TimeDelta::new(1);
    }
}
