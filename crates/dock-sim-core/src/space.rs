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

use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    ops::{Add, Sub},
};

/// A length along the quay, e.g. the berth a ship occupies.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SpaceLength(usize);

impl SpaceLength {
    #[inline]
    pub const fn new(value: usize) -> Self {
        SpaceLength(value)
    }

    #[inline]
    pub const fn zero() -> Self {
        SpaceLength(0)
    }

    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn checked_add(self, rhs: SpaceLength) -> Option<Self> {
        self.0.checked_add(rhs.0).map(SpaceLength)
    }

    #[inline]
    pub fn checked_sub(self, rhs: SpaceLength) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(SpaceLength)
    }
}

impl Display for SpaceLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpaceLength({})", self.0)
    }
}

impl From<usize> for SpaceLength {
    #[inline]
    fn from(value: usize) -> Self {
        SpaceLength(value)
    }
}

impl Add for SpaceLength {
    type Output = SpaceLength;

    #[inline]
    fn add(self, rhs: SpaceLength) -> Self::Output {
        self.checked_add(rhs).expect("overflow in SpaceLength + SpaceLength")
    }
}

impl Sub for SpaceLength {
    type Output = SpaceLength;

    #[inline]
    fn sub(self, rhs: SpaceLength) -> Self::Output {
        self.checked_sub(rhs)
            .expect("underflow in SpaceLength - SpaceLength")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_arithmetic() {
        let a = SpaceLength::new(300);
        let b = SpaceLength::new(200);
        assert_eq!(a + b, SpaceLength::new(500));
        assert_eq!(a - b, SpaceLength::new(100));
        assert_eq!(b.checked_sub(a), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(SpaceLength::new(7).to_string(), "SpaceLength(7)");
    }
}
