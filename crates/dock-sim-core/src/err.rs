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

use std::fmt::Display;

/// Why an operation on a shared resource was refused.
///
/// Refusals never change the state of the resource; they are returned to
/// the caller so strategies and controllers can react to the concrete cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An invalid construction parameter that could not be clamped.
    Construction,
    /// The caller is not a legal participant of the operation.
    WrongParticipant,
    /// The requested amount exceeds what the resource can provide.
    CapacityViolation,
    /// The wait queue is at its configured capacity.
    QueueFull,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Construction => "construction",
            ErrorKind::WrongParticipant => "wrong participant",
            ErrorKind::CapacityViolation => "capacity violation",
            ErrorKind::QueueFull => "queue full",
        };
        f.write_str(name)
    }
}

/// An error that can be classified by [`ErrorKind`].
pub trait Refusal: std::error::Error {
    fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueFullError {
    capacity: usize,
}

impl QueueFullError {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Display for QueueFullError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Wait queue is full (capacity {})", self.capacity)
    }
}

impl std::error::Error for QueueFullError {}

impl Refusal for QueueFullError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::QueueFull
    }
}
