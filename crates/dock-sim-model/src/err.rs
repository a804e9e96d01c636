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

use crate::id::{ShipId, TransporterId, TruckId};
use dock_sim_core::err::{ErrorKind, Refusal};
use std::fmt::Display;

/// Parameters that would leave an entity unusable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityError {
    ZeroShipLength(ShipId),
    NonPositiveTruckSpeed { truck: TruckId, speed: f64 },
    NonPositiveTransporterSpeed { transporter: TransporterId, speed: f64 },
    ZeroTransporterCapacity(TransporterId),
}

impl Display for EntityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityError::ZeroShipLength(id) => write!(f, "{} must have a positive length", id),
            EntityError::NonPositiveTruckSpeed { truck, speed } => {
                write!(f, "{} has non-positive speed {}", truck, speed)
            }
            EntityError::NonPositiveTransporterSpeed { transporter, speed } => {
                write!(f, "{} has non-positive speed {}", transporter, speed)
            }
            EntityError::ZeroTransporterCapacity(id) => {
                write!(f, "{} must be able to carry at least one unit", id)
            }
        }
    }
}

impl std::error::Error for EntityError {}

impl Refusal for EntityError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Construction
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DistanceMatrixError {
    Empty,
    NotSquare { values: usize },
    InvalidNumber { token: String, index: usize },
    Negative { from: usize, to: usize, value: f64 },
}

impl Display for DistanceMatrixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMatrixError::Empty => write!(f, "Distance matrix is empty"),
            DistanceMatrixError::NotSquare { values } => {
                write!(f, "Distance matrix has {} values, not a square number", values)
            }
            DistanceMatrixError::InvalidNumber { token, index } => {
                write!(f, "Value #{} ('{}') is not a number", index, token)
            }
            DistanceMatrixError::Negative { from, to, value } => {
                write!(f, "Distance {} -> {} is negative ({})", from, to, value)
            }
        }
    }
}

impl std::error::Error for DistanceMatrixError {}

impl Refusal for DistanceMatrixError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Construction
    }
}
