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

use crate::err::DistanceMatrixError;
use std::str::FromStr;

/// Distances between the numbered nodes of the terminal layout.
///
/// The text form is a whitespace separated list of `n * n` numbers in
/// row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    size: usize,
    cells: Vec<f64>,
}

impl DistanceMatrix {
    /// Nodes on a line, `spacing` apart.
    pub fn linear(size: usize, spacing: f64) -> Self {
        let mut cells = Vec::with_capacity(size * size);
        for from in 0..size {
            for to in 0..size {
                cells.push(from.abs_diff(to) as f64 * spacing.abs());
            }
        }
        Self { size, cells }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> Option<f64> {
        if from >= self.size || to >= self.size {
            return None;
        }
        self.cells.get(from * self.size + to).copied()
    }
}

impl FromStr for DistanceMatrix {
    type Err = DistanceMatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cells = s
            .split_whitespace()
            .enumerate()
            .map(|(index, token)| {
                token
                    .parse::<f64>()
                    .map_err(|_| DistanceMatrixError::InvalidNumber {
                        token: token.to_string(),
                        index,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if cells.is_empty() {
            return Err(DistanceMatrixError::Empty);
        }
        let size = (cells.len() as f64).sqrt().round() as usize;
        if size * size != cells.len() {
            return Err(DistanceMatrixError::NotSquare {
                values: cells.len(),
            });
        }
        if let Some(bad) = cells.iter().position(|v| *v < 0.0 || v.is_nan()) {
            return Err(DistanceMatrixError::Negative {
                from: bad / size,
                to: bad % size,
                value: cells[bad],
            });
        }
        Ok(Self { size, cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_square_matrix() {
        let m: DistanceMatrix = "0 5 7\n5 0 3\n7 3 0".parse().unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.distance(0, 2), Some(7.0));
        assert_eq!(m.distance(2, 1), Some(3.0));
        assert_eq!(m.distance(3, 0), None);
    }

    #[test]
    fn test_parse_rejects_non_square() {
        let err = "0 1 2".parse::<DistanceMatrix>().unwrap_err();
        assert_eq!(err, DistanceMatrixError::NotSquare { values: 3 });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = "0 x 1 0".parse::<DistanceMatrix>().unwrap_err();
        assert!(matches!(err, DistanceMatrixError::InvalidNumber { index: 1, .. }));
        assert_eq!(
            "".parse::<DistanceMatrix>().unwrap_err(),
            DistanceMatrixError::Empty
        );
    }

    #[test]
    fn test_linear_layout() {
        let m = DistanceMatrix::linear(4, 10.0);
        assert_eq!(m.distance(0, 3), Some(30.0));
        assert_eq!(m.distance(3, 1), Some(20.0));
        assert_eq!(m.distance(2, 2), Some(0.0));
    }
}
