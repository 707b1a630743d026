// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Axis rotation matrices
//!
//! Only what [`Vector::rotate`](crate::math::Vector::rotate) needs: the
//! three axis rotations, their upper-left blocks for two dimensional
//! vectors, and the matrix-vector product.

use crate::error::{PhysicsError, Result};
use crate::math::{Axis, Vector};

/// Row-major matrix of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Rotation by `degrees` about a coordinate axis
    pub fn rotation(axis: Axis, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let data = match axis {
            Axis::X => vec![1.0, 0.0, 0.0, 0.0, cos, sin, 0.0, -sin, cos],
            Axis::Y => vec![cos, 0.0, -sin, 0.0, 1.0, 0.0, sin, 0.0, cos],
            Axis::Z => vec![cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0],
        };
        Matrix { rows: 3, cols: 3, data }
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Matrix-vector product `self * v`
    pub fn multiply_vector(&self, v: &Vector) -> Result<Vector> {
        if self.cols != v.dimension() {
            return Err(PhysicsError::DimensionMismatch {
                expected: self.cols,
                actual: v.dimension(),
            });
        }
        let coords: Vec<f64> = (0..self.rows)
            .map(|r| {
                v.as_slice()
                    .iter()
                    .enumerate()
                    .map(|(c, x)| self.get(r, c) * x)
                    .sum()
            })
            .collect();
        Vector::from_slice(&coords)
    }

    /// Upper-left block with the given number of rows and columns
    pub fn sub_matrix(&self, rows: usize, cols: usize) -> Matrix {
        let rows = rows.min(self.rows);
        let cols = cols.min(self.cols);
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            data.extend_from_slice(&self.data[r * self.cols..r * self.cols + cols]);
        }
        Matrix { rows, cols, data }
    }
}
