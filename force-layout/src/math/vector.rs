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
//! Fixed-capacity vector for two and three dimensional layouts
//!
//! Coordinates live inline in a `[f64; 3]` so a `Vector` is `Copy` and never
//! allocates; unused trailing coordinates are always zero. Arithmetic between
//! vectors of different dimensionality is a programmer error: the checked
//! methods (`try_add`, `try_subtract`, `try_dot`) report it as
//! [`PhysicsError::DimensionMismatch`], the operator forms panic.

use crate::error::{PhysicsError, Result};
use crate::math::{Axis, Matrix};
use rand::Rng;
use std::fmt;
use std::ops::{AddAssign, Div, Mul, Neg, Sub};

/// Largest supported dimensionality
pub const MAX_DIMENSION: usize = 3;

/// Magnitudes at or below this value are treated as zero by [`Vector::norm_vector`]
pub const NORM_EPSILON: f64 = 1e-9;

/// A position, displacement or force with one to three coordinates
///
/// # Examples
///
/// ```
/// use force_layout::math::Vector;
///
/// let a = Vector::new3(1.0, 2.0, 2.0);
/// assert_eq!(a.absolute(), 3.0);
/// assert_eq!(a.dimension(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    coords: [f64; MAX_DIMENSION],
    dimension: usize,
}

impl Vector {
    /// Create a two dimensional vector
    pub fn new2(x: f64, y: f64) -> Self {
        Vector {
            coords: [x, y, 0.0],
            dimension: 2,
        }
    }

    /// Create a three dimensional vector
    pub fn new3(x: f64, y: f64, z: f64) -> Self {
        Vector {
            coords: [x, y, z],
            dimension: 3,
        }
    }

    /// Create a vector from a coordinate slice of length 1 to 3
    pub fn from_slice(coords: &[f64]) -> Result<Self> {
        if coords.is_empty() || coords.len() > MAX_DIMENSION {
            return Err(PhysicsError::UnsupportedDimension(coords.len()));
        }
        let mut inline = [0.0; MAX_DIMENSION];
        inline[..coords.len()].copy_from_slice(coords);
        Ok(Vector {
            coords: inline,
            dimension: coords.len(),
        })
    }

    /// Create the zero vector of the given dimensionality
    ///
    /// # Panics
    ///
    /// Panics if `dimension` is 0 or larger than [`MAX_DIMENSION`]
    pub fn zero(dimension: usize) -> Self {
        assert!(
            (1..=MAX_DIMENSION).contains(&dimension),
            "Vector dimension must be between 1 and 3"
        );
        Vector {
            coords: [0.0; MAX_DIMENSION],
            dimension,
        }
    }

    /// Create a vector with every coordinate drawn uniformly from `[0, 1)`
    pub fn random(dimension: usize) -> Self {
        let mut rng = rand::rng();
        let mut v = Vector::zero(dimension);
        for c in v.coords.iter_mut().take(dimension) {
            *c = rng.random::<f64>();
        }
        v
    }

    /// Create a vector with every coordinate drawn uniformly from `[-1, 1)`
    pub fn random_signed(dimension: usize) -> Self {
        let mut rng = rand::rng();
        let mut v = Vector::zero(dimension);
        for c in v.coords.iter_mut().take(dimension) {
            *c = rng.random_range(-1.0..1.0);
        }
        v
    }

    /// Number of coordinates
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The coordinates as a slice of length [`Vector::dimension`]
    pub fn as_slice(&self) -> &[f64] {
        &self.coords[..self.dimension]
    }

    /// Coordinate at `index`, if present
    pub fn get(&self, index: usize) -> Option<f64> {
        self.as_slice().get(index).copied()
    }

    /// First coordinate
    pub fn x(&self) -> f64 {
        self.coords[0]
    }

    /// Second coordinate (zero for one dimensional vectors)
    pub fn y(&self) -> f64 {
        self.coords[1]
    }

    /// Third coordinate (zero for vectors below three dimensions)
    pub fn z(&self) -> f64 {
        self.coords[2]
    }

    /// Check that all coordinates are finite
    pub fn is_valid(&self) -> bool {
        self.as_slice().iter().all(|c| c.is_finite())
    }

    fn check_dimension(&self, other: &Vector) -> Result<()> {
        if self.dimension != other.dimension {
            return Err(PhysicsError::DimensionMismatch {
                expected: self.dimension,
                actual: other.dimension,
            });
        }
        Ok(())
    }

    /// Component-wise sum
    pub fn try_add(&self, other: &Vector) -> Result<Vector> {
        self.check_dimension(other)?;
        let mut out = *self;
        for i in 0..self.dimension {
            out.coords[i] += other.coords[i];
        }
        Ok(out)
    }

    /// Component-wise difference `self - other`
    pub fn try_subtract(&self, other: &Vector) -> Result<Vector> {
        self.try_add(&other.multiply(-1.0))
    }

    /// Dot product
    pub fn try_dot(&self, other: &Vector) -> Result<f64> {
        self.check_dimension(other)?;
        Ok(self
            .as_slice()
            .iter()
            .zip(other.as_slice())
            .map(|(a, b)| a * b)
            .sum())
    }

    /// Component-wise sum, panicking on dimension mismatch
    pub fn add(&self, other: &Vector) -> Vector {
        expect_same_dimension(self.try_add(other))
    }

    /// Component-wise difference, panicking on dimension mismatch
    pub fn subtract(&self, other: &Vector) -> Vector {
        expect_same_dimension(self.try_subtract(other))
    }

    /// Dot product, panicking on dimension mismatch
    pub fn multiply_scalar(&self, other: &Vector) -> f64 {
        expect_same_dimension(self.try_dot(other))
    }

    /// Scale by a scalar
    pub fn multiply(&self, factor: f64) -> Vector {
        let mut out = *self;
        for c in out.coords.iter_mut().take(self.dimension) {
            *c *= factor;
        }
        out
    }

    /// Divide by a scalar
    pub fn divide(&self, divisor: f64) -> Vector {
        self.multiply(1.0 / divisor)
    }

    /// Euclidean length
    pub fn absolute(&self) -> f64 {
        self.as_slice().iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// Unit vector in the same direction
    ///
    /// Vectors shorter than [`NORM_EPSILON`] normalize to the zero vector
    /// rather than producing NaN.
    pub fn norm_vector(&self) -> Vector {
        let length = self.absolute();
        if length > NORM_EPSILON {
            self.divide(length)
        } else {
            Vector::zero(self.dimension)
        }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Vector) -> f64 {
        self.subtract(other).absolute()
    }

    /// Cross product of two three dimensional vectors
    pub fn multiply_cross(&self, other: &Vector) -> Result<Vector> {
        for v in [self, other] {
            if v.dimension != 3 {
                return Err(PhysicsError::DimensionMismatch {
                    expected: 3,
                    actual: v.dimension,
                });
            }
        }
        let (a, b) = (self.coords, other.coords);
        Ok(Vector::new3(
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ))
    }

    /// Rotate by `degrees` about a coordinate axis
    ///
    /// Two dimensional vectors use the upper-left 2x2 block of the rotation,
    /// so only rotation about [`Axis::Z`] moves them.
    pub fn rotate(&self, axis: Axis, degrees: f64) -> Vector {
        let dim = self.dimension;
        let rotation = Matrix::rotation(axis, degrees).sub_matrix(dim, dim);
        // square sub-matrix of matching size, the product cannot fail
        rotation.multiply_vector(self).unwrap_or(*self)
    }

    /// Rotate about the X axis
    pub fn rotate_x(&self, degrees: f64) -> Vector {
        self.rotate(Axis::X, degrees)
    }

    /// Rotate about the Y axis
    pub fn rotate_y(&self, degrees: f64) -> Vector {
        self.rotate(Axis::Y, degrees)
    }

    /// Rotate about the Z axis
    pub fn rotate_z(&self, degrees: f64) -> Vector {
        self.rotate(Axis::Z, degrees)
    }

    /// Rotate about X, then Y, then Z
    pub fn rotate_xyz(&self, x_degrees: f64, y_degrees: f64, z_degrees: f64) -> Vector {
        self.rotate_x(x_degrees).rotate_y(y_degrees).rotate_z(z_degrees)
    }

    /// Direction from this point to the closest point on a line
    ///
    /// The line passes through `point` with direction `direction`. A
    /// degenerate direction collapses the line to `point` itself.
    pub fn closest_direction_to_line(&self, point: &Vector, direction: &Vector) -> Vector {
        let to_point = point.subtract(self);
        let length_sq = direction.multiply_scalar(direction);
        if length_sq <= NORM_EPSILON * NORM_EPSILON {
            return to_point;
        }
        let t = self.subtract(point).multiply_scalar(direction) / length_sq;
        point.add(&direction.multiply(t)).subtract(self)
    }
}

fn expect_same_dimension<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("vector arithmetic on mismatched operands: {}", err),
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        *self = Vector::add(self, &rhs);
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        self.subtract(&rhs)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        self.multiply(rhs)
    }
}

impl Div<f64> for Vector {
    type Output = Vector;

    fn div(self, rhs: f64) -> Vector {
        self.divide(rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        self.multiply(-1.0)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.as_slice().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.3}", c)?;
        }
        write!(f, ")")
    }
}
