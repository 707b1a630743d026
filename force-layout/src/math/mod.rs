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
//! Geometry primitives consumed by every force model
//!
//! - [`Vector`]: inline one to three dimensional vector
//! - [`Matrix`]: axis rotation matrices

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::{Vector, MAX_DIMENSION, NORM_EPSILON};

/// Coordinate axis for rotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Rotation in the YZ plane
    X,
    /// Rotation in the XZ plane
    Y,
    /// Rotation in the XY plane
    Z,
}
