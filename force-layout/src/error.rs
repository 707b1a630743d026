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
//! Error type shared by the whole crate
//!
//! Degenerate geometry is never an error here: force providers substitute a
//! random direction instead. Errors are reserved for programmer mistakes that
//! a caller can still observe (dimension mismatches through the checked
//! arithmetic API), invalid configuration, and runner lifecycle misuse.

use thiserror::Error;

/// Errors produced by the force-layout engine
#[derive(Debug, Error)]
pub enum PhysicsError {
    /// Two operands of a vector or matrix operation disagree in dimension
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the left-hand operand
        expected: usize,
        /// Dimension of the right-hand operand
        actual: usize,
    },

    /// Vectors are limited to one, two or three dimensions
    #[error("unsupported dimension {0}, vectors hold between 1 and 3 coordinates")]
    UnsupportedDimension(usize),

    /// A numeric parameter is outside its accepted range
    #[error("invalid value {value} for parameter `{name}`")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// The rejected value
        value: f64,
    },

    /// A runner operation was requested in the wrong lifecycle state
    #[error("runner is {actual}, expected {expected}")]
    InvalidRunnerState {
        /// State the operation requires
        expected: &'static str,
        /// State the runner was actually in
        actual: &'static str,
    },

    /// The operating system refused to start a worker thread
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// The thread pool bounding runner ticks could not be built
    #[error("failed to build tick thread pool: {0}")]
    ThreadPool(String),

    /// An environment override could not be parsed
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PhysicsError>;
