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
//! Numerical integration of particle positions
//!
//! Forces are converted straight into displacement (`force * t * t`), with no
//! velocity carried between steps. This is a relaxation scheme: it settles a
//! layout, it does not conserve momentum or energy.
//!
//! # Step schedule
//!
//! A tick of length `delta_t` is split into one half step of `delta_t / 2`
//! followed by ten micro steps of `delta_t / 20`. Each of those chunks is
//! integrated adaptively: the time scale is halved until the displacement fits
//! within `max(1.0, chunk)`, and at most four sub-steps are spent per chunk.
//! Time left over after the fourth sub-step is dropped.

use crate::error::{PhysicsError, Result};
use crate::math::Vector;
use crate::particle::Particle;

mod adaptive;

pub use adaptive::AdaptiveIntegrator;

/// Tunable constants of the step schedule
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorConfig {
    /// Fraction of the tick spent in the leading half step
    pub half_step_fraction: f64,
    /// Number of micro steps sharing the remainder of the tick
    pub micro_steps: usize,
    /// Maximum number of sub-steps per chunk
    pub max_depth: usize,
    /// A chunk counts as complete once this fraction of it has passed
    pub completion_tolerance: f64,
    /// Lower bound of the per-sub-step displacement limit
    pub displacement_floor: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig {
            half_step_fraction: 0.5,
            micro_steps: 10,
            max_depth: 4,
            completion_tolerance: 0.9999,
            displacement_floor: 1.0,
        }
    }
}

impl IntegratorConfig {
    /// Set the number of micro steps
    pub fn with_micro_steps(mut self, micro_steps: usize) -> Self {
        self.micro_steps = micro_steps;
        self
    }

    /// Set the sub-step budget per chunk
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the displacement floor
    pub fn with_displacement_floor(mut self, floor: f64) -> Self {
        self.displacement_floor = floor;
        self
    }

    /// Check that every constant is usable
    pub fn validate(&self) -> Result<()> {
        if !(self.half_step_fraction > 0.0 && self.half_step_fraction <= 1.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "half_step_fraction",
                value: self.half_step_fraction,
            });
        }
        if self.max_depth == 0 {
            return Err(PhysicsError::InvalidParameter {
                name: "max_depth",
                value: 0.0,
            });
        }
        if !(self.completion_tolerance > 0.0 && self.completion_tolerance <= 1.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "completion_tolerance",
                value: self.completion_tolerance,
            });
        }
        if !(self.displacement_floor > 0.0 && self.displacement_floor.is_finite()) {
            return Err(PhysicsError::InvalidParameter {
                name: "displacement_floor",
                value: self.displacement_floor,
            });
        }
        Ok(())
    }

    /// Chunk lengths for one tick of `delta_t`
    ///
    /// With no micro steps the whole tick is a single chunk.
    pub fn schedule(&self, delta_t: f64) -> impl Iterator<Item = f64> {
        let (head, rest) = if self.micro_steps == 0 {
            (delta_t, 0)
        } else {
            (delta_t * self.half_step_fraction, self.micro_steps)
        };
        let micro = if rest == 0 { 0.0 } else { head / rest as f64 };
        std::iter::once(head).chain(std::iter::repeat(micro).take(rest))
    }

    /// Largest displacement a single sub-step of a `chunk` may apply
    pub fn displacement_limit(&self, chunk: f64) -> f64 {
        self.displacement_floor.max(chunk)
    }
}

/// Outcome of integrating one or more chunks
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChunkReport {
    /// Simulated time actually applied
    pub passed_time: f64,
    /// Sub-steps used
    pub depth: usize,
    /// Largest displacement magnitude applied by a single sub-step
    pub max_displacement: f64,
}

impl ChunkReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: &ChunkReport) {
        self.passed_time += other.passed_time;
        self.depth += other.depth;
        self.max_displacement = self.max_displacement.max(other.max_displacement);
    }
}

/// Converts force into displacement for one particle
pub trait Integrator: Send + Sync {
    /// Get the name of this integrator
    fn name(&self) -> &str;

    /// Advance `particle` by one tick of `delta_t`
    ///
    /// `force` is re-evaluated at the particle's current position before
    /// every sub-step.
    fn advance(&self, particle: &Particle, delta_t: f64, force: &dyn Fn(&Particle) -> Vector) -> ChunkReport;
}
