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
//! # Force Layout
//!
//! A force-directed particle relaxation engine for positioning points, for
//! example the nodes of a graph, under springs, anchors and repulsion
//! fields.
//!
//! ## Features
//!
//! - **Force providers**: anchors, springs, minimum distances, collision
//!   fields and line alignment behind one [`ForceProvider`] trait
//! - **Bounded integration**: adaptive sub-stepping that never moves a
//!   particle by more than `max(1.0, chunk)` per sub-step
//! - **Call optimization**: cached aggregates for whole-population providers
//! - **Concurrent runner**: background fast and slow tick workers with
//!   suspend, boost and a tick callback under exclusive access
//! - **Parallelization**: optional Rayon integration for per-tick particle
//!   parallelism (`parallel` feature, on by default)
//!
//! ## Example
//!
//! ```rust
//! use force_layout::forces::{PointForceProvider, SharedForceProvider};
//! use force_layout::math::Vector;
//! use force_layout::particle::Particle;
//! use force_layout::simulation::Simulation;
//! use std::sync::Arc;
//!
//! let simulation = Simulation::new();
//! let particle = Arc::new(Particle::at(Vector::new2(3.0, 4.0)));
//! let anchor: SharedForceProvider = Arc::new(PointForceProvider::center(2));
//!
//! simulation.add_particle(Arc::clone(&particle)).add_force_provider(anchor);
//! simulation.tick_default();
//! assert!(particle.location().absolute() < 5.0);
//! ```

#![warn(missing_docs)]

/// Error type and result alias
pub mod error;

/// Runner configuration and environment overrides
pub mod config;

/// Vector and matrix primitives
pub mod math;

/// Particles and stable particle ids
pub mod particle;

/// Force provider trait and force models
pub mod forces;

/// Call-frequency optimization of force resolution
pub mod optimization;

/// Numerical integration methods
pub mod integration;

/// Particle population and tick
pub mod simulation;

/// Concurrent tick scheduling
pub mod runner;

pub use config::RunnerConfig;
pub use error::{PhysicsError, Result};
pub use forces::{ForceKind, ForceProvider, SharedForceProvider};
pub use math::Vector;
pub use particle::{Particle, ParticleId};
pub use runner::{Runner, RunnerState};
pub use simulation::Simulation;
