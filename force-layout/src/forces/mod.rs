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
//! Force providers
//!
//! A force provider is a policy that decides which particles it applies to
//! ([`ForceProvider::matches`]) and what directional force it contributes to
//! each of them ([`ForceProvider::force`]). Providers never mutate particles;
//! the integrator is the only writer.
//!
//! # Provider kinds
//!
//! - [`ForceKind::Specific`]: bound to explicitly named particles (springs,
//!   lines, anchors for one particle). Cheap, evaluated on every fast tick.
//! - [`ForceKind::AllMatching`]: applies to the whole population (shared
//!   anchors, anti-collision fields). Expensive, evaluated on slow ticks and
//!   cached by the [`optimization`](crate::optimization) manager.
//!
//! # Degenerate geometry
//!
//! Every provider normalizes a direction vector. When that vector is shorter
//! than [`DEGENERATE_DISTANCE`] it is replaced by a small random vector so the
//! result is always finite. This keeps the integrator total at the cost of a
//! little noise when particles coincide.

mod anti_collision;
mod distance;
mod line;
mod minimal_distance;
mod point;

pub use anti_collision::AntiCollisionForceProvider;
pub use distance::DistanceForceProvider;
pub use line::LineForceProvider;
pub use minimal_distance::{MinimalDistanceForceProvider, MinimalPointDistanceForceProvider};
pub use point::PointForceProvider;

use crate::math::Vector;
use crate::particle::Particle;
use std::fmt;
use std::sync::Arc;

/// Separations at or below this value are treated as coincident
pub const DEGENERATE_DISTANCE: f64 = 0.001;

/// Scope tag distinguishing bound providers from global ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForceKind {
    /// Applies only to explicitly bound particles
    Specific,
    /// Applies to the whole particle population
    AllMatching,
}

impl ForceKind {
    /// Both kinds in table order
    pub const ALL: [ForceKind; 2] = [ForceKind::Specific, ForceKind::AllMatching];

    const INVERSE: [ForceKind; 2] = [ForceKind::AllMatching, ForceKind::Specific];

    /// Position of this kind in per-kind tables
    pub const fn index(self) -> usize {
        match self {
            ForceKind::Specific => 0,
            ForceKind::AllMatching => 1,
        }
    }

    /// The other kind
    pub const fn inverse(self) -> ForceKind {
        Self::INVERSE[self.index()]
    }
}

impl fmt::Display for ForceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForceKind::Specific => write!(f, "specific"),
            ForceKind::AllMatching => write!(f, "all-matching"),
        }
    }
}

/// Trait for anything that contributes force to particles
///
/// Implementations must be cheap to call concurrently: the runner evaluates
/// the same provider from several worker threads at once.
pub trait ForceProvider: Send + Sync {
    /// Whether this provider applies to `particle`
    fn matches(&self, particle: &Particle) -> bool;

    /// Instantaneous force on `particle`
    ///
    /// Only meaningful when [`ForceProvider::matches`] returned true. Must not
    /// mutate any particle.
    fn force(&self, particle: &Particle) -> Vector;

    /// Scope of this provider
    fn kind(&self) -> ForceKind;

    /// Get a descriptive name for this force provider
    fn name(&self) -> &str;
}

/// Shared handle to a force provider
///
/// Simulations hold providers by `Arc` and treat two handles as the same
/// provider only if they point at the same allocation.
pub type SharedForceProvider = Arc<dyn ForceProvider>;

/// Identity comparison for shared providers
pub fn same_provider(a: &SharedForceProvider, b: &SharedForceProvider) -> bool {
    Arc::ptr_eq(a, b)
}

/// A provider parameter that is either fixed or re-evaluated on every call
///
/// Dynamic parameters let callers animate strengths and distances while a
/// runner is active without replacing the provider.
#[derive(Clone)]
pub enum Param {
    /// Constant value
    Fixed(f64),
    /// Closure evaluated on each use
    Dynamic(Arc<dyn Fn() -> f64 + Send + Sync>),
}

impl Param {
    /// Wrap a closure as a dynamic parameter
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Param::Dynamic(Arc::new(f))
    }

    /// Current value
    pub fn get(&self) -> f64 {
        match self {
            Param::Fixed(v) => *v,
            Param::Dynamic(f) => f(),
        }
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Param::Fixed(value)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Fixed(v) => write!(f, "{}", v),
            Param::Dynamic(_) => write!(f, "<dynamic>"),
        }
    }
}

/// Replace a degenerate direction with a random one of the same dimension
pub(crate) fn non_degenerate(delta: Vector) -> Vector {
    if delta.absolute() <= DEGENERATE_DISTANCE {
        Vector::random_signed(delta.dimension())
    } else {
        delta
    }
}

/// Unit direction of `delta`, randomized when `delta` is degenerate
pub(crate) fn direction_of(delta: &Vector) -> Vector {
    non_degenerate(*delta).norm_vector()
}
