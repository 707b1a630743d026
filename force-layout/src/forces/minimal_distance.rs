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
//! One-sided repulsion enforcing a minimum separation
//!
//! [`MinimalDistanceForceProvider`] acts between two particles,
//! [`MinimalPointDistanceForceProvider`] between one particle and a fixed
//! location. Both are silent once the minimum is satisfied.

use crate::forces::{direction_of, ForceKind, ForceProvider, Param};
use crate::math::Vector;
use crate::particle::Particle;
use std::sync::Arc;

/// Default repulsion strength
pub const DEFAULT_MINIMAL_DISTANCE_STRENGTH: f64 = 100.0;

/// Pushes two particles apart while they are closer than a minimum
#[derive(Debug, Clone)]
pub struct MinimalDistanceForceProvider {
    first: Arc<Particle>,
    second: Arc<Particle>,
    distance: Param,
    strength: Param,
}

impl MinimalDistanceForceProvider {
    /// Keep `first` and `second` at least `distance` apart
    pub fn new(first: Arc<Particle>, second: Arc<Particle>, distance: impl Into<Param>) -> Self {
        MinimalDistanceForceProvider {
            first,
            second,
            distance: distance.into(),
            strength: Param::Fixed(DEFAULT_MINIMAL_DISTANCE_STRENGTH),
        }
    }

    /// Set the repulsion strength
    pub fn with_strength(mut self, strength: impl Into<Param>) -> Self {
        self.strength = strength.into();
        self
    }

    /// Current minimum separation
    pub fn distance(&self) -> f64 {
        self.distance.get()
    }
}

impl ForceProvider for MinimalDistanceForceProvider {
    fn matches(&self, particle: &Particle) -> bool {
        *particle == *self.first || *particle == *self.second
    }

    fn force(&self, particle: &Particle) -> Vector {
        // Points from the partner toward `particle`
        let delta = if *particle == *self.first {
            self.first.location().subtract(&self.second.location())
        } else {
            self.second.location().subtract(&self.first.location())
        };
        let shortfall = self.distance.get() - delta.absolute();
        if shortfall <= 0.0 {
            return Vector::zero(delta.dimension());
        }
        direction_of(&delta).multiply(shortfall * self.strength.get())
    }

    fn kind(&self) -> ForceKind {
        ForceKind::Specific
    }

    fn name(&self) -> &str {
        "minimal-distance"
    }
}

/// Keeps one particle at least a minimum distance away from a fixed point
///
/// Behaves exactly like [`MinimalDistanceForceProvider`] against an
/// immovable particle placed at the given location. The synthetic particle
/// is never part of a simulation, so nothing ever moves it.
#[derive(Debug, Clone)]
pub struct MinimalPointDistanceForceProvider {
    anchor: Arc<Particle>,
    inner: MinimalDistanceForceProvider,
}

impl MinimalPointDistanceForceProvider {
    /// Keep `particle` at least `distance` away from `location`
    pub fn new(particle: Arc<Particle>, location: Vector, distance: impl Into<Param>) -> Self {
        let anchor = Arc::new(Particle::at(location));
        let inner = MinimalDistanceForceProvider::new(particle, Arc::clone(&anchor), distance);
        MinimalPointDistanceForceProvider { anchor, inner }
    }

    /// Set the repulsion strength
    pub fn with_strength(mut self, strength: impl Into<Param>) -> Self {
        self.inner = self.inner.with_strength(strength);
        self
    }

    /// The fixed location particles are kept away from
    pub fn location(&self) -> Vector {
        self.anchor.location()
    }
}

impl ForceProvider for MinimalPointDistanceForceProvider {
    fn matches(&self, particle: &Particle) -> bool {
        *particle == *self.inner.first
    }

    fn force(&self, particle: &Particle) -> Vector {
        self.inner.force(particle)
    }

    fn kind(&self) -> ForceKind {
        ForceKind::Specific
    }

    fn name(&self) -> &str {
        "minimal-point-distance"
    }
}
