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
//! Anchor force pulling particles toward a fixed point
//!
//! The pull grows with the *square* of the distance to the anchor: strong
//! when far away, gentle near the anchor. This makes the provider behave like
//! a stiff restoring spring rather than a field source, and layouts relying
//! on it converge quickly from far-off starting positions.

use crate::forces::{direction_of, ForceKind, ForceProvider, Param};
use crate::math::Vector;
use crate::particle::Particle;
use std::sync::Arc;

/// Default strength of the anchor pull
pub const DEFAULT_POINT_STRENGTH: f64 = 0.9;

/// Default mass multiplier
pub const DEFAULT_POINT_MASS: f64 = 1.0;

/// Pulls one particle, or every particle, toward an anchor location
///
/// # Examples
///
/// ```
/// use force_layout::forces::{ForceKind, ForceProvider, PointForceProvider};
/// use force_layout::math::Vector;
/// use force_layout::particle::Particle;
///
/// let anchor = PointForceProvider::all(Vector::new2(0.0, 0.0));
/// assert_eq!(anchor.kind(), ForceKind::AllMatching);
///
/// let p = Particle::at(Vector::new2(2.0, 0.0));
/// let f = anchor.force(&p);
/// assert!((f.x() + 4.0 * 0.9).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct PointForceProvider {
    particle: Option<Arc<Particle>>,
    location: Vector,
    strength: Param,
    mass: Param,
}

impl PointForceProvider {
    /// Anchor a single particle to `location`
    pub fn new(particle: Arc<Particle>, location: Vector) -> Self {
        PointForceProvider {
            particle: Some(particle),
            location,
            strength: Param::Fixed(DEFAULT_POINT_STRENGTH),
            mass: Param::Fixed(DEFAULT_POINT_MASS),
        }
    }

    /// Anchor every particle to `location`
    pub fn all(location: Vector) -> Self {
        PointForceProvider {
            particle: None,
            location,
            strength: Param::Fixed(DEFAULT_POINT_STRENGTH),
            mass: Param::Fixed(DEFAULT_POINT_MASS),
        }
    }

    /// Anchor every particle to the origin
    pub fn center(dimensions: usize) -> Self {
        Self::all(Vector::zero(dimensions))
    }

    /// Anchor a single particle to the origin
    pub fn center_for(particle: Arc<Particle>, dimensions: usize) -> Self {
        Self::new(particle, Vector::zero(dimensions))
    }

    /// Set the strength
    pub fn with_strength(mut self, strength: impl Into<Param>) -> Self {
        self.strength = strength.into();
        self
    }

    /// Set the mass multiplier
    pub fn with_mass(mut self, mass: impl Into<Param>) -> Self {
        self.mass = mass.into();
        self
    }

    /// The bound particle, if any
    pub fn particle(&self) -> Option<&Arc<Particle>> {
        self.particle.as_ref()
    }

    /// Anchor location
    pub fn location(&self) -> Vector {
        self.location
    }

    /// Move the anchor
    pub fn set_location(&mut self, location: Vector) {
        self.location = location;
    }
}

impl ForceProvider for PointForceProvider {
    fn matches(&self, particle: &Particle) -> bool {
        self.particle.as_deref().map_or(true, |p| p == particle)
    }

    fn force(&self, particle: &Particle) -> Vector {
        let delta = self.location.subtract(&particle.location());
        let distance = delta.absolute();
        direction_of(&delta)
            .multiply(distance * distance)
            .multiply(self.strength.get() * self.mass.get())
    }

    fn kind(&self) -> ForceKind {
        if self.particle.is_some() {
            ForceKind::Specific
        } else {
            ForceKind::AllMatching
        }
    }

    fn name(&self) -> &str {
        "point"
    }
}
