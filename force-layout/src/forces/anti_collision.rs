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
//! Short-range repulsion field around one particle

use crate::forces::{direction_of, ForceKind, ForceProvider, Param};
use crate::math::Vector;
use crate::particle::{Particle, ParticleId};
use std::collections::HashSet;
use std::sync::Arc;

/// Default field strength
pub const DEFAULT_ANTI_COLLISION_STRENGTH: f64 = 1e9;

/// Pushes every other particle out of a radius around its owner
///
/// Inside `collision_distance` the repulsion grows with the square of the
/// penetration depth; outside it the force is exactly zero. The owner itself
/// and any explicitly excluded particles are never affected.
///
/// This is a whole-population provider and is therefore evaluated on slow
/// ticks and cached between them.
#[derive(Debug, Clone)]
pub struct AntiCollisionForceProvider {
    owner: Arc<Particle>,
    collision_distance: Param,
    strength: Param,
    exclusions: HashSet<ParticleId>,
}

impl AntiCollisionForceProvider {
    /// Repulsion field of radius `collision_distance` around `owner`
    pub fn new(owner: Arc<Particle>, collision_distance: impl Into<Param>) -> Self {
        AntiCollisionForceProvider {
            owner,
            collision_distance: collision_distance.into(),
            strength: Param::Fixed(DEFAULT_ANTI_COLLISION_STRENGTH),
            exclusions: HashSet::new(),
        }
    }

    /// Set the field strength
    pub fn with_strength(mut self, strength: impl Into<Param>) -> Self {
        self.strength = strength.into();
        self
    }

    /// Exempt particles from the field
    pub fn with_exclusions<'a, I>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = &'a Particle>,
    {
        self.exclusions.extend(excluded.into_iter().map(Particle::id));
        self
    }

    /// The particle at the center of the field
    pub fn owner(&self) -> &Arc<Particle> {
        &self.owner
    }

    /// Current field radius
    pub fn collision_distance(&self) -> f64 {
        self.collision_distance.get()
    }
}

impl ForceProvider for AntiCollisionForceProvider {
    fn matches(&self, particle: &Particle) -> bool {
        *particle != *self.owner && !self.exclusions.contains(&particle.id())
    }

    fn force(&self, particle: &Particle) -> Vector {
        let delta = particle.location().subtract(&self.owner.location());
        let depth = self.collision_distance.get() - delta.absolute();
        if depth < 0.0 {
            return Vector::zero(delta.dimension());
        }
        direction_of(&delta).multiply(depth * depth * self.strength.get())
    }

    fn kind(&self) -> ForceKind {
        ForceKind::AllMatching
    }

    fn name(&self) -> &str {
        "anti-collision"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_outside_radius() {
        let owner = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
        let field = AntiCollisionForceProvider::new(Arc::clone(&owner), 2.0);
        let far = Particle::at(Vector::new2(2.5, 0.0));
        assert_eq!(field.force(&far), Vector::zero(2));
    }

    #[test]
    fn test_quadratic_inside_radius() {
        let owner = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
        let field = AntiCollisionForceProvider::new(Arc::clone(&owner), 2.0).with_strength(1.0);
        let close = Particle::at(Vector::new2(0.0, 0.5));
        let f = field.force(&close);
        assert!(f.x().abs() < 1e-12);
        assert!((f.y() - 2.25).abs() < 1e-12);
    }

    #[test]
    fn test_repulsive_as_distance_vanishes() {
        let owner = Arc::new(Particle::at(Vector::new3(1.0, 1.0, 1.0)));
        let field = AntiCollisionForceProvider::new(Arc::clone(&owner), 1.0).with_strength(1.0);
        let on_top = Particle::at(Vector::new3(1.0, 1.0, 1.0));
        let f = field.force(&on_top);
        assert!(f.is_valid());
        assert!(f.absolute() > 0.0);
    }

    #[test]
    fn test_owner_and_exclusions_do_not_match() {
        let owner = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
        let excluded = Particle::at(Vector::new2(0.1, 0.0));
        let other = Particle::at(Vector::new2(0.1, 0.0));
        let field = AntiCollisionForceProvider::new(Arc::clone(&owner), 1.0).with_exclusions([&excluded]);
        assert!(!field.matches(&owner));
        assert!(!field.matches(&excluded));
        assert!(field.matches(&other));
        assert_eq!(field.kind(), ForceKind::AllMatching);
    }
}
