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
//! Spring holding two particles at a target separation

use crate::forces::{direction_of, ForceKind, ForceProvider, Param};
use crate::math::Vector;
use crate::particle::Particle;
use std::sync::Arc;

/// Default spring stiffness
pub const DEFAULT_DISTANCE_STRENGTH: f64 = 1000.0;

/// Linear spring between two particles
///
/// The force on either endpoint points toward the other one when the pair is
/// stretched beyond `distance` and away from it when compressed, with a
/// magnitude of `|actual - distance| * strength`. The two endpoints receive
/// equal and opposite forces.
#[derive(Debug, Clone)]
pub struct DistanceForceProvider {
    first: Arc<Particle>,
    second: Arc<Particle>,
    distance: Param,
    strength: Param,
}

impl DistanceForceProvider {
    /// Connect `first` and `second` at the given rest length
    pub fn new(first: Arc<Particle>, second: Arc<Particle>, distance: impl Into<Param>) -> Self {
        DistanceForceProvider {
            first,
            second,
            distance: distance.into(),
            strength: Param::Fixed(DEFAULT_DISTANCE_STRENGTH),
        }
    }

    /// Set the stiffness
    pub fn with_strength(mut self, strength: impl Into<Param>) -> Self {
        self.strength = strength.into();
        self
    }

    /// Both endpoints
    pub fn particles(&self) -> (&Arc<Particle>, &Arc<Particle>) {
        (&self.first, &self.second)
    }

    /// Current rest length
    pub fn distance(&self) -> f64 {
        self.distance.get()
    }
}

impl ForceProvider for DistanceForceProvider {
    fn matches(&self, particle: &Particle) -> bool {
        *particle == *self.first || *particle == *self.second
    }

    fn force(&self, particle: &Particle) -> Vector {
        // Points from `particle` toward its partner
        let delta = if *particle == *self.first {
            self.second.location().subtract(&self.first.location())
        } else {
            self.first.location().subtract(&self.second.location())
        };
        let stretch = delta.absolute() - self.distance.get();
        direction_of(&delta).multiply(stretch * self.strength.get())
    }

    fn kind(&self) -> ForceKind {
        ForceKind::Specific
    }

    fn name(&self) -> &str {
        "distance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: Vector, b: Vector) -> (Arc<Particle>, Arc<Particle>) {
        (Arc::new(Particle::at(a)), Arc::new(Particle::at(b)))
    }

    #[test]
    fn test_stretched_spring_attracts() {
        let (a, b) = pair(Vector::new2(0.0, 0.0), Vector::new2(10.0, 0.0));
        let spring = DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 4.0).with_strength(1.0);
        assert!((spring.force(&a).x() - 6.0).abs() < 1e-12);
        assert!((spring.force(&b).x() + 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_compressed_spring_repels() {
        let (a, b) = pair(Vector::new2(0.0, 0.0), Vector::new2(0.0, 1.0));
        let spring = DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 3.0).with_strength(2.0);
        assert!((spring.force(&a).y() + 4.0).abs() < 1e-12);
        assert!((spring.force(&b).y() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_equal_and_opposite() {
        let (a, b) = pair(Vector::new3(1.0, 2.0, 3.0), Vector::new3(-4.0, 0.5, 7.0));
        let spring = DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 2.0);
        let sum = spring.force(&a).add(&spring.force(&b));
        assert!(sum.absolute() < 1e-6);
    }

    #[test]
    fn test_matches_only_endpoints() {
        let (a, b) = pair(Vector::new2(0.0, 0.0), Vector::new2(1.0, 0.0));
        let other = Particle::at(Vector::new2(0.0, 0.0));
        let spring = DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 1.0);
        assert!(spring.matches(&a));
        assert!(spring.matches(&b));
        assert!(!spring.matches(&other));
        assert_eq!(spring.kind(), ForceKind::Specific);
    }

    #[test]
    fn test_coincident_endpoints_push_apart() {
        let (a, b) = pair(Vector::new2(1.0, 1.0), Vector::new2(1.0, 1.0));
        let spring = DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 5.0).with_strength(1.0);
        let f = spring.force(&a);
        assert!(f.is_valid());
        assert!((f.absolute() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_dynamic_distance() {
        use std::sync::atomic::{AtomicU64, Ordering};

        let target = Arc::new(AtomicU64::new(2.0f64.to_bits()));
        let handle = Arc::clone(&target);
        let (a, b) = pair(Vector::new2(0.0, 0.0), Vector::new2(4.0, 0.0));
        let spring = DistanceForceProvider::new(
            Arc::clone(&a),
            Arc::clone(&b),
            Param::dynamic(move || f64::from_bits(handle.load(Ordering::SeqCst))),
        )
        .with_strength(1.0);
        assert!((spring.force(&a).x() - 2.0).abs() < 1e-12);

        target.store(4.0f64.to_bits(), Ordering::SeqCst);
        assert!(spring.force(&a).absolute() < 1e-12);
    }
}
