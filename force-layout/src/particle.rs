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
//! Particles and their stable identifiers
//!
//! A particle is a point with an atomically replaceable position. Identity is
//! the [`ParticleId`] handed out at construction: two particles are equal only
//! if they are the same particle, regardless of where they sit. Ids are never
//! reused within a process, so per-particle bookkeeping can key on them.

use crate::error::{PhysicsError, Result};
use crate::math::{Vector, MAX_DIMENSION};
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PARTICLE_ID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(u64);

impl ParticleId {
    fn next() -> Self {
        ParticleId(NEXT_PARTICLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Particle({})", self.0)
    }
}

/// A point particle with a thread-safe position
///
/// # Examples
///
/// ```
/// use force_layout::particle::Particle;
/// use force_layout::math::Vector;
///
/// let p = Particle::at(Vector::new2(1.0, 1.0));
/// p.move_by(&Vector::new2(0.5, -1.0));
/// assert_eq!(p.location(), Vector::new2(1.5, 0.0));
/// ```
pub struct Particle {
    id: ParticleId,
    location: RwLock<Vector>,
}

impl Particle {
    /// Create a particle at a random position in the unit cube
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnsupportedDimension`] unless `dimensions` is 1 to 3
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 || dimensions > MAX_DIMENSION {
            return Err(PhysicsError::UnsupportedDimension(dimensions));
        }
        Ok(Self::at(Vector::random(dimensions)))
    }

    /// Create a particle at an explicit position
    pub fn at(location: Vector) -> Self {
        Particle {
            id: ParticleId::next(),
            location: RwLock::new(location),
        }
    }

    /// Create a particle at the running pairwise average of a group
    ///
    /// Each further particle is averaged with the result so far, so later
    /// members weigh more than earlier ones. An empty group yields the origin
    /// in three dimensions.
    pub fn average<'a, I>(particles: I) -> Self
    where
        I: IntoIterator<Item = &'a Particle>,
    {
        let location = particles
            .into_iter()
            .map(Particle::location)
            .reduce(|acc, l| acc.add(&l).divide(2.0))
            .unwrap_or_else(|| Vector::zero(3));
        Self::at(location)
    }

    /// Stable identifier of this particle
    pub fn id(&self) -> ParticleId {
        self.id
    }

    /// Number of coordinates of the current position
    pub fn dimension(&self) -> usize {
        self.location.read().dimension()
    }

    /// Snapshot of the current position
    pub fn location(&self) -> Vector {
        *self.location.read()
    }

    /// Replace the position
    pub fn set_location(&self, location: Vector) -> &Self {
        *self.location.write() = location;
        self
    }

    /// Displace the position by `distance` in a single atomic step
    pub fn move_by(&self, distance: &Vector) -> &Self {
        let mut location = self.location.write();
        *location = location.add(distance);
        self
    }
}

impl PartialEq for Particle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Particle {}

impl Hash for Particle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("id", &self.id.0)
            .field("location", &self.location())
            .finish()
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.id, self.location())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_particle_ids_are_unique() {
        let a = Particle::at(Vector::new2(0.0, 0.0));
        let b = Particle::at(Vector::new2(0.0, 0.0));
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_random_particle_in_unit_cube() {
        let p = Particle::new(3).unwrap();
        assert_eq!(p.dimension(), 3);
        assert!(p.location().as_slice().iter().all(|c| (0.0..1.0).contains(c)));
    }

    #[test]
    fn test_unsupported_dimension() {
        assert!(matches!(Particle::new(0), Err(PhysicsError::UnsupportedDimension(0))));
        assert!(matches!(Particle::new(4), Err(PhysicsError::UnsupportedDimension(4))));
    }

    #[test]
    fn test_set_and_move() {
        let p = Particle::at(Vector::new3(1.0, 2.0, 3.0));
        p.set_location(Vector::new3(0.0, 0.0, 0.0))
            .move_by(&Vector::new3(1.0, 1.0, 1.0));
        assert_eq!(p.location(), Vector::new3(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_average_particle() {
        let a = Particle::at(Vector::new2(0.0, 0.0));
        let b = Particle::at(Vector::new2(4.0, 0.0));
        let avg = Particle::average([&a, &b]);
        assert_eq!(avg.location(), Vector::new2(2.0, 0.0));

        let empty = Particle::average(std::iter::empty());
        assert_eq!(empty.location(), Vector::zero(3));
    }

    #[test]
    fn test_concurrent_moves_are_atomic() {
        use std::sync::Arc;
        use std::thread;

        let p = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        p.move_by(&Vector::new2(1.0, 0.0));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(p.location().x(), 4000.0);
    }
}
