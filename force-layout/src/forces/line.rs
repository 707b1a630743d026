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
//! Alignment force keeping a group of particles on a common line

use crate::forces::{direction_of, ForceKind, ForceProvider, Param};
use crate::math::Vector;
use crate::particle::Particle;
use std::sync::Arc;

/// Default perpendicular offset from the line
pub const DEFAULT_LINE_DISTANCE: f64 = 0.0;

/// Default alignment strength
pub const DEFAULT_LINE_STRENGTH: f64 = 0.1;

/// Pulls each member of a group toward the line spanned by the others
///
/// For a member `p`, the line runs through the centroid of the other members
/// with the direction between the two members farthest from `p`. The force
/// points along the perpendicular from `p` to that line with magnitude
/// `(perpendicular - distance) * strength`. Groups with fewer than three
/// members exert no force.
///
/// # Examples
///
/// ```
/// use force_layout::forces::{ForceProvider, LineForceProvider};
/// use force_layout::math::Vector;
/// use force_layout::particle::Particle;
/// use std::sync::Arc;
///
/// let left = Arc::new(Particle::at(Vector::new3(-100.0, 0.0, 0.0)));
/// let right = Arc::new(Particle::at(Vector::new3(100.0, 0.0, 0.0)));
/// let top = Arc::new(Particle::at(Vector::new3(0.0, 100.0, 0.0)));
/// let line = LineForceProvider::new([left, right, Arc::clone(&top)]);
///
/// let f = line.force(&top);
/// assert!((f.y() + 10.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct LineForceProvider {
    members: Vec<Arc<Particle>>,
    distance: Param,
    strength: Param,
}

impl LineForceProvider {
    /// Align the given group
    pub fn new<I>(members: I) -> Self
    where
        I: IntoIterator<Item = Arc<Particle>>,
    {
        LineForceProvider {
            members: members.into_iter().collect(),
            distance: Param::Fixed(DEFAULT_LINE_DISTANCE),
            strength: Param::Fixed(DEFAULT_LINE_STRENGTH),
        }
    }

    /// Set the target perpendicular offset
    pub fn with_distance(mut self, distance: impl Into<Param>) -> Self {
        self.distance = distance.into();
        self
    }

    /// Set the alignment strength
    pub fn with_strength(mut self, strength: impl Into<Param>) -> Self {
        self.strength = strength.into();
        self
    }

    /// Group members
    pub fn members(&self) -> &[Arc<Particle>] {
        &self.members
    }
}

impl ForceProvider for LineForceProvider {
    fn matches(&self, particle: &Particle) -> bool {
        self.members.iter().any(|m| **m == *particle)
    }

    fn force(&self, particle: &Particle) -> Vector {
        let location = particle.location();
        let mut others: Vec<Vector> = self
            .members
            .iter()
            .filter(|m| ***m != *particle)
            .map(|m| m.location())
            .collect();
        if others.len() < 2 {
            return Vector::zero(location.dimension());
        }

        let mut center = Vector::zero(location.dimension());
        for other in &others {
            center += *other;
        }
        let center = center.divide(others.len() as f64);

        others.sort_by(|a, b| location.distance_to(b).total_cmp(&location.distance_to(a)));
        let direction = others[1].subtract(&others[0]);

        let delta = location.closest_direction_to_line(&center, &direction);
        let offset = delta.absolute() - self.distance.get();
        direction_of(&delta).multiply(offset * self.strength.get())
    }

    fn kind(&self) -> ForceKind {
        ForceKind::Specific
    }

    fn name(&self) -> &str {
        "line"
    }
}
