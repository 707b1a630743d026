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
//! Adaptive sub-stepping integrator
//!
//! # Algorithm
//!
//! For a chunk of length `chunk`:
//!
//! ```text
//! passed = 0, depth = 0
//! while passed < chunk * tolerance and depth < max_depth:
//!     f  = force(particle)
//!     ts = chunk - passed
//!     while |f * ts * ts| > max(floor, chunk): ts /= 2
//!     particle += f * ts * ts
//!     passed += ts, depth += 1
//! ```
//!
//! The displacement bound holds for any finite force. A non-finite force
//! aborts the chunk without moving the particle.

use super::{ChunkReport, Integrator, IntegratorConfig};
use crate::math::Vector;
use crate::particle::Particle;

/// Integrator with a bounded per-sub-step displacement
///
/// # Example
///
/// ```
/// use force_layout::integration::{AdaptiveIntegrator, Integrator};
/// use force_layout::math::Vector;
/// use force_layout::particle::Particle;
///
/// let integrator = AdaptiveIntegrator::default();
/// let p = Particle::at(Vector::new2(0.0, 0.0));
/// let report = integrator.advance(&p, 1.0, &|_| Vector::new2(1.0e6, 0.0));
/// assert!(report.max_displacement <= 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AdaptiveIntegrator {
    config: IntegratorConfig,
}

impl AdaptiveIntegrator {
    /// Create an integrator with custom schedule constants
    ///
    /// # Panics
    ///
    /// Panics if the configuration does not validate
    pub fn new(config: IntegratorConfig) -> Self {
        if let Err(err) = config.validate() {
            panic!("Invalid integrator configuration: {}", err);
        }
        AdaptiveIntegrator { config }
    }

    /// Schedule constants in use
    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Displacement produced by `force` acting for `time_scale`
    pub fn displacement(force: &Vector, time_scale: f64) -> Vector {
        force.multiply(time_scale).multiply(time_scale)
    }

    /// Integrate a single chunk
    pub fn integrate_chunk<F>(&self, particle: &Particle, chunk: f64, force: F) -> ChunkReport
    where
        F: Fn(&Particle) -> Vector,
    {
        let limit = self.config.displacement_limit(chunk);
        let mut report = ChunkReport::default();

        while report.passed_time < chunk * self.config.completion_tolerance && report.depth < self.config.max_depth {
            let f = force(particle);
            if !f.is_valid() {
                log::warn!("Non-finite force {} on {}, skipping remaining {} of chunk", f, particle.id(), chunk - report.passed_time);
                break;
            }

            let mut time_scale = chunk - report.passed_time;
            let mut displacement = Self::displacement(&f, time_scale);
            while displacement.absolute() > limit {
                time_scale /= 2.0;
                displacement = Self::displacement(&f, time_scale);
            }

            particle.move_by(&displacement);
            report.passed_time += time_scale;
            report.depth += 1;
            report.max_displacement = report.max_displacement.max(displacement.absolute());
        }

        if report.passed_time < chunk * self.config.completion_tolerance {
            log::trace!(
                "{}: dropped {} of {} after {} sub-steps",
                particle.id(),
                chunk - report.passed_time,
                chunk,
                report.depth
            );
        }
        report
    }
}

impl Integrator for AdaptiveIntegrator {
    fn name(&self) -> &str {
        "Adaptive Sub-stepping"
    }

    fn advance(&self, particle: &Particle, delta_t: f64, force: &dyn Fn(&Particle) -> Vector) -> ChunkReport {
        let mut total = ChunkReport::default();
        for chunk in self.config.schedule(delta_t) {
            total.merge(&self.integrate_chunk(particle, chunk, force));
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_force_completes_in_one_step() {
        let integrator = AdaptiveIntegrator::default();
        let p = Particle::at(Vector::new2(0.0, 0.0));
        let report = integrator.integrate_chunk(&p, 0.5, |_| Vector::new2(1.0, 0.0));
        assert_eq!(report.depth, 1);
        assert_eq!(report.passed_time, 0.5);
        assert!((p.location().x() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_large_force_is_bounded_and_truncated() {
        let integrator = AdaptiveIntegrator::default();
        let p = Particle::at(Vector::new2(0.0, 0.0));
        let report = integrator.integrate_chunk(&p, 0.5, |_| Vector::new2(1.0e12, 0.0));
        assert_eq!(report.depth, 4);
        assert!(report.passed_time < 0.5);
        assert!(report.max_displacement <= 1.0);
        assert!(p.location().x() <= 4.0);
    }

    #[test]
    fn test_non_finite_force_aborts_chunk() {
        let integrator = AdaptiveIntegrator::default();
        let p = Particle::at(Vector::new2(1.0, 1.0));
        let report = integrator.integrate_chunk(&p, 1.0, |_| Vector::new2(f64::NAN, 0.0));
        assert_eq!(report.depth, 0);
        assert_eq!(p.location(), Vector::new2(1.0, 1.0));

        let report = integrator.integrate_chunk(&p, 1.0, |_| Vector::new2(f64::INFINITY, 0.0));
        assert_eq!(report.depth, 0);
    }

    #[test]
    fn test_zero_chunk_is_noop() {
        let integrator = AdaptiveIntegrator::default();
        let p = Particle::at(Vector::new2(0.0, 0.0));
        let report = integrator.integrate_chunk(&p, 0.0, |_| Vector::new2(5.0, 5.0));
        assert_eq!(report, ChunkReport::default());
    }

    #[test]
    fn test_advance_runs_full_schedule() {
        let integrator = AdaptiveIntegrator::default();
        let p = Particle::at(Vector::new2(0.0, 0.0));
        let report = integrator.advance(&p, 1.0, &|_| Vector::new2(0.0, 0.0));
        assert_eq!(report.depth, 11);
        assert!((report.passed_time - 1.0).abs() < 1e-12);
        assert_eq!(p.location(), Vector::new2(0.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "Invalid integrator configuration")]
    fn test_rejects_invalid_config() {
        AdaptiveIntegrator::new(IntegratorConfig::default().with_max_depth(0));
    }
}
