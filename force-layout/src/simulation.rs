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
//! The particle population and its force providers
//!
//! A [`Simulation`] is shared behind an `Arc`: ticks, runners and callers all
//! hold the same instance, and every method takes `&self`. The particle and
//! provider collections carry their own locks so adding and removing from
//! another thread is memory safe. Doing so while a runner is active still
//! races logically with the tick in progress.

use crate::config::RunnerConfig;
use crate::forces::{same_provider, ForceKind, SharedForceProvider};
use crate::integration::{AdaptiveIntegrator, ChunkReport, Integrator};
use crate::math::Vector;
use crate::optimization::ForceOptimizationManager;
use crate::particle::Particle;
use crate::runner::Runner;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Summary of one [`Simulation::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// Particles advanced
    pub particles: usize,
    /// Sub-steps spent over all particles
    pub sub_steps: usize,
    /// Largest single displacement applied
    pub max_displacement: f64,
}

impl TickReport {
    fn single(report: &ChunkReport) -> Self {
        TickReport {
            particles: 1,
            sub_steps: report.depth,
            max_displacement: report.max_displacement,
        }
    }

    fn combine(self, other: TickReport) -> Self {
        TickReport {
            particles: self.particles + other.particles,
            sub_steps: self.sub_steps + other.sub_steps,
            max_displacement: self.max_displacement.max(other.max_displacement),
        }
    }
}

/// A set of particles moved by a set of force providers
///
/// # Example
///
/// ```
/// use force_layout::forces::{DistanceForceProvider, SharedForceProvider};
/// use force_layout::math::Vector;
/// use force_layout::particle::Particle;
/// use force_layout::simulation::Simulation;
/// use std::sync::Arc;
///
/// let a = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
/// let b = Arc::new(Particle::at(Vector::new2(10.0, 0.0)));
/// let spring: SharedForceProvider =
///     Arc::new(DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 5.0).with_strength(1.0));
///
/// let simulation = Simulation::new();
/// simulation.add_particles([Arc::clone(&a), Arc::clone(&b)]).add_force_provider(spring);
/// for _ in 0..200 {
///     simulation.tick_default();
/// }
/// assert!((a.location().distance_to(&b.location()) - 5.0).abs() < 0.01);
/// ```
pub struct Simulation {
    particles: RwLock<Vec<Arc<Particle>>>,
    providers: RwLock<Vec<SharedForceProvider>>,
    optimizer: Arc<ForceOptimizationManager>,
    integrator: Arc<dyn Integrator>,
    call_counting: AtomicBool,
    cpu_use_factor: RwLock<f64>,
}

impl Simulation {
    /// Create an empty simulation with the adaptive integrator
    pub fn new() -> Self {
        Self::with_integrator(Arc::new(AdaptiveIntegrator::default()))
    }

    /// Create an empty simulation with a custom integrator
    pub fn with_integrator(integrator: Arc<dyn Integrator>) -> Self {
        Simulation {
            particles: RwLock::new(Vec::new()),
            providers: RwLock::new(Vec::new()),
            optimizer: Arc::new(ForceOptimizationManager::new()),
            integrator,
            call_counting: AtomicBool::new(false),
            cpu_use_factor: RwLock::new(RunnerConfig::default().cpu_use_factor),
        }
    }

    /// Add a particle; a particle already present is ignored
    pub fn add_particle(&self, particle: Arc<Particle>) -> &Self {
        let mut particles = self.particles.write();
        if !particles.iter().any(|p| p.id() == particle.id()) {
            particles.push(particle);
        }
        self
    }

    /// Add several particles
    pub fn add_particles<I>(&self, particles: I) -> &Self
    where
        I: IntoIterator<Item = Arc<Particle>>,
    {
        for particle in particles {
            self.add_particle(particle);
        }
        self
    }

    /// Remove the given particles
    pub fn remove_particles<'a, I>(&self, particles: I) -> &Self
    where
        I: IntoIterator<Item = &'a Particle>,
    {
        let ids: Vec<_> = particles.into_iter().map(Particle::id).collect();
        self.particles.write().retain(|p| !ids.contains(&p.id()));
        self
    }

    /// Add a provider; the same `Arc` is only added once
    pub fn add_force_provider(&self, provider: SharedForceProvider) -> &Self {
        let mut providers = self.providers.write();
        if !providers.iter().any(|p| same_provider(p, &provider)) {
            providers.push(provider);
        }
        self
    }

    /// Add several providers
    pub fn add_force_providers<I>(&self, providers: I) -> &Self
    where
        I: IntoIterator<Item = SharedForceProvider>,
    {
        for provider in providers {
            self.add_force_provider(provider);
        }
        self
    }

    /// Remove a provider by identity
    pub fn remove_force_provider(&self, provider: &SharedForceProvider) -> &Self {
        self.providers.write().retain(|p| !same_provider(p, provider));
        self
    }

    /// Remove several providers by identity
    pub fn remove_force_providers<'a, I>(&self, providers: I) -> &Self
    where
        I: IntoIterator<Item = &'a SharedForceProvider>,
    {
        for provider in providers {
            self.remove_force_provider(provider);
        }
        self
    }

    /// Snapshot of the particles
    pub fn particles(&self) -> Vec<Arc<Particle>> {
        self.particles.read().clone()
    }

    /// Number of particles
    pub fn particle_count(&self) -> usize {
        self.particles.read().len()
    }

    /// Snapshot of the providers
    pub fn force_providers(&self) -> Vec<SharedForceProvider> {
        self.providers.read().clone()
    }

    /// The optimization manager shared by all ticks
    pub fn optimizer(&self) -> &Arc<ForceOptimizationManager> {
        &self.optimizer
    }

    /// Count every provider evaluation made by ticks
    ///
    /// Off by default. While on, a provider kind evaluated more than ten times
    /// as often as the other is served from cache on later ticks.
    pub fn set_call_counting(&self, enabled: bool) -> &Self {
        self.call_counting.store(enabled, Ordering::Relaxed);
        self
    }

    /// Whether provider evaluations are counted
    pub fn call_counting(&self) -> bool {
        self.call_counting.load(Ordering::Relaxed)
    }

    /// Advance every particle by `delta_t`
    ///
    /// Only providers of kind `scope` take part, or all of them when `scope`
    /// is `None`. Kinds left out still contribute their last cached aggregate.
    pub fn tick(&self, delta_t: f64, scope: Option<ForceKind>) -> TickReport {
        let counting = self.call_counting();
        let providers: Vec<SharedForceProvider> = self
            .providers
            .read()
            .iter()
            .filter(|p| scope.map_or(true, |kind| p.kind() == kind))
            .map(|p| {
                if counting {
                    self.optimizer.wrap(Arc::clone(p))
                } else {
                    Arc::clone(p)
                }
            })
            .collect();
        let particles = self.particles();
        self.advance_all(&particles, &providers, delta_t)
    }

    /// Tick by 1.0 with every provider
    pub fn tick_default(&self) -> TickReport {
        self.tick(1.0, None)
    }

    fn advance(&self, particle: &Particle, providers: &[SharedForceProvider], delta_t: f64) -> TickReport {
        let matching = self.optimizer.matching_providers(providers, particle);
        let report = self
            .integrator
            .advance(particle, delta_t, &|p| self.optimizer.calculate_force(&matching, p));
        TickReport::single(&report)
    }

    #[cfg(feature = "parallel")]
    fn advance_all(&self, particles: &[Arc<Particle>], providers: &[SharedForceProvider], delta_t: f64) -> TickReport {
        particles
            .par_iter()
            .map(|p| self.advance(p, providers, delta_t))
            .reduce(TickReport::default, TickReport::combine)
    }

    #[cfg(not(feature = "parallel"))]
    fn advance_all(&self, particles: &[Arc<Particle>], providers: &[SharedForceProvider], delta_t: f64) -> TickReport {
        particles
            .iter()
            .map(|p| self.advance(p, providers, delta_t))
            .fold(TickReport::default(), TickReport::combine)
    }

    /// Sum of all matching providers at the particle's current position
    ///
    /// Bypasses the optimization cache and call counting.
    pub fn calculate_force_for(&self, particle: &Particle) -> Vector {
        let mut force = Vector::zero(particle.dimension());
        for provider in self.providers.read().iter().filter(|p| p.matches(particle)) {
            force += provider.force(particle);
        }
        force
    }

    /// Remove all particles, providers and call statistics
    pub fn reset(&self) {
        self.particles.write().clear();
        self.providers.write().clear();
        self.optimizer.clear();
    }

    /// Set the fraction of hardware threads future runners use
    pub fn set_cpu_use_factor(&self, factor: f64) -> &Self {
        *self.cpu_use_factor.write() = factor;
        self
    }

    /// Fraction of hardware threads future runners use
    pub fn cpu_use_factor(&self) -> f64 {
        *self.cpu_use_factor.read()
    }

    /// Create a runner driving this simulation with default timing
    pub fn runner(self: &Arc<Self>) -> Runner {
        self.runner_with_config(RunnerConfig::default())
    }

    /// Create a runner with explicit timing
    ///
    /// The simulation's cpu use factor overrides the one in `config`.
    pub fn runner_with_config(self: &Arc<Self>, config: RunnerConfig) -> Runner {
        Runner::new(Arc::clone(self), config.with_cpu_use_factor(self.cpu_use_factor()))
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::{AntiCollisionForceProvider, DistanceForceProvider, PointForceProvider};

    fn at(x: f64, y: f64) -> Arc<Particle> {
        Arc::new(Particle::at(Vector::new2(x, y)))
    }

    #[test]
    fn test_particle_membership_is_unique() {
        let sim = Simulation::new();
        let a = at(0.0, 0.0);
        sim.add_particle(Arc::clone(&a)).add_particle(Arc::clone(&a));
        assert_eq!(sim.particle_count(), 1);

        sim.remove_particles([&*a]);
        assert_eq!(sim.particle_count(), 0);
    }

    #[test]
    fn test_provider_identity() {
        let sim = Simulation::new();
        let p1: SharedForceProvider = Arc::new(PointForceProvider::center(2));
        let p2: SharedForceProvider = Arc::new(PointForceProvider::center(2));
        sim.add_force_providers([Arc::clone(&p1), Arc::clone(&p1), Arc::clone(&p2)]);
        assert_eq!(sim.force_providers().len(), 2);

        sim.remove_force_provider(&p1);
        let left = sim.force_providers();
        assert_eq!(left.len(), 1);
        assert!(same_provider(&left[0], &p2));

        sim.remove_force_providers([&p2]);
        assert!(sim.force_providers().is_empty());
    }

    #[test]
    fn test_tick_moves_toward_anchor() {
        let sim = Simulation::new();
        let p = at(4.0, 0.0);
        sim.add_particle(Arc::clone(&p))
            .add_force_provider(Arc::new(PointForceProvider::center(2).with_strength(0.1)));
        let report = sim.tick_default();
        assert_eq!(report.particles, 1);
        assert!(report.sub_steps >= 11);
        assert!(p.location().x() < 4.0);
        assert!(p.location().x() > 0.0);
    }

    #[test]
    fn test_scope_filters_providers() {
        let sim = Simulation::new();
        let p = at(4.0, 0.0);
        sim.add_particle(Arc::clone(&p))
            .add_force_provider(Arc::new(PointForceProvider::center(2)));
        sim.tick(1.0, Some(ForceKind::Specific));
        assert_eq!(p.location(), Vector::new2(4.0, 0.0));
    }

    #[test]
    fn test_calculate_force_for_sums_providers() {
        let sim = Simulation::new();
        let a = at(0.0, 0.0);
        let b = at(2.0, 0.0);
        sim.add_particles([Arc::clone(&a), Arc::clone(&b)]);
        sim.add_force_provider(Arc::new(
            DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 1.0).with_strength(1.0),
        ));
        sim.add_force_provider(Arc::new(PointForceProvider::center(2).with_strength(1.0)));
        let f = sim.calculate_force_for(&b);
        assert!((f.x() + 5.0).abs() < 1e-12);
        assert_eq!(sim.calculate_force_for(&a).x(), 1.0);
    }

    #[test]
    fn test_call_counting_feeds_optimizer() {
        let sim = Simulation::new();
        let owner = at(0.0, 0.0);
        let p = at(50.0, 0.0);
        sim.add_particles([Arc::clone(&owner), Arc::clone(&p)]);
        sim.add_force_provider(Arc::new(AntiCollisionForceProvider::new(Arc::clone(&owner), 1.0)));

        sim.tick_default();
        assert_eq!(sim.optimizer().statistics(p.id()).calls(ForceKind::AllMatching), 0);

        sim.set_call_counting(true).tick_default();
        assert!(sim.optimizer().statistics(p.id()).calls(ForceKind::AllMatching) >= 11);
    }

    #[test]
    fn test_reset_clears_everything() {
        let sim = Simulation::new();
        let p = at(1.0, 0.0);
        sim.add_particle(Arc::clone(&p))
            .add_force_provider(Arc::new(PointForceProvider::center(2)));
        sim.tick_default();
        assert!(!sim.optimizer().is_empty());

        sim.reset();
        assert_eq!(sim.particle_count(), 0);
        assert!(sim.force_providers().is_empty());
        assert!(sim.optimizer().is_empty());
    }

    #[test]
    fn test_cpu_use_factor_reaches_runner() {
        let sim = Arc::new(Simulation::new());
        sim.set_cpu_use_factor(0.25);
        assert_eq!(sim.cpu_use_factor(), 0.25);
        assert_eq!(sim.runner().config().cpu_use_factor, 0.25);
    }
}
