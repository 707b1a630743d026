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
//! Call-frequency optimization for force resolution
//!
//! Whole-population providers are the expensive part of a tick: they match
//! every particle. The [`ForceOptimizationManager`] keeps, for each particle
//! and each [`ForceKind`], how often providers of that kind were invoked and
//! the last aggregate force they produced. A kind that has been called more
//! than ten times as often as the other one is *avoided*: its cached
//! aggregate is reused instead of being recomputed. Kinds with no matching
//! provider in the current scope also contribute their cached aggregate,
//! which is how fast ticks keep feeling the global forces computed by the
//! last slow tick.
//!
//! Statistics live in a table keyed by [`ParticleId`], so it only grows with
//! the particles this manager has actually resolved. Entries are created
//! lazily on first resolution and dropped only by
//! [`ForceOptimizationManager::clear`].

use crate::forces::{ForceKind, ForceProvider, SharedForceProvider};
use crate::math::Vector;
use crate::particle::{Particle, ParticleId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A kind is avoided once its call count exceeds the other's by this factor
pub const AVOID_RATIO: u64 = 10;

/// Per-particle invocation counters and cached aggregates
#[derive(Debug, Default)]
pub struct CallStatistics {
    calls: [AtomicU64; 2],
    last: Mutex<[Option<Vector>; 2]>,
}

impl CallStatistics {
    /// Number of provider invocations recorded for `kind`
    pub fn calls(&self, kind: ForceKind) -> u64 {
        self.calls[kind.index()].load(Ordering::Relaxed)
    }

    /// Last aggregate force computed for `kind`, if any
    pub fn last_force(&self, kind: ForceKind) -> Option<Vector> {
        self.last.lock()[kind.index()]
    }

    fn record(&self, kind: ForceKind, count: u64) {
        self.calls[kind.index()].fetch_add(count, Ordering::Relaxed);
    }

    fn store(&self, kind: ForceKind, force: Vector) {
        self.last.lock()[kind.index()] = Some(force);
    }

    /// Whether `kind` has been called disproportionately often
    pub fn avoid(&self, kind: ForceKind) -> bool {
        let own = self.calls(kind);
        let other = self.calls(kind.inverse());
        own > 0 && other > 0 && own > other.saturating_mul(AVOID_RATIO)
    }
}

/// Providers matching one particle, grouped by kind
#[derive(Clone, Default)]
pub struct MatchingProviders {
    groups: [Vec<SharedForceProvider>; 2],
}

impl MatchingProviders {
    /// Providers of `kind`
    pub fn get(&self, kind: ForceKind) -> &[SharedForceProvider] {
        &self.groups[kind.index()]
    }

    /// Total number of providers across both kinds
    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    /// Whether no provider matched
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }
}

/// Tracks invocation statistics and serves cached aggregates
#[derive(Debug, Default)]
pub struct ForceOptimizationManager {
    entries: RwLock<HashMap<ParticleId, Arc<CallStatistics>>>,
}

impl ForceOptimizationManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for `id`, creating the entry on first use
    pub fn statistics(&self, id: ParticleId) -> Arc<CallStatistics> {
        if let Some(entry) = self.entries.read().get(&id) {
            return Arc::clone(entry);
        }
        Arc::clone(self.entries.write().entry(id).or_default())
    }

    /// Number of particles with statistics
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Number of entries the table can hold without reallocating
    pub fn capacity(&self) -> usize {
        self.entries.read().capacity()
    }

    /// Whether no statistics have been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all statistics and cached aggregates
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Add `count` invocations of `kind` for `particle`
    pub fn record_calls(&self, particle: &Particle, kind: ForceKind, count: u64) {
        self.statistics(particle.id()).record(kind, count);
    }

    /// Avoid decision per kind, indexed by [`ForceKind::index`]
    pub fn avoid_map(&self, particle: &Particle) -> [bool; 2] {
        let stats = self.statistics(particle.id());
        ForceKind::ALL.map(|kind| stats.avoid(kind))
    }

    /// Filter `providers` down to the non-avoided ones matching `particle`
    pub fn matching_providers(&self, providers: &[SharedForceProvider], particle: &Particle) -> MatchingProviders {
        let avoid = self.avoid_map(particle);
        let mut matching = MatchingProviders::default();
        for provider in providers {
            let kind = provider.kind();
            if !avoid[kind.index()] && provider.matches(particle) {
                matching.groups[kind.index()].push(Arc::clone(provider));
            }
        }
        matching
    }

    /// Aggregate force on `particle`
    ///
    /// Kinds with providers in `matching` are evaluated fresh and their sum is
    /// cached; kinds without any fall back to the cached aggregate, or to
    /// zero when nothing has been cached yet.
    pub fn calculate_force(&self, matching: &MatchingProviders, particle: &Particle) -> Vector {
        let stats = self.statistics(particle.id());
        let dimension = particle.dimension();
        let mut total = Vector::zero(dimension);
        for kind in ForceKind::ALL {
            let group = matching.get(kind);
            if group.is_empty() {
                if let Some(cached) = stats.last_force(kind) {
                    if cached.dimension() == dimension {
                        total += cached;
                    }
                }
                continue;
            }
            let mut force = Vector::zero(dimension);
            for provider in group {
                force += provider.force(particle);
            }
            stats.store(kind, force);
            total += force;
        }
        total
    }

    /// Wrap `provider` so every evaluation is counted against this manager
    pub fn wrap(self: &Arc<Self>, provider: SharedForceProvider) -> SharedForceProvider {
        Arc::new(CountingProvider {
            inner: provider,
            manager: Arc::clone(self),
        })
    }
}

/// Provider decorator that records each evaluation in a manager
pub struct CountingProvider {
    inner: SharedForceProvider,
    manager: Arc<ForceOptimizationManager>,
}

impl CountingProvider {
    /// The wrapped provider
    pub fn inner(&self) -> &SharedForceProvider {
        &self.inner
    }
}

impl ForceProvider for CountingProvider {
    fn matches(&self, particle: &Particle) -> bool {
        self.inner.matches(particle)
    }

    fn force(&self, particle: &Particle) -> Vector {
        let force = self.inner.force(particle);
        self.manager.record_calls(particle, self.inner.kind(), 1);
        force
    }

    fn kind(&self) -> ForceKind {
        self.inner.kind()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
