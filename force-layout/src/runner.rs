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
//! Concurrent driver for a [`Simulation`]
//!
//! A [`Runner`] keeps a simulation moving on background threads:
//!
//! - **fast workers** tick bound ([`ForceKind::Specific`]) providers back to
//!   back, each converting its own previous wall-clock tick duration into the
//!   next simulated `delta_t`;
//! - **slow workers** drain the simulated time fed to them by the fast
//!   workers and tick whole-population ([`ForceKind::AllMatching`])
//!   providers with it;
//! - an optional **callback worker** hands the simulation to a user handler
//!   with an increasing tick counter.
//!
//! Fast and slow workers share the read side of a tick lock; the callback
//! holds the write side, so it always observes a settled snapshot while all
//! ticking pauses.
//!
//! Every tick runs inside a thread pool sized to the runner's worker budget,
//! so the per-particle parallelism of a tick stays within
//! [`RunnerConfig::worker_budget`] threads.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --run()--> Running --stop()--> Stopped
//!                   ^  |
//!        suspend()  |  v  suspend()
//!                 (suspended)
//! ```
//!
//! Every worker is a persistent loop on a named OS thread that exits once the
//! shared cancellation flag is raised.

use crate::config::{check_positive, RunnerConfig};
use crate::error::{PhysicsError, Result};
use crate::forces::ForceKind;
use crate::simulation::{Simulation, TickReport};
use crossbeam::atomic::AtomicCell;
use parking_lot::{Condvar, Mutex, RwLock};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Error type handlers may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked by the callback worker with the logical tick counter
pub type TimeTickHandler = Box<dyn FnMut(u64, &Simulation) -> std::result::Result<(), HandlerError> + Send>;

/// Lifecycle state of a runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Created, not yet started
    Idle,
    /// Workers are active (possibly suspended)
    Running,
    /// Stopped; a runner cannot be restarted
    Stopped,
}

impl RunnerState {
    fn as_str(self) -> &'static str {
        match self {
            RunnerState::Idle => "idle",
            RunnerState::Running => "running",
            RunnerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread pool every runner tick executes in
#[cfg(feature = "parallel")]
struct TickPool(rayon::ThreadPool);

#[cfg(feature = "parallel")]
impl TickPool {
    fn new(threads: usize) -> Result<Self> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("force-layout-tick-{}", i))
            .build()
            .map(TickPool)
            .map_err(|err| PhysicsError::ThreadPool(err.to_string()))
    }

    fn tick(&self, simulation: &Simulation, delta_t: f64, scope: ForceKind) -> TickReport {
        self.0.install(|| simulation.tick(delta_t, Some(scope)))
    }
}

/// Without rayon a tick runs on the worker thread itself
#[cfg(not(feature = "parallel"))]
struct TickPool;

#[cfg(not(feature = "parallel"))]
impl TickPool {
    fn new(_threads: usize) -> Result<Self> {
        Ok(TickPool)
    }

    fn tick(&self, simulation: &Simulation, delta_t: f64, scope: ForceKind) -> TickReport {
        simulation.tick(delta_t, Some(scope))
    }
}

/// Compress simulated time fed to the slow workers
///
/// Durations up to 1 are raised to the eighth power, longer ones reduced to
/// their eighth root, so the slow ticks stay short however the fast ticks
/// are paced.
fn slow_time(delta_t: f64) -> f64 {
    if delta_t <= 0.0 {
        0.0
    } else if delta_t <= 1.0 {
        delta_t.powi(8)
    } else {
        delta_t.powf(1.0 / 8.0)
    }
}

/// State shared between the runner handle and its workers
struct Shared {
    simulation: Arc<Simulation>,
    config: RunnerConfig,
    cancelled: AtomicBool,
    suspended: AtomicBool,
    precision: AtomicCell<f64>,
    fps: AtomicCell<f64>,
    slow_budget: Mutex<f64>,
    boost_until: Mutex<Option<Instant>>,
    tick_lock: RwLock<()>,
    handler: Mutex<Option<TimeTickHandler>>,
    active: Mutex<usize>,
    finished: Condvar,
}

impl Shared {
    fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn boost_multiplier(&self) -> f64 {
        match *self.boost_until.lock() {
            Some(until) if Instant::now() < until => self.config.boost_factor,
            _ => 1.0,
        }
    }

    fn delta_t(&self, duration_ms: f64) -> f64 {
        duration_ms.max(0.1) * self.precision.load() * self.boost_multiplier() * self.config.pixels_per_second / 1000.0
    }

    fn fast_loop(&self, pool: &TickPool) {
        let mut duration_ms = self.config.initial_tick_duration.as_secs_f64() * 1000.0;
        while !self.cancelled() {
            let started = Instant::now();
            if self.suspended.load(Ordering::Acquire) || self.simulation.particle_count() == 0 {
                thread::sleep(self.config.idle_sleep);
            } else {
                let delta_t = self.delta_t(duration_ms);
                let _guard = self.tick_lock.read();
                pool.tick(&self.simulation, delta_t, ForceKind::Specific);
                *self.slow_budget.lock() += slow_time(delta_t);
            }
            duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            self.fps.store(1000.0 / duration_ms.max(1e-3));
        }
    }

    fn slow_loop(&self, pool: &TickPool) {
        while !self.cancelled() {
            if self.suspended.load(Ordering::Acquire) {
                thread::sleep(self.config.idle_sleep);
                continue;
            }
            let delta_t = std::mem::take(&mut *self.slow_budget.lock());
            if delta_t <= 0.0 {
                thread::sleep(self.config.idle_sleep);
                continue;
            }
            let _guard = self.tick_lock.read();
            pool.tick(&self.simulation, delta_t, ForceKind::AllMatching);
        }
    }

    fn callback_loop(&self) {
        let mut tick = 0u64;
        while !self.cancelled() {
            {
                let _guard = self.tick_lock.write();
                let mut handler = self.handler.lock();
                if let Some(handler) = handler.as_mut() {
                    match catch_unwind(AssertUnwindSafe(|| handler(tick, &*self.simulation))) {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => log::error!("Time tick handler failed at tick {}: {}", tick, err),
                        Err(_) => log::error!("Time tick handler panicked at tick {}", tick),
                    }
                }
                tick += 1;
            }
            thread::sleep(self.config.callback_interval);
        }
    }
}

/// Decrements the active worker count when a worker exits, even by panic
struct WorkerGuard(Arc<Shared>);

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let mut active = self.0.active.lock();
        *active -= 1;
        if *active == 0 {
            self.0.finished.notify_all();
        }
    }
}

#[derive(Clone, Copy)]
enum WorkerRole {
    Fast,
    Slow,
    Callback,
}

impl WorkerRole {
    fn name(self) -> &'static str {
        match self {
            WorkerRole::Fast => "fast",
            WorkerRole::Slow => "slow",
            WorkerRole::Callback => "callback",
        }
    }
}

/// Background driver bound to one simulation
///
/// # Example
///
/// ```no_run
/// use force_layout::simulation::Simulation;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let simulation = Arc::new(Simulation::new());
/// let runner = simulation.runner();
/// runner
///     .set_time_tick_handler(|tick, sim| {
///         if tick % 1000 == 0 {
///             println!("{} particles", sim.particle_count());
///         }
///         Ok(())
///     })
///     .run()
///     .unwrap();
/// std::thread::sleep(Duration::from_secs(1));
/// runner.stop();
/// ```
pub struct Runner {
    shared: Arc<Shared>,
    state: Mutex<RunnerState>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Runner {
    /// Create an idle runner; prefer [`Simulation::runner`]
    pub fn new(simulation: Arc<Simulation>, config: RunnerConfig) -> Self {
        let precision = config.precision;
        Runner {
            shared: Arc::new(Shared {
                simulation,
                config,
                cancelled: AtomicBool::new(false),
                suspended: AtomicBool::new(false),
                precision: AtomicCell::new(precision),
                fps: AtomicCell::new(0.0),
                slow_budget: Mutex::new(0.0),
                boost_until: Mutex::new(None),
                tick_lock: RwLock::new(()),
                handler: Mutex::new(None),
                active: Mutex::new(0),
                finished: Condvar::new(),
            }),
            state: Mutex::new(RunnerState::Idle),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Timing configuration in use
    pub fn config(&self) -> &RunnerConfig {
        &self.shared.config
    }

    /// The driven simulation
    pub fn simulation(&self) -> &Arc<Simulation> {
        &self.shared.simulation
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunnerState {
        *self.state.lock()
    }

    /// Start the workers
    ///
    /// The callback worker is only started if a handler was registered
    /// before this call.
    ///
    /// # Errors
    ///
    /// - [`PhysicsError::InvalidRunnerState`] unless the runner is idle
    /// - [`PhysicsError::InvalidParameter`] if the configuration is invalid
    /// - [`PhysicsError::ThreadPool`] if the tick pool could not be built
    /// - [`PhysicsError::WorkerSpawn`] if a thread could not be started; any
    ///   workers already started are stopped again
    pub fn run(&self) -> Result<&Self> {
        let mut state = self.state.lock();
        if *state != RunnerState::Idle {
            return Err(PhysicsError::InvalidRunnerState {
                expected: RunnerState::Idle.as_str(),
                actual: state.as_str(),
            });
        }
        self.shared.config.validate()?;

        let available = thread::available_parallelism().map_or(1, |n| n.get());
        let budget = self.shared.config.worker_budget(available);
        let (fast, slow) = self.shared.config.worker_split(available);
        let pool = Arc::new(TickPool::new(budget)?);
        let with_callback = self.shared.handler.lock().is_some();
        log::info!(
            "Starting runner: {} fast, {} slow worker(s) over {} tick thread(s), callback {}",
            fast,
            slow,
            budget,
            if with_callback { "on" } else { "off" }
        );

        let mut roles = vec![WorkerRole::Fast; fast];
        roles.extend(std::iter::repeat(WorkerRole::Slow).take(slow));
        if with_callback {
            roles.push(WorkerRole::Callback);
        }

        *state = RunnerState::Running;
        for (index, role) in roles.into_iter().enumerate() {
            if let Err(err) = self.spawn(index, role, Arc::clone(&pool)) {
                log::error!("Failed to start {} worker: {}", role.name(), err);
                drop(state);
                self.stop();
                return Err(err);
            }
        }
        Ok(self)
    }

    fn spawn(&self, index: usize, role: WorkerRole, pool: Arc<TickPool>) -> Result<()> {
        *self.shared.active.lock() += 1;
        let guard = WorkerGuard(Arc::clone(&self.shared));
        let spawned = thread::Builder::new()
            .name(format!("force-layout-{}-{}", role.name(), index))
            .spawn(move || {
                let shared = Arc::clone(&guard.0);
                log::debug!("{} worker {} started", role.name(), index);
                match role {
                    WorkerRole::Fast => shared.fast_loop(&pool),
                    WorkerRole::Slow => shared.slow_loop(&pool),
                    WorkerRole::Callback => shared.callback_loop(),
                }
                drop(guard);
            });
        // A failed spawn drops the closure and with it the guard
        let handle = spawned?;
        self.handles.lock().push(handle);
        Ok(())
    }

    /// Signal all workers to finish and wait up to the stop grace window
    ///
    /// Workers still busy after the window are left to finish on their own.
    pub fn stop(&self) -> &Self {
        let mut state = self.state.lock();
        if *state == RunnerState::Stopped {
            return self;
        }
        *state = RunnerState::Stopped;
        drop(state);

        self.shared.cancelled.store(true, Ordering::Release);
        let deadline = Instant::now() + self.shared.config.stop_grace;
        let mut active = self.shared.active.lock();
        while *active > 0 {
            if self.shared.finished.wait_until(&mut active, deadline).timed_out() {
                break;
            }
        }
        let remaining = *active;
        drop(active);

        if remaining > 0 {
            log::warn!(
                "{} worker(s) still running after {:?} grace window",
                remaining,
                self.shared.config.stop_grace
            );
        } else {
            self.join_finished();
            log::info!("Runner stopped");
        }
        self
    }

    /// Block until every worker has exited
    ///
    /// Polls in slices of the configured await interval. Returns at once if
    /// the runner was never started; otherwise only returns after
    /// [`stop`](Runner::stop) has been requested.
    pub fn await_stop(&self) -> &Self {
        let mut active = self.shared.active.lock();
        while *active > 0 {
            if self.shared.finished.wait_for(&mut active, self.shared.config.await_poll).timed_out() {
                log::trace!("Still waiting for {} worker(s)", *active);
            }
        }
        drop(active);
        self.join_finished();
        self
    }

    fn join_finished(&self) {
        for handle in self.handles.lock().drain(..) {
            if handle.join().is_err() {
                log::warn!("A runner worker panicked");
            }
        }
    }

    /// Toggle the paused flag
    pub fn suspend(&self) -> &Self {
        let was = self.shared.suspended.fetch_xor(true, Ordering::AcqRel);
        log::info!("Runner {}", if was { "resumed" } else { "suspended" });
        self
    }

    /// Whether ticking is paused
    pub fn is_suspended(&self) -> bool {
        self.shared.suspended.load(Ordering::Acquire)
    }

    /// Speed up simulated time for `duration`
    ///
    /// Boosting again while a boost is active extends it if the new deadline
    /// is later.
    pub fn boost(&self, duration: Duration) -> &Self {
        let until = Instant::now() + duration;
        let mut boost_until = self.shared.boost_until.lock();
        if boost_until.map_or(true, |current| current < until) {
            *boost_until = Some(until);
        }
        log::info!("Boost for {}ms", duration.as_millis());
        self
    }

    /// Precision multiplier currently applied by the boost
    pub fn boost_multiplier(&self) -> f64 {
        self.shared.boost_multiplier()
    }

    /// Set the detail precision
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidParameter`] unless `precision` is
    /// positive and finite; the previous precision is kept
    pub fn set_precision(&self, precision: f64) -> Result<&Self> {
        check_positive("precision", precision)?;
        self.shared.precision.store(precision);
        Ok(self)
    }

    /// Current detail precision
    pub fn precision(&self) -> f64 {
        self.shared.precision.load()
    }

    /// Simulated time a fast worker applies for a tick of `duration`
    pub fn delta_t_for(&self, duration: Duration) -> f64 {
        self.shared.delta_t(duration.as_secs_f64() * 1000.0)
    }

    /// Register the callback run under exclusive access between ticks
    pub fn set_time_tick_handler<F>(&self, handler: F) -> &Self
    where
        F: FnMut(u64, &Simulation) -> std::result::Result<(), HandlerError> + Send + 'static,
    {
        *self.shared.handler.lock() = Some(Box::new(handler));
        self
    }

    /// Ticks per second of the most recent fast tick
    pub fn fps(&self) -> f64 {
        self.shared.fps.load()
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        if *self.state.lock() == RunnerState::Running {
            self.shared.cancelled.store(true, Ordering::Release);
        }
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("state", &self.state())
            .field("suspended", &self.is_suspended())
            .field("precision", &self.precision())
            .field("fps", &self.fps())
            .finish()
    }
}
