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
//! Runner lifecycle tests
//!
//! These start real worker threads and rely on short sleeps, so assertions
//! only check monotone progress rather than exact positions.

use force_layout::forces::{DistanceForceProvider, ForceKind, ForceProvider, PointForceProvider};
use force_layout::math::Vector;
use force_layout::particle::Particle;
use force_layout::runner::RunnerState;
use force_layout::simulation::Simulation;
use force_layout::{PhysicsError, RunnerConfig};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn spring_pair() -> (Arc<Simulation>, Arc<Particle>, Arc<Particle>) {
    let a = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
    let b = Arc::new(Particle::at(Vector::new2(40.0, 0.0)));
    let simulation = Arc::new(Simulation::new());
    simulation
        .add_particles([Arc::clone(&a), Arc::clone(&b)])
        .add_force_provider(Arc::new(
            DistanceForceProvider::new(Arc::clone(&a), Arc::clone(&b), 5.0).with_strength(1.0),
        ));
    (simulation, a, b)
}

/// Constant push along x that also records the evaluating threads
struct Drift {
    threads: Arc<Mutex<HashSet<ThreadId>>>,
}

impl Drift {
    fn new() -> Self {
        Drift { threads: Arc::new(Mutex::new(HashSet::new())) }
    }
}

impl ForceProvider for Drift {
    fn matches(&self, _particle: &Particle) -> bool {
        true
    }

    fn force(&self, particle: &Particle) -> Vector {
        self.threads.lock().unwrap().insert(thread::current().id());
        let mut coords = vec![0.0; particle.dimension()];
        coords[0] = 1.0;
        Vector::from_slice(&coords).unwrap()
    }

    fn kind(&self) -> ForceKind {
        ForceKind::Specific
    }

    fn name(&self) -> &str {
        "drift"
    }
}

fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_run_and_stop() {
    init_logging();
    let (simulation, a, b) = spring_pair();
    let runner = simulation.runner();
    assert_eq!(runner.state(), RunnerState::Idle);

    runner.run().unwrap();
    assert_eq!(runner.state(), RunnerState::Running);
    assert!(wait_for(|| a.location().distance_to(&b.location()) < 39.0, Duration::from_secs(5)));
    assert!(runner.fps() > 0.0);

    runner.stop().await_stop();
    assert_eq!(runner.state(), RunnerState::Stopped);
    let separation = a.location().distance_to(&b.location());
    assert!(separation < 40.0);
    assert!(a.location().is_valid() && b.location().is_valid());

    assert!(matches!(
        runner.run(),
        Err(PhysicsError::InvalidRunnerState { expected: "idle", actual: "stopped" })
    ));
}

#[test]
fn test_double_run_is_rejected() {
    init_logging();
    let (simulation, _, _) = spring_pair();
    let runner = simulation.runner();
    runner.run().unwrap();
    assert!(matches!(
        runner.run(),
        Err(PhysicsError::InvalidRunnerState { expected: "idle", actual: "running" })
    ));
    runner.stop();
}

#[test]
fn test_suspend_freezes_positions() {
    init_logging();
    let p = Arc::new(Particle::at(Vector::new2(500.0, 500.0)));
    let simulation = Arc::new(Simulation::new());
    simulation
        .add_particle(Arc::clone(&p))
        .add_force_provider(Arc::new(PointForceProvider::center(2).with_strength(0.001)));
    let runner = simulation.runner();
    runner.run().unwrap();
    assert!(wait_for(|| p.location().x() < 500.0, Duration::from_secs(5)));

    runner.suspend();
    assert!(runner.is_suspended());
    // Let any tick already in flight finish
    thread::sleep(Duration::from_millis(100));
    let frozen = p.location();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(p.location(), frozen);

    runner.suspend();
    assert!(!runner.is_suspended());
    assert!(wait_for(|| p.location() != frozen, Duration::from_secs(5)));
    runner.stop();
}

#[test]
fn test_callback_survives_errors_and_panics() {
    init_logging();
    let (simulation, _, _) = spring_pair();
    let runner = simulation.runner();
    let calls = Arc::new(AtomicU64::new(0));
    let last_tick = Arc::new(AtomicU64::new(0));

    let counter = Arc::clone(&calls);
    let ticks = Arc::clone(&last_tick);
    runner.set_time_tick_handler(move |tick, sim| {
        counter.fetch_add(1, Ordering::SeqCst);
        ticks.store(tick, Ordering::SeqCst);
        assert_eq!(sim.particle_count(), 2);
        match tick {
            1 => Err("rejected".into()),
            2 => panic!("handler blew up"),
            _ => Ok(()),
        }
    });
    runner.run().unwrap();

    assert!(wait_for(|| calls.load(Ordering::SeqCst) >= 5, Duration::from_secs(5)));
    assert!(last_tick.load(Ordering::SeqCst) >= 4);
    runner.stop().await_stop();
    assert_eq!(runner.state(), RunnerState::Stopped);
}

#[test]
fn test_boost_while_running() {
    init_logging();
    let (simulation, _, _) = spring_pair();
    let runner = simulation.runner();
    runner.run().unwrap();
    assert_eq!(runner.boost_multiplier(), 1.0);
    runner.boost(Duration::from_millis(300));
    assert_eq!(runner.boost_multiplier(), runner.config().boost_factor);
    assert!(wait_for(|| runner.boost_multiplier() == 1.0, Duration::from_secs(5)));
    runner.stop();
}

#[test]
fn test_await_stop_returns_after_stop() {
    init_logging();
    let (simulation, _, _) = spring_pair();
    let runner = simulation.runner_with_config(RunnerConfig::default().with_await_poll(Duration::from_millis(20)));
    runner.run().unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            thread::sleep(Duration::from_millis(50));
            runner.stop();
        });
        runner.await_stop();
    });
    assert_eq!(runner.state(), RunnerState::Stopped);
}

#[test]
fn test_drop_cancels_workers() {
    init_logging();
    let (simulation, a, b) = spring_pair();
    {
        let runner = simulation.runner();
        runner.run().unwrap();
        thread::sleep(Duration::from_millis(20));
    }
    // Give the workers time to notice the cancellation
    thread::sleep(Duration::from_millis(200));
    let settled = (a.location(), b.location());
    thread::sleep(Duration::from_millis(100));
    assert_eq!((a.location(), b.location()), settled);
}

#[test]
fn test_ticks_stay_within_worker_budget() {
    init_logging();
    let drift = Drift::new();
    let threads = Arc::clone(&drift.threads);
    let simulation = Arc::new(Simulation::new());
    simulation
        .add_particles((0..256).map(|i| Arc::new(Particle::at(Vector::new2(i as f64, (i % 16) as f64)))))
        .add_force_provider(Arc::new(drift))
        .set_cpu_use_factor(0.01);

    let runner = simulation.runner();
    let available = thread::available_parallelism().map_or(1, |n| n.get());
    let budget = runner.config().worker_budget(available);
    runner.run().unwrap();
    assert!(wait_for(|| !threads.lock().unwrap().is_empty(), Duration::from_secs(5)));
    thread::sleep(Duration::from_millis(500));
    runner.stop().await_stop();

    let distinct = threads.lock().unwrap().len();
    assert!(distinct >= 1);
    assert!(distinct <= budget, "{} threads evaluated forces, budget {}", distinct, budget);
}

#[test]
fn test_callback_sees_frozen_snapshot() {
    init_logging();
    let p = Arc::new(Particle::at(Vector::new2(0.0, 0.0)));
    let simulation = Arc::new(Simulation::new());
    simulation.add_particle(Arc::clone(&p)).add_force_provider(Arc::new(Drift::new()));

    let runner = simulation.runner();
    let calls = Arc::new(AtomicU64::new(0));
    let changed = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let violations = Arc::clone(&changed);
    runner.set_time_tick_handler(move |_, sim| {
        let before: Vec<Vector> = sim.particles().iter().map(|p| p.location()).collect();
        thread::sleep(Duration::from_millis(20));
        let after: Vec<Vector> = sim.particles().iter().map(|p| p.location()).collect();
        if before != after {
            violations.fetch_add(1, Ordering::SeqCst);
        }
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    runner.run().unwrap();

    assert!(wait_for(|| calls.load(Ordering::SeqCst) >= 5, Duration::from_secs(5)));
    assert!(wait_for(|| p.location().x() > 0.0, Duration::from_secs(5)));
    runner.stop().await_stop();
    assert_eq!(changed.load(Ordering::SeqCst), 0);
}
