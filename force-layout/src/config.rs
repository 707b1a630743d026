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
//! Runner configuration
//!
//! # Environment Configuration
//!
//! [`RunnerConfig::from_env`] starts from the defaults and applies optional
//! overrides:
//!
//! ```bash
//! export FORCE_LAYOUT_CPU_USE_FACTOR=0.5
//! export FORCE_LAYOUT_PRECISION=2.0
//! export FORCE_LAYOUT_PIXELS_PER_SECOND=20
//! ```

use crate::error::{PhysicsError, Result};
use std::time::Duration;

/// Environment variable overriding [`RunnerConfig::cpu_use_factor`]
pub const ENV_CPU_USE_FACTOR: &str = "FORCE_LAYOUT_CPU_USE_FACTOR";
/// Environment variable overriding [`RunnerConfig::precision`]
pub const ENV_PRECISION: &str = "FORCE_LAYOUT_PRECISION";
/// Environment variable overriding [`RunnerConfig::pixels_per_second`]
pub const ENV_PIXELS_PER_SECOND: &str = "FORCE_LAYOUT_PIXELS_PER_SECOND";

/// Timing and sizing of a [`Runner`](crate::runner::Runner)
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Simulated distance units per wall-clock second at precision 1
    pub pixels_per_second: f64,
    /// Duration assumed for the tick before the first one was measured
    pub initial_tick_duration: Duration,
    /// Precision multiplier while a boost is active
    pub boost_factor: f64,
    /// Sleep of a fast worker while suspended or without particles
    pub idle_sleep: Duration,
    /// Pause between two tick callback invocations
    pub callback_interval: Duration,
    /// How long `stop` waits for workers to finish
    pub stop_grace: Duration,
    /// Polling slice of `await_stop`
    pub await_poll: Duration,
    /// Initial precision factor
    pub precision: f64,
    /// Fraction of the available hardware threads to use
    pub cpu_use_factor: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            pixels_per_second: 10.0,
            initial_tick_duration: Duration::from_millis(100),
            boost_factor: 100.0,
            idle_sleep: Duration::from_millis(10),
            callback_interval: Duration::from_millis(1),
            stop_grace: Duration::from_secs(2),
            await_poll: Duration::from_secs(1),
            precision: 1.0,
            cpu_use_factor: 1.0,
        }
    }
}

impl RunnerConfig {
    /// Defaults with environment overrides applied
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Configuration`] if a variable is set but is
    /// not a positive finite number
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides taken from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RunnerConfig::default();
        if let Some(value) = parse_override(&lookup, ENV_CPU_USE_FACTOR)? {
            config.cpu_use_factor = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_PRECISION)? {
            config.precision = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_PIXELS_PER_SECOND)? {
            config.pixels_per_second = value;
        }
        Ok(config)
    }

    /// Set the fraction of hardware threads to use
    pub fn with_cpu_use_factor(mut self, factor: f64) -> Self {
        self.cpu_use_factor = factor;
        self
    }

    /// Set the initial precision
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Set the simulated speed
    pub fn with_pixels_per_second(mut self, pixels_per_second: f64) -> Self {
        self.pixels_per_second = pixels_per_second;
        self
    }

    /// Set the stop grace window
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Set the await polling slice
    pub fn with_await_poll(mut self, poll: Duration) -> Self {
        self.await_poll = poll;
        self
    }

    /// Check that every numeric setting is positive and finite
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pixels_per_second", self.pixels_per_second),
            ("boost_factor", self.boost_factor),
            ("precision", self.precision),
            ("cpu_use_factor", self.cpu_use_factor),
        ] {
            check_positive(name, value)?;
        }
        Ok(())
    }

    /// Total worker threads for the given hardware parallelism
    ///
    /// The available parallelism scaled by the cpu use factor, at least 1.
    /// Runner ticks never fan out over more threads than this.
    pub fn worker_budget(&self, available: usize) -> usize {
        ((available as f64) * self.cpu_use_factor).round().max(1.0) as usize
    }

    /// Number of worker threads for the given hardware parallelism
    ///
    /// Returns `(fast, slow)`: roughly two thirds of the budget tick bound
    /// providers, one third ticks whole-population providers, and each group
    /// has at least one worker.
    pub fn worker_split(&self, available: usize) -> (usize, usize) {
        let budget = self.worker_budget(available);
        (1 + budget * 2 / 3, 1 + budget / 3)
    }
}

/// Reject values that are not positive and finite
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidParameter { name, value })
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value > 0.0 && value.is_finite() => Ok(Some(value)),
        _ => Err(PhysicsError::Configuration(format!(
            "{} must be a positive number, got {:?}",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.pixels_per_second, 10.0);
        assert_eq!(config.initial_tick_duration, Duration::from_millis(100));
        assert_eq!(config.boost_factor, 100.0);
        assert_eq!(config.stop_grace, Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (ENV_CPU_USE_FACTOR, "0.5"),
            (ENV_PRECISION, " 2 "),
        ]))
        .unwrap();
        assert_eq!(config.cpu_use_factor, 0.5);
        assert_eq!(config.precision, 2.0);
        assert_eq!(config.pixels_per_second, 10.0);
    }

    #[test]
    fn test_unparsable_override() {
        let err = RunnerConfig::from_lookup(lookup(&[(ENV_PIXELS_PER_SECOND, "fast")])).unwrap_err();
        assert!(matches!(err, PhysicsError::Configuration(_)));
        assert!(err.to_string().contains(ENV_PIXELS_PER_SECOND));

        assert!(RunnerConfig::from_lookup(lookup(&[(ENV_PRECISION, "-1")])).is_err());
    }

    #[test]
    fn test_worker_split() {
        let config = RunnerConfig::default();
        assert_eq!(config.worker_split(6), (5, 3));
        assert_eq!(config.worker_split(1), (1, 1));
        assert_eq!(config.with_cpu_use_factor(0.01).worker_split(8), (1, 1));
    }

    #[test]
    fn test_worker_budget() {
        let config = RunnerConfig::default();
        assert_eq!(config.worker_budget(8), 8);
        assert_eq!(config.clone().with_cpu_use_factor(0.5).worker_budget(8), 4);
        assert_eq!(config.with_cpu_use_factor(0.01).worker_budget(8), 1);
    }

    #[test]
    fn test_validate_rejects_zero_precision() {
        assert!(matches!(
            RunnerConfig::default().with_precision(0.0).validate(),
            Err(PhysicsError::InvalidParameter { name: "precision", .. })
        ));
    }
}
