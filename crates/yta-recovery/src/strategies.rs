//! Retry strategies (spec.md §4.1.1): pluggable `{ShouldRetry, GetDelay,
//! RecordAttempt}` capability set. Each strategy owns its own state and
//! exposes cumulative counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use yta_models::{RetryConfig, RetryReason};

use crate::jitter::apply_jitter;

#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyCounters {
    pub total_attempts: u64,
    pub successful_attempts: u64,
    pub failed_attempts: u64,
}

/// Capability set consumed by the `ExecuteWithRetry` driver (C1).
pub trait RetryStrategy: Send + Sync {
    fn should_retry(&self, attempt: u32, reason: RetryReason) -> bool;
    fn get_delay(&self, attempt: u32, reason: RetryReason) -> Duration;
    fn record_attempt(&self, success: bool, reason: Option<RetryReason>);
    fn counters(&self) -> StrategyCounters;
    fn config(&self) -> RetryConfig;
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, success: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> StrategyCounters {
        StrategyCounters {
            total_attempts: self.total.load(Ordering::Relaxed),
            successful_attempts: self.success.load(Ordering::Relaxed),
            failed_attempts: self.failed.load(Ordering::Relaxed),
        }
    }
}

fn exponential_delay(config: &RetryConfig, attempt: u32) -> f64 {
    let raw = config.base_delay_secs * config.exponential_base.powi(attempt as i32);
    raw.min(config.max_delay_secs)
}

// ---------------------------------------------------------------------
// ExponentialBackoff
// ---------------------------------------------------------------------

pub struct ExponentialBackoffStrategy {
    config: RetryConfig,
    counters: Counters,
}

impl ExponentialBackoffStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
        }
    }
}

impl RetryStrategy for ExponentialBackoffStrategy {
    fn should_retry(&self, attempt: u32, reason: RetryReason) -> bool {
        attempt < self.config.max_attempts && reason != RetryReason::QualityNotAvailable
    }

    fn get_delay(&self, attempt: u32, _reason: RetryReason) -> Duration {
        let raw = exponential_delay(&self.config, attempt);
        let delay = if self.config.jitter {
            apply_jitter(raw)
        } else {
            raw
        };
        Duration::from_secs_f64(delay.max(0.0))
    }

    fn record_attempt(&self, success: bool, _reason: Option<RetryReason>) {
        self.counters.record(success);
    }

    fn counters(&self) -> StrategyCounters {
        self.counters.snapshot()
    }

    fn config(&self) -> RetryConfig {
        self.config
    }
}

// ---------------------------------------------------------------------
// FixedDelay
// ---------------------------------------------------------------------

pub struct FixedDelayStrategy {
    config: RetryConfig,
    counters: Counters,
}

impl FixedDelayStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
        }
    }
}

impl RetryStrategy for FixedDelayStrategy {
    fn should_retry(&self, attempt: u32, _reason: RetryReason) -> bool {
        attempt < self.config.max_attempts
    }

    fn get_delay(&self, _attempt: u32, _reason: RetryReason) -> Duration {
        let delay = if self.config.jitter {
            apply_jitter(self.config.base_delay_secs)
        } else {
            self.config.base_delay_secs
        };
        Duration::from_secs_f64(delay.max(0.0))
    }

    fn record_attempt(&self, success: bool, _reason: Option<RetryReason>) {
        self.counters.record(success);
    }

    fn counters(&self) -> StrategyCounters {
        self.counters.snapshot()
    }

    fn config(&self) -> RetryConfig {
        self.config
    }
}

// ---------------------------------------------------------------------
// CircuitBreaker
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

pub struct CircuitBreakerStrategy {
    config: RetryConfig,
    counters: Counters,
    state: Mutex<CircuitState>,
    failure_count: AtomicU64,
}

impl CircuitBreakerStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
            state: Mutex::new(CircuitState::Closed),
            failure_count: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.lock().unwrap()
    }
}

impl RetryStrategy for CircuitBreakerStrategy {
    fn should_retry(&self, attempt: u32, _reason: RetryReason) -> bool {
        let mut state = self.state.lock().unwrap();
        match *state {
            CircuitState::Open { opened_at } => {
                let recovery = Duration::from_secs_f64(self.config.recovery_timeout_secs);
                if Instant::now().duration_since(opened_at) > recovery {
                    *state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
            CircuitState::Closed | CircuitState::HalfOpen => attempt < self.config.max_attempts,
        }
    }

    fn get_delay(&self, attempt: u32, _reason: RetryReason) -> Duration {
        let state = *self.state.lock().unwrap();
        if matches!(state, CircuitState::Open { .. }) {
            return Duration::from_secs_f64(self.config.recovery_timeout_secs);
        }
        Duration::from_secs_f64(exponential_delay(&self.config, attempt).max(0.0))
    }

    fn record_attempt(&self, success: bool, _reason: Option<RetryReason>) {
        self.counters.record(success);
        let mut state = self.state.lock().unwrap();
        if success {
            self.failure_count.store(0, Ordering::Relaxed);
            if matches!(*state, CircuitState::HalfOpen) {
                *state = CircuitState::Closed;
            }
        } else {
            let failures = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
            if failures >= self.config.failure_threshold as u64 {
                *state = CircuitState::Open {
                    opened_at: Instant::now(),
                };
            }
        }
    }

    fn counters(&self) -> StrategyCounters {
        self.counters.snapshot()
    }

    fn config(&self) -> RetryConfig {
        self.config
    }
}

// ---------------------------------------------------------------------
// Adaptive
// ---------------------------------------------------------------------

const ADAPTIVE_WINDOW: usize = 10;

pub struct AdaptiveStrategy {
    config: RetryConfig,
    counters: Counters,
    window: Mutex<VecDeque<bool>>,
}

impl AdaptiveStrategy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
            window: Mutex::new(VecDeque::with_capacity(ADAPTIVE_WINDOW)),
        }
    }

    fn success_rate(&self) -> f64 {
        let window = self.window.lock().unwrap();
        if window.is_empty() {
            return 1.0;
        }
        let successes = window.iter().filter(|&&ok| ok).count();
        successes as f64 / window.len() as f64
    }
}

impl RetryStrategy for AdaptiveStrategy {
    fn should_retry(&self, attempt: u32, _reason: RetryReason) -> bool {
        if attempt >= self.config.max_attempts {
            return false;
        }
        if self.success_rate() < 0.3 && attempt >= 2 {
            return false;
        }
        true
    }

    fn get_delay(&self, attempt: u32, _reason: RetryReason) -> Duration {
        let base = exponential_delay(&self.config, attempt);
        let rate = self.success_rate();
        let scaled = if rate >= 0.7 { base * 0.5 } else { base * 2.0 };
        let clamped = scaled.min(self.config.max_delay_secs);
        let delay = if self.config.jitter {
            apply_jitter(clamped)
        } else {
            clamped
        };
        Duration::from_secs_f64(delay.max(0.0))
    }

    fn record_attempt(&self, success: bool, _reason: Option<RetryReason>) {
        self.counters.record(success);
        let mut window = self.window.lock().unwrap();
        if window.len() == ADAPTIVE_WINDOW {
            window.pop_front();
        }
        window.push_back(success);
    }

    fn counters(&self) -> StrategyCounters {
        self.counters.snapshot()
    }

    fn config(&self) -> RetryConfig {
        self.config
    }
}

pub fn shared<S: RetryStrategy + 'static>(strategy: S) -> Arc<dyn RetryStrategy> {
    Arc::new(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32, jitter: bool) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay_secs: 1.0,
            max_delay_secs: 300.0,
            exponential_base: 2.0,
            jitter,
            failure_threshold: 3,
            recovery_timeout_secs: 1.0,
        }
    }

    #[test]
    fn exponential_backoff_without_jitter_is_exact() {
        let strategy = ExponentialBackoffStrategy::new(config(5, false));
        assert_eq!(strategy.get_delay(0, RetryReason::Unknown).as_secs_f64(), 1.0);
        assert_eq!(strategy.get_delay(1, RetryReason::Unknown).as_secs_f64(), 2.0);
        assert_eq!(strategy.get_delay(2, RetryReason::Unknown).as_secs_f64(), 4.0);
    }

    #[test]
    fn exponential_backoff_clamps_to_max_delay() {
        let mut cfg = config(20, false);
        cfg.max_delay_secs = 5.0;
        let strategy = ExponentialBackoffStrategy::new(cfg);
        assert_eq!(strategy.get_delay(10, RetryReason::Unknown).as_secs_f64(), 5.0);
    }

    #[test]
    fn exponential_backoff_refuses_quality_not_available() {
        let strategy = ExponentialBackoffStrategy::new(config(5, false));
        assert!(!strategy.should_retry(0, RetryReason::QualityNotAvailable));
        assert!(strategy.should_retry(0, RetryReason::NetworkError));
    }

    #[test]
    fn fixed_delay_without_jitter_is_constant() {
        let strategy = FixedDelayStrategy::new(config(5, false));
        for attempt in 0..4 {
            assert_eq!(
                strategy.get_delay(attempt, RetryReason::Unknown).as_secs_f64(),
                1.0
            );
        }
    }

    #[test]
    fn circuit_breaker_opens_after_threshold_and_recovers() {
        let strategy = CircuitBreakerStrategy::new(config(10, false));
        for _ in 0..3 {
            strategy.record_attempt(false, Some(RetryReason::NetworkError));
        }
        assert!(matches!(strategy.state(), CircuitState::Open { .. }));
        assert!(!strategy.should_retry(0, RetryReason::NetworkError));

        std::thread::sleep(Duration::from_millis(1100));
        assert!(strategy.should_retry(0, RetryReason::NetworkError));
        assert!(matches!(strategy.state(), CircuitState::HalfOpen));

        strategy.record_attempt(true, None);
        assert_eq!(strategy.state(), CircuitState::Closed);
    }

    #[test]
    fn adaptive_refuses_when_success_rate_collapses() {
        let strategy = AdaptiveStrategy::new(config(10, false));
        for _ in 0..8 {
            strategy.record_attempt(false, Some(RetryReason::NetworkError));
        }
        assert!(strategy.success_rate() < 0.3);
        assert!(!strategy.should_retry(2, RetryReason::NetworkError));
        assert!(strategy.should_retry(1, RetryReason::NetworkError));
    }

    #[test]
    fn adaptive_speeds_up_when_healthy() {
        let strategy = AdaptiveStrategy::new(config(10, false));
        for _ in 0..10 {
            strategy.record_attempt(true, None);
        }
        assert!(strategy.success_rate() >= 0.7);
        let delay = strategy.get_delay(2, RetryReason::Unknown).as_secs_f64();
        assert!(delay <= exponential_delay(&config(10, false), 2));
    }

    #[test]
    fn counters_sum_correctly() {
        let strategy = ExponentialBackoffStrategy::new(config(5, false));
        strategy.record_attempt(false, None);
        strategy.record_attempt(false, None);
        strategy.record_attempt(true, None);
        let c = strategy.counters();
        assert_eq!(c.total_attempts, c.successful_attempts + c.failed_attempts);
        assert_eq!(c.total_attempts, 3);
    }
}
