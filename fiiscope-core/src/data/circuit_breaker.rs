//! Per-host circuit breakers.
//!
//! A provider that answers 403 (blocked) or keeps failing is left alone for a
//! cooldown period instead of being hammered on every request. Each host gets
//! its own breaker, so one provider blocking us does not silence the others.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// State of a single breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests flow normally.
    Closed { consecutive_failures: u32 },
    /// Requests are refused until the cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            state: Mutex::new(BreakerState::Closed {
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a request may be sent now. An expired cooldown closes the breaker.
    pub fn is_allowed(&self) -> bool {
        let mut state = self.lock();
        match *state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { tripped_at } if tripped_at.elapsed() >= self.cooldown => {
                *state = BreakerState::Closed {
                    consecutive_failures: 0,
                };
                true
            }
            BreakerState::Open { .. } => false,
        }
    }

    pub fn record_success(&self) {
        *self.lock() = BreakerState::Closed {
            consecutive_failures: 0,
        };
    }

    pub fn record_failure(&self) {
        let mut state = self.lock();
        if let BreakerState::Closed {
            consecutive_failures,
        } = *state
        {
            let failures = consecutive_failures + 1;
            *state = if failures >= self.failure_threshold {
                BreakerState::Open {
                    tripped_at: Instant::now(),
                }
            } else {
                BreakerState::Closed {
                    consecutive_failures: failures,
                }
            };
        }
    }

    /// Open immediately, e.g. after a 403.
    pub fn trip(&self) {
        *self.lock() = BreakerState::Open {
            tripped_at: Instant::now(),
        };
    }

    pub fn remaining_cooldown(&self) -> Duration {
        match *self.lock() {
            BreakerState::Closed { .. } => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}

/// Lazily created breakers keyed by host name.
#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl BreakerRegistry {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            breakers: Mutex::new(HashMap::new()),
            cooldown,
            failure_threshold,
        }
    }

    pub fn for_host(&self, host: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap_or_else(PoisonError::into_inner);
        breakers
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.cooldown, self.failure_threshold)))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        assert!(cb.is_allowed());
        assert_eq!(cb.remaining_cooldown(), Duration::ZERO);
    }

    #[test]
    fn opens_after_threshold_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 3);
        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_allowed());
        cb.record_failure();
        assert!(!cb.is_allowed());
        assert!(cb.remaining_cooldown() > Duration::ZERO);
    }

    #[test]
    fn success_resets_failures() {
        let cb = CircuitBreaker::new(Duration::from_secs(60), 2);
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert!(cb.is_allowed());
    }

    #[test]
    fn trip_then_cooldown_expiry() {
        let cb = CircuitBreaker::new(Duration::from_millis(10), 3);
        cb.trip();
        assert!(!cb.is_allowed());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cb.is_allowed());
    }

    #[test]
    fn registry_isolates_hosts() {
        let registry = BreakerRegistry::new(Duration::from_secs(60), 1);
        registry.for_host("fundamentus.com.br").trip();
        assert!(!registry.for_host("fundamentus.com.br").is_allowed());
        assert!(registry.for_host("investidor10.com.br").is_allowed());
    }
}
