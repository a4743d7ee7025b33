//! Circuit breaker guarding remote market data sources.
//!
//! After `failure_threshold` consecutive failures the breaker opens and
//! calls fail fast until `cooldown` has elapsed. The first call after the
//! cooldown runs as a probe; `success_threshold` successful probes close it,
//! any failed probe reopens it.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,   // Requests pass through
    Open,     // Requests are rejected without touching the source
    HalfOpen, // Probing whether the source recovered
}

#[derive(Debug)]
struct Counters {
    state: CircuitState,
    consecutive_failures: usize,
    probe_successes: usize,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    name: String,
    failure_threshold: usize,
    success_threshold: usize,
    cooldown: Duration,
    counters: Mutex<Counters>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: usize,
        success_threshold: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            cooldown,
            counters: Mutex::new(Counters {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                probe_successes: 0,
                opened_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `f` unless the breaker is open.
    pub async fn call<F, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        self.admit().map_err(CircuitBreakerError::Open)?;

        match f.await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked.
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn admit(&self) -> Result<(), String> {
        let mut counters = self.lock();
        if counters.state != CircuitState::Open {
            return Ok(());
        }

        let elapsed = counters
            .opened_at
            .map(|at| at.elapsed())
            .unwrap_or(self.cooldown);
        if elapsed >= self.cooldown {
            info!(
                "CircuitBreaker [{}]: Open -> HalfOpen after {:?}",
                self.name, elapsed
            );
            counters.state = CircuitState::HalfOpen;
            counters.probe_successes = 0;
            Ok(())
        } else {
            Err(format!(
                "{} is unavailable, retry in {:?}",
                self.name,
                self.cooldown - elapsed
            ))
        }
    }

    fn record_success(&self) {
        let mut counters = self.lock();
        counters.consecutive_failures = 0;

        if counters.state == CircuitState::HalfOpen {
            counters.probe_successes += 1;
            if counters.probe_successes >= self.success_threshold {
                info!("CircuitBreaker [{}]: HalfOpen -> Closed", self.name);
                counters.state = CircuitState::Closed;
                counters.probe_successes = 0;
                counters.opened_at = None;
            }
        }
    }

    fn record_failure(&self) {
        let mut counters = self.lock();
        counters.consecutive_failures += 1;

        match counters.state {
            CircuitState::Closed if counters.consecutive_failures >= self.failure_threshold => {
                error!(
                    "CircuitBreaker [{}]: Closed -> Open after {} consecutive failures",
                    self.name, counters.consecutive_failures
                );
                counters.state = CircuitState::Open;
                counters.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!("CircuitBreaker [{}]: probe failed, reopening", self.name);
                counters.state = CircuitState::Open;
                counters.opened_at = Some(Instant::now());
                counters.probe_successes = 0;
            }
            _ => {}
        }
    }
}

/// Error type for circuit breaker
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit open: {0}")]
    Open(String),

    #[error(transparent)]
    Inner(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fail(cb: &CircuitBreaker) {
        let _ = cb.call(async { Err::<(), &str>("boom") }).await;
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let cb = CircuitBreaker::new("yahoo", 3, 1, Duration::from_secs(60));

        fail(&cb).await;
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Closed);
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        let result = cb.call(async { Ok::<u8, &str>(1) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Open(_))));
    }

    #[tokio::test]
    async fn test_success_resets_the_failure_streak() {
        let cb = CircuitBreaker::new("yahoo", 2, 1, Duration::from_secs(60));

        fail(&cb).await;
        assert!(cb.call(async { Ok::<(), &str>(()) }).await.is_ok());
        fail(&cb).await;

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_probe_success_closes_after_cooldown() {
        let cb = CircuitBreaker::new("yahoo", 1, 2, Duration::from_millis(50));
        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cb.call(async { Ok::<(), &str>(()) }).await.is_ok());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.call(async { Ok::<(), &str>(()) }).await.is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_reopens() {
        let cb = CircuitBreaker::new("yahoo", 1, 1, Duration::from_millis(50));
        fail(&cb).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_inner_error_is_passed_through() {
        let cb = CircuitBreaker::new("csv", 5, 1, Duration::from_secs(1));
        let result = cb.call(async { Err::<(), &str>("no such file") }).await;
        assert!(matches!(result, Err(CircuitBreakerError::Inner("no such file"))));
    }
}
