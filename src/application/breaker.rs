use crate::config::defaults;
use crate::domain::types::CircuitState;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

/// Result of running an operation through a [`CircuitBreaker`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was never invoked.
    #[error("circuit breaker is open")]
    Open,
    /// The operation ran and failed; the failure has been recorded.
    #[error(transparent)]
    Inner(E),
}

/// Per-server fault-tolerance state machine.
///
/// Cycles `Closed -> Open -> HalfOpen -> {Closed|Open}`: after
/// `failure_threshold` consecutive failures the circuit opens and calls fail
/// fast, until `reset_timeout` elapses and a single probe call is let
/// through.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    state: Mutex<BreakerState>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(defaults::FAILURE_THRESHOLD, defaults::RESET_TIMEOUT)
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    /// Run `operation`, recording its outcome.
    ///
    /// The state lock is never held across the operation itself; transitions
    /// happen before the call (open-circuit check, half-open probe) and after
    /// it (success reset, failure count).
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut guard = self.state.lock().await;
            if guard.state == CircuitState::Open {
                let cooled_down = guard
                    .last_failure
                    .map(|at| at.elapsed() > self.reset_timeout)
                    .unwrap_or(true);
                if cooled_down {
                    guard.state = CircuitState::HalfOpen;
                } else {
                    return Err(BreakerError::Open);
                }
            }
        }

        match operation().await {
            Ok(value) => {
                let mut guard = self.state.lock().await;
                if guard.state == CircuitState::HalfOpen {
                    guard.state = CircuitState::Closed;
                    guard.failure_count = 0;
                }
                Ok(value)
            }
            Err(error) => {
                let mut guard = self.state.lock().await;
                guard.failure_count += 1;
                guard.last_failure = Some(Instant::now());
                if guard.failure_count >= self.failure_threshold {
                    guard.state = CircuitState::Open;
                }
                Err(BreakerError::Inner(error))
            }
        }
    }

    /// Force the breaker back to a clean closed state. Manual recovery hook.
    pub async fn reset(&self) {
        let mut guard = self.state.lock().await;
        guard.state = CircuitState::Closed;
        guard.failure_count = 0;
        guard.last_failure = None;
    }

    pub async fn current_state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.state.lock().await.failure_count
    }
}
