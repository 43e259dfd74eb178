use super::types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use crate::error::CallError;
use crate::metrics;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker for a single logical dependency
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Configuration
    config: CircuitBreakerConfig,
    /// Runtime state, only touched through short critical sections
    state: Mutex<State>,
    /// Dependency identifier
    dependency: String,
}

#[derive(Debug)]
struct State {
    /// Current circuit state
    circuit_state: CircuitState,
    /// Consecutive failures; cleared by a successful half-open trial
    consecutive_failures: u32,
    /// Time of the most recent counted failure
    last_failure_at: Option<Instant>,
    /// Whether the single half-open trial call is running
    trial_in_flight: bool,
    /// Metrics
    metrics: CircuitBreakerMetrics,
}

/// How a call got through the breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted while closed
    Normal,
    /// Admitted as the half-open recovery probe
    Trial,
}

/// Releases the trial slot if the trial future is dropped before completing
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.breaker.lock();
            state.trial_in_flight = false;
            warn!(
                dependency = %self.breaker.dependency,
                "Half-open trial call cancelled before completion"
            );
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(dependency: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let dependency = dependency.into();
        info!(
            dependency = %dependency,
            failure_threshold = config.failure_threshold,
            recovery_timeout_ms = config.recovery_timeout_ms,
            reset_on_success = config.reset_on_success,
            "Creating circuit breaker"
        );
        metrics::record_circuit_state(&dependency, CircuitState::Closed);

        Self {
            config,
            state: Mutex::new(State {
                circuit_state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                trial_in_flight: false,
                metrics: CircuitBreakerMetrics::default(),
            }),
            dependency,
        }
    }

    /// Run `operation` through the breaker.
    ///
    /// The operation is invoked at most once. When the circuit is open and the
    /// recovery window has not elapsed it is not invoked at all and
    /// `CallError::CircuitOpen` is returned. Otherwise its error, if any, is
    /// returned unchanged as `CallError::Operation` after the failure has been
    /// counted.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = match self.admit() {
            Some(admission) => admission,
            None => {
                return Err(CallError::CircuitOpen {
                    dependency: self.dependency.clone(),
                })
            }
        };

        let mut guard = TrialGuard {
            breaker: self,
            armed: admission == Admission::Trial,
        };

        let result = operation().await;
        guard.armed = false;

        match result {
            Ok(value) => {
                self.on_success(admission);
                Ok(value)
            }
            Err(e) => {
                self.on_failure(admission);
                Err(CallError::Operation(e))
            }
        }
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.lock().circuit_state
    }

    /// Get the current consecutive failure count
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Get metrics
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        self.lock().metrics.clone()
    }

    /// Dependency this breaker guards
    pub fn dependency(&self) -> &str {
        &self.dependency
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent across a panic in another holder; every
        // critical section is a handful of field writes.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether a call may proceed, moving Open -> HalfOpen when due
    fn admit(&self) -> Option<Admission> {
        let mut state = self.lock();

        match state.circuit_state {
            CircuitState::Closed => {
                state.metrics.total_requests += 1;
                Some(Admission::Normal)
            }
            CircuitState::Open => {
                let Some(last_failure_at) = state.last_failure_at else {
                    warn!(dependency = %self.dependency, "Circuit open but no failure timestamp");
                    state.metrics.rejected_requests += 1;
                    return None;
                };

                let elapsed = Instant::now().saturating_duration_since(last_failure_at);
                if elapsed >= self.config.recovery_timeout() {
                    self.transition_to_half_open(&mut state);
                    state.trial_in_flight = true;
                    state.metrics.total_requests += 1;
                    Some(Admission::Trial)
                } else {
                    state.metrics.rejected_requests += 1;
                    metrics::record_rejected(&self.dependency);
                    debug!(
                        dependency = %self.dependency,
                        time_remaining = ?self.config.recovery_timeout() - elapsed,
                        "Circuit breaker open, rejecting call"
                    );
                    None
                }
            }
            CircuitState::HalfOpen => {
                if state.trial_in_flight {
                    state.metrics.rejected_requests += 1;
                    metrics::record_rejected(&self.dependency);
                    debug!(
                        dependency = %self.dependency,
                        "Half-open trial already in flight, rejecting"
                    );
                    None
                } else {
                    state.trial_in_flight = true;
                    state.metrics.total_requests += 1;
                    debug!(dependency = %self.dependency, "Allowing half-open trial call");
                    Some(Admission::Trial)
                }
            }
        }
    }

    fn on_success(&self, admission: Admission) {
        let mut state = self.lock();
        state.metrics.successful_requests += 1;

        match (state.circuit_state, admission) {
            (CircuitState::HalfOpen, Admission::Trial) => {
                state.trial_in_flight = false;
                self.transition_to_closed(&mut state);
            }
            (CircuitState::Closed, Admission::Normal) => {
                if self.config.reset_on_success {
                    state.consecutive_failures = 0;
                }
            }
            (circuit_state, _) => {
                debug!(
                    dependency = %self.dependency,
                    state = %circuit_state,
                    "Late success from a call admitted under an earlier state"
                );
            }
        }
    }

    fn on_failure(&self, admission: Admission) {
        let mut state = self.lock();
        state.metrics.failed_requests += 1;

        match (state.circuit_state, admission) {
            (CircuitState::Closed, Admission::Normal) => {
                state.consecutive_failures += 1;
                state.last_failure_at = Some(Instant::now());

                debug!(
                    dependency = %self.dependency,
                    consecutive_failures = state.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    "Call failed in closed state"
                );

                if state.consecutive_failures >= self.config.failure_threshold {
                    self.transition_to_open(&mut state);
                }
            }
            (CircuitState::HalfOpen, Admission::Trial) => {
                state.trial_in_flight = false;
                state.consecutive_failures += 1;
                state.last_failure_at = Some(Instant::now());
                warn!(
                    dependency = %self.dependency,
                    consecutive_failures = state.consecutive_failures,
                    "Half-open trial call failed, reopening circuit"
                );
                self.transition_to_open(&mut state);
            }
            (circuit_state, _) => {
                debug!(
                    dependency = %self.dependency,
                    state = %circuit_state,
                    "Late failure from a call admitted under an earlier state"
                );
            }
        }
    }

    fn transition_to_open(&self, state: &mut State) {
        info!(
            dependency = %self.dependency,
            consecutive_failures = state.consecutive_failures,
            "Circuit breaker opening"
        );

        metrics::record_circuit_transition(&self.dependency, state.circuit_state, CircuitState::Open);
        state.circuit_state = CircuitState::Open;
        state.metrics.circuit_opened_count += 1;
    }

    fn transition_to_half_open(&self, state: &mut State) {
        info!(
            dependency = %self.dependency,
            recovery_timeout = ?self.config.recovery_timeout(),
            "Circuit breaker transitioning to half-open"
        );

        metrics::record_circuit_transition(
            &self.dependency,
            state.circuit_state,
            CircuitState::HalfOpen,
        );
        state.circuit_state = CircuitState::HalfOpen;
        state.metrics.circuit_half_opened_count += 1;
    }

    fn transition_to_closed(&self, state: &mut State) {
        info!(dependency = %self.dependency, "Circuit breaker closing");

        metrics::record_circuit_transition(&self.dependency, state.circuit_state, CircuitState::Closed);
        state.circuit_state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.last_failure_at = None;
        state.metrics.circuit_closed_count += 1;
    }
}
