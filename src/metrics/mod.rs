use crate::circuit_breaker::CircuitState;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Instant;
use tracing::debug;

/// Register metric descriptions with whatever recorder the host process installed
pub fn describe_metrics() {
    // Guarded call metrics
    describe_counter!(
        "guard_calls_total",
        "Total number of guarded dependency calls"
    );
    describe_counter!(
        "guard_call_failures_total",
        "Total number of guarded calls that ended on the degraded path"
    );
    describe_histogram!(
        "guard_call_duration_seconds",
        "Guarded call latencies in seconds"
    );

    // Discovery metrics
    describe_counter!(
        "guard_resolve_misses_total",
        "Total number of lookups that resolved no endpoint"
    );

    // Circuit breaker metrics
    describe_gauge!(
        "guard_circuit_breaker_state",
        "Circuit breaker state (0 = closed, 1 = open, 2 = half-open)"
    );
    describe_counter!(
        "guard_circuit_breaker_transitions_total",
        "Total number of circuit breaker state transitions"
    );
    describe_counter!(
        "guard_circuit_breaker_rejections_total",
        "Total number of calls rejected by an open circuit"
    );

    debug!("All metrics registered with descriptions");
}

/// Record the outcome of one guarded call
pub fn record_call(dependency: &str, outcome: &str, duration: f64) {
    let labels = [
        ("dependency", dependency.to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!("guard_calls_total", &labels).increment(1);
    histogram!("guard_call_duration_seconds", &labels).record(duration);

    if outcome != "success" {
        counter!("guard_call_failures_total", &labels).increment(1);
    }
}

/// Record a lookup that found no usable instance
pub fn record_resolve_miss(service: &str) {
    let labels = [("service", service.to_string())];
    counter!("guard_resolve_misses_total", &labels).increment(1);
}

/// Record circuit breaker state
pub fn record_circuit_state(dependency: &str, state: CircuitState) {
    let labels = [("dependency", dependency.to_string())];
    gauge!("guard_circuit_breaker_state", &labels).set(state.as_gauge());
}

/// Record circuit breaker transition and the resulting state
pub fn record_circuit_transition(dependency: &str, from: CircuitState, to: CircuitState) {
    let labels = [
        ("dependency", dependency.to_string()),
        ("from", from.to_string()),
        ("to", to.to_string()),
    ];
    counter!("guard_circuit_breaker_transitions_total", &labels).increment(1);
    record_circuit_state(dependency, to);
}

/// Record a call rejected by an open circuit
pub fn record_rejected(dependency: &str) {
    let labels = [("dependency", dependency.to_string())];
    counter!("guard_circuit_breaker_rejections_total", &labels).increment(1);
}

/// Timer for measuring guarded call duration
pub struct CallTimer {
    start: Instant,
    dependency: String,
}

impl CallTimer {
    pub fn new(dependency: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            dependency: dependency.into(),
        }
    }

    /// Record the elapsed time with the given outcome label
    pub fn record(self, outcome: &str) {
        record_call(&self.dependency, outcome, self.elapsed());
    }

    /// Get the elapsed time in seconds
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
