use super::breaker::CircuitBreaker;
use super::types::{CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One shared circuit breaker per logical dependency
#[derive(Debug, Clone)]
pub struct BreakerRegistry {
    /// Circuit breakers per dependency
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    /// Default configuration
    defaults: CircuitBreakerConfig,
    /// Per-dependency configuration overrides
    overrides: Arc<HashMap<String, CircuitBreakerConfig>>,
}

impl BreakerRegistry {
    /// Create a registry where every dependency uses `defaults`
    pub fn new(defaults: CircuitBreakerConfig) -> Self {
        Self::with_overrides(defaults, HashMap::new())
    }

    /// Create a registry with per-dependency configuration overrides
    pub fn with_overrides(
        defaults: CircuitBreakerConfig,
        overrides: HashMap<String, CircuitBreakerConfig>,
    ) -> Self {
        Self {
            breakers: Arc::new(DashMap::new()),
            defaults,
            overrides: Arc::new(overrides),
        }
    }

    /// Get or create the breaker for a dependency.
    ///
    /// Every caller targeting the same dependency receives the same instance.
    pub fn breaker(&self, dependency: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(dependency.to_string())
            .or_insert_with(|| {
                debug!(dependency = dependency, "Creating new circuit breaker");
                Arc::new(CircuitBreaker::new(dependency, self.config_for(dependency)))
            })
            .value()
            .clone()
    }

    /// Configuration applied to a dependency's breaker
    pub fn config_for(&self, dependency: &str) -> CircuitBreakerConfig {
        self.overrides
            .get(dependency)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Get the state of a dependency's breaker
    pub fn state(&self, dependency: &str) -> CircuitState {
        self.breakers
            .get(dependency)
            .map(|breaker| breaker.state())
            .unwrap_or(CircuitState::Closed)
    }

    /// Get metrics for a dependency
    pub fn metrics(&self, dependency: &str) -> Option<CircuitBreakerMetrics> {
        self.breakers.get(dependency).map(|breaker| breaker.metrics())
    }

    /// Get all dependency names with circuit breakers
    pub fn dependencies(&self) -> Vec<String> {
        self.breakers.iter().map(|e| e.key().clone()).collect()
    }

    /// Get metrics and state for all dependencies
    pub fn all_metrics(&self) -> Vec<(String, CircuitBreakerMetrics, CircuitState)> {
        self.breakers
            .iter()
            .map(|entry| {
                let breaker = entry.value();
                (entry.key().clone(), breaker.metrics(), breaker.state())
            })
            .collect()
    }
}
