use crate::callers::RetryConfig;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::{GuardError, Result};
use crate::locator::ServiceInstance;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main dependency guard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Identity of the calling service
    #[serde(default)]
    pub service: ServiceConfig,
    /// Seed for the in-memory discovery registry
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Default circuit breaker settings
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Per-dependency circuit breaker overrides
    #[serde(default)]
    pub dependencies: HashMap<String, CircuitBreakerConfig>,
    /// Guarded call settings
    #[serde(default)]
    pub call: CallConfig,
    /// Caller-side retry policy
    #[serde(default)]
    pub retry: RetryConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Calling service identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Logical name of this service
    #[serde(default = "default_service_name")]
    pub name: String,
}

/// Registry seed: logical service name -> known instances
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub services: HashMap<String, Vec<ServiceInstance>>,
}

/// Guarded call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallConfig {
    /// Per-call timeout in milliseconds
    #[serde(default = "default_call_timeout_ms")]
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

fn default_service_name() -> String {
    "ORDER-SERVICE".to_string()
}

fn default_call_timeout_ms() -> u64 {
    5000
}

fn default_log_filter() -> String {
    "dependency_guard=debug".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
        }
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl CallConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl GuardConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GuardError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.service.name.trim().is_empty() {
            return Err(GuardError::Config(
                "Service name cannot be empty".to_string(),
            ));
        }

        self.circuit_breaker
            .validate()
            .map_err(|e| GuardError::Config(format!("circuit_breaker: {}", e)))?;

        for (dependency, breaker) in &self.dependencies {
            breaker
                .validate()
                .map_err(|e| GuardError::Config(format!("dependencies.{}: {}", dependency, e)))?;
        }

        if self.call.timeout_ms == 0 {
            return Err(GuardError::Config(
                "Call timeout must be > 0".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(GuardError::Config(
                "Retry max_attempts must be > 0".to_string(),
            ));
        }

        for (name, instances) in &self.registry.services {
            if name.trim().is_empty() {
                return Err(GuardError::Config(
                    "Registry service name cannot be empty".to_string(),
                ));
            }
            for instance in instances {
                if instance.host.is_empty() || instance.port == 0 {
                    return Err(GuardError::Config(format!(
                        "Invalid instance {}:{} for service: {}",
                        instance.host, instance.port, name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_config() -> Self {
        Self {
            service: ServiceConfig::default(),
            registry: RegistryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            dependencies: HashMap::new(),
            call: CallConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::InstanceStatus;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
service:
  name: "LOGIN-SERVICE"

registry:
  services:
    USER-MANAGEMENT-SERVICE:
      - host: "10.0.0.1"
        port: 8082
      - host: "10.0.0.2"
        port: 8082
        status: DOWN

circuit_breaker:
  failure_threshold: 5
  recovery_timeout_ms: 60000

dependencies:
  USER-MANAGEMENT-SERVICE:
    failure_threshold: 3
    reset_on_success: true

call:
  timeout_ms: 2500
"#;

        let config = GuardConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.service.name, "LOGIN-SERVICE");

        let instances = &config.registry.services["USER-MANAGEMENT-SERVICE"];
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[1].status, InstanceStatus::Down);

        let overridden = &config.dependencies["USER-MANAGEMENT-SERVICE"];
        assert_eq!(overridden.failure_threshold, 3);
        assert_eq!(overridden.recovery_timeout_ms, 60_000);
        assert!(overridden.reset_on_success);

        assert_eq!(config.call.timeout(), Duration::from_millis(2500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = GuardConfig::from_yaml("{}").unwrap();
        assert_eq!(config.service.name, "ORDER-SERVICE");
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.circuit_breaker.recovery_timeout_ms, 60_000);
        assert_eq!(config.call.timeout_ms, 5000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.logging.filter, "dependency_guard=debug");
        assert!(!config.logging.json);
        assert!(config.registry.services.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_threshold() {
        let mut config = GuardConfig::default_config();
        config.circuit_breaker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_dependency_override() {
        let mut config = GuardConfig::default_config();
        config.dependencies.insert(
            "LOGIN-SERVICE".to_string(),
            CircuitBreakerConfig {
                recovery_timeout_ms: 0,
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dependencies.LOGIN-SERVICE"));
    }

    #[test]
    fn test_validate_zero_call_timeout() {
        let mut config = GuardConfig::default_config();
        config.call.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_instance() {
        let mut config = GuardConfig::default_config();
        config.registry.services.insert(
            "LOGIN-SERVICE".to_string(),
            vec![ServiceInstance::new("", 8081)],
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = GuardConfig::from_yaml("circuit_breaker: [1, 2]");
        assert!(matches!(result, Err(GuardError::Config(_))));
    }
}
