use super::instance::{InstanceStatus, ServiceInstance};
use crate::error::{GuardError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Client for the external service registry
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// List the instances currently registered under `service_name`.
    ///
    /// May return an empty list; returns an error when the registry itself
    /// cannot be reached.
    async fn list_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>>;
}

/// Registry kept in process memory, keyed by logical service name
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    services: Arc<DashMap<String, Vec<ServiceInstance>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry from configuration
    pub fn from_services(services: HashMap<String, Vec<ServiceInstance>>) -> Self {
        let registry = Self::new();
        for (name, instances) in services {
            if !instances.is_empty() {
                registry.services.insert(name, instances);
            }
        }
        registry
    }

    /// Register an instance, replacing any with the same host and port
    pub fn register(&self, service_name: &str, instance: ServiceInstance) {
        info!(
            service = service_name,
            host = %instance.host,
            port = instance.port,
            "Registering service instance"
        );

        let mut instances = self.services.entry(service_name.to_string()).or_default();
        instances.retain(|i| !(i.host == instance.host && i.port == instance.port));
        instances.push(instance);
    }

    /// Remove an instance; returns whether it was registered.
    ///
    /// The service name is dropped along with its last instance.
    pub fn deregister(&self, service_name: &str, host: &str, port: u16) -> bool {
        let removed = {
            let Some(mut instances) = self.services.get_mut(service_name) else {
                return false;
            };
            let before = instances.len();
            instances.retain(|i| !(i.host == host && i.port == port));
            instances.len() != before
        };

        self.services
            .remove_if(service_name, |_, instances| instances.is_empty());

        if removed {
            info!(service = service_name, host, port, "Deregistered service instance");
        }
        removed
    }

    /// Update the status of an instance; returns whether it was found
    pub fn set_status(&self, service_name: &str, host: &str, port: u16, status: InstanceStatus) -> bool {
        let Some(mut instances) = self.services.get_mut(service_name) else {
            return false;
        };

        match instances.iter_mut().find(|i| i.host == host && i.port == port) {
            Some(instance) => {
                debug!(service = service_name, host, port, status = ?status, "Instance status changed");
                instance.status = status;
                true
            }
            None => false,
        }
    }

    /// Names of all services with at least one registration
    pub fn services(&self) -> Vec<String> {
        self.services.iter().map(|e| e.key().clone()).collect()
    }
}

#[async_trait]
impl DiscoveryClient for InMemoryRegistry {
    async fn list_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>> {
        Ok(self
            .services
            .get(service_name)
            .map(|instances| instances.value().clone())
            .unwrap_or_default())
    }
}

/// Discovery client whose registry is never reachable
#[derive(Debug, Clone, Default)]
pub struct UnreachableRegistry;

#[async_trait]
impl DiscoveryClient for UnreachableRegistry {
    async fn list_instances(&self, _service_name: &str) -> Result<Vec<ServiceInstance>> {
        Err(GuardError::Registry("registry unreachable".to_string()))
    }
}
