pub mod instance;
pub mod registry;

pub use instance::{InstanceStatus, ServiceEndpoint, ServiceInstance};
pub use registry::{DiscoveryClient, InMemoryRegistry, UnreachableRegistry};

use crate::metrics;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves logical service names to endpoints through a discovery client
#[derive(Clone)]
pub struct ServiceLocator {
    discovery: Arc<dyn DiscoveryClient>,
}

impl std::fmt::Debug for ServiceLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLocator")
            .field("discovery", &"<dyn DiscoveryClient>")
            .finish()
    }
}

impl ServiceLocator {
    pub fn new(discovery: Arc<dyn DiscoveryClient>) -> Self {
        Self { discovery }
    }

    /// Resolve a logical service name to the first healthy instance.
    ///
    /// Never fails: an empty name, an unknown service, a registry with no
    /// healthy instance, or an unreachable registry all yield `None`.
    pub async fn resolve(&self, service_name: &str) -> Option<ServiceEndpoint> {
        if service_name.trim().is_empty() {
            warn!("Refusing to resolve an empty service name");
            return None;
        }

        let instances = match self.discovery.list_instances(service_name).await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(
                    service = service_name,
                    error = %e,
                    "Failed to get service instances"
                );
                metrics::record_resolve_miss(service_name);
                return None;
            }
        };

        let endpoint = instances
            .iter()
            .find(|instance| instance.is_healthy())
            .map(ServiceInstance::endpoint);

        match &endpoint {
            Some(endpoint) => debug!(
                service = service_name,
                endpoint = %endpoint,
                known_instances = instances.len(),
                "Resolved service endpoint"
            ),
            None => {
                debug!(
                    service = service_name,
                    known_instances = instances.len(),
                    "No healthy instance registered"
                );
                metrics::record_resolve_miss(service_name);
            }
        }

        endpoint
    }
}
