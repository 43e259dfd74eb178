pub mod callers;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod guarded;
pub mod locator;
pub mod metrics;
pub mod transport;

use crate::circuit_breaker::BreakerRegistry;
use crate::config::{GuardConfig, LoggingConfig};
use crate::error::Result;
use crate::guarded::GuardedClient;
use crate::locator::{InMemoryRegistry, ServiceLocator};
use crate::transport::HttpTransport;
use std::sync::Arc;
use tracing::info;

/// Build a guarded client from configuration.
///
/// The registry is seeded from `registry.services`; one breaker per
/// dependency is created lazily on first use.
pub fn build_client(config: &GuardConfig) -> Result<GuardedClient> {
    config.validate()?;

    let registry = InMemoryRegistry::from_services(config.registry.services.clone());
    info!(
        service = %config.service.name,
        known_services = registry.services().len(),
        call_timeout_ms = config.call.timeout_ms,
        "Building guarded client"
    );

    let breakers =
        BreakerRegistry::with_overrides(config.circuit_breaker.clone(), config.dependencies.clone());

    Ok(GuardedClient::new(
        ServiceLocator::new(Arc::new(registry)),
        breakers,
        Arc::new(HttpTransport::new()),
    )
    .with_call_timeout(config.call.timeout()))
}

/// Initialize tracing/logging
pub fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_str().into());

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }

    crate::metrics::describe_metrics();
}
