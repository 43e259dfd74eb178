use crate::circuit_breaker::BreakerRegistry;
use crate::error::{GuardError, Result, TransportError};
use crate::locator::ServiceLocator;
use crate::metrics::CallTimer;
use crate::transport::{DependencyRequest, DependencyResponse, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

/// Default per-call budget
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Locator, breaker and timeout composed around one dependency call.
///
/// The client is policy-neutral: every failure becomes `None`, and the call
/// site decides whether missing data is fatal.
#[derive(Clone)]
pub struct GuardedClient {
    locator: ServiceLocator,
    breakers: BreakerRegistry,
    transport: Arc<dyn Transport>,
    call_timeout: Duration,
}

impl std::fmt::Debug for GuardedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedClient")
            .field("locator", &self.locator)
            .field("breakers", &self.breakers)
            .field("transport", &"<dyn Transport>")
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl GuardedClient {
    pub fn new(
        locator: ServiceLocator,
        breakers: BreakerRegistry,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            locator,
            breakers,
            transport,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Call a dependency, degrading to `None` on any failure.
    ///
    /// A failure is logged once at error level with the dependency name and
    /// the reason; it is never returned to the caller.
    pub async fn call_dependency(
        &self,
        service_name: &str,
        request: &DependencyRequest,
    ) -> Option<DependencyResponse> {
        match self.try_call(service_name, request).await {
            Ok(response) => Some(response),
            Err(e) => {
                error!(
                    dependency = service_name,
                    reason = e.kind(),
                    error = %e,
                    "Dependency call failed, continuing on degraded path"
                );
                None
            }
        }
    }

    /// Call a dependency and report why it failed, without logging the failure.
    ///
    /// Meant for callers that apply their own retry policy on top.
    pub async fn try_call(
        &self,
        service_name: &str,
        request: &DependencyRequest,
    ) -> Result<DependencyResponse> {
        let span = info_span!(
            "guarded_call",
            dependency = service_name,
            call_id = %Uuid::new_v4()
        );

        async {
            let timer = CallTimer::new(service_name);
            let result = self.guarded(service_name, request).await;
            timer.record(match &result {
                Ok(_) => "success",
                Err(e) => e.kind(),
            });
            result
        }
        .instrument(span)
        .await
    }

    async fn guarded(
        &self,
        service_name: &str,
        request: &DependencyRequest,
    ) -> Result<DependencyResponse> {
        let endpoint = self
            .locator
            .resolve(service_name)
            .await
            .ok_or_else(|| GuardError::DependencyUnavailable(service_name.to_string()))?;

        let breaker = self.breakers.breaker(service_name);
        let transport = self.transport.as_ref();
        let endpoint = &endpoint;
        let call_timeout = self.call_timeout;

        let response = breaker
            .execute(move || async move {
                match tokio::time::timeout(
                    call_timeout,
                    transport.send(endpoint, request, call_timeout),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(call_timeout)),
                }
            })
            .await?;

        // The dependency answered, so the breaker saw a success
        if !response.is_success() {
            debug!(
                endpoint = %endpoint,
                status = response.status,
                "Dependency rejected the request"
            );
            return Err(GuardError::Rejected {
                dependency: service_name.to_string(),
                status: response.status,
            });
        }

        debug!(
            endpoint = %endpoint,
            status = response.status,
            "Dependency call succeeded"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::locator::{InMemoryRegistry, ServiceEndpoint, ServiceInstance, UnreachableRegistry};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Transport that answers from a fixed script and counts invocations
    struct ScriptedTransport {
        calls: AtomicU32,
        fail: bool,
        delay: Option<Duration>,
        status: u16,
    }

    impl ScriptedTransport {
        fn ok() -> Self {
            Self {
                calls: AtomicU32::new(0),
                fail: false,
                delay: None,
                status: 200,
            }
        }

        fn answering(status: u16) -> Self {
            Self {
                status,
                ..Self::ok()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::ok()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            endpoint: &ServiceEndpoint,
            request: &DependencyRequest,
            _timeout: Duration,
        ) -> std::result::Result<DependencyResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(TransportError::Connect("connection refused".to_string()));
            }
            Ok(DependencyResponse {
                status: self.status,
                body: json!({ "endpoint": endpoint.to_string(), "path": request.path }),
            })
        }
    }

    fn client(transport: Arc<ScriptedTransport>, failure_threshold: u32) -> GuardedClient {
        let registry = InMemoryRegistry::new();
        registry.register("USER-MANAGEMENT-SERVICE", ServiceInstance::new("10.0.0.1", 8082));

        GuardedClient::new(
            ServiceLocator::new(Arc::new(registry)),
            BreakerRegistry::new(CircuitBreakerConfig {
                failure_threshold,
                ..Default::default()
            }),
            transport,
        )
    }

    #[tokio::test]
    async fn test_call_dependency_success() {
        let transport = Arc::new(ScriptedTransport::ok());
        let client = client(transport.clone(), 5);

        let response = client
            .call_dependency(
                "USER-MANAGEMENT-SERVICE",
                &DependencyRequest::get("/customer/findcustomerbyid"),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body["endpoint"], "10.0.0.1:8082");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unresolved_dependency_is_none() {
        let transport = Arc::new(ScriptedTransport::ok());
        let client = client(transport.clone(), 5);

        let result = client
            .try_call("UNKNOWN-SERVICE", &DependencyRequest::get("/"))
            .await;
        assert!(matches!(result, Err(GuardError::DependencyUnavailable(ref name)) if name == "UNKNOWN-SERVICE"));

        let response = client
            .call_dependency("UNKNOWN-SERVICE", &DependencyRequest::get("/"))
            .await;
        assert!(response.is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        // No breaker is created for a dependency that never resolved
        assert!(client.breakers().metrics("UNKNOWN-SERVICE").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_none() {
        let transport = Arc::new(ScriptedTransport::ok());
        let client = GuardedClient::new(
            ServiceLocator::new(Arc::new(UnreachableRegistry)),
            BreakerRegistry::new(CircuitBreakerConfig::default()),
            transport.clone(),
        );

        let response = client
            .call_dependency("USER-MANAGEMENT-SERVICE", &DependencyRequest::get("/"))
            .await;
        assert!(response.is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_open_breaker_skips_transport() {
        let transport = Arc::new(ScriptedTransport::failing());
        let client = client(transport.clone(), 2);
        let request = DependencyRequest::get("/customer/findcustomerbyid");

        for _ in 0..2 {
            let result = client.try_call("USER-MANAGEMENT-SERVICE", &request).await;
            assert!(matches!(result, Err(GuardError::Transport(TransportError::Connect(_)))));
        }
        assert_eq!(
            client.breakers().state("USER-MANAGEMENT-SERVICE"),
            CircuitState::Open
        );

        let result = client.try_call("USER-MANAGEMENT-SERVICE", &request).await;
        assert!(matches!(result, Err(GuardError::CircuitOpen(_))));
        assert!(client
            .call_dependency("USER-MANAGEMENT-SERVICE", &request)
            .await
            .is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let transport = Arc::new(ScriptedTransport::slow(Duration::from_secs(30)));
        let client = client(transport.clone(), 1).with_call_timeout(Duration::from_millis(100));

        let result = client
            .try_call("USER-MANAGEMENT-SERVICE", &DependencyRequest::get("/"))
            .await;

        assert!(matches!(
            result,
            Err(GuardError::Transport(TransportError::Timeout(d))) if d == Duration::from_millis(100)
        ));
        assert_eq!(
            client.breakers().state("USER-MANAGEMENT-SERVICE"),
            CircuitState::Open
        );
    }

    #[tokio::test]
    async fn test_client_errors_do_not_trip_breaker() {
        let transport = Arc::new(ScriptedTransport::answering(404));
        let client = client(transport.clone(), 2);
        let request = DependencyRequest::get("/customer/findcustomerbyid");

        for _ in 0..5 {
            let result = client.try_call("USER-MANAGEMENT-SERVICE", &request).await;
            assert!(matches!(
                result,
                Err(GuardError::Rejected { status: 404, ref dependency }) if dependency == "USER-MANAGEMENT-SERVICE"
            ));
        }

        assert_eq!(transport.calls.load(Ordering::SeqCst), 5);
        assert_eq!(
            client.breakers().state("USER-MANAGEMENT-SERVICE"),
            CircuitState::Closed
        );
        let metrics = client.breakers().metrics("USER-MANAGEMENT-SERVICE").unwrap();
        assert_eq!(metrics.failed_requests, 0);
        assert_eq!(metrics.successful_requests, 5);
    }

    #[test]
    fn test_default_call_timeout() {
        let client = client(Arc::new(ScriptedTransport::ok()), 5);
        assert_eq!(client.call_timeout(), Duration::from_secs(5));
    }
}
