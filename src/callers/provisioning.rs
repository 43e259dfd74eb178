use super::retry::RetryExecutor;
use super::LOGIN_SERVICE;
use crate::error::GuardError;
use crate::guarded::GuardedClient;
use crate::transport::DependencyRequest;
use serde_json::json;
use tracing::{info, warn};

/// Password given to login users created on behalf of a new customer
pub const DEFAULT_LOGIN_PASSWORD: &str = "defaultPassword123";

/// Creates the login user for a freshly created customer.
///
/// Best effort: the customer creation that triggers it never fails because of
/// it.
#[derive(Debug, Clone)]
pub struct UserProvisioner {
    client: GuardedClient,
    retry: RetryExecutor,
    default_password: String,
}

impl UserProvisioner {
    pub fn new(client: GuardedClient, retry: RetryExecutor) -> Self {
        Self {
            client,
            retry,
            default_password: DEFAULT_LOGIN_PASSWORD.to_string(),
        }
    }

    pub fn with_default_password(mut self, password: impl Into<String>) -> Self {
        self.default_password = password.into();
        self
    }

    /// Create the login user; returns whether the login service accepted it
    pub async fn provision_login(&self, customer_id: &str) -> bool {
        let request = DependencyRequest::post(
            "/login/createuser",
            json!({ "customerid": customer_id, "password": self.default_password }),
        );

        let client = &self.client;
        let request = &request;
        let result = self
            .retry
            .execute_with_predicate(
                move || client.try_call(LOGIN_SERVICE, request),
                GuardError::is_retryable,
            )
            .await;

        match result {
            Ok(_) => {
                info!(customer_id, "Login user provisioned");
                true
            }
            Err(e) => {
                warn!(
                    customer_id,
                    reason = e.kind(),
                    error = %e,
                    "Could not create user in login service"
                );
                false
            }
        }
    }
}
