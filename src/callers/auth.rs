use super::USER_MANAGEMENT_SERVICE;
use crate::guarded::GuardedClient;
use crate::transport::DependencyRequest;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Authentication errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials payload: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Authentication failed for {0}: credentials do not match")]
    AuthenticationMismatch(String),
}

/// Outcome of a successful authentication; mismatches are `AuthError`s
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub customer_id: String,
    /// Whether the customer service confirmed the customer
    pub customer_confirmed: bool,
}

/// Local credential storage
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Stored digest for a customer, if registered
    async fn digest(&self, customer_id: &str) -> Option<String>;

    /// Store a digest; returns false if the customer is already registered
    async fn insert(&self, customer_id: &str, digest: String) -> bool;
}

/// Credential store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    digests: Arc<DashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn digest(&self, customer_id: &str) -> Option<String> {
        self.digests.get(customer_id).map(|d| d.value().clone())
    }

    async fn insert(&self, customer_id: &str, digest: String) -> bool {
        match self.digests.entry(customer_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(digest);
                true
            }
        }
    }
}

/// Salted SHA-256 digest of a password, hex encoded
pub fn digest_password(customer_id: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(customer_id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn validate_credentials(customer_id: &str, password: &str) -> Result<(), AuthError> {
    let mut errors = Vec::new();
    if customer_id.trim().is_empty() {
        errors.push("Customer ID is required".to_string());
    }
    if password.is_empty() {
        errors.push("Password is required".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(errors))
    }
}

/// Login front end. Fails open: an unreachable customer service does not block
/// a user whose local credentials check out.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    client: GuardedClient,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("store", &"<dyn CredentialStore>")
            .field("client", &self.client)
            .finish()
    }
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, client: GuardedClient) -> Self {
        Self { store, client }
    }

    /// Register login credentials for a customer
    pub async fn register(&self, customer_id: &str, password: &str) -> Result<(), AuthError> {
        validate_credentials(customer_id, password)?;

        let digest = digest_password(customer_id, password);
        if !self.store.insert(customer_id, digest).await {
            return Err(AuthError::UserAlreadyExists(customer_id.to_string()));
        }

        info!(customer_id, "Login user created");
        Ok(())
    }

    /// Verify credentials locally, then confirm the customer remotely if possible
    pub async fn authenticate(
        &self,
        customer_id: &str,
        password: &str,
    ) -> Result<AuthResponse, AuthError> {
        validate_credentials(customer_id, password)?;

        let stored = self
            .store
            .digest(customer_id)
            .await
            .ok_or_else(|| AuthError::UserNotFound(customer_id.to_string()))?;

        if stored != digest_password(customer_id, password) {
            warn!(customer_id, "Password mismatch");
            return Err(AuthError::AuthenticationMismatch(customer_id.to_string()));
        }

        let lookup = DependencyRequest::get("/customer/findcustomerbyid")
            .with_query("customerid", customer_id);
        let customer_confirmed = self
            .client
            .call_dependency(USER_MANAGEMENT_SERVICE, &lookup)
            .await
            .is_some();

        if !customer_confirmed {
            warn!(
                customer_id,
                "Could not confirm customer, continuing with local credentials"
            );
        }

        Ok(AuthResponse {
            customer_id: customer_id.to_string(),
            customer_confirmed,
        })
    }
}
