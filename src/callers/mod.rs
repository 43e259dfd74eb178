//! Call sites that put the guarded client to work.
//!
//! The same guarded call backs opposite policies: order intake refuses to
//! proceed without customer data, authentication proceeds on local
//! credentials alone. Retries live here rather than in the guarded client.

pub mod auth;
pub mod order;
pub mod provisioning;
pub mod retry;

pub use auth::{AuthError, AuthResponse, Authenticator, CredentialStore, InMemoryCredentialStore};
pub use order::{Order, OrderError, OrderIntake, OrderItem, OrderRequest};
pub use provisioning::UserProvisioner;
pub use retry::{RetryConfig, RetryExecutor};

/// Logical name of the customer service
pub const USER_MANAGEMENT_SERVICE: &str = "USER-MANAGEMENT-SERVICE";

/// Logical name of the login service
pub const LOGIN_SERVICE: &str = "LOGIN-SERVICE";
