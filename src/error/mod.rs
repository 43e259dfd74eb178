use std::time::Duration;
use thiserror::Error;

/// Result type for dependency guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Dependency guard error types
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Dependency unavailable: no endpoint resolved for {0}")]
    DependencyUnavailable(String),

    #[error("Circuit breaker open for {0}")]
    CircuitOpen(String),

    /// The dependency answered, but refused the request (4xx)
    #[error("{dependency} rejected the request with status {status}")]
    Rejected { dependency: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    /// Short machine-friendly label used for log fields and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            GuardError::Config(_) => "config",
            GuardError::Registry(_) => "registry",
            GuardError::DependencyUnavailable(_) => "dependency_unavailable",
            GuardError::CircuitOpen(_) => "circuit_open",
            GuardError::Rejected { .. } => "rejected",
            GuardError::Transport(TransportError::Timeout(_)) => "timeout",
            GuardError::Transport(_) => "transport",
            GuardError::Io(_) => "io",
        }
    }

    /// Whether a caller-side retry could change the outcome
    pub fn is_retryable(&self) -> bool {
        match self {
            GuardError::Transport(TransportError::Status(status)) => !(400..=499).contains(status),
            GuardError::Transport(_) => true,
            _ => false,
        }
    }
}

/// Failure of the underlying transport call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Error returned by `CircuitBreaker::execute`
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CallError<E> {
    /// Rejected without invoking the operation
    #[error("circuit open for {dependency}")]
    CircuitOpen { dependency: String },

    /// The operation ran and failed; its error is passed through unchanged
    #[error(transparent)]
    Operation(E),
}

impl<E> CallError<E> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, CallError::CircuitOpen { .. })
    }

    /// Unwrap the operation's own error, if the operation ran
    pub fn into_operation(self) -> Option<E> {
        match self {
            CallError::Operation(e) => Some(e),
            CallError::CircuitOpen { .. } => None,
        }
    }
}

impl From<CallError<TransportError>> for GuardError {
    fn from(err: CallError<TransportError>) -> Self {
        match err {
            CallError::CircuitOpen { dependency } => GuardError::CircuitOpen(dependency),
            CallError::Operation(e) => GuardError::Transport(e),
        }
    }
}
