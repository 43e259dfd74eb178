use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry-reported status of a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    #[default]
    Up,
    Down,
    Starting,
    OutOfService,
}

/// One registered instance of a logical service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Host name or IP address
    pub host: String,
    /// Port the instance listens on
    pub port: u16,
    /// Current status as reported by the registry
    #[serde(default)]
    pub status: InstanceStatus,
}

impl ServiceInstance {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            status: InstanceStatus::Up,
        }
    }

    pub fn with_status(mut self, status: InstanceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == InstanceStatus::Up
    }

    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Resolved network address for a logical service name.
///
/// Produced per lookup and discarded after the call that used it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL for plain HTTP calls
    pub fn base_url(&self) -> String {
        format!("http://{}", self)
    }
}

/// `host:port`, with IPv6 literals bracketed
impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
