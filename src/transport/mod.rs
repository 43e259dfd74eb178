use crate::error::TransportError;
use crate::locator::ServiceEndpoint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// HTTP method for a dependency call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request parameters for one dependency call, independent of the endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRequest {
    pub method: Method,
    /// Path on the dependency, e.g. "/customer/findcustomerbyid"
    pub path: String,
    #[serde(default)]
    pub query: Vec<(String, String)>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl DependencyRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Full URL of this request against a resolved endpoint
    pub fn url_for(&self, endpoint: &ServiceEndpoint) -> Result<Url, TransportError> {
        let mut url = Url::parse(&endpoint.base_url())
            .and_then(|base| base.join(&self.path))
            .map_err(|e| TransportError::Request(format!("invalid url: {}", e)))?;

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }

        Ok(url)
    }
}

/// Response payload from a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl DependencyResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// Performs one network call to a resolved endpoint.
///
/// Implementations return `Err` only when the dependency itself is unhealthy
/// (unreachable, timed out, 5xx, undecodable success body). A 4xx answer is a
/// response like any other.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &ServiceEndpoint,
        request: &DependencyRequest,
        timeout: Duration,
    ) -> Result<DependencyResponse, TransportError>;
}

/// JSON-over-HTTP transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &ServiceEndpoint,
        request: &DependencyRequest,
        timeout: Duration,
    ) -> Result<DependencyResponse, TransportError> {
        let url = request.url_for(endpoint)?;

        debug!(
            method = ?request.method,
            url = %url,
            "Sending dependency request"
        );

        let mut builder = self
            .client
            .request(request.method.as_reqwest(), url)
            .timeout(timeout);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| classify(e, timeout))?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else if status.is_success() {
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?
        } else {
            // Error bodies are informational and may not be JSON
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        Ok(DependencyResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_decode() {
        TransportError::Decode(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_building() {
        let endpoint = ServiceEndpoint::new("10.0.0.1", 8082);
        let request = DependencyRequest::get("/customer/findcustomerbyid").with_query("customerid", "42 a");

        let url = request.url_for(&endpoint).unwrap();
        assert_eq!(
            url.as_str(),
            "http://10.0.0.1:8082/customer/findcustomerbyid?customerid=42+a"
        );
    }

    #[test]
    fn test_url_without_query() {
        let endpoint = ServiceEndpoint::new("login", 8081);
        let request = DependencyRequest::post("/login/createuser", json!({"customerid": "1"}));

        let url = request.url_for(&endpoint).unwrap();
        assert_eq!(url.as_str(), "http://login:8081/login/createuser");
        assert_eq!(request.method, Method::Post);
    }

    #[test]
    fn test_url_for_ipv6_endpoint() {
        let endpoint = ServiceEndpoint::new("::1", 8082);
        let request = DependencyRequest::get("/customer/findcustomerbyid").with_query("customerid", "1001");

        let url = request.url_for(&endpoint).unwrap();
        assert_eq!(
            url.as_str(),
            "http://[::1]:8082/customer/findcustomerbyid?customerid=1001"
        );
    }

    #[test]
    fn test_response_success_range() {
        let response = |status| DependencyResponse {
            status,
            body: serde_json::Value::Null,
        };
        assert!(response(200).is_success());
        assert!(response(204).is_success());
        assert!(!response(404).is_success());
        assert!(!response(409).is_success());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(Method::Get.as_reqwest(), reqwest::Method::GET);
        assert_eq!(Method::Delete.as_reqwest(), reqwest::Method::DELETE);
    }
}
