//! HTTP transport module
//!
//! Every request the crate makes goes through the [`HttpTransport`] trait. The
//! production implementation wraps a blocking `reqwest` client, tests swap in a
//! stub serving canned responses.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while talking to an upstream service
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the response body could not be read
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The server answered with a non-success status code
    #[error("HTTP {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The response body was not the JSON we expected
    #[error("Failed to decode response from {url}: {source}")]
    DecodeFailed {
        url: String,
        source: serde_json::Error,
    },
}

/// A fully buffered HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The URL that was requested
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

impl HttpResponse {
    /// Returns true for 2xx status codes
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-2xx response into [`TransportError::UnexpectedStatus`]
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::UnexpectedStatus {
                url: self.url,
                status: self.status,
            })
        }
    }

    /// Deserializes the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_str(&self.body).map_err(|e| TransportError::DecodeFailed {
            url: self.url.clone(),
            source: e,
        })
    }
}

/// Blocking HTTP client abstraction
///
/// Implementors perform exactly one request per call and never retry.
pub trait HttpTransport: Send + Sync {
    /// Sends a GET request with the given extra headers
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;

    /// Sends a POST request with a JSON body and the given extra headers
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;
}

/// Transport handle shared between the resolvers and the catalog client
pub type SharedTransport = Arc<dyn HttpTransport>;

/// [`HttpTransport`] backed by `reqwest::blocking::Client`
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Creates a transport that identifies itself with `user_agent`
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::RequestFailed {
                url: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    fn buffer(
        url: &str,
        result: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<HttpResponse, TransportError> {
        let response = result.map_err(|e| TransportError::RequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError::RequestFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(HttpResponse {
            url: url.to_string(),
            status,
            body,
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        Self::buffer(url, request.send())
    }

    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        Self::buffer(url, request.send())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            url: "https://example.invalid/".to_string(),
            status: 204,
            body: String::new(),
        };
        assert!(ok.error_for_status().is_ok());

        let missing = HttpResponse {
            url: "https://example.invalid/".to_string(),
            status: 404,
            body: String::new(),
        };
        match missing.error_for_status() {
            Err(TransportError::UnexpectedStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_json_decode_failure() {
        let response = HttpResponse {
            url: "https://example.invalid/".to_string(),
            status: 200,
            body: "<html>".to_string(),
        };
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(result, Err(TransportError::DecodeFailed { .. })));
    }

    #[test]
    fn test_stub_longest_prefix_wins() {
        let stub = stub::StubTransport::new()
            .route("https://a.invalid/", 200, "short")
            .route("https://a.invalid/items/", 200, "long");

        let response = stub.get("https://a.invalid/items/1", &[]).unwrap();
        assert_eq!(response.body, "long");
        assert!(stub.get("https://b.invalid/", &[]).is_err());
        assert_eq!(stub.requests().len(), 2);
    }
}
