//! Request and response values passed across the cache boundaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A request intercepted from the hosting page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// HTTP method, upper case
    pub method: String,
    /// Path relative to the origin, including any query string
    pub path: String,
    /// Request headers forwarded to the origin, lower-cased names
    pub headers: BTreeMap<String, String>,
    /// Request body forwarded to the origin
    pub body: Vec<u8>,
}

impl ResourceRequest {
    /// Create a GET request for a path
    pub fn get(path: impl Into<String>) -> Self {
        Self::with_method("GET", path)
    }

    /// Create a request with an explicit method
    pub fn with_method(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// Add a header (name is lower-cased)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a request body
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Key used to look the request up in a store.
    ///
    /// Only GET requests are ever matched against cached entries.
    pub fn cache_key(&self) -> Option<&str> {
        if self.method == "GET" {
            Some(&self.path)
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A response, either fresh from the network or replayed from a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, lower-cased names
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
}

impl ResourceResponse {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a header (name is lower-cased)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Result of a fetch-intercept
#[derive(Debug, Clone)]
pub struct Served {
    pub source: ResponseSource,
    pub response: ResourceResponse,
}

/// A response as held by a named store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// Request key the entry was stored under
    pub key: String,
    pub response: ResourceResponse,
    /// When the entry was written
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    pub fn new(key: impl Into<String>, response: ResourceResponse) -> Self {
        Self {
            key: key.into(),
            response,
            cached_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_requests_have_cache_keys() {
        assert_eq!(ResourceRequest::get("/a.css").cache_key(), Some("/a.css"));
        assert_eq!(
            ResourceRequest::with_method("get", "/a.css").cache_key(),
            Some("/a.css")
        );
        assert!(ResourceRequest::with_method("POST", "/contact")
            .cache_key()
            .is_none());
    }

    #[test]
    fn request_carries_headers_and_body() {
        let request = ResourceRequest::with_method("post", "/contact")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("name=Ana&message=hi");

        assert_eq!(request.method, "POST");
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.body, b"name=Ana&message=hi");
        assert_eq!(request.to_string(), "POST /contact");
    }

    #[test]
    fn response_status_classes() {
        assert!(ResourceResponse::new(200, "ok").is_success());
        assert!(ResourceResponse::new(204, Vec::new()).is_success());
        assert!(!ResourceResponse::new(304, Vec::new()).is_success());
        assert!(!ResourceResponse::new(404, "missing").is_success());
    }

    #[test]
    fn headers_are_lower_cased() {
        let response = ResourceResponse::new(200, "body").with_header("Content-Type", "text/css");
        assert_eq!(response.content_type(), Some("text/css"));
    }
}
