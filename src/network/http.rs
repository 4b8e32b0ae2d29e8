//! HTTP transport against a single origin

use super::Transport;
use crate::config::schema::OriginConfig;
use crate::error::{PrecacheError, PrecacheResult};
use crate::resource::{ResourceRequest, ResourceResponse};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use ureq::{http, Agent};

/// Blocking `ureq` agent driven from the tokio blocking pool
#[derive(Clone)]
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the configured origin
    pub fn new(origin: &OriginConfig) -> Self {
        // Zero disables the timeout
        let timeout = (origin.timeout_secs > 0).then(|| Duration::from_secs(origin.timeout_secs));
        let agent: Agent = Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: origin.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for an origin-relative path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Issue `request` against `url`, forwarding its method, headers and body
    fn fetch_blocking(
        agent: &Agent,
        request: &ResourceRequest,
        url: &str,
    ) -> PrecacheResult<ResourceResponse> {
        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // Bodyless requests go out without a body so GET and HEAD stay valid
        let result = if request.body.is_empty() {
            let outgoing = builder
                .body(())
                .map_err(|e| PrecacheError::network(url, format!("invalid request: {}", e)))?;
            agent.run(outgoing)
        } else {
            let outgoing = builder
                .body(request.body.as_slice())
                .map_err(|e| PrecacheError::network(url, format!("invalid request: {}", e)))?;
            agent.run(outgoing)
        };

        let mut response = result.map_err(|e| PrecacheError::network(url, e.to_string()))?;

        let status = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| PrecacheError::network(url, format!("reading body: {}", e)))?;

        Ok(ResourceResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &ResourceRequest) -> PrecacheResult<ResourceResponse> {
        let url = self.url_for(&request.path);
        let outgoing = request.clone();
        let agent = self.agent.clone();

        debug!("{} {}", request.method, url);
        let task_url = url.clone();
        let response =
            tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &outgoing, &task_url))
                .await
                .map_err(|e| PrecacheError::Internal(format!("fetch task for {}: {}", url, e)))??;

        debug!("{} -> {}", url, response.status);
        Ok(response)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
