//! Network transport abstraction
//!
//! The cache manager never talks to the network directly; it goes through a
//! `Transport` so tests can script responses and failures.

mod http;

pub use http::HttpTransport;

use crate::error::PrecacheResult;
use crate::resource::{ResourceRequest, ResourceResponse};
use async_trait::async_trait;

/// Request/response transport to the origin
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a request.
    ///
    /// Any HTTP status is a successful fetch; only failures to obtain a
    /// response at all (connection refused, DNS, timeout) are errors.
    async fn fetch(&self, request: &ResourceRequest) -> PrecacheResult<ResourceResponse>;

    /// Human-readable description of where requests go
    fn describe(&self) -> String;
}
