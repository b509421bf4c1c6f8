//! Public IP detection.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Source of the current public IP address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Fetch the current public IP.
    ///
    /// The address is returned as reported, trimmed, without format checks.
    async fn resolve(&self) -> Result<String>;
}

/// IP detector backed by a plain-text "what is my IP" service.
pub struct IpDetector {
    client: reqwest::Client,
    service: String,
}

impl IpDetector {
    /// Create a detector for `service` with a per-request timeout.
    pub fn new(service: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DdnsError::Config(format!("building HTTP client: {}", e)))?;

        Ok(Self { client, service })
    }

    /// Service URL this detector queries.
    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl IpResolver for IpDetector {
    async fn resolve(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.service)
            .send()
            .await
            .map_err(|e| {
                DdnsError::Resolution(format!("request to {} failed: {}", self.service, e))
            })?;

        if !response.status().is_success() {
            return Err(DdnsError::ResolutionStatus(response.status().as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DdnsError::Resolution(format!("reading response: {}", e)))?;
        let ip = text.trim();

        if ip.is_empty() {
            return Err(DdnsError::Resolution(format!(
                "empty response from {}",
                self.service
            )));
        }

        tracing::debug!(ip, service = %self.service, "Resolved public IP");
        Ok(ip.to_string())
    }
}
