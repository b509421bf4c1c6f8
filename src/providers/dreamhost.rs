//! Dreamhost DNS API client.

use super::{DnsProvider, ProviderRecord};
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const CMD_LIST: &str = "dns-list_records";
const CMD_ADD: &str = "dns-add_record";
const CMD_REMOVE: &str = "dns-remove_record";

/// Dreamhost DNS provider.
pub struct DreamhostProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Envelope every Dreamhost command answers with.
#[derive(Debug, Deserialize)]
struct DreamhostResponse {
    result: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    reason: Option<String>,
}

impl DreamhostResponse {
    fn is_success(&self) -> bool {
        self.result == "success"
    }

    fn error_message(&self) -> String {
        match (&self.data, &self.reason) {
            (serde_json::Value::String(data), Some(reason)) => format!("{}: {}", data, reason),
            (serde_json::Value::String(data), None) => data.clone(),
            (_, Some(reason)) => reason.clone(),
            _ => "Unknown error".to_string(),
        }
    }
}

impl DreamhostProvider {
    /// Create a new Dreamhost provider.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DdnsError::Config(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// Issue one API command and decode its envelope.
    ///
    /// Transport failures, non-200 statuses, undecodable bodies and
    /// `"result": "error"` envelopes all surface as provider errors.
    async fn call(&self, cmd: &str, params: &[(&str, &str)]) -> Result<DreamhostResponse> {
        let mut query: Vec<(&str, &str)> = vec![
            ("key", self.api_key.as_str()),
            ("cmd", cmd),
            ("format", "json"),
        ];
        query.extend_from_slice(params);

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| DdnsError::provider(cmd, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DdnsError::provider(
                cmd,
                format!("HTTP {} from Dreamhost API", status.as_u16()),
            ));
        }

        let body: DreamhostResponse = response
            .json()
            .await
            .map_err(|e| DdnsError::provider(cmd, format!("decoding response: {}", e)))?;

        if !body.is_success() {
            return Err(DdnsError::provider(cmd, body.error_message()));
        }

        Ok(body)
    }
}

#[async_trait]
impl DnsProvider for DreamhostProvider {
    fn name(&self) -> &'static str {
        "dreamhost"
    }

    async fn list_records(&self) -> Result<Vec<ProviderRecord>> {
        let body = self.call(CMD_LIST, &[]).await?;

        serde_json::from_value(body.data)
            .map_err(|e| DdnsError::provider(CMD_LIST, format!("malformed record list: {}", e)))
    }

    async fn add_record(&self, fqdn: &str, record_type: &str, value: &str) -> Result<()> {
        self.call(
            CMD_ADD,
            &[("record", fqdn), ("type", record_type), ("value", value)],
        )
        .await?;
        Ok(())
    }

    async fn remove_record(
        &self,
        fqdn: &str,
        record_type: &str,
        value: Option<String>,
    ) -> Result<()> {
        let mut params = vec![("record", fqdn), ("type", record_type)];
        if let Some(value) = value.as_deref() {
            params.push(("value", value));
        }

        self.call(CMD_REMOVE, &params).await?;
        Ok(())
    }
}
