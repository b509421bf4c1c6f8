//! DNS provider client.

mod dreamhost;


pub use dreamhost::DreamhostProvider;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A record as reported by the provider's list call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Fully qualified record name.
    pub record: String,
    /// Record type.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Current value.
    pub value: String,
}

/// Primitive record operations against a DNS provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &'static str;

    /// List every record the account manages.
    async fn list_records(&self) -> Result<Vec<ProviderRecord>>;

    /// Add a record.
    async fn add_record(&self, fqdn: &str, record_type: &str, value: &str) -> Result<()>;

    /// Remove a record. `value` narrows the removal to one record value.
    async fn remove_record(
        &self,
        fqdn: &str,
        record_type: &str,
        value: Option<String>,
    ) -> Result<()>;
}

/// Current value of `(fqdn, record_type)`, or `None` when no such record exists.
pub async fn lookup_current_value<P>(
    provider: &P,
    fqdn: &str,
    record_type: &str,
) -> Result<Option<String>>
where
    P: DnsProvider + ?Sized,
{
    let records = provider.list_records().await?;

    Ok(records
        .into_iter()
        .find(|r| r.record == fqdn && r.record_type == record_type)
        .map(|r| r.value))
}

/// Point `(fqdn, record_type)` at `new_value`.
///
/// The provider has no upsert, so this is a best-effort remove of
/// `old_value` followed by an add. Only the add can fail the update.
pub async fn update_record<P>(
    provider: &P,
    fqdn: &str,
    record_type: &str,
    new_value: &str,
    old_value: Option<&str>,
) -> Result<()>
where
    P: DnsProvider + ?Sized,
{
    if let Err(e) = provider
        .remove_record(fqdn, record_type, old_value.map(str::to_string))
        .await
    {
        tracing::warn!(
            provider = provider.name(),
            fqdn,
            record_type,
            error = %e,
            "Failed to remove existing record (might not exist)"
        );
    }

    provider.add_record(fqdn, record_type, new_value).await
}
