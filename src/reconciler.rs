//! One reconciliation pass: public IP in, DNS records out.

use crate::config::DomainConfig;
use crate::detector::IpResolver;
use crate::error::{DdnsError, Result};
use crate::providers::{lookup_current_value, update_record, DnsProvider};
use crate::state::State;
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// What a successful pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Public IP the pass reconciled against.
    pub public_ip: String,
    /// Records rewritten this pass.
    pub updated: Vec<String>,
    /// Records that already pointed at the public IP.
    pub unchanged: Vec<String>,
}

/// Brings every configured record in line with the current public IP.
///
/// Holds no state between passes; the caller owns [`State`] and passes it in.
pub struct Reconciler {
    resolver: Box<dyn IpResolver>,
    provider: Box<dyn DnsProvider>,
    domains: Vec<DomainConfig>,
    state_path: PathBuf,
}

impl Reconciler {
    /// Create a reconciler over `domains`, persisting to `state_path`.
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        domains: Vec<DomainConfig>,
        state_path: PathBuf,
    ) -> Self {
        Self {
            resolver,
            provider,
            domains,
            state_path,
        }
    }

    /// Configured domains, in update order.
    pub fn domains(&self) -> &[DomainConfig] {
        &self.domains
    }

    /// Run one pass.
    ///
    /// `state` is only modified, and only saved, when every domain ended up
    /// current. A failed or cancelled pass leaves it untouched so the next
    /// pass retries everything.
    pub async fn run_once(
        &self,
        cancel: &CancellationToken,
        state: &mut State,
    ) -> Result<PassReport> {
        let current_ip = cancellable(cancel, self.resolver.resolve()).await?;
        tracing::debug!(ip = %current_ip, "Current IP");

        if current_ip != state.last_public_ip {
            tracing::info!(old = %state.last_public_ip, new = %current_ip, "IP changed");
        }

        let mut next = state.clone();
        let mut report = PassReport {
            public_ip: current_ip.clone(),
            ..PassReport::default()
        };
        let mut failures = 0usize;

        for domain in &self.domains {
            let fqdn = domain.fqdn();

            let live = match cancellable(
                cancel,
                lookup_current_value(self.provider.as_ref(), &fqdn, &domain.record_type),
            )
            .await
            {
                Ok(value) => value,
                Err(DdnsError::Cancelled) => return Err(DdnsError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        domain = %domain.name,
                        record = %domain.record,
                        error = %e,
                        "Failed to get current DNS record, will update anyway"
                    );
                    None
                }
            };

            if live.as_deref() == Some(current_ip.as_str()) {
                tracing::debug!(
                    domain = %domain.name,
                    record = %domain.record,
                    ip = %current_ip,
                    "DNS record already up to date"
                );
                next.records.insert(fqdn.clone(), current_ip.clone());
                report.unchanged.push(fqdn);
                continue;
            }

            let old_value = live
                .filter(|v| !v.is_empty())
                .or_else(|| next.records.get(&fqdn).cloned());

            tracing::info!(
                domain = %domain.name,
                record = %domain.record,
                old_ip = old_value.as_deref().unwrap_or(""),
                new_ip = %current_ip,
                "Updating DNS record"
            );

            match cancellable(
                cancel,
                update_record(
                    self.provider.as_ref(),
                    &fqdn,
                    &domain.record_type,
                    &current_ip,
                    old_value.as_deref(),
                ),
            )
            .await
            {
                Ok(()) => {
                    tracing::info!(
                        domain = %domain.name,
                        record = %domain.record,
                        ip = %current_ip,
                        "Successfully updated DNS record"
                    );
                    next.records.insert(fqdn.clone(), current_ip.clone());
                    report.updated.push(fqdn);
                }
                Err(DdnsError::Cancelled) => return Err(DdnsError::Cancelled),
                Err(e) => {
                    tracing::error!(
                        domain = %domain.name,
                        record = %domain.record,
                        error = %e,
                        "Failed to update DNS record"
                    );
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            return Err(DdnsError::UpdatesFailed(failures));
        }
        if cancel.is_cancelled() {
            return Err(DdnsError::Cancelled);
        }

        next.last_public_ip = current_ip;
        if !report.updated.is_empty() {
            next.last_updated = Some(chrono::Utc::now());
        }

        *state = next;
        state.save(&self.state_path)?;

        Ok(report)
    }
}

/// Race `fut` against cancellation of `cancel`.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DdnsError::Cancelled),
        res = fut => res,
    }
}
