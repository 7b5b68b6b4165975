//! Domain and subdomain resolution
//!
//! Turns the configured domain name and comma-separated subdomain list into
//! provider-side identifiers before the update loop starts.
//!
//! ## Failure handling
//!
//! - Forbidden characters in the subdomain list → fatal (`Error::InvalidInput`),
//!   checked before any provider call
//! - Domain unknown to the provider → fatal (`Error::NotFound`)
//! - Individual subdomain unknown (or its lookup fails) → warning, label dropped
//!
//! An empty result is not an error: the loop will simply have nothing to
//! update.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::DnsProvider;

/// Characters that are never valid in the subdomain list
pub const FORBIDDEN_SUBDOMAIN_CHARS: &[char] = &[';', '$', '#', '^', '&'];

/// One subdomain the agent keeps updated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Provider-side domain identifier
    pub domain_id: String,
    /// Provider-side record identifier
    pub subdomain_id: String,
    /// Subdomain label (e.g. "home")
    pub label: String,
}

/// Output of resolution: the domain and its updatable subdomains
///
/// Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDomain {
    /// Trimmed domain name (e.g. "example.com")
    pub name: String,
    /// Provider-side domain identifier
    pub id: String,
    /// Targets in the order their labels appeared in the configuration
    pub targets: Vec<ResolvedTarget>,
}

impl ResolvedDomain {
    /// Fully-qualified name of a target (e.g. "home.example.com")
    pub fn fqdn(&self, target: &ResolvedTarget) -> String {
        format!("{}.{}", target.label, self.name)
    }
}

/// Split the raw subdomain list into trimmed, non-empty labels
///
/// Order is preserved; empty entries are silently dropped.
///
/// # Errors
///
/// - `Error::InvalidInput` if the list contains any of
///   [`FORBIDDEN_SUBDOMAIN_CHARS`]
pub fn parse_subdomains(raw: &str) -> Result<Vec<String>> {
    if let Some(c) = raw.chars().find(|c| FORBIDDEN_SUBDOMAIN_CHARS.contains(c)) {
        return Err(Error::invalid_input(format!(
            "sub_domains contains '{}'; separate multiple subdomains with \",\"",
            c
        )));
    }

    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect())
}

/// Resolves configured names against a provider
pub struct DomainResolver<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> DomainResolver<'a> {
    /// Create a resolver backed by `provider`
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Resolve `domain_name` and each label of `raw_subdomains`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` on a malformed subdomain list (no provider call is made)
    /// - `Error::NotFound` if the provider does not know the domain
    /// - Any error from the domain lookup call itself
    pub async fn resolve(&self, domain_name: &str, raw_subdomains: &str) -> Result<ResolvedDomain> {
        let name = domain_name.trim().to_string();
        let labels = parse_subdomains(raw_subdomains)?;

        let id = self.provider.lookup_domain(&name).await?.ok_or_else(|| {
            Error::not_found(format!(
                "domain {} is not managed by {}",
                name,
                self.provider.provider_name()
            ))
        })?;

        let mut targets = Vec::with_capacity(labels.len());
        for label in labels {
            let fqdn = format!("{}.{}", label, name);
            match self.provider.lookup_subdomain(&id, &label).await {
                Ok(Some(record)) => {
                    info!("{} => {}", fqdn, record.current_ip);
                    targets.push(ResolvedTarget {
                        domain_id: id.clone(),
                        subdomain_id: record.id,
                        label,
                    });
                }
                Ok(None) => {
                    warn!("{} is not in the record list, skipping", fqdn);
                }
                Err(e) => {
                    warn!("Failed to look up {}, skipping: {}", fqdn, e);
                }
            }
        }

        if targets.is_empty() {
            warn!("No subdomains of {} resolved; nothing will be updated", name);
        }

        Ok(ResolvedDomain { name, id, targets })
    }
}
