// # DNS Provider Trait
//
// Defines the interface the agent consumes from a DNS provider: domain and
// subdomain lookup at startup, record updates in the loop, and the API
// version for the startup banner.
//
// ## Implementations
//
// - DnsPod: `ddns-provider-dnspod` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// let provider = /* DnsProvider implementation */;
//
// let domain_id = provider.lookup_domain("example.com").await?
//     .expect("domain known to provider");
// if let Some(record) = provider.lookup_subdomain(&domain_id, "home").await? {
//     provider.update_record(&domain_id, &record.id, "home", "1.2.3.4").await?;
// }
// ```

use async_trait::async_trait;

/// A subdomain record as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubdomainRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// The IP address the provider currently has on record
    pub current_ip: String,
}

/// Provider API version, logged once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersion {
    /// Version string as reported by the provider
    pub version: String,
    /// Release date of that version, if the provider reports one
    pub released: Option<chrono::NaiveDate>,
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.released {
            Some(date) => write!(f, "{} (released {})", self.version, date.format("%Y-%m-%d")),
            None => write!(f, "{}", self.version),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers are single-shot: one logical API call per method invocation,
/// no retries, no caching, no background tasks. Lookups distinguish a clean
/// "not known to the provider" (`Ok(None)`) from a failed call (`Err`).
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the provider-side identifier of a domain
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: The domain is managed by this account
    /// - `Ok(None)`: The provider does not know the domain
    /// - `Err(Error)`: The lookup itself failed
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>, crate::Error>;

    /// Look up a subdomain's record ID and current IP
    ///
    /// # Parameters
    ///
    /// - `domain_id`: Identifier returned by [`DnsProvider::lookup_domain`]
    /// - `label`: Subdomain label (e.g. "home" for home.example.com)
    async fn lookup_subdomain(
        &self,
        domain_id: &str,
        label: &str,
    ) -> Result<Option<SubdomainRecord>, crate::Error>;

    /// Point a subdomain record at a new IP
    async fn update_record(
        &self,
        domain_id: &str,
        subdomain_id: &str,
        label: &str,
        new_ip: &str,
    ) -> Result<(), crate::Error>;

    /// Query the provider's API version (informational)
    async fn api_version(&self) -> Result<ApiVersion, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[async_trait]
impl<T: DnsProvider + ?Sized> DnsProvider for std::sync::Arc<T> {
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>, crate::Error> {
        (**self).lookup_domain(name).await
    }

    async fn lookup_subdomain(
        &self,
        domain_id: &str,
        label: &str,
    ) -> Result<Option<SubdomainRecord>, crate::Error> {
        (**self).lookup_subdomain(domain_id, label).await
    }

    async fn update_record(
        &self,
        domain_id: &str,
        subdomain_id: &str,
        label: &str,
        new_ip: &str,
    ) -> Result<(), crate::Error> {
        (**self)
            .update_record(domain_id, subdomain_id, label, new_ip)
            .await
    }

    async fn api_version(&self) -> Result<ApiVersion, crate::Error> {
        (**self).api_version().await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }
}
