// # HTTP Address Source
//
// This crate provides the external-mode address source for the DDNS agent.
//
// ## Purpose
//
// Hosts behind NAT cannot see their public address on any local interface.
// External mode asks a "what is my IP" endpoint instead, for example:
// - http://myexternalip.com/raw
// - http://members.3322.org/dyndns/getip
// - https://api.ipify.org
//
// ## Contract
//
// One GET per discovery. The whole response body, trimmed, is the address.
// The body is not parsed as an IP: whatever the endpoint returns is what gets
// pushed to the provider. Retrying is the caller's job (see `RetryPolicy`).

use ddns_core::config::DiscoveryMode;
use ddns_core::traits::AddressSource;
use ddns_core::{Error, Result};

use std::time::Duration;
use tracing::debug;

/// Request timeout for the fetch endpoint
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Address source that queries an external endpoint over HTTP
#[derive(Debug, Clone)]
pub struct HttpAddressSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a new HTTP address source
    ///
    /// # Parameters
    ///
    /// - `url`: Endpoint returning the caller's address as plain text
    ///
    /// # Errors
    ///
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// The endpoint this source queries
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl AddressSource for HttpAddressSource {
    async fn discover(&self) -> Result<String> {
        debug!("Fetching address from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::fetch(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(format!("Failed to read response: {}", e)))?;

        let address = body.trim();
        if address.is_empty() {
            return Err(Error::fetch(format!("{} returned an empty body", self.url)));
        }

        Ok(address.to_string())
    }

    fn mode(&self) -> DiscoveryMode {
        DiscoveryMode::External
    }
}
