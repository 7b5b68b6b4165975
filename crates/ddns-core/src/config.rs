//! Configuration types for the DDNS agent
//!
//! Settings are loaded once from a JSON file at startup and are read-only
//! afterwards.
//!
//! ```json
//! {
//!   "api_id": 12345,
//!   "api_token": "your-token",
//!   "domain": "example.com",
//!   "sub_domains": "home,nas",
//!   "ip_fetch_url": "https://api.ipify.org",
//!   "check_second": 300
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default interval between discovery cycles (5 minutes)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

/// Shortest interval accepted; anything lower hammers the provider API
pub const MIN_CHECK_INTERVAL_SECS: u64 = 300;

/// How the current address is discovered, selected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Read the host's own interface addresses
    Internal,
    /// Ask an external "what is my IP" endpoint
    External,
}

impl std::fmt::Display for DiscoveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryMode::Internal => write!(f, "internal"),
            DiscoveryMode::External => write!(f, "external"),
        }
    }
}

/// Agent settings
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Provider API id (first half of the login token)
    #[serde(default)]
    pub api_id: i64,

    /// Provider API token
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub api_token: String,

    /// Domain whose subdomains are kept updated (e.g. "example.com")
    #[serde(default)]
    pub domain: String,

    /// Comma-separated subdomain labels (e.g. "home,nas")
    #[serde(default)]
    pub sub_domains: String,

    /// Endpoint returning the caller's IP as plain text (external mode)
    #[serde(default)]
    pub ip_fetch_url: String,

    /// Seconds between discovery cycles; 0 means the default
    #[serde(default, rename = "check_second")]
    pub check_secs: u64,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_id", &self.api_id)
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("sub_domains", &self.sub_domains)
            .field("ip_fetch_url", &self.ip_fetch_url)
            .field("check_secs", &self.check_secs)
            .finish()
    }
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the file cannot be read or is not valid JSON
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Cannot read config file {} ({}); make sure it exists",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&text).map_err(|e| {
            Error::config(format!(
                "Cannot parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Parse settings from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Effective interval between discovery cycles
    ///
    /// - `0` → [`DEFAULT_CHECK_INTERVAL_SECS`]
    /// - below [`MIN_CHECK_INTERVAL_SECS`] → `Error::Config`
    /// - otherwise used verbatim
    pub fn check_interval(&self) -> Result<Duration> {
        match self.check_secs {
            0 => Ok(Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS)),
            secs if secs < MIN_CHECK_INTERVAL_SECS => Err(Error::config(format!(
                "check_second must be at least {} seconds. Got: {}",
                MIN_CHECK_INTERVAL_SECS, secs
            ))),
            secs => Ok(Duration::from_secs(secs)),
        }
    }

    /// Provider login token in `<id>,<token>` form
    pub fn login_token(&self) -> String {
        format!("{},{}", self.api_id, self.api_token)
    }

    /// Validate the settings for the given discovery mode
    pub fn validate(&self, mode: DiscoveryMode) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(Error::config("api_token is required"));
        }

        if self.domain.trim().is_empty() {
            return Err(Error::config("domain is required"));
        }

        if mode == DiscoveryMode::External {
            let url = self.ip_fetch_url.trim();
            if url.is_empty() {
                return Err(Error::config(
                    "ip_fetch_url is required unless internal discovery is selected",
                ));
            }
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(Error::config(format!(
                    "ip_fetch_url must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        self.check_interval()?;

        Ok(())
    }
}
