// # DnsPod DNS Provider
//
// This crate provides the DnsPod provider for the DDNS agent.
//
// ## Scope
//
// - One HTTP request per trait method call
// - Full error propagation; retries and scheduling belong to the caller
// - Dry-run mode: lookups are real, record modifications are only logged
// - A records only
//
// ## Security Requirements
//
// - The login token NEVER appears in logs or `Debug` output
// - The token travels in the form body, never in the URL
//
// ## API Reference
//
// Every call is a form-encoded `POST https://dnsapi.cn/<Action>` carrying the
// common parameters `login_token=<id>,<token>`, `format=json`, `lang=en` and
// `error_on_empty=no`. Every response carries a `status` object whose `code`
// is `"1"` on success.
//
// - `Domain.Info`: domain ID by name
// - `Record.List`: records of a domain filtered by sub_domain and type
// - `Record.Modify`: point a record at a new value
// - `Info.Version`: API version (in `status.message`)

use async_trait::async_trait;
use ddns_core::traits::{ApiVersion, DnsProvider, SubdomainRecord};
use ddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// DnsPod API base URL
const DNSPOD_API_BASE: &str = "https://dnsapi.cn";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider name used in errors and logs
const PROVIDER_NAME: &str = "dnspod";

/// Record type managed by this provider
const RECORD_TYPE: &str = "A";

/// The default resolution line
const RECORD_LINE_DEFAULT: &str = "默认";

/// Status code for a successful call
const CODE_OK: &str = "1";

/// Status code for a rejected login token
const CODE_LOGIN_FAILED: &str = "-1";

/// `Domain.Info`: domain does not exist
const CODE_DOMAIN_UNKNOWN: &str = "6";

/// `Domain.Info`: domain belongs to another account
const CODE_DOMAIN_NOT_OWNED: &str = "8";

/// `Record.List`: no records
const CODE_NO_RECORDS: &str = "10";

/// DnsPod DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all lookups (`Domain.Info`, `Record.List`, `Info.Version`)
/// - Log the intended `Record.Modify` call
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation does NOT expose the login token.
pub struct DnspodProvider {
    /// `<api_id>,<api_token>`
    /// ⚠️ NEVER log this value
    login_token: String,

    /// API base URL, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform lookups but skip record modifications
    dry_run: bool,
}

// Custom Debug implementation that hides the login token
impl std::fmt::Debug for DnspodProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnspodProvider")
            .field("login_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl DnspodProvider {
    /// Create a new DnsPod provider
    ///
    /// # Parameters
    ///
    /// - `login_token`: `<api_id>,<api_token>` (see `Settings::login_token`)
    /// - `dry_run`: If true, perform lookups but skip record modifications
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the login token is empty
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(login_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        let login_token = login_token.into();
        if login_token.trim().is_empty() {
            return Err(Error::config("DnsPod login token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("ddnsd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            login_token,
            base_url: DNSPOD_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Point the provider at another API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether record modifications are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// POST one API action and decode its JSON response
    ///
    /// Only transport-level problems are errors here; the `status` object is
    /// left to the caller since some non-success codes are expected answers.
    async fn call<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let mut form: Vec<(&str, &str)> = vec![
            ("login_token", self.login_token.as_str()),
            ("format", "json"),
            ("lang", "en"),
            ("error_on_empty", "no"),
        ];
        form.extend_from_slice(params);

        tracing::debug!("Calling DnsPod {}", action);

        let url = format!("{}/{}", self.base_url, action);
        let response = self
            .client
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} returned HTTP {}", action, status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", action, e)))?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!("Unparseable {} response: {}", action, body);
            Error::provider(PROVIDER_NAME, format!("Invalid {} response: {}", action, e))
        })
    }
}

/// The `status` object present in every response
#[derive(Debug, Deserialize)]
struct Status {
    #[serde(deserialize_with = "string_or_number")]
    code: String,

    #[serde(default)]
    message: String,

    #[serde(default)]
    created_at: Option<String>,
}

impl Status {
    fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    /// Map a non-success status to an error
    fn into_error(self, action: &str) -> Error {
        if self.code == CODE_LOGIN_FAILED {
            Error::auth(format!("{} rejected the login token: {}", action, self.message))
        } else {
            Error::provider(
                PROVIDER_NAME,
                format!("{} failed (code {}): {}", action, self.code, self.message),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Status,
}

#[derive(Debug, Deserialize)]
struct DomainInfoResponse {
    status: Status,
    domain: Option<DomainInfo>,
}

#[derive(Debug, Deserialize)]
struct DomainInfo {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct RecordListResponse {
    status: Status,
    #[serde(default)]
    records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    name: String,
    #[serde(default)]
    value: String,
}

/// DnsPod returns IDs and codes as strings or numbers depending on the action
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(i64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Number(n) => n.to_string(),
    })
}

/// Parse `status.created_at` ("2024-03-01 10:00:00" or "2024-03-01")
fn parse_release_date(raw: &str) -> Option<chrono::NaiveDate> {
    let raw = raw.trim();
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

#[async_trait]
impl DnsProvider for DnspodProvider {
    /// `Domain.Info`
    ///
    /// Codes 6 (unknown domain) and 8 (owned by another account) are a clean
    /// "not found".
    async fn lookup_domain(&self, name: &str) -> Result<Option<String>> {
        let response: DomainInfoResponse = self.call("Domain.Info", &[("domain", name)]).await?;

        if !response.status.is_ok() {
            if matches!(
                response.status.code.as_str(),
                CODE_DOMAIN_UNKNOWN | CODE_DOMAIN_NOT_OWNED
            ) {
                tracing::debug!("Domain {} not found: {}", name, response.status.message);
                return Ok(None);
            }
            return Err(response.status.into_error("Domain.Info"));
        }

        let domain = response.domain.ok_or_else(|| {
            Error::provider(PROVIDER_NAME, "Domain.Info response has no domain object")
        })?;

        tracing::debug!("Found domain ID for {}: {}", name, domain.id);
        Ok(Some(domain.id))
    }

    /// `Record.List`, first exact name match wins
    async fn lookup_subdomain(
        &self,
        domain_id: &str,
        label: &str,
    ) -> Result<Option<SubdomainRecord>> {
        let response: RecordListResponse = self
            .call(
                "Record.List",
                &[
                    ("domain_id", domain_id),
                    ("sub_domain", label),
                    ("record_type", RECORD_TYPE),
                ],
            )
            .await?;

        if !response.status.is_ok() {
            if response.status.code == CODE_NO_RECORDS {
                return Ok(None);
            }
            return Err(response.status.into_error("Record.List"));
        }

        let record = response
            .records
            .into_iter()
            .find(|r| r.name == label)
            .filter(|r| !r.id.is_empty() && !r.value.is_empty());

        Ok(record.map(|r| SubdomainRecord {
            id: r.id,
            current_ip: r.value,
        }))
    }

    /// `Record.Modify` with the default line
    async fn update_record(
        &self,
        domain_id: &str,
        subdomain_id: &str,
        label: &str,
        new_ip: &str,
    ) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would modify record {} ({}) in domain {}: {} {}",
                subdomain_id,
                label,
                domain_id,
                RECORD_TYPE,
                new_ip
            );
            return Ok(());
        }

        let response: StatusResponse = self
            .call(
                "Record.Modify",
                &[
                    ("domain_id", domain_id),
                    ("record_id", subdomain_id),
                    ("sub_domain", label),
                    ("record_type", RECORD_TYPE),
                    ("record_line", RECORD_LINE_DEFAULT),
                    ("value", new_ip),
                ],
            )
            .await?;

        if !response.status.is_ok() {
            return Err(response.status.into_error("Record.Modify"));
        }

        Ok(())
    }

    /// `Info.Version`
    async fn api_version(&self) -> Result<ApiVersion> {
        let response: StatusResponse = self.call("Info.Version", &[]).await?;

        if !response.status.is_ok() {
            return Err(response.status.into_error("Info.Version"));
        }

        let released = response
            .status
            .created_at
            .as_deref()
            .and_then(parse_release_date);

        Ok(ApiVersion {
            version: response.status.message,
            released,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
