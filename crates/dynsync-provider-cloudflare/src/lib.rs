//! Cloudflare DNS record adapter
//!
//! Translates one update call into the minimal Cloudflare v4 API exchange:
//! list the matching records, then PUT the stale record, POST a missing one,
//! or do nothing when the content already matches. All scheduling, retry and
//! state decisions stay in the engine; the adapter is stateless and
//! single-shot.
//!
//! Three credential modes are accepted, exactly one per record:
//! - API token (`token`), sent as a bearer header
//! - Global API key plus account email (`key` + `email`)
//! - Origin CA user service key (`user_service_key`, `v1.0-` prefixed)
//!
//! Credentials never appear in logs or Debug output.

use async_trait::async_trait;
use dynsync_core::config::{IpVersion, RecordConfig, build_fqdn};
use dynsync_core::{DnsProvider, Error, ProviderFactory, Result};
use regex::Regex;
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::LazyLock;
use tracing::{debug, info};

const API_BASE: &str = "https://api.cloudflare.com/client/v4";
const PROVIDER_NAME: &str = "cloudflare";
const LIST_PAGE_SIZE: &str = "100";

static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").unwrap());
static USER_SERVICE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v1\.0.+$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Provider-specific record settings, decoded from the record's settings
/// blob at construction time
#[derive(Deserialize)]
struct CloudflareSettings {
    #[serde(default)]
    email: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    user_service_key: String,
    zone_identifier: String,
    #[serde(default)]
    proxied: bool,
    ttl: u32,
}

/// One validated credential mode
#[derive(Clone)]
enum Credentials {
    Token(String),
    EmailKey { email: String, key: String },
    UserServiceKey(String),
}

impl Credentials {
    /// Pick exactly one mode from the settings blob; zero or several
    /// configured modes are a configuration error.
    fn from_settings(settings: &CloudflareSettings) -> Result<Self> {
        let mut modes = Vec::new();
        if !settings.token.is_empty() {
            modes.push("token");
        }
        if !settings.key.is_empty() || !settings.email.is_empty() {
            modes.push("email+key");
        }
        if !settings.user_service_key.is_empty() {
            modes.push("user_service_key");
        }

        match modes.as_slice() {
            ["token"] => Ok(Self::Token(settings.token.clone())),
            ["email+key"] => {
                if !KEY_RE.is_match(&settings.key) {
                    return Err(Error::config("cloudflare key is malformed"));
                }
                if !EMAIL_RE.is_match(&settings.email) {
                    return Err(Error::config("cloudflare email is malformed"));
                }
                Ok(Self::EmailKey {
                    email: settings.email.clone(),
                    key: settings.key.clone(),
                })
            }
            ["user_service_key"] => {
                if !USER_SERVICE_KEY_RE.is_match(&settings.user_service_key) {
                    return Err(Error::config("cloudflare user service key is malformed"));
                }
                Ok(Self::UserServiceKey(settings.user_service_key.clone()))
            }
            [] => Err(Error::config(
                "cloudflare credentials missing: set token, email+key, or user_service_key",
            )),
            several => Err(Error::config(format!(
                "cloudflare credentials ambiguous: {} configured, pick one",
                several.join(" and ")
            ))),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Token(token) => request.bearer_auth(token),
            Self::EmailKey { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
            Self::UserServiceKey(key) => request.header("X-Auth-User-Service-Key", key),
        }
    }
}

/// Cloudflare v4 API response envelope
#[derive(Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct ApiError {
    code: i64,
    message: String,
}

/// The record fields the adapter reads back
#[derive(Debug, Clone, Deserialize)]
struct RecordObject {
    id: String,
    content: String,
}

/// Outcome of matching listed records against the target address
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    /// No record of this type and name exists yet
    Missing,
    /// Exactly one record exists and already carries the target address
    UpToDate { id: String },
    /// Exactly one record exists with different content
    Stale { id: String },
}

/// Decide what to do with the listed records.
///
/// Zero records means a creation attempt; more than one is always ambiguous
/// and never auto-resolved. Unparseable content counts as stale.
fn classify(records: &[RecordObject], target: IpAddr) -> Result<Lookup> {
    match records {
        [] => Ok(Lookup::Missing),
        [record] => match record.content.parse::<IpAddr>() {
            Ok(ip) if ip == target => Ok(Lookup::UpToDate {
                id: record.id.clone(),
            }),
            _ => Ok(Lookup::Stale {
                id: record.id.clone(),
            }),
        },
        several => Err(Error::MultipleResults {
            count: several.len(),
        }),
    }
}

/// DNS record type for an address family
fn record_type(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

/// Cloudflare adapter for one managed record
pub struct CloudflareProvider {
    domain: String,
    owner: String,
    fqdn: String,
    ip_version: IpVersion,
    zone_identifier: String,
    credentials: Credentials,
    proxied: bool,
    ttl: u32,
    client: reqwest::Client,
    api_base: String,
}

// Credentials never appear in Debug output
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("fqdn", &self.fqdn)
            .field("ip_version", &self.ip_version)
            .field("zone_identifier", &self.zone_identifier)
            .field("credentials", &"<REDACTED>")
            .field("proxied", &self.proxied)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CloudflareProvider {
    /// Build an adapter from a record configuration and its decoded
    /// settings. All validation happens here, once; a constructed adapter
    /// never re-checks its configuration.
    fn new(
        record: &RecordConfig,
        settings: CloudflareSettings,
        client: reqwest::Client,
    ) -> Result<Self> {
        let credentials = Credentials::from_settings(&settings)?;

        if settings.zone_identifier.is_empty() {
            return Err(Error::config("cloudflare zone_identifier is required"));
        }
        if settings.ttl == 0 {
            return Err(Error::config("cloudflare ttl must be > 0"));
        }

        Ok(Self {
            domain: record.domain.clone(),
            owner: record.owner.clone(),
            fqdn: build_fqdn(&record.owner, &record.domain),
            ip_version: record.ip_version,
            zone_identifier: settings.zone_identifier,
            credentials,
            proxied: settings.proxied,
            ttl: settings.ttl,
            client,
            api_base: API_BASE.to_string(),
        })
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_identifier)
    }

    /// List the records matching this adapter's name and the given type
    async fn list_records(&self, rtype: &str) -> Result<Vec<RecordObject>> {
        let request = self
            .client
            .get(self.records_url())
            .query(&[
                ("type", rtype),
                ("name", self.fqdn.as_str()),
                ("page", "1"),
                ("per_page", LIST_PAGE_SIZE),
            ]);
        let records: Option<Vec<RecordObject>> = self.exchange(request, "list").await?;
        Ok(records.unwrap_or_default())
    }

    /// Create the record. A creation response without a result body means
    /// the record still does not exist, surfaced as [`Error::NoResult`].
    async fn create_record(&self, rtype: &str, ip: IpAddr) -> Result<IpAddr> {
        info!(fqdn = %self.fqdn, %ip, "record missing, creating it");
        let request = self
            .client
            .post(self.records_url())
            .json(&self.record_payload(rtype, ip));
        let created: Option<RecordObject> = self.exchange(request, "create").await?;
        let created = created.ok_or(Error::NoResult)?;
        self.confirm_content(&created)
    }

    /// Replace the stale record's content
    async fn put_record(&self, id: &str, rtype: &str, ip: IpAddr) -> Result<IpAddr> {
        debug!(fqdn = %self.fqdn, %ip, "replacing stale record content");
        let request = self
            .client
            .put(format!("{}/{}", self.records_url(), id))
            .json(&self.record_payload(rtype, ip));
        let updated: Option<RecordObject> = self.exchange(request, "update").await?;
        let updated = updated.ok_or_else(|| {
            Error::provider(PROVIDER_NAME, "update response carried no record")
        })?;
        self.confirm_content(&updated)
    }

    fn record_payload(&self, rtype: &str, ip: IpAddr) -> serde_json::Value {
        serde_json::json!({
            "type": rtype,
            "name": self.fqdn,
            "content": ip.to_string(),
            "ttl": self.ttl,
            "proxied": self.proxied,
        })
    }

    fn confirm_content(&self, record: &RecordObject) -> Result<IpAddr> {
        record.content.parse().map_err(|_| {
            Error::provider(
                PROVIDER_NAME,
                format!("response content is not an IP address: {:?}", record.content),
            )
        })
    }

    /// Send one authenticated request and decode the API envelope
    async fn exchange<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<Option<T>> {
        let response = self
            .credentials
            .apply(request)
            .send()
            .await
            .map_err(|e| Error::http(format!("cloudflare {}: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, operation));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| Error::provider(PROVIDER_NAME, format!("{} response: {}", operation, e)))?;

        if !envelope.success {
            let detail = envelope
                .errors
                .iter()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("{} rejected: {}", operation, detail),
            ));
        }

        Ok(envelope.result)
    }
}

/// Map a non-success HTTP status to a runtime error
fn status_error(status: reqwest::StatusCode, operation: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::provider(
            PROVIDER_NAME,
            format!("{}: authentication rejected (status {})", operation, status),
        ),
        429 => Error::provider(
            PROVIDER_NAME,
            format!("{}: rate limited (status {})", operation, status),
        ),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("{}: server error (status {})", operation, status),
        ),
        _ => Error::http(format!("cloudflare {}: status {}", operation, status)),
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn update(&self, ip: IpAddr) -> Result<IpAddr> {
        let rtype = record_type(ip);
        let records = self.list_records(rtype).await?;

        match classify(&records, ip)? {
            Lookup::UpToDate { .. } => {
                debug!(fqdn = %self.fqdn, %ip, "record content already correct");
                Ok(ip)
            }
            Lookup::Stale { id } => self.put_record(&id, rtype, ip).await,
            Lookup::Missing => self.create_record(rtype, ip).await,
        }
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn ip_version(&self) -> IpVersion {
        self.ip_version
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Factory building Cloudflare adapters from record configurations.
///
/// Shares one HTTP client across every adapter it creates.
pub struct CloudflareFactory {
    client: reqwest::Client,
}

impl CloudflareFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ProviderFactory for CloudflareFactory {
    fn create(&self, record: &RecordConfig) -> Result<Box<dyn DnsProvider>> {
        let settings: CloudflareSettings = serde_json::from_value(record.settings.clone())
            .map_err(|e| Error::config(format!("cloudflare settings: {}", e)))?;
        let provider = CloudflareProvider::new(record, settings, self.client.clone())?;
        Ok(Box::new(provider))
    }
}
