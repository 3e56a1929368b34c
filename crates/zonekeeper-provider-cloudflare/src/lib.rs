// # Cloudflare Remote Zone
//
// This crate provides the Cloudflare implementation of `RemoteZone`.
//
// ## Behavior
//
// - One HTTP request per call: POST to create, PATCH to update, DELETE to delete
// - Every failure is classified into a `RemoteErrorClass`; the manager
//   decides what to do with it
// - The manager's remote timeout bounds every call; the HTTP client timeout
//   sits above its largest accepted value and only closes connections the
//   manager has already given up on
// - No retry, backoff or caching
//
// ## Trust Level: Untrusted (Remote Zone)
//
// The zone never touches the record store or the account directory and never
// lists the zone to reconstruct local state.
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Construction fails fast if the token or zone id is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use zonekeeper_core::config::{MAX_REMOTE_TIMEOUT_SECS, ProviderConfig};
use zonekeeper_core::traits::{
    RecordChanges, RecordSpec, RemoteError, RemoteErrorClass, RemoteZone, RemoteZoneFactory,
};
use zonekeeper_core::{Error, Result};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
///
/// Always longer than the manager's remote timeout, so that bound fires first.
const HTTP_TIMEOUT: Duration = Duration::from_secs(MAX_REMOTE_TIMEOUT_SECS + 5);

/// Cloudflare error codes that carry more meaning than the HTTP status
const CODE_RECORD_NOT_FOUND: u64 = 81044;
const CODE_AUTHENTICATION: u64 = 10000;
const CODE_RATE_LIMITED: u64 = 971;

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    message: String,
}

/// Cloudflare remote zone
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. Retries and timeouts around the call are owned
/// by `RecordManager`.
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CloudflareZone {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone the records live in
    zone_id: String,

    /// API base URL, overridable for tests
    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareZone")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareZone {
    /// Create a new Cloudflare zone client
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permission
    /// - `zone_id`: Identifier of the zone holding the base domain
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone_id cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider("cloudflare", format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_url(&self, remote_id: &str) -> String {
        format!("{}/{}", self.records_url(), remote_id)
    }

    /// Send a request and unwrap the Cloudflare envelope
    ///
    /// Returns the `result` field of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> std::result::Result<Value, RemoteError> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        match serde_json::from_str::<ApiEnvelope>(&body) {
            Ok(envelope) if status.is_success() && envelope.success => {
                Ok(envelope.result.unwrap_or(Value::Null))
            }
            Ok(envelope) => Err(RemoteError::new(
                classify(status, &envelope.errors),
                describe(status, &envelope.errors),
            )),
            Err(_) if status.is_success() => Err(RemoteError::transient(format!(
                "unexpected response body (HTTP {})",
                status.as_u16()
            ))),
            Err(_) => Err(RemoteError::new(
                classify(status, &[]),
                format!("HTTP {}", status.as_u16()),
            )),
        }
    }
}

/// Map an HTTP status and Cloudflare error codes to a failure class
fn classify(status: StatusCode, errors: &[ApiMessage]) -> RemoteErrorClass {
    if errors.iter().any(|e| e.code == CODE_RECORD_NOT_FOUND) {
        return RemoteErrorClass::NotFound;
    }
    if errors.iter().any(|e| e.code == CODE_AUTHENTICATION) {
        return RemoteErrorClass::AuthorizationRejected;
    }
    if errors.iter().any(|e| e.code == CODE_RATE_LIMITED) {
        return RemoteErrorClass::RateLimited;
    }

    match status.as_u16() {
        401 | 403 => RemoteErrorClass::AuthorizationRejected,
        404 => RemoteErrorClass::NotFound,
        429 => RemoteErrorClass::RateLimited,
        500..=599 => RemoteErrorClass::Transient,
        // 2xx with success=false and every other 4xx
        _ => RemoteErrorClass::ValidationRejected,
    }
}

fn describe(status: StatusCode, errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return format!("HTTP {}", status.as_u16());
    }
    let messages: Vec<String> = errors
        .iter()
        .map(|e| format!("{} (code {})", e.message, e.code))
        .collect();
    format!("HTTP {}: {}", status.as_u16(), messages.join("; "))
}

// reqwest errors never include the bearer token
fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::transient("request to Cloudflare timed out")
    } else {
        RemoteError::transient(format!("HTTP request failed: {}", err))
    }
}

fn create_payload(spec: &RecordSpec) -> Value {
    json!({
        "type": spec.record_type.as_str(),
        "name": spec.name,
        "content": spec.content,
        "ttl": spec.ttl.wire_value(),
        "proxied": spec.proxied,
    })
}

/// Body for a PATCH: only the fields being changed
fn patch_payload(changes: &RecordChanges) -> Value {
    let mut body = Map::new();
    if let Some(ref content) = changes.content {
        body.insert("content".into(), json!(content));
    }
    if let Some(ttl) = changes.ttl {
        body.insert("ttl".into(), json!(ttl.wire_value()));
    }
    if let Some(proxied) = changes.proxied {
        body.insert("proxied".into(), json!(proxied));
    }
    Value::Object(body)
}

#[async_trait]
impl RemoteZone for CloudflareZone {
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "www.example.com", "content": "203.0.113.5", "ttl": 1, "proxied": false }
    /// ```
    async fn create_record(&self, spec: &RecordSpec) -> std::result::Result<String, RemoteError> {
        tracing::debug!("Creating {} record {} on Cloudflare", spec.record_type, spec.name);

        let result = self
            .send(self.client.post(self.records_url()).json(&create_payload(spec)))
            .await?;

        let remote_id = result["id"].as_str().ok_or_else(|| {
            RemoteError::transient("invalid response format: result.id is not a string")
        })?;

        tracing::debug!("Cloudflare assigned record id {}", remote_id);
        Ok(remote_id.to_string())
    }

    async fn update_record(
        &self,
        remote_id: &str,
        changes: &RecordChanges,
    ) -> std::result::Result<(), RemoteError> {
        tracing::debug!("Patching Cloudflare record {}", remote_id);
        self.send(
            self.client
                .patch(self.record_url(remote_id))
                .json(&patch_payload(changes)),
        )
        .await?;
        Ok(())
    }

    async fn delete_record(&self, remote_id: &str) -> std::result::Result<(), RemoteError> {
        tracing::debug!("Deleting Cloudflare record {}", remote_id);
        self.send(self.client.delete(self.record_url(remote_id)))
            .await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare remote zones
pub struct CloudflareFactory;

impl RemoteZoneFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn RemoteZone>> {
        match config {
            ProviderConfig::Cloudflare { api_token, zone_id } => Ok(Box::new(
                CloudflareZone::new(api_token.clone(), zone_id.clone())?,
            )),
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare remote zone with a registry
///
/// # Example
///
/// ```rust
/// use zonekeeper_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// zonekeeper_provider_cloudflare::register(&registry);
/// assert!(registry.has_remote_zone("cloudflare"));
/// ```
pub fn register(registry: &zonekeeper_core::ProviderRegistry) {
    registry.register_remote_zone("cloudflare", Box::new(CloudflareFactory));
}
