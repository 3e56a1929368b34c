// # Remote Zone Trait
//
// Defines the interface to the authoritative DNS zone (the remote truth).
//
// ## Implementations
//
// - Cloudflare: `zonekeeper-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use zonekeeper_core::traits::{RecordSpec, RemoteZone};
//
// let remote_id = zone.create_record(&RecordSpec {
//     name: "www.example.com".into(),
//     record_type: RecordType::A,
//     content: "203.0.113.5".into(),
//     ttl: Ttl::Auto,
//     proxied: false,
// }).await?;
//
// zone.delete_record(&remote_id).await?;
// ```

use crate::record::{DnsRecord, RecordType, Ttl};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Classification of a failed remote call
///
/// The manager relies on this to decide between "already gone" (delete),
/// "try again" and "do not retry".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorClass {
    /// Network failure, timeout or provider-side 5xx
    Transient,
    /// The remote record does not exist
    NotFound,
    /// The provider rejected the payload (including remote duplicates)
    ValidationRejected,
    /// Credentials missing, invalid or lacking permission
    AuthorizationRejected,
    /// The provider throttled the request
    RateLimited,
}

impl RemoteErrorClass {
    /// Whether a caller may retry with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient | Self::RateLimited)
    }
}

impl fmt::Display for RemoteErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transient => "transient failure",
            Self::NotFound => "not found",
            Self::ValidationRejected => "rejected by validation",
            Self::AuthorizationRejected => "authorization rejected",
            Self::RateLimited => "rate limited",
        };
        f.write_str(name)
    }
}

/// Error returned by a [`RemoteZone`] call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{class}: {message}")]
pub struct RemoteError {
    pub class: RemoteErrorClass,
    pub message: String,
}

impl RemoteError {
    pub fn new(class: RemoteErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorClass::Transient, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorClass::NotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorClass::ValidationRejected, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorClass::AuthorizationRejected, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorClass::RateLimited, message)
    }

    /// Whether the remote record is known to be absent
    pub fn is_not_found(&self) -> bool {
        self.class == RemoteErrorClass::NotFound
    }

    pub fn is_retryable(&self) -> bool {
        self.class.is_retryable()
    }
}

/// Full description of a record to create remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// Fully qualified record name
    pub name: String,
    pub record_type: RecordType,
    pub content: String,
    pub ttl: Ttl,
    pub proxied: bool,
}

impl From<&DnsRecord> for RecordSpec {
    fn from(record: &DnsRecord) -> Self {
        Self {
            name: record.full_name.clone(),
            record_type: record.record_type,
            content: record.content.clone(),
            ttl: record.ttl,
            proxied: record.proxied,
        }
    }
}

/// Partial update of a remote record; `None` fields stay untouched
///
/// Name and type never change in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordChanges {
    pub content: Option<String>,
    pub ttl: Option<Ttl>,
    pub proxied: Option<bool>,
}

impl RecordChanges {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.ttl.is_none() && self.proxied.is_none()
    }

    /// Apply the changes to a local copy of the record
    pub fn apply_to(&self, record: &mut DnsRecord) {
        if let Some(ref content) = self.content {
            record.content = content.clone();
        }
        if let Some(ttl) = self.ttl {
            record.ttl = ttl;
        }
        if let Some(proxied) = self.proxied {
            record.proxied = proxied;
        }
    }
}

/// Trait for remote zone implementations
///
/// # Trust Level: Untrusted
///
/// Remote zones are **untrusted** components with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Classify failures into [`RemoteErrorClass`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (callers decide, based on the error class)
/// - ❌ Access the record store or account directory
/// - ❌ Spawn tasks or cache state beyond a single request
/// - ❌ Read the full zone to reconstruct local state
///
/// Every call is wrapped in a timeout by the manager; implementations should
/// still configure a transport timeout so an abandoned connection is closed.
#[async_trait]
pub trait RemoteZone: Send + Sync {
    /// Create a record and return the identifier the provider assigned
    async fn create_record(&self, spec: &RecordSpec) -> Result<String, RemoteError>;

    /// Apply a partial update to the record identified by `remote_id`
    async fn update_record(
        &self,
        remote_id: &str,
        changes: &RecordChanges,
    ) -> Result<(), RemoteError>;

    /// Delete a record
    ///
    /// A missing record must be reported with [`RemoteErrorClass::NotFound`]
    /// so callers can treat it as already deleted.
    async fn delete_record(&self, remote_id: &str) -> Result<(), RemoteError>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing remote zones from configuration
pub trait RemoteZoneFactory: Send + Sync {
    /// Create a RemoteZone instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn RemoteZone>, crate::Error>;
}
