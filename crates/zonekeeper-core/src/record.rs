//! DNS record model
//!
//! A [`DnsRecord`] without a `remote_id` is a *reservation*: it claims its
//! `full_name` while the remote create is in flight, but it is not durable,
//! never counts toward quota and never shows up in listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            other => Err(crate::Error::invalid_input(format!(
                "unsupported record type '{}' (supported: A, AAAA, CNAME)",
                other
            ))),
        }
    }
}

/// Record time-to-live
///
/// Serialized as the provider's wire value: `1` means automatic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum Ttl {
    /// Let the provider choose
    #[default]
    Auto,
    /// Fixed number of seconds
    Seconds(u32),
}

impl Ttl {
    /// Wire value for [`Ttl::Auto`]
    pub const AUTO_WIRE_VALUE: u32 = 1;
    /// Smallest accepted fixed TTL
    pub const MIN_SECONDS: u32 = 60;
    /// Largest accepted fixed TTL
    pub const MAX_SECONDS: u32 = 86_400;

    /// Value sent to the provider
    pub fn wire_value(&self) -> u32 {
        match self {
            Ttl::Auto => Self::AUTO_WIRE_VALUE,
            Ttl::Seconds(secs) => *secs,
        }
    }
}

impl From<u32> for Ttl {
    fn from(value: u32) -> Self {
        if value == Self::AUTO_WIRE_VALUE {
            Ttl::Auto
        } else {
            Ttl::Seconds(value)
        }
    }
}

impl From<Ttl> for u32 {
    fn from(ttl: Ttl) -> Self {
        ttl.wire_value()
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Auto => f.write_str("auto"),
            Ttl::Seconds(secs) => write!(f, "{}s", secs),
        }
    }
}

/// A locally known DNS record and its remote counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Local identifier (UUID v4), immutable
    pub id: String,
    /// Owning account, never reassigned
    pub owner_id: String,
    /// Normalized subdomain label (`@` for the apex)
    pub subdomain_label: String,
    /// Label joined with the base domain; unique across the zone
    pub full_name: String,
    /// Immutable after creation
    pub record_type: RecordType,
    /// Normalized content for `record_type`
    pub content: String,
    pub ttl: Ttl,
    pub proxied: bool,
    /// Identifier assigned by the remote zone; `None` while a create is in flight
    pub remote_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DnsRecord {
    /// Create a reservation that claims `full_name` ahead of the remote create
    ///
    /// # Visibility
    ///
    /// This is `pub(crate)` so that only the manager mints reservations; every
    /// field has already been validated by the time it is called.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn reservation(
        owner_id: impl Into<String>,
        subdomain_label: impl Into<String>,
        full_name: impl Into<String>,
        record_type: RecordType,
        content: impl Into<String>,
        ttl: Ttl,
        proxied: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            subdomain_label: subdomain_label.into(),
            full_name: full_name.into(),
            record_type,
            content: content.into(),
            ttl,
            proxied,
            remote_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the remote create succeeded and the row is durable
    pub fn is_committed(&self) -> bool {
        self.remote_id.is_some()
    }
}
