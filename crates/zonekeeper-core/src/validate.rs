//! Input validation for labels, record content and TTLs
//!
//! All functions normalize to lowercase where DNS is case-insensitive, so
//! the uniqueness check on `full_name` cannot be bypassed with `WWW` vs `www`.

use crate::record::{RecordType, Ttl};
use std::net::{Ipv4Addr, Ipv6Addr};
use thiserror::Error;

/// Label that denotes the zone apex
pub const APEX_LABEL: &str = "@";

/// Maximum length of a single DNS label (RFC 1035)
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a full domain name (RFC 1035)
pub const MAX_NAME_LEN: usize = 253;

/// Reasons a user-supplied value is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("label cannot be empty")]
    EmptyLabel,

    #[error("label is {len} characters long (max {max})", max = MAX_LABEL_LEN)]
    LabelTooLong { len: usize },

    #[error("label '{label}' may only contain letters, digits and hyphens")]
    InvalidLabelCharacter { label: String },

    #[error("label '{label}' cannot start or end with a hyphen")]
    HyphenAtEdge { label: String },

    #[error("'{name}' is {len} characters long (max {max})", max = MAX_NAME_LEN)]
    NameTooLong { name: String, len: usize },

    #[error("'{0}' is not a valid IPv4 address")]
    InvalidIpv4(String),

    #[error("'{0}' is not a valid IPv6 address")]
    InvalidIpv6(String),

    #[error("'{name}' is not a valid hostname: {reason}")]
    InvalidHostname { name: String, reason: String },

    #[error("a CNAME record cannot point at itself ({0})")]
    SelfReferentialCname(String),

    #[error("TTL {0} is out of range (use 1 for automatic or {min}..={max} seconds)", min = Ttl::MIN_SECONDS, max = Ttl::MAX_SECONDS)]
    TtlOutOfRange(u32),

    #[error("no changes supplied")]
    NoChanges,
}

/// Validate a subdomain label and return its normalized (lowercase) form
///
/// Accepts `@` for the zone apex.
pub fn normalize_label(label: &str) -> Result<String, ValidationError> {
    if label == APEX_LABEL {
        return Ok(APEX_LABEL.to_string());
    }
    check_label(label)?;
    Ok(label.to_ascii_lowercase())
}

/// Combine a normalized label with the base domain
///
/// A valid label under a long base domain can still overflow the name limit.
pub fn full_name(label: &str, base_domain: &str) -> Result<String, ValidationError> {
    let name = if label == APEX_LABEL {
        base_domain.to_string()
    } else {
        format!("{}.{}", label, base_domain)
    };
    if name.len() > MAX_NAME_LEN {
        let len = name.len();
        return Err(ValidationError::NameTooLong { name, len });
    }
    Ok(name)
}

/// Validate record content against its type and return the normalized form
pub fn normalize_content(record_type: RecordType, content: &str) -> Result<String, ValidationError> {
    match record_type {
        RecordType::A => content
            .parse::<Ipv4Addr>()
            .map(|ip| ip.to_string())
            .map_err(|_| ValidationError::InvalidIpv4(content.to_string())),
        RecordType::Aaaa => content
            .parse::<Ipv6Addr>()
            .map(|ip| ip.to_string())
            .map_err(|_| ValidationError::InvalidIpv6(content.to_string())),
        RecordType::Cname => normalize_hostname(content),
    }
}

/// Validate a fully qualified hostname (a trailing dot is accepted and dropped)
pub fn normalize_hostname(name: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidHostname {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(invalid("longer than 253 characters"));
    }

    let labels: Vec<&str> = trimmed.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid("expected at least two labels"));
    }
    for label in &labels {
        check_label(label).map_err(|e| invalid(&e.to_string()))?;
    }

    Ok(trimmed.to_ascii_lowercase())
}

/// Check that a TTL is automatic or within the accepted range
pub fn check_ttl(ttl: Ttl) -> Result<Ttl, ValidationError> {
    match ttl {
        Ttl::Auto => Ok(ttl),
        Ttl::Seconds(secs) if (Ttl::MIN_SECONDS..=Ttl::MAX_SECONDS).contains(&secs) => Ok(ttl),
        Ttl::Seconds(secs) => Err(ValidationError::TtlOutOfRange(secs)),
    }
}

fn check_label(label: &str) -> Result<(), ValidationError> {
    if label.is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(ValidationError::LabelTooLong { len: label.len() });
    }
    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidLabelCharacter {
            label: label.escape_default().to_string(),
        });
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(ValidationError::HyphenAtEdge {
            label: label.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_normalization() {
        assert_eq!(normalize_label("MySite").unwrap(), "mysite");
        assert_eq!(normalize_label("my-site-2").unwrap(), "my-site-2");
        assert_eq!(normalize_label("@").unwrap(), "@");
    }

    #[test]
    fn test_label_rejections() {
        assert_eq!(normalize_label(""), Err(ValidationError::EmptyLabel));
        assert_eq!(
            normalize_label(&"a".repeat(64)),
            Err(ValidationError::LabelTooLong { len: 64 })
        );
        assert!(normalize_label(&"a".repeat(63)).is_ok());

        for bad in ["my site", "a.b", "tab\there", "nul\0", "ünï", "under_score"] {
            assert!(
                matches!(
                    normalize_label(bad),
                    Err(ValidationError::InvalidLabelCharacter { .. })
                ),
                "expected {:?} to be rejected",
                bad
            );
        }

        assert!(matches!(
            normalize_label("-edge"),
            Err(ValidationError::HyphenAtEdge { .. })
        ));
        assert!(matches!(
            normalize_label("edge-"),
            Err(ValidationError::HyphenAtEdge { .. })
        ));
    }

    #[test]
    fn test_full_name() {
        assert_eq!(full_name("www", "example.com").unwrap(), "www.example.com");
        assert_eq!(full_name("@", "example.com").unwrap(), "example.com");

        let long = "b".repeat(60);
        let base = format!("{long}.{long}.{long}.example.com");
        assert_eq!(base.len(), 194);
        assert!(matches!(
            full_name(&"a".repeat(MAX_LABEL_LEN), &base),
            Err(ValidationError::NameTooLong { len: 258, .. })
        ));
        assert_eq!(full_name(&"a".repeat(58), &base).unwrap().len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_a_content() {
        assert_eq!(
            normalize_content(RecordType::A, "203.0.113.5").unwrap(),
            "203.0.113.5"
        );
        assert!(normalize_content(RecordType::A, "203.0.113").is_err());
        assert!(normalize_content(RecordType::A, "203.0.113.256").is_err());
        assert!(normalize_content(RecordType::A, "2001:db8::1").is_err());
        assert!(normalize_content(RecordType::A, " 203.0.113.5").is_err());
    }

    #[test]
    fn test_aaaa_content_is_canonicalized() {
        assert_eq!(
            normalize_content(RecordType::Aaaa, "2001:0DB8:0000:0000:0000:0000:0000:0001").unwrap(),
            "2001:db8::1"
        );
        assert!(matches!(
            normalize_content(RecordType::Aaaa, "203.0.113.5"),
            Err(ValidationError::InvalidIpv6(_))
        ));
    }

    #[test]
    fn test_cname_content() {
        assert_eq!(
            normalize_content(RecordType::Cname, "Example.ORG.").unwrap(),
            "example.org"
        );
        assert!(normalize_content(RecordType::Cname, "localhost").is_err());
        assert!(normalize_content(RecordType::Cname, "bad..example.org").is_err());
        assert!(normalize_content(RecordType::Cname, "has space.example.org").is_err());
        assert!(normalize_content(RecordType::Cname, ".").is_err());
    }

    #[test]
    fn test_ttl_bounds() {
        assert_eq!(check_ttl(Ttl::Auto), Ok(Ttl::Auto));
        assert!(check_ttl(Ttl::Seconds(60)).is_ok());
        assert!(check_ttl(Ttl::Seconds(86_400)).is_ok());
        assert_eq!(
            check_ttl(Ttl::Seconds(59)),
            Err(ValidationError::TtlOutOfRange(59))
        );
        assert_eq!(
            check_ttl(Ttl::Seconds(86_401)),
            Err(ValidationError::TtlOutOfRange(86_401))
        );
    }
}
