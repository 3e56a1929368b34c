//! Configuration types for zonekeeper
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest accepted remote timeout
pub const MIN_REMOTE_TIMEOUT_SECS: u64 = 1;

/// Largest accepted remote timeout
pub const MAX_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Main zonekeeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonekeeperConfig {
    /// Record manager settings
    pub manager: ManagerConfig,

    /// Remote zone provider configuration
    pub provider: ProviderConfig,

    /// Record store configuration
    #[serde(default)]
    pub record_store: RecordStoreConfig,

    /// Account directory storage
    #[serde(default)]
    pub accounts: StoreConfig,

    /// Site settings storage
    #[serde(default)]
    pub settings: StoreConfig,
}

impl ZonekeeperConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.manager.validate()?;
        self.provider.validate()?;
        self.record_store.validate()?;
        self.accounts.validate("accounts")?;
        self.settings.validate("settings")?;
        Ok(())
    }
}

/// Record manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Zone records are created under (e.g. "example.com")
    pub base_domain: String,

    /// Upper bound for a single remote call (in seconds)
    ///
    /// An expired call counts as a transient remote failure.
    ///
    /// Default: 5 seconds, accepted range 1..=30
    #[serde(default = "default_remote_timeout_secs")]
    pub remote_timeout_secs: u64,

    /// Capacity of the operator event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ManagerConfig {
    /// Create a configuration with defaults for `base_domain`
    pub fn new(base_domain: impl Into<String>) -> Self {
        Self {
            base_domain: base_domain.into(),
            remote_timeout_secs: default_remote_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Set the remote timeout
    pub fn with_remote_timeout_secs(mut self, secs: u64) -> Self {
        self.remote_timeout_secs = secs;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    /// Validate the manager configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_domain.trim().is_empty() {
            return Err(crate::Error::config("base_domain cannot be empty"));
        }
        if !(MIN_REMOTE_TIMEOUT_SECS..=MAX_REMOTE_TIMEOUT_SECS).contains(&self.remote_timeout_secs)
        {
            return Err(crate::Error::config(format!(
                "remote_timeout_secs must be between {} and {} (got {})",
                MIN_REMOTE_TIMEOUT_SECS, MAX_REMOTE_TIMEOUT_SECS, self.remote_timeout_secs
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

/// Remote zone provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token (needs Zone.DNS edit permission)
        api_token: String,
        /// Zone the records live in
        zone_id: String,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { api_token, zone_id } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if zone_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare zone_id cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Keeps the API token out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<redacted>")
                .field("zone_id", zone_id)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordStoreConfig {
    /// File-based record store
    File {
        /// Path to the records file
        path: String,
    },

    /// In-memory record store (not persistent)
    #[default]
    Memory,

    /// Custom record store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl RecordStoreConfig {
    /// Validate the record store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RecordStoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("record store path cannot be empty"))
            }
            RecordStoreConfig::Custom { factory, .. } if factory.is_empty() => Err(
                crate::Error::config("Custom record store factory cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the record store type name
    pub fn type_name(&self) -> &str {
        match self {
            RecordStoreConfig::File { .. } => "file",
            RecordStoreConfig::Memory => "memory",
            RecordStoreConfig::Custom { factory, .. } => factory,
        }
    }

    /// Configuration handed to the store factory
    pub fn factory_config(&self) -> Result<serde_json::Value, crate::Error> {
        match self {
            RecordStoreConfig::Custom { config, .. } => Ok(config.clone()),
            other => Ok(serde_json::to_value(other)?),
        }
    }
}

/// Storage for accounts or settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// JSON file
    File {
        /// Path to the file
        path: String,
    },

    /// In-memory (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration; `what` names the store in errors
    pub fn validate(&self, what: &str) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.trim().is_empty() => Err(crate::Error::config(
                format!("{} store path cannot be empty", what),
            )),
            _ => Ok(()),
        }
    }
}

fn default_remote_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_defaults() {
        let config: ManagerConfig =
            serde_json::from_value(serde_json::json!({ "base_domain": "example.com" })).unwrap();
        assert_eq!(config.remote_timeout_secs, 5);
        assert_eq!(config.event_channel_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_remote_timeout_range() {
        let base = ManagerConfig::new("example.com");
        assert!(base.clone().with_remote_timeout_secs(0).validate().is_err());
        assert!(base.clone().with_remote_timeout_secs(1).validate().is_ok());
        assert!(base.clone().with_remote_timeout_secs(30).validate().is_ok());
        assert!(base.with_remote_timeout_secs(31).validate().is_err());
    }

    #[test]
    fn test_provider_validation() {
        let missing_zone = ProviderConfig::Cloudflare {
            api_token: "token".into(),
            zone_id: String::new(),
        };
        assert!(missing_zone.validate().is_err());

        let custom = ProviderConfig::Custom {
            factory: "mock".into(),
            config: serde_json::Value::Null,
        };
        assert!(custom.validate().is_err());
    }

    #[test]
    fn test_provider_debug_redacts_token() {
        let config = ProviderConfig::Cloudflare {
            api_token: "super-secret-token".into(),
            zone_id: "zone-1".into(),
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("zone-1"));
    }

    #[test]
    fn test_full_config_from_json() {
        let config: ZonekeeperConfig = serde_json::from_value(serde_json::json!({
            "manager": { "base_domain": "example.com", "remote_timeout_secs": 10 },
            "provider": { "type": "cloudflare", "api_token": "t", "zone_id": "z" },
            "record_store": { "type": "file", "path": "/tmp/records.json" },
            "accounts": { "type": "memory" }
        }))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.record_store.type_name(), "file");
        assert!(matches!(config.settings, StoreConfig::Memory));
        assert_eq!(
            config.record_store.factory_config().unwrap()["path"],
            "/tmp/records.json"
        );
    }
}
